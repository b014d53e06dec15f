//! Import-time classification of cluster namespaces into tenant,
//! environment and application records (spec §4.F).

pub mod application;
pub mod classify;
pub mod error;
pub mod quota;
pub mod tenancy;

pub use application::{ApplicationDraft, DeploymentInfo};
pub use classify::{classify_cluster, classify_namespace, ClassificationResult};
pub use error::Error;
pub use quota::ResourceQuotaDraft;
pub use tenancy::{assign_tenant_name, is_system_namespace, DEFAULT_TENANT_NAME, SYSTEM_TENANT_NAME};
