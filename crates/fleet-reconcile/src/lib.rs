//! Cluster reconciliation: per-cluster informer watchers, policy-sync
//! detection, and the top-level lifecycle engine (spec §4.E).

pub mod engine;
pub mod error;
pub mod policy;
pub mod security;
pub mod severity;
pub mod watcher;

pub use engine::{EngineConfig, ReconciliationEngine};
pub use error::Error;
pub use watcher::ClusterWatcher;
