//! Cluster backup and restore orchestration (spec §4.H): resource dumps,
//! etcd snapshots over SSH, and control-plane stop/start around a restore.

pub mod archive;
pub mod backup;
pub mod client;
pub mod control_plane;
pub mod dump;
pub mod error;
pub mod resource_kinds;
pub mod restore;

pub use backup::BackupService;
pub use control_plane::{ControlPlaneComponent, ControlPlaneManager};
pub use error::Error;
pub use restore::{RestoreProgress, RestoreService, RestoreStatus, VerificationSummary};
