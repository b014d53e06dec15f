//! The canonical error taxonomy (spec §7).
//!
//! Every other crate in this workspace propagates [`FleetError`] across its
//! public surface instead of leaking kube-client, SSH, or repository-layer
//! error types (spec §9: "implementations must not leak repository-layer
//! error types through the public surface").

use std::collections::BTreeMap;

use snafu::Snafu;

pub type Result<T, E = FleetError> = std::result::Result<T, E>;

/// Semantic error kinds. Propagation behavior for each kind is documented on
/// the variant; see spec §7 for the authoritative table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FleetError {
    /// Malformed name, unrecognized quota key, invalid kubeconfig. Surfaced
    /// to the caller verbatim.
    #[snafu(display("invalid argument: {message}"))]
    InvalidArgument { message: String },

    /// Duplicate cluster/tenant/environment/application name.
    #[snafu(display("{kind} '{name}' already exists"))]
    AlreadyExists { kind: String, name: String },

    /// Missing id.
    #[snafu(display("{kind} '{id}' not found"))]
    NotFound { kind: String, id: String },

    /// Attempt to modify or delete a system tenant.
    #[snafu(display("permission denied: {message}"))]
    PermissionDenied { message: String },

    /// Deletion blocked by dependents; `blockers` carries counts per
    /// dependent kind for UI use (spec §4.G precheck).
    #[snafu(display("cannot delete {kind} '{id}': has dependents {blockers:?}"))]
    HasChildren {
        kind: String,
        id: String,
        blockers: BTreeMap<String, u64>,
    },

    /// Environment quota exceeds tenant quota, or replica scale exceeds a
    /// limit.
    #[snafu(display("quota exceeded for '{resource}': limit={limit}, attempted={attempted}"))]
    QuotaExceeded {
        resource: String,
        limit: i64,
        attempted: i64,
    },

    /// Deadlock, connection reset, timeout. Retried up to
    /// `worker.retry_attempts` with exponential backoff; surfaced only after
    /// retries are exhausted.
    #[snafu(display("transient failure: {message}"))]
    Transient { message: String },

    /// Cluster unreachable, kubeconfig decrypt fails. Recorded on
    /// `ClusterState.sync_error`; not fatal to the reconciliation engine.
    #[snafu(display("unavailable: {message}"))]
    Unavailable { message: String },

    /// Config load failure. The process aborts.
    #[snafu(display("fatal: {message}"))]
    Fatal { message: String },
}

impl FleetError {
    /// Classifies whether this error is eligible for the outer retry wrapper
    /// described in spec §4.G ("Retry") and §7.
    pub fn is_transient(&self) -> bool {
        matches!(self, FleetError::Transient { .. })
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        FleetError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        FleetError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        FleetError::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
