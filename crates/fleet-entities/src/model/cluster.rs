use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{EntityId, LabelMap, Timestamps};

/// A target Kubernetes control plane the system manages, addressed by a
/// stored kubeconfig (spec §3 "Cluster"). Owning: none. Deleted only by
/// explicit user action. Invariant: `name` unique.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cluster {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    /// AEAD ciphertext produced by `fleet-crypto`; never the plaintext.
    pub kubeconfig_ciphertext: String,
    pub labels: LabelMap,
    pub environment_type: String,
    pub region: String,
    pub provider: String,
    pub import_source: String,
    pub created_by: String,
    pub last_backup_at: Option<DateTime<Utc>>,
    pub timestamps: Timestamps,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Healthy,
    Unhealthy,
    Disconnected,
}

/// One per cluster. Reconciled by the reconciliation engine (spec §4.E).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterState {
    pub cluster_id: EntityId,
    pub status: ClusterStatus,
    pub node_count: u32,
    pub kubernetes_version: String,
    pub api_server_url: String,
    pub last_heartbeat_at: DateTime<Utc>,
    pub last_sync_at: DateTime<Utc>,
    pub sync_success: bool,
    pub sync_error: Option<String>,
}

/// Latest row is authoritative (spec §3 "ClusterResource").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterResource {
    pub cluster_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub total_cpu_cores: f64,
    pub total_memory_bytes: i64,
    pub total_storage_bytes: i64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    ControlPlane,
    Worker,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
    Unknown,
}

/// Uniqueness: (cluster_id, name).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub cluster_id: EntityId,
    pub name: String,
    pub node_type: NodeType,
    pub status: NodeStatus,
    pub cpu_cores: f64,
    pub cpu_used_cores: f64,
    pub memory_bytes: i64,
    pub memory_used_bytes: i64,
    pub pod_count: u32,
    pub labels: LabelMap,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub cluster_id: EntityId,
    pub event_type: String,
    pub reason: String,
    pub component: String,
    pub message: String,
    pub severity: EventSeverity,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub count: u32,
}

/// One per cluster (spec §3 "AutoscalingPolicy").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutoscalingPolicy {
    pub cluster_id: EntityId,
    pub hpa_count: u32,
    pub cluster_autoscaler_enabled: bool,
    pub vpa_count: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodSecurityStandard {
    Privileged,
    Baseline,
    Restricted,
    Disabled,
}

/// One per cluster (spec §3 "SecurityPolicy").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub cluster_id: EntityId,
    pub rbac_enabled: bool,
    pub rbac_details: String,
    pub network_policies_enabled: bool,
    pub network_policy_details: String,
    pub pod_security_standard: PodSecurityStandard,
    pub pod_security_details: String,
    pub audit_logging_enabled: bool,
    pub audit_logging_details: String,
}
