use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{EntityId, LabelMap, QuantityMap, Timestamps};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    System,
    UserCreated,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Active,
    Suspended,
}

/// A logical owner of environments (spec §3 "Tenant"). Invariant: a system
/// tenant may not be deleted or renamed; predefined tenants `system` and
/// `default` always exist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tenant {
    pub id: EntityId,
    pub name: String,
    pub display_name: String,
    pub tenant_type: TenantType,
    pub is_system: bool,
    pub status: LifecycleStatus,
    pub labels: LabelMap,
    pub timestamps: Timestamps,
}

impl Tenant {
    pub const SYSTEM_TENANT_NAME: &'static str = "system";
    pub const DEFAULT_TENANT_NAME: &'static str = "default";
}

/// A (cluster, namespace) pair owned by a tenant (spec §3 "Environment").
/// Uniqueness: (cluster_id, namespace).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Environment {
    pub id: EntityId,
    pub tenant_id: EntityId,
    pub cluster_id: EntityId,
    pub namespace: String,
    pub display_name: String,
    pub labels: LabelMap,
    pub status: LifecycleStatus,
    pub timestamps: Timestamps,
}

/// A named group of deployments within one environment (spec §3
/// "Application"). Uniqueness: (environment_id, name).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Application {
    pub id: EntityId,
    pub tenant_id: EntityId,
    pub environment_id: EntityId,
    pub name: String,
    pub display_name: String,
    pub labels: LabelMap,
    pub workload_types: Vec<String>,
    pub deployment_count: u32,
    pub timestamps: Timestamps,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    Active,
    Exceeded,
    Warning,
}

/// Invariant: `allocated + available = hard_limits` per resource
/// (spec §3 "TenantQuota").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantQuota {
    pub tenant_id: EntityId,
    pub hard_limits: QuantityMap,
    pub allocated: QuantityMap,
    pub available: QuantityMap,
    pub status: QuotaStatus,
}

/// Environment-scoped quota mirror (spec §3 "ResourceQuota"). Invariant: sum
/// of environment hard limits of one tenant ≤ tenant hard limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub environment_id: EntityId,
    pub hard_limits: QuantityMap,
    pub used: QuantityMap,
    pub status: QuotaStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Invariant: `current_replicas <= max_replicas` (spec §3
/// "ApplicationResourceSpec").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplicationResourceSpec {
    pub application_id: EntityId,
    pub default_request: QuantityMap,
    pub default_limit: QuantityMap,
    pub max_replicas: u32,
    pub current_replicas: u32,
}

/// Recognized tenant/environment quota keys (spec §4.G "Tenant create").
pub const TENANT_QUOTA_KEYS: &[&str] = &[
    "requests.cpu",
    "requests.memory",
    "limits.cpu",
    "limits.memory",
    "pods",
    "services",
    "secrets",
    "configmaps",
];

/// Recognized application request/limit keys (spec §4.G "Application
/// create").
pub const APPLICATION_SPEC_KEYS: &[&str] =
    &["requests.cpu", "requests.memory", "limits.cpu", "limits.memory"];

/// How inherited quota is propagated from a tenant to its environments
/// (spec §4.G "Inheritance").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceMode {
    EqualSplit,
    ManualOverride,
}

/// Result of an inheritance-status query (spec §4.G "Inheritance").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceStatus {
    None,
    Manual,
    Tenant,
}
