use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::EntityId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationScope {
    Tenant,
    Environment,
    Application,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Info,
    Warning,
    Critical,
}

/// spec §3 "ConstraintViolation", produced by the constraint monitor
/// (spec §4.J).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub id: EntityId,
    pub scope: ViolationScope,
    pub scope_id: Option<EntityId>,
    pub violation_type: String,
    pub message: String,
    pub severity: ViolationSeverity,
    pub details: serde_json::Value,
    pub detected_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}
