use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::EntityId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Validating,
    Importing,
    Completed,
    Failed,
}

/// spec §3 "ImportRecord". `imported_resources` holds the counts used by the
/// import scenario in spec §8 (`{tenants, environments, applications,
/// quotas}`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: EntityId,
    pub cluster_id: Option<EntityId>,
    pub import_source: String,
    pub import_status: ImportStatus,
    pub validation_results: Vec<String>,
    pub imported_resources: BTreeMap<String, u64>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportRecord {
    pub fn new(id: EntityId, import_source: String) -> Self {
        Self {
            id,
            cluster_id: None,
            import_source,
            import_status: ImportStatus::Pending,
            validation_results: Vec::new(),
            imported_resources: BTreeMap::new(),
            error_message: None,
            completed_at: None,
        }
    }
}
