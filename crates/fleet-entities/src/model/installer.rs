use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::EntityId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateTaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

/// spec §3 "CreateTask".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateTask {
    pub id: EntityId,
    pub cluster_name: String,
    pub machine_ids: BTreeSet<EntityId>,
    pub config_text: String,
    pub status: CreateTaskStatus,
    pub progress: u8,
    pub current_step: String,
    pub logs: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CreateTask {
    pub fn new(id: EntityId, cluster_name: String, machine_ids: BTreeSet<EntityId>, config_text: String) -> Self {
        Self {
            id,
            cluster_name,
            machine_ids,
            config_text,
            status: CreateTaskStatus::Pending,
            progress: 0,
            current_step: String::new(),
            logs: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Available,
    Reserved,
    Provisioning,
    InUse,
    Unreachable,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineRole {
    Master,
    Worker,
}

/// A pool machine eligible for cluster creation. Not named explicitly as an
/// entity in spec §3, but required by §4.I's "all machines exist, all are in
/// status `available`, at least one carries role `master`" validation; the
/// machine inventory itself is a collaborator (provisioned out of band), so
/// only the shape needed to validate against is modeled here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Machine {
    pub id: EntityId,
    pub hostname: String,
    pub status: MachineStatus,
    pub roles: BTreeSet<MachineRole>,
}
