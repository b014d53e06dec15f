use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::EntityId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
    Full,
    Etcd,
    Resources,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// spec §3 "ClusterBackup".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterBackup {
    pub id: EntityId,
    pub cluster_id: EntityId,
    pub name: String,
    pub backup_type: BackupType,
    pub status: BackupStatus,
    pub storage_location: String,
    pub retention_days: u32,
    pub snapshot_timestamp: DateTime<Utc>,
    pub size_bytes: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_msg: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtcdDeploymentType {
    Kubexm,
    Kubeadm,
}

/// spec §3 "BackupSchedule".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupSchedule {
    pub id: EntityId,
    pub cluster_id: EntityId,
    pub name: String,
    pub cron_expression: String,
    pub backup_type: BackupType,
    pub retention_count: u32,
    pub enabled: bool,
    pub etcd_endpoints: String,
    pub etcd_ca: String,
    pub etcd_cert: String,
    pub etcd_key: String,
    pub etcd_data_dir: String,
    pub etcdctl_path: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub etcd_deployment_type: EtcdDeploymentType,
    pub k8s_deployment_type: String,
}
