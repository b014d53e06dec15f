//! The backup lifecycle: create, execute, compress, mark terminal (spec
//! §4.H "Backup state machine" / "Create" / "Execute").

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fleet_client::ClusterClientPool;
use fleet_crypto::Cipher;
use fleet_entities::model::{BackupStatus, BackupType, Cluster, ClusterBackup, EntityId};
use fleet_entities::repository::{AlertSink, BackupRepository, ClusterRepository};
use snafu::{OptionExt, ResultExt};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::client::build_client;
use crate::error::{self, Result};
use crate::{archive, dump};
use crate::resource_kinds::BackupResourceKind;

/// Where backup working directories and archives live (spec §4.H "Create":
/// `storage location = /backups/<cluster-id>/<name>/<yyyymmdd-HHMMSS>`).
pub struct BackupService<R> {
    repo: Arc<R>,
    pool: Arc<ClusterClientPool>,
    cipher: Arc<Cipher>,
    alert_sink: Arc<dyn AlertSink>,
    base_dir: PathBuf,
}

impl<R> BackupService<R>
where
    R: BackupRepository + ClusterRepository,
{
    pub fn new(repo: Arc<R>, pool: Arc<ClusterClientPool>, cipher: Arc<Cipher>, alert_sink: Arc<dyn AlertSink>, base_dir: PathBuf) -> Self {
        Self {
            repo,
            pool,
            cipher,
            alert_sink,
            base_dir,
        }
    }

    /// Persists the `pending` backup row (spec §4.H "Create").
    pub async fn create_backup(
        &self,
        cluster_id: EntityId,
        name: String,
        backup_type: BackupType,
        retention_days: u32,
    ) -> fleet_entities::Result<ClusterBackup> {
        let now = Utc::now();
        let backup = ClusterBackup {
            id: Uuid::new_v4(),
            cluster_id,
            name: name.clone(),
            backup_type,
            status: BackupStatus::Pending,
            storage_location: self.storage_location(cluster_id, &name, now).display().to_string(),
            retention_days,
            snapshot_timestamp: now,
            size_bytes: 0,
            started_at: None,
            completed_at: None,
            error_msg: None,
        };
        self.repo.put_backup(backup.clone()).await?;
        Ok(backup)
    }

    fn storage_location(&self, cluster_id: EntityId, name: &str, now: chrono::DateTime<Utc>) -> PathBuf {
        self.base_dir
            .join(cluster_id.to_string())
            .join(name)
            .join(now.format("%Y%m%d-%H%M%S").to_string())
    }

    /// Runs the backup body, then compresses and finalizes the row (spec
    /// §4.H "Execute"). Any failure marks the row `failed` and alerts.
    #[instrument(skip(self))]
    pub async fn execute_backup(&self, backup_id: EntityId) -> fleet_entities::Result<()> {
        let mut backup = self
            .repo
            .get_backup(backup_id)
            .await?
            .context(error::BackupNotFoundSnafu {
                id: backup_id.to_string(),
            })?;

        backup.status = BackupStatus::Running;
        backup.started_at = Some(Utc::now());
        self.repo.put_backup(backup.clone()).await?;

        match self.run_backup_body(&backup).await {
            Ok(()) => self.finalize_success(backup).await,
            Err(error) => {
                warn!(backup_id = %backup_id, %error, "backup failed");
                self.finalize_failure(backup, error.to_string()).await
            }
        }
    }

    async fn run_backup_body(&self, backup: &ClusterBackup) -> fleet_entities::Result<()> {
        let cluster = self.repo.get_cluster(backup.cluster_id).await?.ok_or_else(|| {
            fleet_entities::FleetError::not_found("cluster", backup.cluster_id.to_string())
        })?;

        let dest = Path::new(&backup.storage_location);
        tokio::fs::create_dir_all(dest)
            .await
            .with_context(|_| error::IoSnafu {
                path: dest.display().to_string(),
            })
            .map_err(fleet_entities::FleetError::from)?;

        match backup.backup_type {
            BackupType::Resources => self.run_resources_backup(&cluster, dest).await?,
            BackupType::Etcd => self.run_etcd_backup(&cluster, dest).await?,
            BackupType::Full => {
                if let Err(error) = self.run_etcd_backup(&cluster, dest).await {
                    warn!(cluster_id = %cluster.id, %error, "full backup: etcd step failed, continuing with resources");
                }
                self.run_resources_backup(&cluster, dest).await?;
            }
        }
        Ok(())
    }

    async fn run_resources_backup(&self, cluster: &Cluster, dest: &Path) -> Result<()> {
        let resources_dir = dest.join("resources");
        tokio::fs::create_dir_all(&resources_dir)
            .await
            .with_context(|_| error::IoSnafu {
                path: resources_dir.display().to_string(),
            })?;

        let client = build_client(&self.pool, &self.cipher, cluster).await?;
        for kind in BackupResourceKind::ALL {
            if let Err(error) = dump::dump_kind(&client, *kind, &resources_dir).await {
                warn!(cluster_id = %cluster.id, kind = kind.dir_name(), %error, "resource kind dump failed, continuing");
            }
        }
        Ok(())
    }

    async fn run_etcd_backup(&self, cluster: &Cluster, dest: &Path) -> Result<()> {
        let schedule = self
            .repo
            .get_enabled_schedule(cluster.id)
            .await
            .context(error::RepositorySnafu)?
            .context(error::NoScheduleSnafu {
                cluster_id: cluster.id.to_string(),
            })?;

        let hosts = crate::client::parse_etcd_hosts(&schedule.etcd_endpoints);
        let host = hosts.first().context(error::EmptyEtcdEndpointsSnafu)?;

        let session = fleet_ssh::SshSession::connect(
            host,
            &schedule.ssh_username,
            &schedule.ssh_password,
            fleet_ssh::ConnectOptions::default(),
        )
        .await
        .with_context(|_| error::SshSnafu { host: host.clone() })?;

        session
            .exec("mkdir -p /backup")
            .await
            .with_context(|_| error::SshSnafu { host: host.clone() })?;

        let snapshot_ts = Utc::now().format("%Y%m%d-%H%M%S");
        let remote_snapshot = format!("/backup/etcd-snapshot-{snapshot_ts}.db");
        let snapshot_command = format!(
            "{} --endpoints=https://{host}:2379 --cacert={} --cert={} --key={} snapshot save {remote_snapshot}",
            schedule.etcdctl_path, schedule.etcd_ca, schedule.etcd_cert, schedule.etcd_key
        );
        session
            .exec(&snapshot_command)
            .await
            .with_context(|_| error::SshSnafu { host: host.clone() })?;

        let local_snapshot = dest.join("etcd.snapshot");
        session
            .download(&remote_snapshot, &local_snapshot)
            .await
            .with_context(|_| error::SshSnafu { host: host.clone() })?;

        session
            .exec(&format!("rm -f {remote_snapshot}"))
            .await
            .with_context(|_| error::SshSnafu { host: host.clone() })?;

        Ok(())
    }

    async fn finalize_success(&self, mut backup: ClusterBackup) -> fleet_entities::Result<()> {
        let source_dir = PathBuf::from(&backup.storage_location);
        let (_, size_bytes) = archive::compress_dir(&source_dir)
            .await
            .map_err(fleet_entities::FleetError::from)?;
        let _ = tokio::fs::remove_dir_all(&source_dir).await;

        backup.status = BackupStatus::Completed;
        backup.size_bytes = size_bytes;
        backup.completed_at = Some(Utc::now());
        backup.error_msg = None;
        self.repo.put_backup(backup.clone()).await?;

        if let Some(mut cluster) = self.repo.get_cluster(backup.cluster_id).await? {
            cluster.last_backup_at = Some(Utc::now());
            self.repo.put_cluster(cluster).await?;
        }
        Ok(())
    }

    async fn finalize_failure(&self, mut backup: ClusterBackup, message: String) -> fleet_entities::Result<()> {
        backup.status = BackupStatus::Failed;
        backup.error_msg = Some(message.clone());
        backup.completed_at = Some(Utc::now());
        self.repo.put_backup(backup.clone()).await?;

        self.alert_sink
            .notify(
                "critical",
                "AlertBackupFailed",
                serde_json::json!({
                    "backup_id": backup.id,
                    "cluster_id": backup.cluster_id,
                    "message": message,
                }),
            )
            .await;
        Ok(())
    }
}
