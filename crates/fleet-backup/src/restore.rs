//! The restore lifecycle: asynchronously dispatched, tracked in an
//! in-memory progress map keyed by restore id (spec §4.H "Restore").

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_client::ClusterClientPool;
use fleet_crypto::Cipher;
use fleet_entities::model::{BackupSchedule, BackupType, EntityId};
use fleet_entities::repository::{BackupRepository, ClusterRepository};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, ObjectMeta, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::client::build_client;
use crate::control_plane::{ControlPlaneComponent, ControlPlaneManager};
use crate::error::{self, Result};
use crate::resource_kinds::RestoreResourceKind;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RestoreStatus {
    Running,
    Completed,
    Failed,
}

/// One entry in the restore progress map (spec §4.H "Restore": "In-memory
/// progress map keyed by restore-id records `{status, progress∈[0,1],
/// current-step, start-time}`").
#[derive(Clone, Debug)]
pub struct RestoreProgress {
    pub status: RestoreStatus,
    pub progress: f64,
    pub current_step: String,
    pub start_time: DateTime<Utc>,
    pub error_msg: Option<String>,
    pub verification: Option<VerificationSummary>,
}

/// Advisory post-restore check for the `full` restore path (spec §4.H
/// "full": "verify (list namespaces, pods, deployments; count Running pods
/// and ready deployments — advisory, does not fail restore)").
#[derive(Clone, Debug, Default)]
pub struct VerificationSummary {
    pub namespace_count: usize,
    pub running_pod_count: usize,
    pub ready_deployment_count: usize,
}

pub struct RestoreService<R> {
    repo: Arc<R>,
    pool: Arc<ClusterClientPool>,
    cipher: Arc<Cipher>,
    progress: Arc<RwLock<HashMap<EntityId, RestoreProgress>>>,
    control_plane: Mutex<Option<Arc<ControlPlaneManager>>>,
}

impl<R> RestoreService<R>
where
    R: BackupRepository + ClusterRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, pool: Arc<ClusterClientPool>, cipher: Arc<Cipher>) -> Self {
        Self {
            repo,
            pool,
            cipher,
            progress: Arc::new(RwLock::new(HashMap::new())),
            control_plane: Mutex::new(None),
        }
    }

    pub async fn progress_of(&self, restore_id: EntityId) -> Result<RestoreProgress> {
        self.progress
            .read()
            .await
            .get(&restore_id)
            .cloned()
            .ok_or_else(|| error::Error::RestoreNotFound {
                id: restore_id.to_string(),
            })
    }

    /// Spawns the restore as a detached task and returns its id immediately
    /// (spec §4.H "Restore": "asynchronously dispatched").
    pub fn dispatch_restore(self: &Arc<Self>, cluster_id: EntityId, backup_type: BackupType, source_dir: PathBuf) -> EntityId
    where
        R: 'static,
    {
        let restore_id = Uuid::new_v4();
        let now = Utc::now();
        let service = Arc::clone(self);

        tokio::spawn(async move {
            {
                let mut progress = service.progress.write().await;
                progress.insert(
                    restore_id,
                    RestoreProgress {
                        status: RestoreStatus::Running,
                        progress: 0.0,
                        current_step: "starting".to_string(),
                        start_time: now,
                        error_msg: None,
                        verification: None,
                    },
                );
            }

            let outcome = service.run_restore(restore_id, cluster_id, backup_type, &source_dir).await;
            service.finalize(restore_id, outcome).await;
        });

        restore_id
    }

    async fn set_step(&self, restore_id: EntityId, progress: f64, step: &str) {
        if let Some(entry) = self.progress.write().await.get_mut(&restore_id) {
            entry.progress = progress;
            entry.current_step = step.to_string();
        }
    }

    async fn finalize(&self, restore_id: EntityId, outcome: Result<Option<VerificationSummary>>) {
        let mut progress = self.progress.write().await;
        let Some(entry) = progress.get_mut(&restore_id) else {
            return;
        };
        match outcome {
            Ok(verification) => {
                entry.status = RestoreStatus::Completed;
                entry.progress = 1.0;
                entry.current_step = "completed".to_string();
                entry.verification = verification;
            }
            Err(error) => {
                warn!(%restore_id, %error, "restore failed");
                entry.status = RestoreStatus::Failed;
                entry.error_msg = Some(error.to_string());
            }
        }
    }

    #[instrument(skip(self, source_dir))]
    async fn run_restore(
        &self,
        restore_id: EntityId,
        cluster_id: EntityId,
        backup_type: BackupType,
        source_dir: &Path,
    ) -> Result<Option<VerificationSummary>> {
        let cluster = self
            .repo
            .get_cluster(cluster_id)
            .await
            .context(error::RepositorySnafu)?
            .ok_or_else(|| error::Error::ClusterNotFound {
                id: cluster_id.to_string(),
            })?;
        let client = build_client(&self.pool, &self.cipher, &cluster).await?;

        match backup_type {
            BackupType::Resources => {
                self.set_step(restore_id, 0.2, "restoring resources").await;
                self.restore_resources(&client, source_dir).await?;
                Ok(None)
            }
            BackupType::Etcd => {
                self.set_step(restore_id, 0.2, "restoring etcd snapshot").await;
                let schedule = self
                    .repo
                    .get_enabled_schedule(cluster_id)
                    .await
                    .context(error::RepositorySnafu)?
                    .ok_or_else(|| error::Error::NoSchedule {
                        cluster_id: cluster_id.to_string(),
                    })?;
                self.restore_etcd(&schedule, &source_dir.join("etcd.snapshot")).await?;
                Ok(None)
            }
            BackupType::Full => {
                self.set_step(restore_id, 0.1, "preparing restore namespace").await;
                let restore_name = format!("restore-{restore_id}");
                prepare_restore_namespace(&client, &restore_name).await?;

                self.set_step(restore_id, 0.3, "restoring etcd snapshot").await;
                let schedule = self
                    .repo
                    .get_enabled_schedule(cluster_id)
                    .await
                    .context(error::RepositorySnafu)?
                    .ok_or_else(|| error::Error::NoSchedule {
                        cluster_id: cluster_id.to_string(),
                    })?;
                self.restore_etcd(&schedule, &source_dir.join("etcd.snapshot")).await?;

                self.set_step(restore_id, 0.6, "restoring resources").await;
                self.restore_resources(&client, source_dir).await?;

                self.set_step(restore_id, 0.9, "verifying").await;
                Ok(Some(verify_restore(&client).await?))
            }
        }
    }

    async fn restore_resources(&self, client: &Client, source_dir: &Path) -> Result<()> {
        let resources_dir = source_dir.join("resources");
        for kind in RestoreResourceKind::ALL {
            if let Err(error) = create_kind(client, *kind, &resources_dir).await {
                warn!(kind = kind.dir_name(), %error, "restore of resource kind failed, continuing");
            }
        }
        Ok(())
    }

    async fn restore_etcd(&self, schedule: &BackupSchedule, snapshot_path: &Path) -> Result<()> {
        let manager = self.control_plane_manager().await;
        let hosts = crate::client::parse_etcd_hosts(&schedule.etcd_endpoints);

        manager
            .stop(
                ControlPlaneComponent::Etcd,
                schedule.etcd_deployment_type,
                &hosts,
                &schedule.ssh_username,
                &schedule.ssh_password,
            )
            .await?;

        let mut last_error = None;
        let mut restored = false;
        for host in &hosts {
            match restore_snapshot_on_host(host, schedule, snapshot_path).await {
                Ok(()) => {
                    restored = true;
                    break;
                }
                Err(error) => {
                    warn!(host = %host, %error, "etcd restore attempt failed, trying next node");
                    last_error = Some(error);
                }
            }
        }

        manager
            .start(
                ControlPlaneComponent::Etcd,
                schedule.etcd_deployment_type,
                &hosts,
                &schedule.ssh_username,
                &schedule.ssh_password,
            )
            .await?;

        if !restored {
            return Err(last_error.unwrap_or(error::Error::AllNodesUnreachable {
                operation: "etcd restore".to_string(),
            }));
        }
        Ok(())
    }

    async fn control_plane_manager(&self) -> Arc<ControlPlaneManager> {
        let mut guard = self.control_plane.lock().await;
        if guard.is_none() {
            *guard = Some(Arc::new(ControlPlaneManager::new()));
        }
        Arc::clone(guard.as_ref().expect("just initialized"))
    }
}

async fn restore_snapshot_on_host(host: &str, schedule: &BackupSchedule, snapshot_path: &Path) -> Result<()> {
    let session = fleet_ssh::SshSession::connect(
        host,
        &schedule.ssh_username,
        &schedule.ssh_password,
        fleet_ssh::ConnectOptions::default(),
    )
    .await
    .with_context(|_| error::SshSnafu { host: host.to_string() })?;

    let remote_snapshot = "/backup/restore-snapshot.db";
    session
        .exec("mkdir -p /backup")
        .await
        .with_context(|_| error::SshSnafu { host: host.to_string() })?;
    session
        .upload(snapshot_path, remote_snapshot)
        .await
        .with_context(|_| error::SshSnafu { host: host.to_string() })?;

    let restore_command = format!(
        "{} snapshot restore {remote_snapshot} --data-dir={}",
        schedule.etcdctl_path, schedule.etcd_data_dir
    );
    session
        .exec(&restore_command)
        .await
        .with_context(|_| error::SshSnafu { host: host.to_string() })?;
    Ok(())
}

async fn prepare_restore_namespace(client: &Client, restore_name: &str) -> Result<()> {
    let api: Api<Namespace> = Api::all(client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(restore_name.to_string()),
            labels: Some([("restore".to_string(), restore_name.to_string())].into_iter().collect()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.create(&PostParams::default(), &namespace)
        .await
        .with_context(|_| error::KubeApiSnafu {
            context: format!("create restore namespace '{restore_name}'"),
        })?;
    Ok(())
}

/// Advisory post-restore verification for the `full` path (spec §4.H
/// "full"): counts, does not fail the restore.
async fn verify_restore(client: &Client) -> Result<VerificationSummary> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let namespace_count = namespaces
        .list(&ListParams::default())
        .await
        .with_context(|_| error::KubeApiSnafu {
            context: "verify: list namespaces".to_string(),
        })?
        .items
        .len();

    let pods: Api<Pod> = Api::all(client.clone());
    let running_pod_count = pods
        .list(&ListParams::default())
        .await
        .with_context(|_| error::KubeApiSnafu {
            context: "verify: list pods".to_string(),
        })?
        .items
        .iter()
        .filter(|pod| pod.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running"))
        .count();

    let deployments: Api<Deployment> = Api::all(client.clone());
    let ready_deployment_count = deployments
        .list(&ListParams::default())
        .await
        .with_context(|_| error::KubeApiSnafu {
            context: "verify: list deployments".to_string(),
        })?
        .items
        .iter()
        .filter(|deployment| {
            let status = deployment.status.as_ref();
            let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
            let wanted = deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(1);
            ready >= wanted
        })
        .count();

    Ok(VerificationSummary {
        namespace_count,
        running_pod_count,
        ready_deployment_count,
    })
}

async fn create_kind(client: &Client, kind: RestoreResourceKind, resources_dir: &Path) -> Result<usize> {
    use RestoreResourceKind::*;
    match kind {
        Namespaces => create_all::<Namespace>(client, kind, resources_dir).await,
        PersistentVolumes => create_all::<PersistentVolume>(client, kind, resources_dir).await,
        PersistentVolumeClaims => create_all::<PersistentVolumeClaim>(client, kind, resources_dir).await,
        ConfigMaps => create_all::<ConfigMap>(client, kind, resources_dir).await,
        Secrets => create_all::<Secret>(client, kind, resources_dir).await,
        Deployments => create_all::<Deployment>(client, kind, resources_dir).await,
        Services => create_all::<Service>(client, kind, resources_dir).await,
        Ingresses => create_all::<Ingress>(client, kind, resources_dir).await,
    }
}

async fn create_all<K>(client: &Client, kind: RestoreResourceKind, resources_dir: &Path) -> Result<usize>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    let kind_dir = resources_dir.join(kind.dir_name());
    let mut entries = match tokio::fs::read_dir(&kind_dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(0),
    };

    let mut count = 0usize;
    while let Some(entry) = entries.next_entry().await.with_context(|_| error::IoSnafu {
        path: kind_dir.display().to_string(),
    })? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
            continue;
        }
        let text = tokio::fs::read_to_string(&path).await.with_context(|_| error::IoSnafu {
            path: path.display().to_string(),
        })?;
        let object: K = serde_yaml::from_str(&text).with_context(|_| error::DeserializeYamlSnafu {
            path: path.display().to_string(),
        })?;
        create_one(client, object).await?;
        count += 1;
    }
    Ok(count)
}

async fn create_one<K>(client: &Client, object: K) -> Result<()>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    let namespace = object.meta().namespace.clone();
    let api: Api<K> = match &namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    api.create(&PostParams::default(), &object)
        .await
        .with_context(|_| error::KubeApiSnafu {
            context: "restore create".to_string(),
        })?;
    Ok(())
}
