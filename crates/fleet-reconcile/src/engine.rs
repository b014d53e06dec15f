//! The top-level reconciliation engine: watcher lifecycle and policy sync
//! scheduling (spec §4.E "Lifecycle").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fleet_client::ClusterClientPool;
use fleet_crypto::Cipher;
use fleet_entities::model::EntityId;
use fleet_entities::repository::ClusterRepository;
use tokio::sync::{watch, RwLock, Semaphore};
use tracing::{info, instrument, warn};

use crate::policy;
use crate::watcher::ClusterWatcher;

/// Configuration knobs from the `worker` config section (spec §6).
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub check_interval: Duration,
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(300),
            max_concurrency: 3,
        }
    }
}

/// Owns the per-cluster [`ClusterWatcher`] table and drives the two
/// top-level periodic ticks (spec §4.E "Lifecycle"). `R` is the
/// `ClusterRepository` implementation; `pool`/`cipher` provide the typed
/// client for each active cluster (spec §4.A, §4.B).
pub struct ReconciliationEngine<R> {
    repo: Arc<R>,
    pool: Arc<ClusterClientPool>,
    cipher: Arc<Cipher>,
    config: EngineConfig,
    watchers: Arc<RwLock<HashMap<EntityId, ClusterWatcher>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl<R> ReconciliationEngine<R>
where
    R: ClusterRepository + 'static,
{
    pub fn new(repo: Arc<R>, pool: Arc<ClusterClientPool>, cipher: Arc<Cipher>, config: EngineConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            repo,
            pool,
            cipher,
            config,
            watchers: Arc::new(RwLock::new(HashMap::new())),
            stop_tx,
            stop_rx,
        }
    }

    /// Starts the watcher-reconcile and policy-sync periodic tasks (spec
    /// §4.E "Lifecycle"). Returns immediately; the tasks run until
    /// [`ReconciliationEngine::shutdown`] is called.
    pub fn run(self: Arc<Self>) {
        let watcher_engine = Arc::clone(&self);
        tokio::spawn(async move { watcher_engine.watcher_reconcile_loop().await });

        let policy_engine = Arc::clone(&self);
        tokio::spawn(async move { policy_engine.policy_sync_loop().await });
    }

    /// Propagates the stop signal to every child; each watcher is expected
    /// to exit within one reconciliation tick (spec §4.E "Cancellation").
    pub async fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
        let mut watchers = self.watchers.write().await;
        for (_, watcher) in watchers.drain() {
            watcher.stop().await;
        }
    }

    async fn watcher_reconcile_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        let mut stop_rx = self.stop_rx.clone();
        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => return,
                _ = ticker.tick() => {
                    if let Err(error) = self.reconcile_watchers().await {
                        warn!(%error, "watcher reconciliation pass failed");
                    }
                }
            }
        }
    }

    /// Computes the set difference between active clusters and held
    /// watchers, starting watchers for new clusters and stopping watchers
    /// for deleted ones (spec §4.E "Lifecycle").
    #[instrument(skip(self))]
    async fn reconcile_watchers(&self) -> fleet_entities::Result<()> {
        let active_clusters = self.repo.list_clusters().await?;
        let active_ids: std::collections::HashSet<EntityId> = active_clusters.iter().map(|c| c.id).collect();

        let mut watchers = self.watchers.write().await;

        let stale: Vec<EntityId> = watchers
            .keys()
            .copied()
            .filter(|id| !active_ids.contains(id))
            .collect();
        for cluster_id in stale {
            if let Some(watcher) = watchers.remove(&cluster_id) {
                info!(%cluster_id, "stopping watcher for removed cluster");
                watcher.stop().await;
            }
        }

        for cluster in active_clusters {
            if watchers.contains_key(&cluster.id) {
                continue;
            }
            match self.build_client(&cluster.kubeconfig_ciphertext).await {
                Ok(client) => {
                    info!(cluster_id = %cluster.id, "starting watcher for cluster");
                    let watcher = ClusterWatcher::spawn(
                        cluster.id,
                        client,
                        Arc::clone(&self.repo),
                        self.config.check_interval,
                    );
                    watchers.insert(cluster.id, watcher);
                }
                Err(error) => warn!(cluster_id = %cluster.id, %error, "failed to start watcher"),
            }
        }

        Ok(())
    }

    async fn policy_sync_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        let mut stop_rx = self.stop_rx.clone();
        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => return,
                _ = ticker.tick() => self.policy_sync_all().await,
            }
        }
    }

    /// Runs policy sync across every active cluster, fanned out through a
    /// semaphore of width `worker.max-concurrency` (spec §4.E "Policy
    /// sync").
    #[instrument(skip(self))]
    async fn policy_sync_all(&self) {
        let clusters = match self.repo.list_clusters().await {
            Ok(clusters) => clusters,
            Err(error) => {
                warn!(%error, "failed to list clusters for policy sync");
                return;
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = Vec::with_capacity(clusters.len());

        for cluster in clusters {
            let semaphore = Arc::clone(&semaphore);
            let pool = Arc::clone(&self.pool);
            let cipher = Arc::clone(&self.cipher);
            let repo = Arc::clone(&self.repo);

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let client = match build_client_for(&pool, &cipher, &cluster.kubeconfig_ciphertext).await {
                    Ok(client) => client,
                    Err(error) => {
                        warn!(cluster_id = %cluster.id, %error, "failed to acquire client for policy sync");
                        return;
                    }
                };
                if let Err(error) = policy::sync_cluster(&cluster, client, repo.as_ref()).await {
                    warn!(cluster_id = %cluster.id, %error, "policy sync failed");
                }
            }));
        }

        for task in tasks {
            let _ = task.await;
        }
    }

    async fn build_client(&self, kubeconfig_ciphertext: &str) -> fleet_entities::Result<kube::Client> {
        build_client_for(&self.pool, &self.cipher, kubeconfig_ciphertext).await
    }
}

async fn build_client_for(
    pool: &ClusterClientPool,
    cipher: &Cipher,
    kubeconfig_ciphertext: &str,
) -> fleet_entities::Result<kube::Client> {
    let kubeconfig = cipher
        .decrypt(kubeconfig_ciphertext)
        .map_err(|error| fleet_entities::FleetError::Unavailable {
            message: format!("kubeconfig decrypt failed: {error}"),
        })?;
    pool.get(&kubeconfig)
        .await
        .map_err(|error| fleet_entities::FleetError::Unavailable {
            message: error.to_string(),
        })
}
