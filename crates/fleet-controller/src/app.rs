//! Wires the config-loaded knobs into the engine object graph and runs it
//! until signalled to stop. Grounded on the doc example in
//! `stackable_operator::cli`: parse options, build a client, hand the
//! config to the controller's `run`.

use std::sync::Arc;
use std::time::Duration;

use fleet_backup::{BackupService, RestoreService};
use fleet_client::ClusterClientPool;
use fleet_crypto::{Cipher, KeyMaterial};
use fleet_entities::repository::AlertSink;
use fleet_installer::CreateRunner;
use fleet_monitor::{ConstraintMonitor, MonitorConfig, ThresholdConfig};
use fleet_quota::QuotaEngine;
use fleet_reconcile::{EngineConfig, ReconciliationEngine};
use snafu::{ResultExt, Snafu};
use tracing::info;

use crate::config::Config;
use crate::import::ImportService;
use crate::store::{InMemoryStore, LoggingAlertSink};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("engine error during startup"))]
    Startup { source: fleet_entities::FleetError },
}

/// Every engine this binary constructs, held together so the (out-of-scope)
/// HTTP handler layer would have a single object to receive — this binary
/// runs only the ambient background loops (reconciliation, constraint
/// monitor) since it has no request-driven front end of its own.
pub struct FleetServices {
    pub repo: Arc<InMemoryStore>,
    pub import: Arc<ImportService<InMemoryStore>>,
    pub quota: Arc<QuotaEngine<InMemoryStore>>,
    pub backup: Arc<BackupService<InMemoryStore>>,
    pub restore: Arc<RestoreService<InMemoryStore>>,
    pub installer: Arc<CreateRunner<InMemoryStore>>,
    reconcile: Arc<ReconciliationEngine<InMemoryStore>>,
    monitor: Option<ConstraintMonitor>,
}

/// Builds the whole object graph from `config` and starts the background
/// engines. Returns once they are running; call [`FleetServices::shutdown`]
/// to stop them.
pub async fn build(config: &Config) -> Result<FleetServices> {
    let repo = Arc::new(InMemoryStore::new());
    let alert_sink: Arc<dyn AlertSink> = Arc::new(LoggingAlertSink);

    let pool = Arc::new(ClusterClientPool::new(
        config.cluster_manager.max_clients,
        Duration::from_secs(config.cluster_manager.client_timeout_secs),
    ));
    let key = KeyMaterial::from_passphrase(&config.encryption.key);
    let cipher = Arc::new(Cipher::new(&key));

    let import = Arc::new(ImportService::new(Arc::clone(&repo), Arc::clone(&pool), Arc::clone(&cipher)));
    import.ensure_predefined_tenants().await.context(StartupSnafu)?;

    let quota = Arc::new(QuotaEngine::new(Arc::clone(&repo)));

    let backup = Arc::new(BackupService::new(
        Arc::clone(&repo),
        Arc::clone(&pool),
        Arc::clone(&cipher),
        Arc::clone(&alert_sink),
        config.paths.backup_dir.clone().into(),
    ));
    let restore = Arc::new(RestoreService::new(Arc::clone(&repo), Arc::clone(&pool), Arc::clone(&cipher)));

    let installer = Arc::new(CreateRunner::new(
        Arc::clone(&repo),
        config.paths.installer_binary.clone(),
        config.paths.installer_config_dir.clone().into(),
    ));

    let reconcile = Arc::new(ReconciliationEngine::new(
        Arc::clone(&repo),
        Arc::clone(&pool),
        Arc::clone(&cipher),
        EngineConfig {
            check_interval: Duration::from_secs(config.worker.check_interval_secs),
            max_concurrency: config.worker.max_concurrency,
        },
    ));

    let monitor = if config.worker.enabled {
        info!("starting constraint monitor");
        Some(ConstraintMonitor::spawn(
            Arc::clone(&repo),
            Arc::clone(&alert_sink),
            MonitorConfig {
                scan_interval: Duration::from_secs(config.worker.check_interval_secs),
                auto_resolve_after: chrono::Duration::hours(24),
                thresholds: ThresholdConfig::default(),
            },
        ))
    } else {
        None
    };

    if config.worker.enabled {
        Arc::clone(&reconcile).run();
    }

    Ok(FleetServices {
        repo,
        import,
        quota,
        backup,
        restore,
        installer,
        reconcile,
        monitor,
    })
}

impl FleetServices {
    pub async fn shutdown(self) {
        self.reconcile.shutdown().await;
        if let Some(monitor) = self.monitor {
            monitor.stop().await;
        }
    }
}
