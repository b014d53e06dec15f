//! The constraint monitor's periodic task (spec §4.J): "on a timer, scan
//! quota tables and emit ConstraintViolation rows."

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use fleet_entities::model::ConstraintViolation;
use fleet_entities::repository::{AlertSink, HierarchyRepository, ViolationRepository};
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::alert::{self, ThresholdConfig};
use crate::resolve;
use crate::scan;

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub scan_interval: StdDuration,
    pub auto_resolve_after: ChronoDuration,
    pub thresholds: ThresholdConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval: StdDuration::from_secs(60),
            auto_resolve_after: ChronoDuration::hours(24),
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// A running constraint-monitor task. Dropping or calling
/// [`ConstraintMonitor::stop`] signals the scan loop to exit.
pub struct ConstraintMonitor {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl ConstraintMonitor {
    pub fn spawn<R>(repo: Arc<R>, alert_sink: Arc<dyn AlertSink>, config: MonitorConfig) -> Self
    where
        R: HierarchyRepository + ViolationRepository + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(repo, alert_sink, config, stop_rx));
        Self { stop_tx, task }
    }

    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

async fn run<R>(repo: Arc<R>, alert_sink: Arc<dyn AlertSink>, config: MonitorConfig, mut stop_rx: watch::Receiver<bool>)
where
    R: HierarchyRepository + ViolationRepository + 'static,
{
    let mut ticker = tokio::time::interval(config.scan_interval);
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                return;
            }
            _ = ticker.tick() => {
                run_tick(&repo, &alert_sink, &config).await;
            }
        }
    }
}

#[instrument(skip(repo, alert_sink, config))]
async fn run_tick<R>(repo: &Arc<R>, alert_sink: &Arc<dyn AlertSink>, config: &MonitorConfig)
where
    R: HierarchyRepository + ViolationRepository,
{
    let candidates = match scan::scan(repo.as_ref()).await {
        Ok(candidates) => candidates,
        Err(error) => {
            warn!(%error, "constraint scan failed, skipping this tick");
            return;
        }
    };

    let existing = match repo.list_unresolved_violations().await {
        Ok(existing) => existing,
        Err(error) => {
            warn!(%error, "failed to load existing violations, skipping dedup");
            Vec::new()
        }
    };

    for candidate in candidates {
        if already_open(&existing, &candidate) {
            continue;
        }
        if candidate.severity == fleet_entities::model::ViolationSeverity::Critical {
            alert_sink
                .notify("critical", &candidate.message, candidate.details.clone())
                .await;
        }
        if let Err(error) = repo.put_violation(candidate).await {
            warn!(%error, "failed to persist constraint violation");
        }
    }

    match resolve::auto_resolve(repo.as_ref(), Utc::now(), config.auto_resolve_after).await {
        Ok(resolved_count) if resolved_count > 0 => {
            tracing::debug!(resolved_count, "auto-resolved stale info violations");
        }
        Err(error) => warn!(%error, "auto-resolution pass failed"),
        _ => {}
    }

    let open_after_tick = match repo.list_unresolved_violations().await {
        Ok(open) => open,
        Err(error) => {
            warn!(%error, "failed to reload violations for threshold check");
            return;
        }
    };
    let counts = alert::aggregate(&open_after_tick, Utc::now());
    for message in alert::breaches(&counts, &config.thresholds) {
        alert_sink.notify("critical", &message, serde_json::json!({})).await;
    }
}

fn already_open(existing: &[ConstraintViolation], candidate: &ConstraintViolation) -> bool {
    existing
        .iter()
        .any(|open| open.violation_type == candidate.violation_type && open.scope_id == candidate.scope_id)
}
