//! Per-cluster informer-driven watcher (spec §4.E "ClusterWatcher").
//!
//! Each watcher runs three concurrent loops against one cluster's client:
//! a Node informer, an Event informer, and a resource-total refresh timer.
//! All three stop within one reconciliation tick of the watcher's stop
//! signal (spec §4.E "Cancellation").

use std::sync::Arc;
use std::time::Duration;

use fleet_entities::model::{
    ClusterResource, EntityId, Event as FleetEvent, Node as FleetNode, NodeStatus, NodeType,
};
use fleet_entities::repository::ClusterRepository;
use fleet_quantity::{parse_bytes, parse_cpu_millis};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Event as K8sEvent, Node as K8sNode};
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::severity;

/// A running informer-driven watcher for one cluster. Dropping or calling
/// [`ClusterWatcher::stop`] signals all three sub-loops to exit.
pub struct ClusterWatcher {
    cluster_id: EntityId,
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl ClusterWatcher {
    /// Starts the node informer, event informer and resource-refresh timer
    /// for `cluster_id` against `client` (spec §4.E "ClusterWatcher").
    pub fn spawn<R>(cluster_id: EntityId, client: Client, repo: Arc<R>, check_interval: Duration) -> Self
    where
        R: ClusterRepository + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(cluster_id, client, repo, check_interval, stop_rx));
        Self {
            cluster_id,
            stop_tx,
            task,
        }
    }

    pub fn cluster_id(&self) -> EntityId {
        self.cluster_id
    }

    /// Signals the watcher to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

async fn run<R>(
    cluster_id: EntityId,
    client: Client,
    repo: Arc<R>,
    check_interval: Duration,
    stop_rx: watch::Receiver<bool>,
) where
    R: ClusterRepository + 'static,
{
    let nodes = tokio::spawn(watch_nodes(cluster_id, client.clone(), Arc::clone(&repo), stop_rx.clone()));
    let events = tokio::spawn(watch_events(cluster_id, client.clone(), Arc::clone(&repo), stop_rx.clone()));
    let resources = tokio::spawn(refresh_resources_periodically(
        cluster_id,
        client,
        repo,
        check_interval,
        stop_rx,
    ));

    let _ = tokio::join!(nodes, events, resources);
}

#[instrument(skip(client, repo, stop_rx))]
async fn watch_nodes<R>(cluster_id: EntityId, client: Client, repo: Arc<R>, mut stop_rx: watch::Receiver<bool>)
where
    R: ClusterRepository + 'static,
{
    let api: Api<K8sNode> = Api::all(client);
    let mut stream = std::pin::pin!(watcher::watcher(api, watcher::Config::default()));

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                debug!(%cluster_id, "node watcher stopping");
                return;
            }
            next = stream.next() => {
                match next {
                    Some(Ok(Event::Apply(node))) => apply_node(&repo, cluster_id, &node).await,
                    Some(Ok(Event::Delete(node))) => delete_node(&repo, cluster_id, &node).await,
                    Some(Ok(Event::Init)) | Some(Ok(Event::InitApply(_))) | Some(Ok(Event::InitDone)) => {}
                    Some(Err(error)) => warn!(%cluster_id, %error, "node informer error"),
                    None => return,
                }
            }
        }
    }
}

async fn apply_node<R: ClusterRepository>(repo: &Arc<R>, cluster_id: EntityId, node: &K8sNode) {
    let Some(name) = node.metadata.name.clone() else {
        return;
    };
    let labels = node.metadata.labels.clone().unwrap_or_default();
    let node_type = if labels.contains_key("node-role.kubernetes.io/control-plane")
        || labels.contains_key("node-role.kubernetes.io/master")
    {
        NodeType::ControlPlane
    } else {
        NodeType::Worker
    };

    let status = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|condition| condition.type_ == "Ready"))
        .map(|ready| match ready.status.as_str() {
            "True" => NodeStatus::Ready,
            "False" => NodeStatus::NotReady,
            _ => NodeStatus::Unknown,
        })
        .unwrap_or(NodeStatus::Unknown);

    let allocatable = node.status.as_ref().and_then(|status| status.allocatable.as_ref());
    let cpu_cores = allocatable
        .and_then(|a| a.get("cpu"))
        .and_then(|q| parse_cpu_millis(&q.0).ok())
        .map(|milli| milli as f64 / 1000.0)
        .unwrap_or(0.0);
    let memory_bytes = allocatable
        .and_then(|a| a.get("memory"))
        .and_then(|q| parse_bytes(&q.0).ok())
        .unwrap_or(0);
    let pod_count = allocatable
        .and_then(|a| a.get("pods"))
        .and_then(|q| q.0.parse::<u32>().ok())
        .unwrap_or(0);

    let fleet_node = FleetNode {
        cluster_id,
        name: name.clone(),
        node_type,
        status,
        cpu_cores,
        // Per-node usage requires a metrics-server integration, which is
        // out of scope; only allocatable capacity is tracked here.
        cpu_used_cores: 0.0,
        memory_bytes,
        memory_used_bytes: 0,
        pod_count,
        labels: labels
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    };

    if let Err(error) = repo.upsert_node(fleet_node).await {
        warn!(%cluster_id, node = %name, %error, "failed to upsert node");
    }
}

async fn delete_node<R: ClusterRepository>(repo: &Arc<R>, cluster_id: EntityId, node: &K8sNode) {
    let Some(name) = node.metadata.name.clone() else {
        return;
    };
    if let Err(error) = repo.delete_node(cluster_id, &name).await {
        warn!(%cluster_id, node = %name, %error, "failed to delete node");
    }
}

#[instrument(skip(client, repo, stop_rx))]
async fn watch_events<R>(cluster_id: EntityId, client: Client, repo: Arc<R>, mut stop_rx: watch::Receiver<bool>)
where
    R: ClusterRepository + 'static,
{
    let api: Api<K8sEvent> = Api::all(client);
    let mut stream = std::pin::pin!(watcher::watcher(api, watcher::Config::default()));

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                debug!(%cluster_id, "event watcher stopping");
                return;
            }
            next = stream.next() => {
                match next {
                    Some(Ok(Event::Apply(event))) => apply_event(&repo, cluster_id, &event).await,
                    Some(Ok(Event::Delete(_))) => {}
                    Some(Ok(Event::Init)) | Some(Ok(Event::InitApply(_))) | Some(Ok(Event::InitDone)) => {}
                    Some(Err(error)) => warn!(%cluster_id, %error, "event informer error"),
                    None => return,
                }
            }
        }
    }
}

async fn apply_event<R: ClusterRepository>(repo: &Arc<R>, cluster_id: EntityId, event: &K8sEvent) {
    let event_type = event.type_.clone().unwrap_or_default();
    let reason = event.reason.clone().unwrap_or_default();
    let severity = severity::classify(&event_type, &reason);

    let fleet_event = FleetEvent {
        cluster_id,
        event_type,
        reason,
        component: event
            .source
            .as_ref()
            .and_then(|source| source.component.clone())
            .unwrap_or_default(),
        message: event.message.clone().unwrap_or_default(),
        severity,
        first_timestamp: event
            .first_timestamp
            .as_ref()
            .map(|t| t.0)
            .unwrap_or_else(chrono::Utc::now),
        last_timestamp: event
            .last_timestamp
            .as_ref()
            .map(|t| t.0)
            .unwrap_or_else(chrono::Utc::now),
        count: event.count.unwrap_or(1).max(0) as u32,
    };

    if let Err(error) = repo.upsert_event(fleet_event).await {
        warn!(%cluster_id, %error, "failed to upsert event");
    }
}

#[instrument(skip(client, repo, stop_rx))]
async fn refresh_resources_periodically<R>(
    cluster_id: EntityId,
    client: Client,
    repo: Arc<R>,
    check_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) where
    R: ClusterRepository + 'static,
{
    let mut ticker = tokio::time::interval(check_interval);
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                debug!(%cluster_id, "resource refresh stopping");
                return;
            }
            _ = ticker.tick() => {
                if let Err(error) = refresh_once(cluster_id, &client, repo.as_ref()).await {
                    warn!(%cluster_id, %error, "resource refresh failed");
                }
            }
        }
    }
}

async fn refresh_once<R: ClusterRepository>(cluster_id: EntityId, client: &Client, repo: &R) -> fleet_entities::Result<()> {
    let api: Api<K8sNode> = Api::all(client.clone());
    let nodes = api
        .list(&kube::api::ListParams::default())
        .await
        .map_err(|error| fleet_entities::FleetError::Unavailable {
            message: error.to_string(),
        })?;

    let mut total_cpu_milli: i64 = 0;
    let mut total_memory_bytes: i64 = 0;
    for node in &nodes.items {
        let Some(allocatable) = node.status.as_ref().and_then(|status| status.allocatable.as_ref()) else {
            continue;
        };
        if let Some(cpu) = allocatable.get("cpu") {
            total_cpu_milli += parse_cpu_millis(&cpu.0).unwrap_or(0);
        }
        if let Some(memory) = allocatable.get("memory") {
            total_memory_bytes += parse_bytes(&memory.0).unwrap_or(0);
        }
    }

    repo.put_cluster_resource(ClusterResource {
        cluster_id,
        timestamp: chrono::Utc::now(),
        total_cpu_cores: total_cpu_milli as f64 / 1000.0,
        total_memory_bytes,
        // No node-level storage-capacity source without a CSI/metrics
        // integration in scope; left at zero.
        total_storage_bytes: 0,
    })
    .await
}
