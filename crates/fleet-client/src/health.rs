//! One-shot health probe against a cluster client (spec §4.C).

use chrono::{DateTime, Utc};
use fleet_entities::model::ClusterStatus;
use fleet_quantity::{parse_bytes, parse_cpu_millis};
use k8s_openapi::api::core::v1::Node;
use kube::{api::ListParams, Api, Client};

/// The outcome of a single probe (spec §4.C).
#[derive(Clone, Debug)]
pub struct HealthReport {
    pub status: ClusterStatus,
    pub version: String,
    pub ready_node_count: u32,
    pub total_cpu_cores: f64,
    pub total_memory_bytes: i64,
    pub heartbeat: DateTime<Utc>,
}

/// Probes `client`: `disconnected` if version discovery fails, `unhealthy`
/// if node listing fails, `healthy` otherwise. Ready-node-count counts
/// nodes whose `Ready` condition is true; CPU/memory totals sum allocatable
/// quantities (spec §4.C).
pub async fn probe(client: &Client) -> HealthReport {
    let now = Utc::now();

    let version = match client.apiserver_version().await {
        Ok(info) => info.git_version,
        Err(_) => {
            return HealthReport {
                status: ClusterStatus::Disconnected,
                version: String::new(),
                ready_node_count: 0,
                total_cpu_cores: 0.0,
                total_memory_bytes: 0,
                heartbeat: now,
            };
        }
    };

    let nodes_api: Api<Node> = Api::all(client.clone());
    let nodes = match nodes_api.list(&ListParams::default()).await {
        Ok(list) => list.items,
        Err(_) => {
            return HealthReport {
                status: ClusterStatus::Unhealthy,
                version,
                ready_node_count: 0,
                total_cpu_cores: 0.0,
                total_memory_bytes: 0,
                heartbeat: now,
            };
        }
    };

    let ready_node_count = nodes.iter().filter(|node| is_ready(node)).count() as u32;
    let (total_cpu_cores, total_memory_bytes) = sum_allocatable(&nodes);

    HealthReport {
        status: ClusterStatus::Healthy,
        version,
        ready_node_count,
        total_cpu_cores,
        total_memory_bytes,
        heartbeat: now,
    }
}

fn is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|condition| condition.type_ == "Ready" && condition.status == "True")
        })
        .unwrap_or(false)
}

/// Sums allocatable CPU (converted from milli-CPU to cores) and memory
/// (bytes) across every node (spec §4.C).
fn sum_allocatable(nodes: &[Node]) -> (f64, i64) {
    let mut cpu_milli_total: i64 = 0;
    let mut memory_bytes_total: i64 = 0;

    for node in nodes {
        let Some(allocatable) = node.status.as_ref().and_then(|status| status.allocatable.as_ref()) else {
            continue;
        };
        if let Some(cpu) = allocatable.get("cpu") {
            cpu_milli_total += parse_cpu_millis(&cpu.0).unwrap_or(0);
        }
        if let Some(memory) = allocatable.get("memory") {
            memory_bytes_total += parse_bytes(&memory.0).unwrap_or(0);
        }
    }

    (cpu_milli_total as f64 / 1000.0, memory_bytes_total)
}
