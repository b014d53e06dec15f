//! Per-cluster policy sync (spec §4.E "Policy sync").

use std::time::Duration;

use fleet_entities::model::{AutoscalingPolicy, Cluster, ClusterState, EntityId, PodSecurityStandard, SecurityPolicy};
use fleet_entities::repository::ClusterRepository;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod};
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::{instrument, warn};

use crate::error;
use crate::security;

const POLICY_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one policy-sync pass for a single cluster (spec §4.E "Policy
/// sync"): decrypt kubeconfig, fan the remaining steps out against the
/// live client, and atomically update `ClusterState`.
#[instrument(skip(client, repo))]
pub async fn sync_cluster<R>(cluster: &Cluster, client: Client, repo: &R) -> fleet_entities::Result<()>
where
    R: ClusterRepository,
{
    let outcome = tokio::time::timeout(POLICY_SYNC_TIMEOUT, sync_cluster_inner(cluster.id, &client)).await;

    let now = chrono::Utc::now();
    match outcome {
        Ok(Ok((autoscaling, security, api_server_url))) => {
            repo.put_autoscaling_policy(autoscaling).await?;
            repo.put_security_policy(security).await?;

            let mut state = repo
                .get_cluster_state(cluster.id)
                .await?
                .unwrap_or(ClusterState {
                    cluster_id: cluster.id,
                    status: fleet_entities::model::ClusterStatus::Disconnected,
                    node_count: 0,
                    kubernetes_version: String::new(),
                    api_server_url: String::new(),
                    last_heartbeat_at: now,
                    last_sync_at: now,
                    sync_success: true,
                    sync_error: None,
                });
            state.api_server_url = api_server_url;
            state.last_sync_at = now;
            state.sync_success = true;
            state.sync_error = None;
            repo.put_cluster_state(state).await?;
            Ok(())
        }
        Ok(Err(error)) => {
            warn!(cluster_id = %cluster.id, %error, "policy sync failed");
            record_sync_failure(repo, cluster.id, now, error.to_string()).await?;
            Err(error.into())
        }
        Err(_) => {
            warn!(cluster_id = %cluster.id, "policy sync timed out");
            let timeout_error = error::Error::PolicySyncTimeout {
                cluster_id: cluster.id.to_string(),
                timeout_secs: POLICY_SYNC_TIMEOUT.as_secs(),
            };
            record_sync_failure(repo, cluster.id, now, timeout_error.to_string()).await?;
            Err(timeout_error.into())
        }
    }
}

async fn record_sync_failure<R: ClusterRepository>(
    repo: &R,
    cluster_id: EntityId,
    now: chrono::DateTime<chrono::Utc>,
    message: String,
) -> fleet_entities::Result<()> {
    if let Some(mut state) = repo.get_cluster_state(cluster_id).await? {
        state.last_sync_at = now;
        state.sync_success = false;
        state.sync_error = Some(message);
        repo.put_cluster_state(state).await?;
    }
    Ok(())
}

async fn sync_cluster_inner(
    cluster_id: EntityId,
    client: &Client,
) -> error::Result<(AutoscalingPolicy, SecurityPolicy, String)> {
    let autoscaling = detect_autoscaling_policy(cluster_id, client).await?;
    let security_policy = detect_security_policy(cluster_id, client).await?;
    let api_server_url = discover_api_server_url(client).await?;
    Ok((autoscaling, security_policy, api_server_url))
}

/// Lists HPAs cluster-wide and checks `kube-system` for a
/// `cluster-autoscaler` deployment (spec §4.E "Policy sync" step 2).
async fn detect_autoscaling_policy(cluster_id: EntityId, client: &Client) -> error::Result<AutoscalingPolicy> {
    let hpas: Api<HorizontalPodAutoscaler> = Api::all(client.clone());
    let hpa_list = hpas
        .list(&ListParams::default())
        .await
        .map_err(|source| error::Error::KubeApi {
            context: "list horizontalpodautoscalers".to_string(),
            source,
        })?;

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), "kube-system");
    let cluster_autoscaler_enabled = deployments
        .get_opt("cluster-autoscaler")
        .await
        .map_err(|source| error::Error::KubeApi {
            context: "get kube-system/cluster-autoscaler deployment".to_string(),
            source,
        })?
        .is_some();

    Ok(AutoscalingPolicy {
        cluster_id,
        hpa_count: hpa_list.items.len() as u32,
        cluster_autoscaler_enabled,
        // VerticalPodAutoscaler is a CRD from autoscaling.k8s.io not
        // covered by k8s-openapi's typed API; counting it needs a dynamic
        // client, which this engine does not build.
        vpa_count: 0,
    })
}

/// Assembles the cluster's `SecurityPolicy` (spec §4.E.2).
async fn detect_security_policy(cluster_id: EntityId, client: &Client) -> error::Result<SecurityPolicy> {
    let discovery = kube::discovery::Discovery::new(client.clone())
        .run()
        .await
        .map_err(|source| error::Error::Discovery { source })?;

    let rbac_group_present = discovery.groups().any(|group| group.name() == "rbac.authorization.k8s.io");
    let networking_group_present = discovery.groups().any(|group| group.name() == "networking.k8s.io");
    let psp_present = discovery
        .groups()
        .any(|group| group.name() == "policy" && group.versions().any(|v| v == "v1beta1"));

    let kube_system_pods: Api<Pod> = Api::namespaced(client.clone(), "kube-system");
    let pods = kube_system_pods
        .list(&ListParams::default())
        .await
        .map_err(|source| error::Error::KubeApi {
            context: "list kube-system pods".to_string(),
            source,
        })?;

    let api_server_command = find_api_server_command(&pods.items);
    let authorization_mode_flag = api_server_command
        .iter()
        .find_map(|arg| arg.strip_prefix("--authorization-mode=").map(str::to_string));

    let rbac_enabled = security::rbac_enabled(rbac_group_present, authorization_mode_flag.as_deref());

    let haystacks: Vec<String> = pods
        .items
        .iter()
        .flat_map(|pod| {
            let labels = pod.metadata.labels.clone().unwrap_or_default();
            let images = pod
                .spec
                .as_ref()
                .map(|spec| spec.containers.iter().filter_map(|c| c.image.clone()).collect::<Vec<_>>())
                .unwrap_or_default();
            labels.into_values().chain(images)
        })
        .collect();
    let cni_supports_policy = security::detect_cni_supports_policy(haystacks.iter().map(String::as_str));
    let network_policies_enabled = security::network_policy_enabled(networking_group_present, cni_supports_policy);

    let namespaces: Api<Namespace> = Api::all(client.clone());
    let namespace_list = namespaces
        .list(&ListParams::default())
        .await
        .map_err(|source| error::Error::KubeApi {
            context: "list namespaces".to_string(),
            source,
        })?;
    let enforce_labels = namespace_list.items.iter().filter_map(|namespace| {
        let label = namespace
            .metadata
            .labels
            .as_ref()?
            .get("pod-security.kubernetes.io/enforce")?;
        match label.as_str() {
            "restricted" => Some(PodSecurityStandard::Restricted),
            "baseline" => Some(PodSecurityStandard::Baseline),
            "privileged" => Some(PodSecurityStandard::Privileged),
            _ => None,
        }
    });
    let (pod_security_mode, pod_security_standard) = security::detect_pod_security(enforce_labels, psp_present);

    let (audit_enabled, audit_level) = security::detect_audit_logging(Some(&api_server_command));

    Ok(SecurityPolicy {
        cluster_id,
        rbac_enabled,
        rbac_details: format!("group_present={rbac_group_present}"),
        network_policies_enabled,
        network_policy_details: format!("cni_supports_policy={cni_supports_policy:?}"),
        pod_security_standard,
        pod_security_details: pod_security_mode.to_string(),
        audit_logging_enabled: audit_enabled,
        audit_logging_details: audit_level.to_string(),
    })
}

fn find_api_server_command(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .find(|pod| {
            pod.metadata
                .name
                .as_deref()
                .map(|name| name.starts_with("kube-apiserver"))
                .unwrap_or(false)
        })
        .and_then(|pod| pod.spec.as_ref())
        .and_then(|spec| spec.containers.first())
        .map(|container| {
            container
                .command
                .clone()
                .unwrap_or_default()
                .into_iter()
                .chain(container.args.clone().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}

/// API-server URL discovery: `kube-system/kube-apiserver-original`
/// configmap key `api-server-url`, else `https://<first-node-address>:6443`
/// (spec §4.E "Policy sync" step 4).
async fn discover_api_server_url(client: &Client) -> error::Result<String> {
    let configmaps: Api<ConfigMap> = Api::namespaced(client.clone(), "kube-system");
    if let Some(configmap) = configmaps
        .get_opt("kube-apiserver-original")
        .await
        .map_err(|source| error::Error::KubeApi {
            context: "get kube-system/kube-apiserver-original configmap".to_string(),
            source,
        })?
    {
        if let Some(url) = configmap.data.as_ref().and_then(|data| data.get("api-server-url")) {
            return Ok(url.clone());
        }
    }

    let nodes: Api<k8s_openapi::api::core::v1::Node> = Api::all(client.clone());
    let node_list = nodes.list(&ListParams::default()).await.map_err(|source| error::Error::KubeApi {
        context: "list nodes for api-server URL fallback".to_string(),
        source,
    })?;
    let first_address = node_list
        .items
        .first()
        .and_then(|node| node.status.as_ref())
        .and_then(|status| status.addresses.as_ref())
        .and_then(|addresses| addresses.first())
        .map(|address| address.address.clone())
        .unwrap_or_default();

    Ok(format!("https://{first_address}:6443"))
}
