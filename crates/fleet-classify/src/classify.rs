//! Per-namespace classification against a live cluster client (spec §4.F).

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, ResourceQuota as K8sResourceQuota};
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::instrument;

use crate::application::{self, ApplicationDraft, DeploymentInfo};
use crate::error::{self, Result};
use crate::quota::{self, ResourceQuotaDraft};
use crate::tenancy;

/// The full result of classifying one namespace (spec §4.F
/// `ClassificationResult`).
#[derive(Clone, Debug)]
pub struct ClassificationResult {
    pub namespace: String,
    pub tenant_name: &'static str,
    pub environment_display_name: String,
    pub applications: Vec<ApplicationDraft>,
    pub resource_quota: Option<ResourceQuotaDraft>,
}

/// Classifies every namespace visible to `client` (spec §4.F, driven
/// inside the import transaction by §4.G).
#[instrument(skip(client))]
pub async fn classify_cluster(client: &Client) -> Result<Vec<ClassificationResult>> {
    let namespaces_api: Api<Namespace> = Api::all(client.clone());
    let namespaces = namespaces_api
        .list(&ListParams::default())
        .await
        .map_err(|source| error::Error::ReadNamespace {
            namespace: "*".to_string(),
            source,
        })?;

    let mut results = Vec::with_capacity(namespaces.items.len());
    for namespace in namespaces.items {
        let Some(name) = namespace.metadata.name.clone() else {
            continue;
        };
        let labels = namespace
            .metadata
            .labels
            .clone()
            .unwrap_or_default();
        results.push(classify_namespace(client, &name, &labels).await?);
    }
    Ok(results)
}

/// Classifies a single namespace, given its own labels (for the `env=X`
/// display-name override — spec §4.F "Environment upsert").
#[instrument(skip(client, namespace_labels))]
pub async fn classify_namespace(
    client: &Client,
    namespace: &str,
    namespace_labels: &BTreeMap<String, String>,
) -> Result<ClassificationResult> {
    let tenant_name = tenancy::assign_tenant_name(namespace);
    let environment_display_name = namespace_labels
        .get("env")
        .cloned()
        .unwrap_or_else(|| namespace.to_string());

    let deployments_api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let deployments = deployments_api
        .list(&ListParams::default())
        .await
        .map_err(|source| error::Error::ListDeployments {
            namespace: namespace.to_string(),
            source,
        })?;
    let deployment_infos: Vec<DeploymentInfo> = deployments
        .items
        .iter()
        .filter_map(|deployment| {
            let name = deployment.metadata.name.clone()?;
            let labels = deployment.metadata.labels.clone().unwrap_or_default();
            Some(DeploymentInfo { name, labels })
        })
        .collect();
    let applications = application::group_deployments(&deployment_infos);

    let quotas_api: Api<K8sResourceQuota> = Api::namespaced(client.clone(), namespace);
    let quotas = quotas_api
        .list(&ListParams::default())
        .await
        .map_err(|source| error::Error::ListResourceQuotas {
            namespace: namespace.to_string(),
            source,
        })?;
    let resource_quota = quotas.items.first().map(|rq| {
        let hard = rq
            .status
            .as_ref()
            .and_then(|status| status.hard.as_ref())
            .map(|hard| hard.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect())
            .unwrap_or_default();
        let used = rq
            .status
            .as_ref()
            .and_then(|status| status.used.as_ref())
            .map(|used| used.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect())
            .unwrap_or_default();
        quota::mirror_resource_quota(&hard, &used)
    });

    Ok(ClassificationResult {
        namespace: namespace.to_string(),
        tenant_name,
        environment_display_name,
        applications,
        resource_quota,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_display_name_falls_back_to_namespace_without_env_label() {
        let labels = BTreeMap::new();
        let display = labels.get("env").cloned().unwrap_or_else(|| "my-ns".to_string());
        assert_eq!(display, "my-ns");
    }

    #[test]
    fn environment_display_name_prefers_env_label() {
        let mut labels = BTreeMap::new();
        labels.insert("env".to_string(), "staging".to_string());
        let display = labels.get("env").cloned().unwrap_or_else(|| "my-ns".to_string());
        assert_eq!(display, "staging");
    }
}
