//! Generic list-and-serialize dump for the `resources` backup path
//! (spec §4.H "resources"). One generic function drives every kind that has
//! a typed `k8s-openapi` binding; the two kinds that don't (`psp`, `vpa`)
//! are reported via [`crate::error::Error::UnsupportedKind`] so the caller's
//! per-kind failure handling (spec: "a per-kind failure logs a warning and
//! continues") covers them uniformly.

use std::fmt::Debug;
use std::path::Path;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use k8s_openapi::api::coordination::v1::Lease;
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, LimitRange, Namespace, PersistentVolume, PersistentVolumeClaim, Pod, ResourceQuota,
    Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::ListParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};

use crate::error::{self, Result};
use crate::resource_kinds::BackupResourceKind;

/// Dispatches to the typed listing for `kind`, writing each surviving object
/// as a YAML file under `<dest>/<kind.dir_name()>/`. Returns the number of
/// objects written.
pub async fn dump_kind(client: &Client, kind: BackupResourceKind, dest: &Path) -> Result<usize> {
    use BackupResourceKind::*;
    match kind {
        Namespaces => dump_all::<Namespace>(client, kind, dest).await,
        PersistentVolumes => dump_all::<PersistentVolume>(client, kind, dest).await,
        PersistentVolumeClaims => dump_all::<PersistentVolumeClaim>(client, kind, dest).await,
        ConfigMaps => dump_all::<ConfigMap>(client, kind, dest).await,
        Secrets => dump_all::<Secret>(client, kind, dest).await,
        Services => dump_all::<Service>(client, kind, dest).await,
        Endpoints => dump_all::<Endpoints>(client, kind, dest).await,
        Pods => dump_all::<Pod>(client, kind, dest).await,
        Deployments => dump_all::<Deployment>(client, kind, dest).await,
        StatefulSets => dump_all::<StatefulSet>(client, kind, dest).await,
        DaemonSets => dump_all::<DaemonSet>(client, kind, dest).await,
        Ingresses => dump_all::<Ingress>(client, kind, dest).await,
        NetworkPolicies => dump_all::<NetworkPolicy>(client, kind, dest).await,
        Roles => dump_all::<Role>(client, kind, dest).await,
        RoleBindings => dump_all::<RoleBinding>(client, kind, dest).await,
        ClusterRoles => dump_all::<ClusterRole>(client, kind, dest).await,
        ClusterRoleBindings => dump_all::<ClusterRoleBinding>(client, kind, dest).await,
        ServiceAccounts => dump_all::<ServiceAccount>(client, kind, dest).await,
        PodDisruptionBudgets => dump_all::<PodDisruptionBudget>(client, kind, dest).await,
        Psp | Vpa => error::UnsupportedKindSnafu {
            kind: kind.dir_name().to_string(),
        }
        .fail(),
        LimitRanges => dump_all::<LimitRange>(client, kind, dest).await,
        ResourceQuotas => dump_all::<ResourceQuota>(client, kind, dest).await,
        HorizontalPodAutoscalers => dump_all::<HorizontalPodAutoscaler>(client, kind, dest).await,
        CertificateSigningRequests => dump_all::<CertificateSigningRequest>(client, kind, dest).await,
        Leases => dump_all::<Lease>(client, kind, dest).await,
        Events => dump_all::<Event>(client, kind, dest).await,
    }
}

/// True if an object of `kind` named `name` in `namespace` belongs to a
/// system namespace (spec §4.H: "System namespaces (§4.F set) are
/// skipped"). For the `namespaces` kind itself, `name` is the candidate
/// namespace's own name.
fn should_skip(kind: BackupResourceKind, namespace: Option<&str>, name: &str) -> bool {
    match kind {
        BackupResourceKind::Namespaces => fleet_classify::is_system_namespace(name),
        _ => namespace.map(fleet_classify::is_system_namespace).unwrap_or(false),
    }
}

async fn dump_all<K>(client: &Client, kind: BackupResourceKind, dest: &Path) -> Result<usize>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    let api: Api<K> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default())
        .await
        .with_context(|_| error::KubeApiSnafu {
            context: format!("list {}", kind.dir_name()),
        })?;

    let kind_dir = dest.join(kind.dir_name());
    tokio::fs::create_dir_all(&kind_dir)
        .await
        .with_context(|_| error::IoSnafu {
            path: kind_dir.display().to_string(),
        })?;

    let mut count = 0usize;
    for item in list.items {
        let meta = item.meta();
        let name = meta.name.clone().unwrap_or_default();
        let namespace = meta.namespace.clone();
        if should_skip(kind, namespace.as_deref(), &name) {
            continue;
        }

        let file_name = match &namespace {
            Some(ns) => format!("{ns}-{name}.yaml"),
            None => format!("{name}.yaml"),
        };
        let yaml = serde_yaml::to_string(&item).context(error::SerializeYamlSnafu)?;
        let file_path = kind_dir.join(file_name);
        tokio::fs::write(&file_path, yaml)
            .await
            .with_context(|_| error::IoSnafu {
                path: file_path.display().to_string(),
            })?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BackupResourceKind::Namespaces, None, "kube-system", true)]
    #[case(BackupResourceKind::Namespaces, None, "production", false)]
    #[case(BackupResourceKind::ConfigMaps, Some("kube-system"), "coredns", true)]
    #[case(BackupResourceKind::ConfigMaps, Some("production"), "app-config", false)]
    #[case(BackupResourceKind::ClusterRoles, None, "cluster-admin", false)]
    fn skip_rules_match_system_namespace_set(
        #[case] kind: BackupResourceKind,
        #[case] namespace: Option<&str>,
        #[case] name: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(should_skip(kind, namespace, name), expected);
    }
}
