//! Deployment grouping into Application drafts (spec §4.F "Application
//! discovery").

use std::collections::BTreeMap;

/// The subset of a deployment's metadata classification cares about.
/// Decoupled from `k8s_openapi::Deployment` so the grouping rule can be
/// unit-tested without a live cluster.
#[derive(Clone, Debug)]
pub struct DeploymentInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Label precedence for grouping deployments into one Application (spec
/// §4.F: "`app.kubernetes.io/name` > `app` > `k8s-app`").
const GROUP_LABEL_PRECEDENCE: &[&str] = &["app.kubernetes.io/name", "app", "k8s-app"];

/// Labels copied onto the Application record, restricted to the set spec
/// §4.F names ("app-name labels, version, component, tier").
const APPLICATION_LABEL_KEYS: &[&str] = &[
    "app.kubernetes.io/name",
    "app.kubernetes.io/version",
    "app.kubernetes.io/component",
    "tier",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationDraft {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub workload_types: Vec<String>,
    pub deployment_count: u32,
}

/// Groups `deployments` by the label precedence in spec §4.F. Deployments
/// carrying none of the recognized labels each form their own
/// single-deployment group keyed by their own name.
pub fn group_deployments(deployments: &[DeploymentInfo]) -> Vec<ApplicationDraft> {
    let mut groups: BTreeMap<String, (String, Vec<&DeploymentInfo>)> = BTreeMap::new();

    for deployment in deployments {
        let (key, display_name) = group_identity(deployment);
        groups
            .entry(key)
            .or_insert_with(|| (display_name, Vec::new()))
            .1
            .push(deployment);
    }

    groups
        .into_values()
        .map(|(name, members)| {
            let first = members[0];
            let labels = APPLICATION_LABEL_KEYS
                .iter()
                .filter_map(|key| first.labels.get(*key).map(|value| (key.to_string(), value.clone())))
                .collect();
            ApplicationDraft {
                name,
                labels,
                workload_types: vec!["Deployment".to_string()],
                deployment_count: members.len() as u32,
            }
        })
        .collect()
}

/// Returns the group's internal bucketing key and its display name.
fn group_identity(deployment: &DeploymentInfo) -> (String, String) {
    for label_key in GROUP_LABEL_PRECEDENCE {
        if let Some(value) = deployment.labels.get(*label_key) {
            return (format!("label:{label_key}={value}"), value.clone());
        }
    }
    (format!("name:{}", deployment.name), deployment.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(name: &str, labels: &[(&str, &str)]) -> DeploymentInfo {
        DeploymentInfo {
            name: name.to_string(),
            labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn deployments_sharing_recognized_label_group_together() {
        let deployments = vec![
            deployment("web-1", &[("app.kubernetes.io/name", "web")]),
            deployment("web-2", &[("app.kubernetes.io/name", "web")]),
        ];
        let groups = group_deployments(&deployments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "web");
        assert_eq!(groups[0].deployment_count, 2);
    }

    #[test]
    fn label_precedence_prefers_app_kubernetes_io_name_over_app() {
        let deployments = vec![deployment(
            "web-1",
            &[("app.kubernetes.io/name", "web"), ("app", "other")],
        )];
        let groups = group_deployments(&deployments);
        assert_eq!(groups[0].name, "web");
    }

    #[test]
    fn label_precedence_prefers_app_over_k8s_app() {
        let deployments = vec![deployment("web-1", &[("app", "web"), ("k8s-app", "other")])];
        let groups = group_deployments(&deployments);
        assert_eq!(groups[0].name, "web");
    }

    #[test]
    fn unlabeled_deployments_each_form_their_own_group() {
        let deployments = vec![deployment("solo-a", &[]), deployment("solo-b", &[])];
        let groups = group_deployments(&deployments);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.deployment_count == 1));
    }

    #[test]
    fn application_labels_are_restricted_to_the_recognized_set() {
        let deployments = vec![deployment(
            "web-1",
            &[
                ("app.kubernetes.io/name", "web"),
                ("app.kubernetes.io/version", "1.2.3"),
                ("unrelated-label", "value"),
            ],
        )];
        let groups = group_deployments(&deployments);
        assert!(groups[0].labels.contains_key("app.kubernetes.io/version"));
        assert!(!groups[0].labels.contains_key("unrelated-label"));
    }
}
