//! The ordered resource-kind lists for the `resources` backup/restore paths
//! (spec §4.H). Pure data: the actual listing/creation dispatch lives in
//! [`crate::dump`] and [`crate::restore`].

/// Dependency order for the `resources` backup dump (spec §4.H "resources").
/// `Psp` and `Vpa` have no typed binding in this workspace's `k8s-openapi`
/// feature set (PodSecurityPolicy was removed from the Kubernetes API in
/// 1.25+; VerticalPodAutoscaler is an `autoscaling.k8s.io` CRD this engine
/// has no dynamic client for) — they always surface as a per-kind failure,
/// which is within spec ("a per-kind failure logs a warning and continues").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackupResourceKind {
    Namespaces,
    PersistentVolumes,
    PersistentVolumeClaims,
    ConfigMaps,
    Secrets,
    Services,
    Endpoints,
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    Ingresses,
    NetworkPolicies,
    Roles,
    RoleBindings,
    ClusterRoles,
    ClusterRoleBindings,
    ServiceAccounts,
    PodDisruptionBudgets,
    Psp,
    LimitRanges,
    ResourceQuotas,
    HorizontalPodAutoscalers,
    Vpa,
    CertificateSigningRequests,
    Leases,
    Events,
}

impl BackupResourceKind {
    /// Directory name under `<path>/resources/` (spec §4.H "resources").
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::PersistentVolumes => "pv",
            Self::PersistentVolumeClaims => "pvc",
            Self::ConfigMaps => "configmaps",
            Self::Secrets => "secrets",
            Self::Services => "services",
            Self::Endpoints => "endpoints",
            Self::Pods => "pods",
            Self::Deployments => "deployments",
            Self::StatefulSets => "statefulsets",
            Self::DaemonSets => "daemonsets",
            Self::Ingresses => "ingresses",
            Self::NetworkPolicies => "networkpolicies",
            Self::Roles => "roles",
            Self::RoleBindings => "rolebindings",
            Self::ClusterRoles => "clusterroles",
            Self::ClusterRoleBindings => "clusterrolebindings",
            Self::ServiceAccounts => "serviceaccounts",
            Self::PodDisruptionBudgets => "pdb",
            Self::Psp => "psp",
            Self::LimitRanges => "limitranges",
            Self::ResourceQuotas => "resourcequotas",
            Self::HorizontalPodAutoscalers => "hpa",
            Self::Vpa => "vpa",
            Self::CertificateSigningRequests => "csr",
            Self::Leases => "leases",
            Self::Events => "events",
        }
    }

    /// Dependency order as listed in spec §4.H "resources".
    pub const ALL: &'static [Self] = &[
        Self::Namespaces,
        Self::PersistentVolumes,
        Self::PersistentVolumeClaims,
        Self::ConfigMaps,
        Self::Secrets,
        Self::Services,
        Self::Endpoints,
        Self::Pods,
        Self::Deployments,
        Self::StatefulSets,
        Self::DaemonSets,
        Self::Ingresses,
        Self::NetworkPolicies,
        Self::Roles,
        Self::RoleBindings,
        Self::ClusterRoles,
        Self::ClusterRoleBindings,
        Self::ServiceAccounts,
        Self::PodDisruptionBudgets,
        Self::Psp,
        Self::LimitRanges,
        Self::ResourceQuotas,
        Self::HorizontalPodAutoscalers,
        Self::Vpa,
        Self::CertificateSigningRequests,
        Self::Leases,
        Self::Events,
    ];
}

/// Typed-create order for the `resources` restore path (spec §4.H
/// "Restore" / "resources").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RestoreResourceKind {
    Namespaces,
    PersistentVolumes,
    PersistentVolumeClaims,
    ConfigMaps,
    Secrets,
    Deployments,
    Services,
    Ingresses,
}

impl RestoreResourceKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::PersistentVolumes => "pv",
            Self::PersistentVolumeClaims => "pvc",
            Self::ConfigMaps => "configmaps",
            Self::Secrets => "secrets",
            Self::Deployments => "deployments",
            Self::Services => "services",
            Self::Ingresses => "ingresses",
        }
    }

    pub const ALL: &'static [Self] = &[
        Self::Namespaces,
        Self::PersistentVolumes,
        Self::PersistentVolumeClaims,
        Self::ConfigMaps,
        Self::Secrets,
        Self::Deployments,
        Self::Services,
        Self::Ingresses,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_kind_order_matches_dependency_order() {
        assert_eq!(BackupResourceKind::ALL[0], BackupResourceKind::Namespaces);
        assert_eq!(BackupResourceKind::ALL.last(), Some(&BackupResourceKind::Events));
        assert_eq!(BackupResourceKind::ALL.len(), 27);
    }

    #[test]
    fn restore_kind_order_matches_spec() {
        assert_eq!(RestoreResourceKind::ALL.len(), 8);
        assert_eq!(RestoreResourceKind::ALL[0], RestoreResourceKind::Namespaces);
        assert_eq!(RestoreResourceKind::ALL.last(), Some(&RestoreResourceKind::Ingresses));
    }
}
