//! Tenant identification (spec §4.F "Tenant identification").

/// Exact-match system namespaces; any namespace additionally prefixed
/// `kube-` is also treated as system (spec §4.F).
const SYSTEM_NAMESPACES: &[&str] = &[
    "kube-system",
    "kube-public",
    "kube-node-lease",
    "istio-system",
    "ingress-nginx",
    "cert-manager",
    "monitoring",
    "gatekeeper-system",
];

pub const SYSTEM_TENANT_NAME: &str = "system";
pub const DEFAULT_TENANT_NAME: &str = "default";

/// True if `namespace` belongs to the `system` tenant rather than
/// `default` (spec §4.F.1).
pub fn is_system_namespace(namespace: &str) -> bool {
    SYSTEM_NAMESPACES.contains(&namespace) || namespace.starts_with("kube-")
}

/// Assigns the tenant name a namespace should be classified under.
pub fn assign_tenant_name(namespace: &str) -> &'static str {
    if is_system_namespace(namespace) {
        SYSTEM_TENANT_NAME
    } else {
        DEFAULT_TENANT_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kube-system", true)]
    #[case("kube-public", true)]
    #[case("kube-anything-else", true)]
    #[case("istio-system", true)]
    #[case("gatekeeper-system", true)]
    #[case("my-app", false)]
    #[case("production", false)]
    fn system_namespace_detection(#[case] namespace: &str, #[case] expected: bool) {
        assert_eq!(is_system_namespace(namespace), expected);
    }

    #[test]
    fn system_namespaces_assign_system_tenant() {
        assert_eq!(assign_tenant_name("kube-system"), SYSTEM_TENANT_NAME);
    }

    #[test]
    fn ordinary_namespaces_assign_default_tenant() {
        assert_eq!(assign_tenant_name("my-app"), DEFAULT_TENANT_NAME);
    }
}
