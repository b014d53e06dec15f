//! Security posture detection (spec §4.E.2). Pure functions operating on
//! already-fetched facts, so the detection rules can be unit-tested without
//! a live API server; the async wiring that gathers these facts from a
//! cluster lives in [`crate::policy`].

use fleet_entities::model::PodSecurityStandard;

const POLICY_SUPPORTING_CNI_MARKERS: &[&str] = &["calico", "cilium", "weave", "canal", "antrea"];
const NON_POLICY_CNI_MARKERS: &[&str] = &["flannel"];

/// RBAC is enabled iff the `rbac.authorization.k8s.io` API group is present
/// and, when the api-server's `--authorization-mode` flag could be read, it
/// contains `RBAC`; if the flag could not be read, group presence alone
/// suffices (spec §4.E.2 "RBAC").
pub fn rbac_enabled(api_group_present: bool, authorization_mode_flag: Option<&str>) -> bool {
    match authorization_mode_flag {
        Some(flag) => api_group_present && flag.contains("RBAC"),
        None => api_group_present,
    }
}

/// Scans `kube-system` pod labels and container images for CNI-identifying
/// substrings. Returns `Some(true)` for a policy-supporting CNI, `Some(false)`
/// for a non-supporting one (`flannel`), `None` if nothing matched (spec
/// §4.E.2 "NetworkPolicy").
pub fn detect_cni_supports_policy<'a>(haystacks: impl IntoIterator<Item = &'a str>) -> Option<bool> {
    for haystack in haystacks {
        let lower = haystack.to_ascii_lowercase();
        if POLICY_SUPPORTING_CNI_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return Some(true);
        }
        if NON_POLICY_CNI_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return Some(false);
        }
    }
    None
}

/// NetworkPolicy support requires both the `networking.k8s.io` API group
/// and a policy-supporting CNI (spec §4.E.2 "NetworkPolicy").
pub fn network_policy_enabled(api_group_present: bool, cni_supports_policy: Option<bool>) -> bool {
    api_group_present && cni_supports_policy.unwrap_or(false)
}

/// Strictest of `{restricted > baseline > privileged}` among the Pod
/// Security Admission standards observed across namespace
/// `pod-security.kubernetes.io/enforce` labels.
fn strictest(standards: impl IntoIterator<Item = PodSecurityStandard>) -> Option<PodSecurityStandard> {
    standards.into_iter().min_by_key(rank)
}

fn rank(standard: PodSecurityStandard) -> u8 {
    match standard {
        PodSecurityStandard::Restricted => 0,
        PodSecurityStandard::Baseline => 1,
        PodSecurityStandard::Privileged => 2,
        PodSecurityStandard::Disabled => 3,
    }
}

/// Pod security mode/standard detection (spec §4.E.2 "Pod security").
pub fn detect_pod_security(
    enforce_labels: impl IntoIterator<Item = PodSecurityStandard>,
    psp_v1beta1_exists: bool,
) -> (&'static str, PodSecurityStandard) {
    if let Some(strictest) = strictest(enforce_labels) {
        return ("PSA", strictest);
    }
    if psp_v1beta1_exists {
        return ("PSP", PodSecurityStandard::Baseline);
    }
    ("none", PodSecurityStandard::Disabled)
}

/// Audit logging enabled iff the api-server pod's command contains
/// `--audit-log-path`; log level `request-response` if any arg names
/// `--audit-log-max*`, else `metadata` (spec §4.E.2 "Audit").
pub fn detect_audit_logging(api_server_command: Option<&[String]>) -> (bool, &'static str) {
    let Some(command) = api_server_command else {
        return (false, "metadata");
    };
    let enabled = command.iter().any(|arg| arg.contains("--audit-log-path"));
    if !enabled {
        return (false, "metadata");
    }
    let level = if command.iter().any(|arg| arg.contains("--audit-log-max")) {
        "request-response"
    } else {
        "metadata"
    };
    (true, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rbac_requires_both_group_and_flag_when_flag_readable() {
        assert!(!rbac_enabled(true, Some("Node,Webhook")));
        assert!(rbac_enabled(true, Some("Node,RBAC,Webhook")));
    }

    #[test]
    fn rbac_falls_back_to_group_presence_when_flag_unreadable() {
        assert!(rbac_enabled(true, None));
        assert!(!rbac_enabled(false, None));
    }

    #[test]
    fn cni_detection_prefers_first_match() {
        assert_eq!(
            detect_cni_supports_policy(["calico-node", "other-image"]),
            Some(true)
        );
        assert_eq!(detect_cni_supports_policy(["kube-flannel"]), Some(false));
        assert_eq!(detect_cni_supports_policy(["unrelated"]), None);
    }

    #[test]
    fn network_policy_requires_group_and_supporting_cni() {
        assert!(network_policy_enabled(true, Some(true)));
        assert!(!network_policy_enabled(true, Some(false)));
        assert!(!network_policy_enabled(true, None));
        assert!(!network_policy_enabled(false, Some(true)));
    }

    #[test]
    fn pod_security_prefers_strictest_psa_label() {
        let labels = [PodSecurityStandard::Baseline, PodSecurityStandard::Restricted];
        let (mode, standard) = detect_pod_security(labels, true);
        assert_eq!(mode, "PSA");
        assert_eq!(standard, PodSecurityStandard::Restricted);
    }

    #[test]
    fn pod_security_falls_back_to_psp_then_none() {
        assert_eq!(
            detect_pod_security(std::iter::empty(), true),
            ("PSP", PodSecurityStandard::Baseline)
        );
        assert_eq!(
            detect_pod_security(std::iter::empty(), false),
            ("none", PodSecurityStandard::Disabled)
        );
    }

    #[test]
    fn audit_detection_reads_command_flags() {
        let command = vec![
            "kube-apiserver".to_string(),
            "--audit-log-path=/var/log/audit.log".to_string(),
            "--audit-log-maxsize=100".to_string(),
        ];
        assert_eq!(detect_audit_logging(Some(&command)), (true, "request-response"));
    }

    #[test]
    fn audit_detection_defaults_to_metadata_level() {
        let command = vec!["--audit-log-path=/var/log/audit.log".to_string()];
        assert_eq!(detect_audit_logging(Some(&command)), (true, "metadata"));
    }

    #[test]
    fn audit_detection_disabled_without_path_flag() {
        let command = vec!["kube-apiserver".to_string()];
        assert_eq!(detect_audit_logging(Some(&command)), (false, "metadata"));
    }

    #[test]
    fn audit_detection_disabled_when_command_unreadable() {
        assert_eq!(detect_audit_logging(None), (false, "metadata"));
    }
}
