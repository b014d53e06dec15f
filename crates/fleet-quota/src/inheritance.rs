//! Tenant → environment quota inheritance (spec §4.G "Inheritance").

use std::collections::BTreeMap;

use fleet_entities::model::InheritanceStatus;

/// Given a tenant's `hard_limits` and a count of active environments,
/// returns the inherited hard limits each environment should receive: the
/// tenant's limits unchanged if `active_environment_count <= 1`, otherwise
/// each key divided (integer division) by the count. This is the "current
/// simplified strategy" the spec flags for future refinement (spec §9).
pub fn compute_inherited_limits(
    tenant_hard_limits: &BTreeMap<String, i64>,
    active_environment_count: usize,
) -> BTreeMap<String, i64> {
    if active_environment_count <= 1 {
        return tenant_hard_limits.clone();
    }
    let n = active_environment_count as i64;
    tenant_hard_limits
        .iter()
        .map(|(key, &value)| (key.clone(), value / n))
        .collect()
}

/// Compares a stored environment quota against the freshly computed
/// inherited quota to classify how the environment relates to its tenant's
/// policy (spec §4.G "Inheritance status queries").
pub fn inheritance_status(
    stored: &BTreeMap<String, i64>,
    computed_inherited: &BTreeMap<String, i64>,
    has_manual_override: bool,
) -> InheritanceStatus {
    if has_manual_override {
        return InheritanceStatus::Manual;
    }
    if stored == computed_inherited {
        InheritanceStatus::Tenant
    } else {
        InheritanceStatus::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn single_environment_inherits_full_tenant_limit() {
        let tenant = limits(&[("requests.cpu", 4000)]);
        let inherited = compute_inherited_limits(&tenant, 1);
        assert_eq!(inherited.get("requests.cpu"), Some(&4000));
    }

    #[test]
    fn multiple_environments_split_evenly() {
        let tenant = limits(&[("requests.cpu", 4000), ("pods", 100)]);
        let inherited = compute_inherited_limits(&tenant, 4);
        assert_eq!(inherited.get("requests.cpu"), Some(&1000));
        assert_eq!(inherited.get("pods"), Some(&25));
    }

    #[test]
    fn zero_environments_behaves_like_one() {
        let tenant = limits(&[("requests.cpu", 4000)]);
        let inherited = compute_inherited_limits(&tenant, 0);
        assert_eq!(inherited.get("requests.cpu"), Some(&4000));
    }

    #[test]
    fn status_reflects_manual_override_regardless_of_match() {
        let tenant = limits(&[("requests.cpu", 4000)]);
        let inherited = compute_inherited_limits(&tenant, 1);
        assert_eq!(
            inheritance_status(&inherited, &inherited, true),
            InheritanceStatus::Manual
        );
    }

    #[test]
    fn status_is_tenant_when_stored_matches_computed() {
        let tenant = limits(&[("requests.cpu", 4000)]);
        let inherited = compute_inherited_limits(&tenant, 2);
        assert_eq!(
            inheritance_status(&inherited, &inherited, false),
            InheritanceStatus::Tenant
        );
    }

    #[test]
    fn status_is_none_when_stored_diverges_without_override_flag() {
        let tenant = limits(&[("requests.cpu", 4000)]);
        let inherited = compute_inherited_limits(&tenant, 2);
        let stored = limits(&[("requests.cpu", 999)]);
        assert_eq!(
            inheritance_status(&stored, &inherited, false),
            InheritanceStatus::None
        );
    }
}
