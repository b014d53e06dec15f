//! Hierarchical validation rules (spec §4.G "Hierarchical validation").

use fleet_entities::model::{
    LifecycleStatus, TenantType, APPLICATION_SPEC_KEYS, TENANT_QUOTA_KEYS,
};
use fleet_entities::{FleetError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("static pattern is valid"))
}

/// `name` matches `[A-Za-z0-9_-]{1,255}` (spec §4.G "Tenant create").
pub fn validate_name(name: &str) -> Result<()> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(FleetError::invalid_argument(format!(
            "name '{name}' must match [A-Za-z0-9_-]{{1,255}}"
        )))
    }
}

/// Every key in `quota` is in the recognized tenant/environment quota set
/// (spec §4.G "Tenant create").
pub fn validate_quota_keys(quota: &BTreeMap<String, i64>) -> Result<()> {
    validate_keys_against(quota, TENANT_QUOTA_KEYS)
}

/// Every key in `spec` is in the recognized application request/limit set
/// (spec §4.G "Application create").
pub fn validate_application_spec_keys(spec: &BTreeMap<String, i64>) -> Result<()> {
    validate_keys_against(spec, APPLICATION_SPEC_KEYS)
}

fn validate_keys_against(map: &BTreeMap<String, i64>, recognized: &[&str]) -> Result<()> {
    for key in map.keys() {
        if !recognized.contains(&key.as_str()) {
            return Err(FleetError::invalid_argument(format!(
                "unrecognized quota key '{key}'"
            )));
        }
    }
    Ok(())
}

/// A system tenant may not be renamed (spec §4.G "Tenant update").
pub fn validate_tenant_renameable(tenant_type: TenantType, is_system: bool) -> Result<()> {
    if is_system || tenant_type == TenantType::System {
        return Err(FleetError::PermissionDenied {
            message: "system tenants may not be renamed".to_string(),
        });
    }
    Ok(())
}

/// Tenant and environment exist and are `active` (spec §4.G "Environment
/// create", "Application create").
pub fn validate_active(kind: &str, status: Option<LifecycleStatus>) -> Result<()> {
    match status {
        Some(LifecycleStatus::Active) => Ok(()),
        Some(LifecycleStatus::Suspended) => Err(FleetError::invalid_argument(format!(
            "{kind} is not active"
        ))),
        None => Err(FleetError::not_found(kind, "unknown")),
    }
}

/// §4.G.1 Environment-fits-tenant: for every key present in the tenant's
/// hard limits, the sum of existing environment hard limits plus the
/// requested amount must not exceed the tenant's hard limit.
pub fn environment_fits_tenant(
    tenant_hard_limits: &BTreeMap<String, i64>,
    existing_environment_hard_limits: &[BTreeMap<String, i64>],
    requested: &BTreeMap<String, i64>,
) -> Result<()> {
    for (key, &limit) in tenant_hard_limits {
        let allocated: i64 = existing_environment_hard_limits
            .iter()
            .filter_map(|env| env.get(key))
            .sum();
        let requested_amount = requested.get(key).copied().unwrap_or(0);
        let attempted = allocated + requested_amount;
        if attempted > limit {
            return Err(FleetError::QuotaExceeded {
                resource: key.clone(),
                limit,
                attempted,
            });
        }
    }
    Ok(())
}

/// `replicas <= spec.max_replicas`, and if the environment has a `pods`
/// hard limit, `replicas <= parsed(pods)` (spec §4.G "Application scale").
pub fn validate_scale(
    replicas: u32,
    max_replicas: u32,
    environment_pods_hard_limit: Option<i64>,
) -> Result<()> {
    if replicas > max_replicas {
        return Err(FleetError::QuotaExceeded {
            resource: "replicas".to_string(),
            limit: max_replicas as i64,
            attempted: replicas as i64,
        });
    }
    if let Some(pods_limit) = environment_pods_hard_limit {
        if (replicas as i64) > pods_limit {
            return Err(FleetError::QuotaExceeded {
                resource: "pods".to_string(),
                limit: pods_limit,
                attempted: replicas as i64,
            });
        }
    }
    Ok(())
}

/// `max_replicas >= 0` is implied by the unsigned type; validates
/// request/limit keys only (spec §4.G "Application create").
pub fn validate_application_resource_spec(spec: &BTreeMap<String, i64>) -> Result<()> {
    validate_application_spec_keys(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("my-tenant-1", true)]
    #[case("My_Tenant_2", true)]
    #[case("has a space", false)]
    #[case("", false)]
    fn name_validation(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_name(name).is_ok(), valid);
    }

    #[test]
    fn quota_keys_reject_unrecognized() {
        let mut quota = BTreeMap::new();
        quota.insert("bogus.key".to_string(), 1);
        assert!(validate_quota_keys(&quota).is_err());
    }

    #[test]
    fn quota_keys_accept_recognized() {
        let mut quota = BTreeMap::new();
        quota.insert("requests.cpu".to_string(), 1000);
        quota.insert("pods".to_string(), 10);
        assert!(validate_quota_keys(&quota).is_ok());
    }

    #[test]
    fn environment_fits_tenant_rejects_overallocation() {
        let mut tenant_hard = BTreeMap::new();
        tenant_hard.insert("requests.cpu".to_string(), 4000);

        let mut existing = BTreeMap::new();
        existing.insert("requests.cpu".to_string(), 3000);

        let mut requested = BTreeMap::new();
        requested.insert("requests.cpu".to_string(), 2000);

        let result = environment_fits_tenant(&tenant_hard, &[existing], &requested);
        assert!(matches!(result, Err(FleetError::QuotaExceeded { .. })));
    }

    #[test]
    fn environment_fits_tenant_accepts_exact_fit() {
        let mut tenant_hard = BTreeMap::new();
        tenant_hard.insert("requests.cpu".to_string(), 4000);

        let mut existing = BTreeMap::new();
        existing.insert("requests.cpu".to_string(), 3000);

        let mut requested = BTreeMap::new();
        requested.insert("requests.cpu".to_string(), 1000);

        assert!(environment_fits_tenant(&tenant_hard, &[existing], &requested).is_ok());
    }

    #[test]
    fn scale_rejects_beyond_max_replicas() {
        assert!(validate_scale(5, 3, None).is_err());
    }

    #[test]
    fn scale_rejects_beyond_pods_hard_limit() {
        assert!(validate_scale(5, 10, Some(4)).is_err());
    }

    #[test]
    fn scale_accepts_within_bounds() {
        assert!(validate_scale(3, 10, Some(5)).is_ok());
    }
}
