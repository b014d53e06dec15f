//! The six violation checks scanned on each constraint-monitor tick
//! (spec §4.J).

use chrono::Utc;
use fleet_entities::model::{
    ApplicationResourceSpec, ConstraintViolation, EntityId, QuotaStatus, ResourceQuota, TenantQuota,
    ViolationScope, ViolationSeverity,
};
use fleet_entities::repository::HierarchyRepository;
use serde_json::json;
use uuid::Uuid;

fn new_violation(
    scope: ViolationScope,
    scope_id: Option<EntityId>,
    violation_type: &str,
    message: String,
    severity: ViolationSeverity,
    details: serde_json::Value,
) -> ConstraintViolation {
    ConstraintViolation {
        id: Uuid::new_v4(),
        scope,
        scope_id,
        violation_type: violation_type.to_string(),
        message,
        severity,
        details,
        detected_at: Utc::now(),
        resolved: false,
        resolved_at: None,
    }
}

/// `tenant_quota_exceeded` (critical) and `tenant_quota_insufficient`
/// (warning, spec: "available[k] < 0.1 (10% of unit)" — interpreted as a
/// remaining-fraction threshold, since the quota map mixes units
/// (millicores, bytes, counts) and an absolute 0.1 makes no sense across
/// all of them).
fn check_tenant_quota(tenant_id: EntityId, quota: &TenantQuota) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();

    for (key, allocated) in &quota.allocated {
        let hard_limit = quota.hard_limits.get(key).copied().unwrap_or(0);
        if *allocated > hard_limit {
            violations.push(new_violation(
                ViolationScope::Tenant,
                Some(tenant_id),
                "tenant_quota_exceeded",
                format!("tenant '{tenant_id}' has allocated[{key}]={allocated} > hard_limits[{key}]={hard_limit}"),
                ViolationSeverity::Critical,
                json!({ "key": key, "allocated": allocated, "hard_limit": hard_limit }),
            ));
        }
    }

    for (key, available) in &quota.available {
        let hard_limit = quota.hard_limits.get(key).copied().unwrap_or(0);
        if hard_limit <= 0 {
            continue;
        }
        let remaining_fraction = *available as f64 / hard_limit as f64;
        if remaining_fraction < 0.1 {
            violations.push(new_violation(
                ViolationScope::Tenant,
                Some(tenant_id),
                "tenant_quota_insufficient",
                format!("tenant '{tenant_id}' has only {:.1}% of hard_limits[{key}] remaining", remaining_fraction * 100.0),
                ViolationSeverity::Warning,
                json!({ "key": key, "available": available, "hard_limit": hard_limit, "remaining_fraction": remaining_fraction }),
            ));
        }
    }

    violations
}

/// `environment_quota_high_usage` (warning, used/hard_limits > 0.80) and
/// `environment_quota_status_error` (critical, status != active).
fn check_resource_quota(environment_id: EntityId, quota: &ResourceQuota) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();

    for (key, used) in &quota.used {
        let hard_limit = quota.hard_limits.get(key).copied().unwrap_or(0);
        if hard_limit <= 0 {
            continue;
        }
        let usage_fraction = *used as f64 / hard_limit as f64;
        if usage_fraction > 0.80 {
            violations.push(new_violation(
                ViolationScope::Environment,
                Some(environment_id),
                "environment_quota_high_usage",
                format!("environment '{environment_id}' is at {:.1}% of hard_limits[{key}]", usage_fraction * 100.0),
                ViolationSeverity::Warning,
                json!({ "key": key, "used": used, "hard_limit": hard_limit, "usage_fraction": usage_fraction }),
            ));
        }
    }

    if quota.status != QuotaStatus::Active {
        violations.push(new_violation(
            ViolationScope::Environment,
            Some(environment_id),
            "environment_quota_status_error",
            format!("environment '{environment_id}' resource quota status is {:?}", quota.status),
            ViolationSeverity::Critical,
            json!({ "status": format!("{:?}", quota.status) }),
        ));
    }

    violations
}

/// `application_replica_exceeded` (critical, current_replicas > max_replicas).
fn check_application_spec(application_id: EntityId, spec: &ApplicationResourceSpec) -> Vec<ConstraintViolation> {
    if spec.current_replicas > spec.max_replicas {
        vec![new_violation(
            ViolationScope::Application,
            Some(application_id),
            "application_replica_exceeded",
            format!(
                "application '{application_id}' has current_replicas={} > max_replicas={}",
                spec.current_replicas, spec.max_replicas
            ),
            ViolationSeverity::Critical,
            json!({ "current_replicas": spec.current_replicas, "max_replicas": spec.max_replicas }),
        )]
    } else {
        Vec::new()
    }
}

fn orphaned(scope: ViolationScope, scope_id: EntityId, violation_type: &str, message: String) -> ConstraintViolation {
    new_violation(
        scope,
        Some(scope_id),
        violation_type,
        message,
        ViolationSeverity::Critical,
        json!({}),
    )
}

/// One full pass over the tenant/environment/application catalog,
/// producing every currently-true violation as a fresh candidate row (no
/// persistence or dedup here — that is the caller's job, spec §4.J).
pub async fn scan<R>(repo: &R) -> fleet_entities::Result<Vec<ConstraintViolation>>
where
    R: HierarchyRepository,
{
    let mut violations = Vec::new();

    let tenants = repo.list_tenants().await?;
    for tenant in &tenants {
        if let Some(quota) = repo.get_tenant_quota(tenant.id).await? {
            violations.extend(check_tenant_quota(tenant.id, &quota));
        }
    }

    let environments = repo.list_environments().await?;
    for environment in &environments {
        if repo.get_tenant(environment.tenant_id).await?.is_none() {
            violations.push(orphaned(
                ViolationScope::Environment,
                environment.id,
                "orphaned_environment",
                format!(
                    "environment '{}' references missing tenant '{}'",
                    environment.id, environment.tenant_id
                ),
            ));
        }
        if let Some(quota) = repo.get_resource_quota(environment.id).await? {
            violations.extend(check_resource_quota(environment.id, &quota));
        }
    }

    let applications = repo.list_applications().await?;
    for application in &applications {
        if repo.get_environment(application.environment_id).await?.is_none() {
            violations.push(orphaned(
                ViolationScope::Application,
                application.id,
                "orphaned_application",
                format!(
                    "application '{}' references missing environment '{}'",
                    application.id, application.environment_id
                ),
            ));
        }
        if let Some(spec) = repo.get_application_spec(application.id).await? {
            violations.extend(check_application_spec(application.id, &spec));
        }
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn quota(hard_limits: &[(&str, i64)], allocated: &[(&str, i64)], available: &[(&str, i64)]) -> TenantQuota {
        TenantQuota {
            tenant_id: Uuid::new_v4(),
            hard_limits: hard_limits.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            allocated: allocated.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            available: available.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            status: fleet_entities::model::QuotaStatus::Active,
        }
    }

    #[test]
    fn flags_tenant_over_allocation() {
        let quota = quota(&[("pods", 10)], &[("pods", 12)], &[("pods", -2)]);
        let violations = check_tenant_quota(quota.tenant_id, &quota);
        assert!(violations.iter().any(|v| v.violation_type == "tenant_quota_exceeded"));
    }

    #[test]
    fn flags_tenant_low_remaining_capacity() {
        let quota = quota(&[("pods", 100)], &[("pods", 95)], &[("pods", 5)]);
        let violations = check_tenant_quota(quota.tenant_id, &quota);
        assert!(violations.iter().any(|v| v.violation_type == "tenant_quota_insufficient"));
    }

    #[test]
    fn does_not_flag_healthy_tenant_quota() {
        let quota = quota(&[("pods", 100)], &[("pods", 50)], &[("pods", 50)]);
        let violations = check_tenant_quota(quota.tenant_id, &quota);
        assert!(violations.is_empty());
    }

    #[test]
    fn flags_environment_high_usage_and_status_error() {
        let environment_id = Uuid::new_v4();
        let mut hard_limits = BTreeMap::new();
        hard_limits.insert("pods".to_string(), 100i64);
        let mut used = BTreeMap::new();
        used.insert("pods".to_string(), 90i64);
        let quota = ResourceQuota {
            environment_id,
            hard_limits,
            used,
            status: QuotaStatus::Warning,
            last_synced_at: None,
        };
        let violations = check_resource_quota(environment_id, &quota);
        assert!(violations.iter().any(|v| v.violation_type == "environment_quota_high_usage"));
        assert!(violations.iter().any(|v| v.violation_type == "environment_quota_status_error"));
    }

    #[test]
    fn flags_application_replica_exceeded() {
        let application_id = Uuid::new_v4();
        let spec = ApplicationResourceSpec {
            application_id,
            default_request: BTreeMap::new(),
            default_limit: BTreeMap::new(),
            max_replicas: 5,
            current_replicas: 8,
        };
        let violations = check_application_spec(application_id, &spec);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, "application_replica_exceeded");
    }
}
