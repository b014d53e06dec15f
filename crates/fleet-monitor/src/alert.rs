//! Aggregated violation thresholds (spec §4.J: "aggregated thresholds
//! (per-hour total, per-tenant total) additionally trigger" an alert).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use fleet_entities::model::{ConstraintViolation, EntityId, ViolationScope};

#[derive(Clone, Copy, Debug)]
pub struct ThresholdConfig {
    pub per_hour_total: usize,
    pub per_tenant_total: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            per_hour_total: 20,
            per_tenant_total: 5,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AggregateCounts {
    pub last_hour_total: usize,
    pub per_tenant: BTreeMap<EntityId, usize>,
}

/// Counts unresolved violations detected within the last hour, overall and
/// per tenant-scoped violation (spec §4.J).
pub fn aggregate(violations: &[ConstraintViolation], now: DateTime<Utc>) -> AggregateCounts {
    let window_start = now - Duration::hours(1);
    let mut last_hour_total = 0;
    let mut per_tenant = BTreeMap::new();

    for violation in violations {
        if violation.detected_at < window_start {
            continue;
        }
        last_hour_total += 1;
        if violation.scope == ViolationScope::Tenant {
            if let Some(tenant_id) = violation.scope_id {
                *per_tenant.entry(tenant_id).or_insert(0) += 1;
            }
        }
    }

    AggregateCounts {
        last_hour_total,
        per_tenant,
    }
}

/// Human-readable breach messages for any threshold the counts exceed.
pub fn breaches(counts: &AggregateCounts, config: &ThresholdConfig) -> Vec<String> {
    let mut messages = Vec::new();

    if counts.last_hour_total > config.per_hour_total {
        messages.push(format!(
            "{} violations detected in the last hour, exceeding the per-hour threshold of {}",
            counts.last_hour_total, config.per_hour_total
        ));
    }

    for (tenant_id, count) in &counts.per_tenant {
        if *count > config.per_tenant_total {
            messages.push(format!(
                "tenant '{tenant_id}' has {count} unresolved violations, exceeding the per-tenant threshold of {}",
                config.per_tenant_total
            ));
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_entities::model::ViolationSeverity;
    use uuid::Uuid;

    fn violation(scope: ViolationScope, scope_id: Option<EntityId>, detected_at: DateTime<Utc>) -> ConstraintViolation {
        ConstraintViolation {
            id: Uuid::new_v4(),
            scope,
            scope_id,
            violation_type: "tenant_quota_exceeded".to_string(),
            message: "test".to_string(),
            severity: ViolationSeverity::Critical,
            details: serde_json::json!({}),
            detected_at,
            resolved: false,
            resolved_at: None,
        }
    }

    #[test]
    fn counts_only_within_the_last_hour() {
        let now = DateTime::parse_from_rfc3339("2026-01-02T00:00:00Z").unwrap().with_timezone(&Utc);
        let in_window = violation(ViolationScope::Environment, None, now - Duration::minutes(30));
        let out_of_window = violation(ViolationScope::Environment, None, now - Duration::hours(2));

        let counts = aggregate(&[in_window, out_of_window], now);
        assert_eq!(counts.last_hour_total, 1);
    }

    #[test]
    fn flags_breaches_over_thresholds() {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let violations: Vec<_> = (0..6)
            .map(|_| violation(ViolationScope::Tenant, Some(tenant_id), now))
            .collect();

        let counts = aggregate(&violations, now);
        let config = ThresholdConfig {
            per_hour_total: 100,
            per_tenant_total: 5,
        };
        let messages = breaches(&counts, &config);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains(&tenant_id.to_string()));
    }
}
