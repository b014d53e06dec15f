//! Auto-resolution of stale `info`-severity violations (spec §4.J:
//! "info-severity violations older than 24h are marked resolved").

use chrono::{DateTime, Duration, Utc};
use fleet_entities::model::ViolationSeverity;
use fleet_entities::repository::ViolationRepository;

/// Marks every unresolved `info` violation older than `max_age` as
/// resolved. Returns the number of rows resolved.
pub async fn auto_resolve<R>(repo: &R, now: DateTime<Utc>, max_age: Duration) -> fleet_entities::Result<usize>
where
    R: ViolationRepository,
{
    let unresolved = repo.list_unresolved_violations().await?;
    let mut resolved_count = 0;

    for mut violation in unresolved {
        if violation.severity != ViolationSeverity::Info {
            continue;
        }
        if now.signed_duration_since(violation.detected_at) < max_age {
            continue;
        }
        violation.resolved = true;
        violation.resolved_at = Some(now);
        repo.put_violation(violation).await?;
        resolved_count += 1;
    }

    Ok(resolved_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleet_entities::model::{ConstraintViolation, EntityId, ViolationScope};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeViolationRepo {
        violations: Mutex<Vec<ConstraintViolation>>,
    }

    #[async_trait]
    impl ViolationRepository for FakeViolationRepo {
        async fn put_violation(&self, violation: ConstraintViolation) -> fleet_entities::Result<()> {
            let mut violations = self.violations.lock().expect("lock");
            if let Some(existing) = violations.iter_mut().find(|v| v.id == violation.id) {
                *existing = violation;
            } else {
                violations.push(violation);
            }
            Ok(())
        }

        async fn list_unresolved_violations(&self) -> fleet_entities::Result<Vec<ConstraintViolation>> {
            Ok(self
                .violations
                .lock()
                .expect("lock")
                .iter()
                .filter(|v| !v.resolved)
                .cloned()
                .collect())
        }
    }

    fn violation(id: EntityId, severity: ViolationSeverity, detected_at: DateTime<Utc>) -> ConstraintViolation {
        ConstraintViolation {
            id,
            scope: ViolationScope::Tenant,
            scope_id: Some(Uuid::new_v4()),
            violation_type: "tenant_quota_insufficient".to_string(),
            message: "test".to_string(),
            severity,
            details: serde_json::json!({}),
            detected_at,
            resolved: false,
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn resolves_old_info_violations_but_not_recent_or_non_info() {
        let now = DateTime::parse_from_rfc3339("2026-01-02T00:00:00Z").unwrap().with_timezone(&Utc);
        let old_info = violation(Uuid::new_v4(), ViolationSeverity::Info, now - Duration::hours(25));
        let recent_info = violation(Uuid::new_v4(), ViolationSeverity::Info, now - Duration::hours(1));
        let old_critical = violation(Uuid::new_v4(), ViolationSeverity::Critical, now - Duration::hours(25));

        let repo = FakeViolationRepo {
            violations: Mutex::new(vec![old_info.clone(), recent_info.clone(), old_critical.clone()]),
        };

        let resolved_count = auto_resolve(&repo, now, Duration::hours(24)).await.expect("auto_resolve");
        assert_eq!(resolved_count, 1);

        let remaining = repo.list_unresolved_violations().await.expect("list");
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|v| v.id == recent_info.id));
        assert!(remaining.iter().any(|v| v.id == old_critical.id));
    }
}
