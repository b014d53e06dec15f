//! Cascading delete and its precheck (spec §4.G "Cascading delete").

use std::collections::BTreeMap;

use fleet_entities::model::EntityId;
use fleet_entities::repository::HierarchyRepository;
use fleet_entities::{FleetError, Result};

/// Counts of dependent rows blocking a tenant delete, keyed by dependent
/// kind (spec §4.G: "a precheck that reports the blocking set ... is
/// exposed for UI use but does not itself delete").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionBlockers {
    pub counts: BTreeMap<String, u64>,
}

impl DeletionBlockers {
    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&count| count == 0)
    }
}

/// Reports the dependents that would block a tenant delete without
/// deleting anything.
pub async fn precheck_tenant_delete(
    repo: &dyn HierarchyRepository,
    tenant_id: EntityId,
) -> Result<DeletionBlockers> {
    let environments = repo.list_environments_by_tenant(tenant_id).await?;
    let mut blockers = DeletionBlockers::default();
    if !environments.is_empty() {
        blockers.counts.insert("environment".to_string(), environments.len() as u64);
    }
    if repo.get_tenant_quota(tenant_id).await?.is_some() {
        blockers.counts.insert("tenant_quota".to_string(), 1);
    }
    Ok(blockers)
}

/// Fails with [`FleetError::HasChildren`] if any environment still
/// references the tenant, or if a `TenantQuota` row still exists (spec
/// §4.G "Tenant delete"). System tenants are never deletable.
pub async fn validate_tenant_deletable(
    repo: &dyn HierarchyRepository,
    tenant_id: EntityId,
    is_system: bool,
) -> Result<()> {
    if is_system {
        return Err(FleetError::PermissionDenied {
            message: "system tenants are never deletable".to_string(),
        });
    }
    let blockers = precheck_tenant_delete(repo, tenant_id).await?;
    if !blockers.is_empty() {
        return Err(FleetError::HasChildren {
            kind: "tenant".to_string(),
            id: tenant_id.to_string(),
            blockers: blockers.counts,
        });
    }
    Ok(())
}

/// No child applications, no ResourceQuota row (spec §4.G "Environment
/// delete").
pub async fn validate_environment_deletable(
    repo: &dyn HierarchyRepository,
    environment_id: EntityId,
) -> Result<()> {
    let applications = repo.list_applications_by_environment(environment_id).await?;
    if !applications.is_empty() {
        let mut blockers = BTreeMap::new();
        blockers.insert("application".to_string(), applications.len() as u64);
        return Err(FleetError::HasChildren {
            kind: "environment".to_string(),
            id: environment_id.to_string(),
            blockers,
        });
    }
    if repo.get_resource_quota(environment_id).await?.is_some() {
        let mut blockers = BTreeMap::new();
        blockers.insert("resource_quota".to_string(), 1);
        return Err(FleetError::HasChildren {
            kind: "environment".to_string(),
            id: environment_id.to_string(),
            blockers,
        });
    }
    Ok(())
}

/// Deletes a tenant and every descendant in the order spec §4.G "Cascading
/// delete" prescribes: each environment's applications and their
/// resource-spec rows, then the environment's ResourceQuota, then the
/// environment; then the tenant's TenantQuota; then the tenant. Callers are
/// expected to run this inside a transaction (via
/// [`fleet_entities::repository::TransactionalStore`]) so a failure partway
/// through rolls back cleanly.
pub async fn delete_tenant_cascade(repo: &dyn HierarchyRepository, tenant_id: EntityId, is_system: bool) -> Result<()> {
    if is_system {
        return Err(FleetError::PermissionDenied {
            message: "system tenants are never deletable".to_string(),
        });
    }

    let environments = repo.list_environments_by_tenant(tenant_id).await?;
    for environment in environments {
        delete_environment_cascade(repo, environment.id).await?;
    }

    if repo.get_tenant_quota(tenant_id).await?.is_some() {
        repo.delete_tenant_quota(tenant_id).await?;
    }

    repo.delete_tenant(tenant_id).await
}

/// Deletes one environment and its applications, application resource
/// specs and ResourceQuota row, in the order spec §4.G prescribes.
pub async fn delete_environment_cascade(repo: &dyn HierarchyRepository, environment_id: EntityId) -> Result<()> {
    let applications = repo.list_applications_by_environment(environment_id).await?;
    for application in applications {
        if repo.get_application_spec(application.id).await?.is_some() {
            repo.delete_application_spec(application.id).await?;
        }
        repo.delete_application(application.id).await?;
    }

    if repo.get_resource_quota(environment_id).await?.is_some() {
        repo.delete_resource_quota(environment_id).await?;
    }

    repo.delete_environment(environment_id).await
}
