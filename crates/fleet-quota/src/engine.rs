//! Transactional creators (spec §4.G "Transactional creators").
//!
//! Each creator opens one transaction and, in order, creates the root
//! entity then its quota/spec sub-row; a failure anywhere rolls back the
//! entire tree. `R` is expected to implement both the narrow
//! [`HierarchyRepository`] CRUD surface and [`TransactionalStore`] — in a
//! concrete deployment both are usually backed by the same connection pool,
//! with the repository methods picking up whatever transaction is active
//! on the current task the way the teacher's store layer does.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleet_entities::model::{
    Application, ApplicationResourceSpec, EntityId, Environment, ResourceQuota, Tenant, TenantQuota,
};
use fleet_entities::repository::{HierarchyRepository, TransactionalStore};
use fleet_entities::{FleetError, Result};

use crate::validation;

pub struct QuotaEngine<R> {
    repo: Arc<R>,
}

impl<R> QuotaEngine<R>
where
    R: HierarchyRepository + TransactionalStore + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// `create_tenant_with_deps` (spec §4.G).
    pub async fn create_tenant_with_deps(&self, tenant: Tenant, quota: Option<TenantQuota>) -> Result<Tenant> {
        validation::validate_name(&tenant.name)?;
        if let Some(quota) = &quota {
            validation::validate_quota_keys(&quota.hard_limits)?;
        }
        if self.repo.get_tenant_by_name(&tenant.name).await?.is_some() {
            return Err(FleetError::already_exists("tenant", tenant.name.clone()));
        }

        let repo = Arc::clone(&self.repo);
        let tenant_out = tenant.clone();
        self.repo
            .run_in_transaction(move |_tx| async move {
                repo.put_tenant(tenant.clone()).await?;
                if let Some(quota) = quota {
                    repo.put_tenant_quota(quota).await?;
                }
                Ok(tenant)
            })
            .await?;
        Ok(tenant_out)
    }

    /// `create_environment_with_deps` (spec §4.G): tenant exists and is
    /// active, `(cluster_id, namespace)` is free, and if a quota is
    /// supplied it passes the format check and §4.G.1
    /// environment-fits-tenant.
    pub async fn create_environment_with_deps(
        &self,
        environment: Environment,
        quota: Option<ResourceQuota>,
    ) -> Result<Environment> {
        let tenant = self
            .repo
            .get_tenant(environment.tenant_id)
            .await?
            .ok_or_else(|| FleetError::not_found("tenant", environment.tenant_id.to_string()))?;
        validation::validate_active("tenant", Some(tenant.status))?;

        if self
            .repo
            .get_environment_by_namespace(environment.cluster_id, &environment.namespace)
            .await?
            .is_some()
        {
            return Err(FleetError::already_exists("environment", environment.namespace.clone()));
        }

        if let Some(quota) = &quota {
            validation::validate_quota_keys(&quota.hard_limits)?;
            if let Some(tenant_quota) = self.repo.get_tenant_quota(environment.tenant_id).await? {
                let siblings = self.repo.list_environments_by_tenant(environment.tenant_id).await?;
                let mut sibling_limits = Vec::with_capacity(siblings.len());
                for sibling in &siblings {
                    if let Some(sibling_quota) = self.repo.get_resource_quota(sibling.id).await? {
                        sibling_limits.push(sibling_quota.hard_limits);
                    }
                }
                validation::environment_fits_tenant(&tenant_quota.hard_limits, &sibling_limits, &quota.hard_limits)?;
            }
        }

        let repo = Arc::clone(&self.repo);
        let environment_out = environment.clone();
        self.repo
            .run_in_transaction(move |_tx| async move {
                repo.put_environment(environment.clone()).await?;
                if let Some(quota) = quota {
                    repo.put_resource_quota(quota).await?;
                }
                Ok(environment)
            })
            .await?;
        Ok(environment_out)
    }

    /// `create_application_with_deps` (spec §4.G): tenant and environment
    /// both active, `(environment_id, name)` free, resource-spec keys
    /// recognized.
    pub async fn create_application_with_deps(
        &self,
        application: Application,
        spec: Option<ApplicationResourceSpec>,
    ) -> Result<Application> {
        self.validate_application_create(&application, spec.as_ref()).await?;

        let repo = Arc::clone(&self.repo);
        let application_out = application.clone();
        self.repo
            .run_in_transaction(move |_tx| async move {
                repo.put_application(application.clone()).await?;
                if let Some(spec) = spec {
                    repo.put_application_spec(spec).await?;
                }
                Ok(application)
            })
            .await?;
        Ok(application_out)
    }

    /// `batch_create_applications` (spec §4.G): all-or-nothing creation of
    /// several applications in one transaction.
    pub async fn batch_create_applications(
        &self,
        items: Vec<(Application, Option<ApplicationResourceSpec>)>,
    ) -> Result<Vec<Application>> {
        for (application, spec) in &items {
            self.validate_application_create(application, spec.as_ref()).await?;
        }

        let repo = Arc::clone(&self.repo);
        let created: Vec<Application> = items.iter().map(|(app, _)| app.clone()).collect();
        self.repo
            .run_in_transaction(move |_tx| async move {
                for (application, spec) in items {
                    repo.put_application(application.clone()).await?;
                    if let Some(spec) = spec {
                        repo.put_application_spec(spec).await?;
                    }
                }
                Ok(())
            })
            .await?;
        Ok(created)
    }

    async fn validate_application_create(
        &self,
        application: &Application,
        spec: Option<&ApplicationResourceSpec>,
    ) -> Result<()> {
        let tenant = self
            .repo
            .get_tenant(application.tenant_id)
            .await?
            .ok_or_else(|| FleetError::not_found("tenant", application.tenant_id.to_string()))?;
        validation::validate_active("tenant", Some(tenant.status))?;

        let environment = self
            .repo
            .get_environment(application.environment_id)
            .await?
            .ok_or_else(|| FleetError::not_found("environment", application.environment_id.to_string()))?;
        validation::validate_active("environment", Some(environment.status))?;

        if self
            .repo
            .get_application_by_name(application.environment_id, &application.name)
            .await?
            .is_some()
        {
            return Err(FleetError::already_exists("application", application.name.clone()));
        }

        if let Some(spec) = spec {
            let mut keys: BTreeMap<String, i64> = spec.default_request.clone();
            keys.extend(spec.default_limit.clone());
            validation::validate_application_resource_spec(&keys)?;
        }

        Ok(())
    }

    /// `Application scale(replicas)` (spec §4.G).
    pub async fn scale_application(&self, application_id: EntityId, replicas: u32) -> Result<()> {
        let spec = self
            .repo
            .get_application_spec(application_id)
            .await?
            .ok_or_else(|| FleetError::not_found("application_spec", application_id.to_string()))?;

        let application = self
            .repo
            .get_application(application_id)
            .await?
            .ok_or_else(|| FleetError::not_found("application", application_id.to_string()))?;
        let environment_pods_limit = self
            .repo
            .get_resource_quota(application.environment_id)
            .await?
            .and_then(|quota| quota.hard_limits.get("pods").copied());

        validation::validate_scale(replicas, spec.max_replicas, environment_pods_limit)?;

        let mut updated = spec;
        updated.current_replicas = replicas;
        self.repo.put_application_spec(updated).await
    }
}
