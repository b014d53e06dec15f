//! An in-memory repository satisfying every collaborator trait in
//! `fleet_entities::repository`.
//!
//! The spec treats the relational schema and its DAOs as an out-of-scope
//! collaborator, "specified here only by shape" (spec §6). Something has to
//! back the engines this binary wires together, though, so this module is
//! that something: a reference implementation over `HashMap`s guarded by one
//! `tokio::sync::RwLock`, suitable for running the whole fleet control plane
//! against a single process's memory (demos, integration tests) but not a
//! substitute for a real store.
//!
//! `TransactionalStore::run_in_transaction` snapshots the whole state before
//! running the closure and restores it on `Err`, which is the simplest
//! correct rollback for a single in-memory map — a real backing store would
//! use its own transaction primitive instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_entities::model::*;
use fleet_entities::repository::{
    AlertSink, BackupRepository, ClusterRepository, HierarchyRepository, ImportRepository, InstallerRepository,
    TransactionalStore, ViolationRepository,
};
use fleet_entities::Result;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
struct Inner {
    clusters: HashMap<EntityId, Cluster>,
    cluster_states: HashMap<EntityId, ClusterState>,
    cluster_resources: HashMap<EntityId, ClusterResource>,
    nodes: HashMap<(EntityId, String), Node>,
    events: Vec<Event>,
    autoscaling_policies: HashMap<EntityId, AutoscalingPolicy>,
    security_policies: HashMap<EntityId, SecurityPolicy>,

    tenants: HashMap<EntityId, Tenant>,
    environments: HashMap<EntityId, Environment>,
    applications: HashMap<EntityId, Application>,
    tenant_quotas: HashMap<EntityId, TenantQuota>,
    resource_quotas: HashMap<EntityId, ResourceQuota>,
    application_specs: HashMap<EntityId, ApplicationResourceSpec>,

    backups: HashMap<EntityId, ClusterBackup>,
    schedules: HashMap<EntityId, BackupSchedule>,

    import_records: HashMap<EntityId, ImportRecord>,

    create_tasks: HashMap<EntityId, CreateTask>,
    machines: HashMap<EntityId, Machine>,

    violations: HashMap<EntityId, ConstraintViolation>,
}

/// The in-memory reference repository. One instance is shared (behind an
/// `Arc`) across every engine this binary constructs.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a machine into the pool the installer validates against. Not
    /// part of any repository trait: this is test/demo scaffolding for a
    /// store that otherwise has no write path for its own inventory.
    pub async fn seed_machine(&self, machine: Machine) {
        self.inner.write().await.machines.insert(machine.id, machine);
    }
}

#[async_trait]
impl ClusterRepository for InMemoryStore {
    async fn get_cluster(&self, id: EntityId) -> Result<Option<Cluster>> {
        Ok(self.inner.read().await.clusters.get(&id).cloned())
    }

    async fn get_cluster_by_name(&self, name: &str) -> Result<Option<Cluster>> {
        Ok(self.inner.read().await.clusters.values().find(|c| c.name == name).cloned())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        Ok(self.inner.read().await.clusters.values().cloned().collect())
    }

    async fn put_cluster(&self, cluster: Cluster) -> Result<()> {
        self.inner.write().await.clusters.insert(cluster.id, cluster);
        Ok(())
    }

    async fn delete_cluster(&self, id: EntityId) -> Result<()> {
        self.inner.write().await.clusters.remove(&id);
        Ok(())
    }

    async fn get_cluster_state(&self, cluster_id: EntityId) -> Result<Option<ClusterState>> {
        Ok(self.inner.read().await.cluster_states.get(&cluster_id).cloned())
    }

    async fn put_cluster_state(&self, state: ClusterState) -> Result<()> {
        self.inner.write().await.cluster_states.insert(state.cluster_id, state);
        Ok(())
    }

    async fn put_cluster_resource(&self, resource: ClusterResource) -> Result<()> {
        self.inner.write().await.cluster_resources.insert(resource.cluster_id, resource);
        Ok(())
    }

    async fn latest_cluster_resource(&self, cluster_id: EntityId) -> Result<Option<ClusterResource>> {
        Ok(self.inner.read().await.cluster_resources.get(&cluster_id).cloned())
    }

    async fn upsert_node(&self, node: Node) -> Result<()> {
        self.inner.write().await.nodes.insert((node.cluster_id, node.name.clone()), node);
        Ok(())
    }

    async fn delete_node(&self, cluster_id: EntityId, name: &str) -> Result<()> {
        self.inner.write().await.nodes.remove(&(cluster_id, name.to_string()));
        Ok(())
    }

    async fn list_nodes(&self, cluster_id: EntityId) -> Result<Vec<Node>> {
        Ok(self
            .inner
            .read()
            .await
            .nodes
            .values()
            .filter(|n| n.cluster_id == cluster_id)
            .cloned()
            .collect())
    }

    async fn upsert_event(&self, event: Event) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.events.iter_mut().find(|e| {
            e.cluster_id == event.cluster_id && e.reason == event.reason && e.component == event.component
        }) {
            existing.count += 1;
            existing.last_timestamp = event.last_timestamp;
            existing.message = event.message;
        } else {
            inner.events.push(event);
        }
        Ok(())
    }

    async fn put_autoscaling_policy(&self, policy: AutoscalingPolicy) -> Result<()> {
        self.inner.write().await.autoscaling_policies.insert(policy.cluster_id, policy);
        Ok(())
    }

    async fn put_security_policy(&self, policy: SecurityPolicy) -> Result<()> {
        self.inner.write().await.security_policies.insert(policy.cluster_id, policy);
        Ok(())
    }
}

#[async_trait]
impl HierarchyRepository for InMemoryStore {
    async fn get_tenant(&self, id: EntityId) -> Result<Option<Tenant>> {
        Ok(self.inner.read().await.tenants.get(&id).cloned())
    }

    async fn get_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>> {
        Ok(self.inner.read().await.tenants.values().find(|t| t.name == name).cloned())
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        Ok(self.inner.read().await.tenants.values().cloned().collect())
    }

    async fn put_tenant(&self, tenant: Tenant) -> Result<()> {
        self.inner.write().await.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    async fn delete_tenant(&self, id: EntityId) -> Result<()> {
        self.inner.write().await.tenants.remove(&id);
        Ok(())
    }

    async fn get_environment(&self, id: EntityId) -> Result<Option<Environment>> {
        Ok(self.inner.read().await.environments.get(&id).cloned())
    }

    async fn get_environment_by_namespace(&self, cluster_id: EntityId, namespace: &str) -> Result<Option<Environment>> {
        Ok(self
            .inner
            .read()
            .await
            .environments
            .values()
            .find(|e| e.cluster_id == cluster_id && e.namespace == namespace)
            .cloned())
    }

    async fn list_environments_by_tenant(&self, tenant_id: EntityId) -> Result<Vec<Environment>> {
        Ok(self
            .inner
            .read()
            .await
            .environments
            .values()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_environments(&self) -> Result<Vec<Environment>> {
        Ok(self.inner.read().await.environments.values().cloned().collect())
    }

    async fn put_environment(&self, environment: Environment) -> Result<()> {
        self.inner.write().await.environments.insert(environment.id, environment);
        Ok(())
    }

    async fn delete_environment(&self, id: EntityId) -> Result<()> {
        self.inner.write().await.environments.remove(&id);
        Ok(())
    }

    async fn get_application(&self, id: EntityId) -> Result<Option<Application>> {
        Ok(self.inner.read().await.applications.get(&id).cloned())
    }

    async fn get_application_by_name(&self, environment_id: EntityId, name: &str) -> Result<Option<Application>> {
        Ok(self
            .inner
            .read()
            .await
            .applications
            .values()
            .find(|a| a.environment_id == environment_id && a.name == name)
            .cloned())
    }

    async fn list_applications_by_environment(&self, environment_id: EntityId) -> Result<Vec<Application>> {
        Ok(self
            .inner
            .read()
            .await
            .applications
            .values()
            .filter(|a| a.environment_id == environment_id)
            .cloned()
            .collect())
    }

    async fn list_applications(&self) -> Result<Vec<Application>> {
        Ok(self.inner.read().await.applications.values().cloned().collect())
    }

    async fn put_application(&self, application: Application) -> Result<()> {
        self.inner.write().await.applications.insert(application.id, application);
        Ok(())
    }

    async fn delete_application(&self, id: EntityId) -> Result<()> {
        self.inner.write().await.applications.remove(&id);
        Ok(())
    }

    async fn get_tenant_quota(&self, tenant_id: EntityId) -> Result<Option<TenantQuota>> {
        Ok(self.inner.read().await.tenant_quotas.get(&tenant_id).cloned())
    }

    async fn put_tenant_quota(&self, quota: TenantQuota) -> Result<()> {
        self.inner.write().await.tenant_quotas.insert(quota.tenant_id, quota);
        Ok(())
    }

    async fn delete_tenant_quota(&self, tenant_id: EntityId) -> Result<()> {
        self.inner.write().await.tenant_quotas.remove(&tenant_id);
        Ok(())
    }

    async fn get_resource_quota(&self, environment_id: EntityId) -> Result<Option<ResourceQuota>> {
        Ok(self.inner.read().await.resource_quotas.get(&environment_id).cloned())
    }

    async fn put_resource_quota(&self, quota: ResourceQuota) -> Result<()> {
        self.inner.write().await.resource_quotas.insert(quota.environment_id, quota);
        Ok(())
    }

    async fn delete_resource_quota(&self, environment_id: EntityId) -> Result<()> {
        self.inner.write().await.resource_quotas.remove(&environment_id);
        Ok(())
    }

    async fn get_application_spec(&self, application_id: EntityId) -> Result<Option<ApplicationResourceSpec>> {
        Ok(self.inner.read().await.application_specs.get(&application_id).cloned())
    }

    async fn put_application_spec(&self, spec: ApplicationResourceSpec) -> Result<()> {
        self.inner.write().await.application_specs.insert(spec.application_id, spec);
        Ok(())
    }

    async fn delete_application_spec(&self, application_id: EntityId) -> Result<()> {
        self.inner.write().await.application_specs.remove(&application_id);
        Ok(())
    }
}

#[async_trait]
impl BackupRepository for InMemoryStore {
    async fn get_backup(&self, id: EntityId) -> Result<Option<ClusterBackup>> {
        Ok(self.inner.read().await.backups.get(&id).cloned())
    }

    async fn list_backups_by_cluster(&self, cluster_id: EntityId) -> Result<Vec<ClusterBackup>> {
        Ok(self
            .inner
            .read()
            .await
            .backups
            .values()
            .filter(|b| b.cluster_id == cluster_id)
            .cloned()
            .collect())
    }

    async fn put_backup(&self, backup: ClusterBackup) -> Result<()> {
        self.inner.write().await.backups.insert(backup.id, backup);
        Ok(())
    }

    async fn get_enabled_schedule(&self, cluster_id: EntityId) -> Result<Option<BackupSchedule>> {
        Ok(self
            .inner
            .read()
            .await
            .schedules
            .values()
            .find(|s| s.cluster_id == cluster_id && s.enabled)
            .cloned())
    }

    async fn put_schedule(&self, schedule: BackupSchedule) -> Result<()> {
        self.inner.write().await.schedules.insert(schedule.id, schedule);
        Ok(())
    }
}

#[async_trait]
impl ImportRepository for InMemoryStore {
    async fn put_import_record(&self, record: ImportRecord) -> Result<()> {
        self.inner.write().await.import_records.insert(record.id, record);
        Ok(())
    }

    async fn get_import_record(&self, id: EntityId) -> Result<Option<ImportRecord>> {
        Ok(self.inner.read().await.import_records.get(&id).cloned())
    }
}

#[async_trait]
impl InstallerRepository for InMemoryStore {
    async fn put_create_task(&self, task: CreateTask) -> Result<()> {
        self.inner.write().await.create_tasks.insert(task.id, task);
        Ok(())
    }

    async fn get_create_task(&self, id: EntityId) -> Result<Option<CreateTask>> {
        Ok(self.inner.read().await.create_tasks.get(&id).cloned())
    }

    async fn append_create_task_log(&self, id: EntityId, line: String) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(task) = inner.create_tasks.get_mut(&id) {
            task.logs.push(line);
        }
        Ok(())
    }

    async fn get_machine(&self, id: EntityId) -> Result<Option<Machine>> {
        Ok(self.inner.read().await.machines.get(&id).cloned())
    }

    async fn list_machines(&self, ids: &[EntityId]) -> Result<Vec<Machine>> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.machines.get(id).cloned()).collect())
    }
}

#[async_trait]
impl ViolationRepository for InMemoryStore {
    async fn put_violation(&self, violation: ConstraintViolation) -> Result<()> {
        self.inner.write().await.violations.insert(violation.id, violation);
        Ok(())
    }

    async fn list_unresolved_violations(&self) -> Result<Vec<ConstraintViolation>> {
        Ok(self
            .inner
            .read()
            .await
            .violations
            .values()
            .filter(|v| !v.resolved)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    type Tx = ();

    async fn run_in_transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(()) -> Fut + Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
        T: Send,
    {
        let snapshot = self.inner.read().await.clone();
        match f(()).await {
            Ok(value) => Ok(value),
            Err(error) => {
                *self.inner.write().await = snapshot;
                Err(error)
            }
        }
    }
}

/// Logs every alert at `warn`/`error` instead of paging anyone (spec §6
/// names the alert sink only by shape).
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn notify(&self, severity: &str, message: &str, details: serde_json::Value) {
        match severity {
            "critical" => tracing::error!(severity, %details, "{message}"),
            _ => tracing::warn!(severity, %details, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tenant(name: &str) -> Tenant {
        Tenant {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            display_name: name.to_string(),
            tenant_type: TenantType::System,
            is_system: true,
            status: LifecycleStatus::Active,
            labels: Default::default(),
            timestamps: Timestamps::new_at(Utc::now()),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStore::new();
        let tenant = tenant("system");
        store.put_tenant(tenant.clone()).await.unwrap();
        let fetched = store.get_tenant_by_name("system").await.unwrap().unwrap();
        assert_eq!(fetched.id, tenant.id);
    }

    #[tokio::test]
    async fn transaction_rolls_back_all_writes_on_error() {
        let store = InMemoryStore::new();
        let tenant = tenant("default");
        let store_ref = &store;
        let result: Result<()> = store
            .run_in_transaction(|_tx| async move {
                store_ref.put_tenant(tenant.clone()).await?;
                Err(fleet_entities::FleetError::invalid_argument("boom"))
            })
            .await;

        assert!(result.is_err());
        assert!(store.get_tenant_by_name("default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_keeps_writes_on_success() {
        let store = InMemoryStore::new();
        let tenant = tenant("default");
        let store_ref = &store;
        store
            .run_in_transaction(|_tx| async move {
                store_ref.put_tenant(tenant.clone()).await?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(store.get_tenant_by_name("default").await.unwrap().is_some());
    }
}
