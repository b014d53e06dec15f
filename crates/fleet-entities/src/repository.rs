//! Narrow collaborator interfaces consumed by the core (spec §6:
//! "Collaborator interfaces consumed by the core"). The relational schema
//! and its DAOs are explicitly out of scope (spec §1); these traits pin down
//! only the shape the core needs, so production code can wire them to
//! whatever store it likes (Postgres, etc.) without the core crates knowing.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::*;

/// Per-entity CRUD + list filters for the cluster aggregate.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn get_cluster(&self, id: EntityId) -> Result<Option<Cluster>>;
    async fn get_cluster_by_name(&self, name: &str) -> Result<Option<Cluster>>;
    async fn list_clusters(&self) -> Result<Vec<Cluster>>;
    async fn put_cluster(&self, cluster: Cluster) -> Result<()>;
    async fn delete_cluster(&self, id: EntityId) -> Result<()>;

    async fn get_cluster_state(&self, cluster_id: EntityId) -> Result<Option<ClusterState>>;
    async fn put_cluster_state(&self, state: ClusterState) -> Result<()>;

    async fn put_cluster_resource(&self, resource: ClusterResource) -> Result<()>;
    async fn latest_cluster_resource(&self, cluster_id: EntityId) -> Result<Option<ClusterResource>>;

    async fn upsert_node(&self, node: Node) -> Result<()>;
    async fn delete_node(&self, cluster_id: EntityId, name: &str) -> Result<()>;
    async fn list_nodes(&self, cluster_id: EntityId) -> Result<Vec<Node>>;

    async fn upsert_event(&self, event: Event) -> Result<()>;

    async fn put_autoscaling_policy(&self, policy: AutoscalingPolicy) -> Result<()>;
    async fn put_security_policy(&self, policy: SecurityPolicy) -> Result<()>;
}

/// CRUD for the tenant/environment/application hierarchy and its quota rows.
#[async_trait]
pub trait HierarchyRepository: Send + Sync {
    async fn get_tenant(&self, id: EntityId) -> Result<Option<Tenant>>;
    async fn get_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>>;
    async fn list_tenants(&self) -> Result<Vec<Tenant>>;
    async fn put_tenant(&self, tenant: Tenant) -> Result<()>;
    async fn delete_tenant(&self, id: EntityId) -> Result<()>;

    async fn get_environment(&self, id: EntityId) -> Result<Option<Environment>>;
    async fn get_environment_by_namespace(
        &self,
        cluster_id: EntityId,
        namespace: &str,
    ) -> Result<Option<Environment>>;
    async fn list_environments_by_tenant(&self, tenant_id: EntityId) -> Result<Vec<Environment>>;
    async fn list_environments(&self) -> Result<Vec<Environment>>;
    async fn put_environment(&self, environment: Environment) -> Result<()>;
    async fn delete_environment(&self, id: EntityId) -> Result<()>;

    async fn get_application(&self, id: EntityId) -> Result<Option<Application>>;
    async fn get_application_by_name(
        &self,
        environment_id: EntityId,
        name: &str,
    ) -> Result<Option<Application>>;
    async fn list_applications_by_environment(&self, environment_id: EntityId) -> Result<Vec<Application>>;
    async fn list_applications(&self) -> Result<Vec<Application>>;
    async fn put_application(&self, application: Application) -> Result<()>;
    async fn delete_application(&self, id: EntityId) -> Result<()>;

    async fn get_tenant_quota(&self, tenant_id: EntityId) -> Result<Option<TenantQuota>>;
    async fn put_tenant_quota(&self, quota: TenantQuota) -> Result<()>;
    async fn delete_tenant_quota(&self, tenant_id: EntityId) -> Result<()>;

    async fn get_resource_quota(&self, environment_id: EntityId) -> Result<Option<ResourceQuota>>;
    async fn put_resource_quota(&self, quota: ResourceQuota) -> Result<()>;
    async fn delete_resource_quota(&self, environment_id: EntityId) -> Result<()>;

    async fn get_application_spec(&self, application_id: EntityId) -> Result<Option<ApplicationResourceSpec>>;
    async fn put_application_spec(&self, spec: ApplicationResourceSpec) -> Result<()>;
    async fn delete_application_spec(&self, application_id: EntityId) -> Result<()>;
}

/// CRUD for backups, schedules and restore bookkeeping.
#[async_trait]
pub trait BackupRepository: Send + Sync {
    async fn get_backup(&self, id: EntityId) -> Result<Option<ClusterBackup>>;
    async fn list_backups_by_cluster(&self, cluster_id: EntityId) -> Result<Vec<ClusterBackup>>;
    async fn put_backup(&self, backup: ClusterBackup) -> Result<()>;

    async fn get_enabled_schedule(&self, cluster_id: EntityId) -> Result<Option<BackupSchedule>>;
    async fn put_schedule(&self, schedule: BackupSchedule) -> Result<()>;
}

/// CRUD for import records.
#[async_trait]
pub trait ImportRepository: Send + Sync {
    async fn put_import_record(&self, record: ImportRecord) -> Result<()>;
    async fn get_import_record(&self, id: EntityId) -> Result<Option<ImportRecord>>;
}

/// CRUD for create-job tasks and the machine inventory they validate
/// against.
#[async_trait]
pub trait InstallerRepository: Send + Sync {
    async fn put_create_task(&self, task: CreateTask) -> Result<()>;
    async fn get_create_task(&self, id: EntityId) -> Result<Option<CreateTask>>;
    async fn append_create_task_log(&self, id: EntityId, line: String) -> Result<()>;

    async fn get_machine(&self, id: EntityId) -> Result<Option<Machine>>;
    async fn list_machines(&self, ids: &[EntityId]) -> Result<Vec<Machine>>;
}

/// CRUD for constraint-violation rows.
#[async_trait]
pub trait ViolationRepository: Send + Sync {
    async fn put_violation(&self, violation: ConstraintViolation) -> Result<()>;
    async fn list_unresolved_violations(&self) -> Result<Vec<ConstraintViolation>>;
}

/// Transactional `run(tx -> result)` primitive (spec §6). `Tx` is opaque to
/// the core: it is whatever handle the concrete repository implementation
/// needs threaded through a transaction, and the core only ever receives it
/// back through the repository trait methods called inside the closure.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Tx: Send;

    /// Runs `f` inside one transaction. If `f` returns `Err`, the whole
    /// transaction rolls back (spec §4.G "Transactional creators": "A
    /// failure anywhere rolls back the entire tree").
    async fn run_in_transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Self::Tx) -> Fut + Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
        T: Send;
}

/// Fire-and-forget audit sink (spec §6).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(
        &self,
        event_type: &str,
        resource: &str,
        resource_id: EntityId,
        actor: &str,
        old: Option<serde_json::Value>,
        new: Option<serde_json::Value>,
    );
}

/// Alert sink (spec §6).
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, severity: &str, message: &str, details: serde_json::Value);
}
