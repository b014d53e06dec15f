//! Cluster import orchestration (spec §2 "Data flow"): "a kubeconfig is
//! validated by B, encrypted by A, persisted, then F classifies namespaces
//! and G creates hierarchy entities in one transaction."
//!
//! No single crate owns this sequencing — `fleet-client` validates,
//! `fleet-crypto` encrypts, `fleet-classify` classifies, `fleet-quota`
//! supplies the transaction primitive — so it lives here, in the binary
//! that is already responsible for wiring every engine together.

use std::sync::Arc;

use chrono::Utc;
use fleet_classify::{classify_cluster, ClassificationResult};
use fleet_client::ClusterClientPool;
use fleet_crypto::Cipher;
use fleet_entities::model::{
    Application, Cluster, Environment, EntityId, ImportRecord, ImportStatus, LabelMap, LifecycleStatus, ResourceQuota,
    QuotaStatus, Tenant, TenantType, Timestamps,
};
use fleet_entities::repository::{ClusterRepository, HierarchyRepository, ImportRepository, TransactionalStore};
use fleet_entities::{FleetError, Result};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Orchestrates "import a cluster" end to end. `R` must back every
/// collaborator the flow touches.
pub struct ImportService<R> {
    repo: Arc<R>,
    pool: Arc<ClusterClientPool>,
    cipher: Arc<Cipher>,
}

impl<R> ImportService<R>
where
    R: ClusterRepository + HierarchyRepository + ImportRepository + TransactionalStore + 'static,
{
    pub fn new(repo: Arc<R>, pool: Arc<ClusterClientPool>, cipher: Arc<Cipher>) -> Self {
        Self { repo, pool, cipher }
    }

    /// Ensures the two predefined tenants named in spec §3 ("`system` and
    /// `default` always exist") are present. Idempotent; meant to run once
    /// at startup before any import or reconciliation.
    #[instrument(skip(self))]
    pub async fn ensure_predefined_tenants(&self) -> Result<()> {
        for (name, display_name) in [
            (Tenant::SYSTEM_TENANT_NAME, "System"),
            (Tenant::DEFAULT_TENANT_NAME, "Default"),
        ] {
            if self.repo.get_tenant_by_name(name).await?.is_some() {
                continue;
            }
            let now = Utc::now();
            self.repo
                .put_tenant(Tenant {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    display_name: display_name.to_string(),
                    tenant_type: TenantType::System,
                    is_system: true,
                    status: LifecycleStatus::Active,
                    labels: LabelMap::default(),
                    timestamps: Timestamps::new_at(now),
                })
                .await?;
            info!(tenant = name, "seeded predefined tenant");
        }
        Ok(())
    }

    /// Validates, encrypts and persists `kubeconfig` as a new cluster, then
    /// classifies and upserts its namespace hierarchy, recording the whole
    /// attempt as one [`ImportRecord`] (spec §2 "Data flow", §4.F, §4.G).
    #[instrument(skip(self, kubeconfig))]
    pub async fn import_cluster(&self, name: String, kubeconfig: &[u8]) -> Result<EntityId> {
        let record_id = Uuid::new_v4();
        let mut record = ImportRecord::new(record_id, "kubeconfig".to_string());
        record.import_status = ImportStatus::Validating;

        if !ClusterClientPool::validate(kubeconfig) {
            record.import_status = ImportStatus::Failed;
            record.error_message = Some("kubeconfig failed to parse".to_string());
            self.repo.put_import_record(record).await?;
            return Err(FleetError::invalid_argument("kubeconfig failed to parse"));
        }

        if self.repo.get_cluster_by_name(&name).await?.is_some() {
            record.import_status = ImportStatus::Failed;
            record.error_message = Some(format!("cluster '{name}' already exists"));
            self.repo.put_import_record(record).await?;
            return Err(FleetError::already_exists("cluster", name));
        }

        record.import_status = ImportStatus::Importing;
        self.repo.put_import_record(record.clone()).await?;

        let result = self.do_import(&mut record, name, kubeconfig).await;
        match &result {
            Ok(cluster_id) => {
                record.cluster_id = Some(*cluster_id);
                record.import_status = ImportStatus::Completed;
                record.completed_at = Some(Utc::now());
            }
            Err(error) => {
                record.import_status = ImportStatus::Failed;
                record.error_message = Some(error.to_string());
                warn!(%error, "cluster import failed");
            }
        }
        self.repo.put_import_record(record).await?;
        result
    }

    async fn do_import(&self, record: &mut ImportRecord, name: String, kubeconfig: &[u8]) -> Result<EntityId> {
        // Fails fast if the kubeconfig has no usable cluster entry, before any state is persisted.
        ClusterClientPool::api_server_url(kubeconfig)?;
        let ciphertext = self.cipher.encrypt(kubeconfig);
        let client = self.pool.get(kubeconfig).await?;

        let cluster_id = Uuid::new_v4();
        let now = Utc::now();
        self.repo
            .put_cluster(Cluster {
                id: cluster_id,
                name,
                description: None,
                kubeconfig_ciphertext: ciphertext,
                labels: LabelMap::default(),
                environment_type: "imported".to_string(),
                region: "unknown".to_string(),
                provider: "unknown".to_string(),
                import_source: "kubeconfig".to_string(),
                created_by: "import".to_string(),
                last_backup_at: None,
                timestamps: Timestamps::new_at(now),
            })
            .await?;

        let classifications = classify_cluster(&client).await?;

        let mut tenants_touched = std::collections::BTreeSet::new();
        let mut environment_count = 0u64;
        let mut application_count = 0u64;
        let mut quota_count = 0u64;

        for classification in classifications {
            let tenant = self
                .repo
                .get_tenant_by_name(classification.tenant_name)
                .await?
                .ok_or_else(|| FleetError::not_found("tenant", classification.tenant_name.to_string()))?;
            tenants_touched.insert(tenant.id);

            let environment_id = self
                .upsert_environment(&tenant.id, cluster_id, &classification)
                .await?;
            environment_count += 1;
            if classification.resource_quota.is_some() {
                quota_count += 1;
            }

            application_count += self
                .upsert_applications(&tenant.id, environment_id, &classification)
                .await?;
        }

        record.imported_resources.insert("tenants".to_string(), tenants_touched.len() as u64);
        record.imported_resources.insert("environments".to_string(), environment_count);
        record.imported_resources.insert("applications".to_string(), application_count);
        record.imported_resources.insert("quotas".to_string(), quota_count);

        Ok(cluster_id)
    }

    async fn upsert_environment(
        &self,
        tenant_id: &EntityId,
        cluster_id: EntityId,
        classification: &ClassificationResult,
    ) -> Result<EntityId> {
        let existing = self
            .repo
            .get_environment_by_namespace(cluster_id, &classification.namespace)
            .await?;
        let now = Utc::now();
        let environment = Environment {
            id: existing.as_ref().map(|e| e.id).unwrap_or_else(Uuid::new_v4),
            tenant_id: *tenant_id,
            cluster_id,
            namespace: classification.namespace.clone(),
            display_name: classification.environment_display_name.clone(),
            labels: LabelMap::default(),
            status: LifecycleStatus::Active,
            timestamps: existing
                .as_ref()
                .map(|e| {
                    let mut t = e.timestamps;
                    t.touch(now);
                    t
                })
                .unwrap_or_else(|| Timestamps::new_at(now)),
        };
        let environment_id = environment.id;

        let repo = Arc::clone(&self.repo);
        let environment_for_txn = environment.clone();
        let quota = classification.resource_quota.as_ref().map(|draft| ResourceQuota {
            environment_id,
            hard_limits: draft.hard_limits.clone(),
            used: draft.used.clone(),
            status: QuotaStatus::Active,
            last_synced_at: Some(now),
        });
        self.repo
            .run_in_transaction(move |_tx| async move {
                repo.put_environment(environment_for_txn).await?;
                if let Some(quota) = quota {
                    repo.put_resource_quota(quota).await?;
                }
                Ok(())
            })
            .await?;

        Ok(environment_id)
    }

    async fn upsert_applications(
        &self,
        tenant_id: &EntityId,
        environment_id: EntityId,
        classification: &ClassificationResult,
    ) -> Result<u64> {
        let mut count = 0u64;
        for draft in &classification.applications {
            let existing = self
                .repo
                .get_application_by_name(environment_id, &draft.name)
                .await?;
            let now = Utc::now();
            let application = Application {
                id: existing.as_ref().map(|a| a.id).unwrap_or_else(Uuid::new_v4),
                tenant_id: *tenant_id,
                environment_id,
                name: draft.name.clone(),
                display_name: draft.name.clone(),
                labels: draft
                    .labels
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
                workload_types: draft.workload_types.clone(),
                deployment_count: draft.deployment_count,
                timestamps: existing
                    .as_ref()
                    .map(|a| {
                        let mut t = a.timestamps;
                        t.touch(now);
                        t
                    })
                    .unwrap_or_else(|| Timestamps::new_at(now)),
            };
            self.repo.put_application(application).await?;
            count += 1;
        }
        Ok(count)
    }
}
