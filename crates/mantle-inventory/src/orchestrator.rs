//! Reconciliation orchestrator
//!
//! Drives one full reconciliation call: a single transaction over the
//! aggregate root in which each declared collection is loaded, matched,
//! link-rewritten, and bulk-applied in dependency order. Any failure
//! rolls the whole call back; the caller retries with the full payload.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use mantle_connector::payload::{RefreshPayload, RefreshTarget};
use mantle_connector::record::FetchedRecord;

use crate::association::Association;
use crate::config::ReconcileConfig;
use crate::deletion;
use crate::descriptor::CollectionDescriptor;
use crate::entity::PersistedEntity;
use crate::error::{ReconcileError, ReconcileResult};
use crate::matcher;
use crate::projector;
use crate::propagator::{self, IdMap};
use crate::store::{ChangeSet, InventoryStore, StoreError};
use crate::summary::ReconcileSummary;

/// Reconciles fetched inventory payloads into the persisted graph.
pub struct Reconciler<S: InventoryStore> {
    store: Arc<S>,
    config: ReconcileConfig,
    descriptors: Vec<CollectionDescriptor>,
}

impl<S: InventoryStore> Reconciler<S> {
    /// Create a reconciler with default configuration.
    pub fn new(store: Arc<S>, descriptors: Vec<CollectionDescriptor>) -> Self {
        Self {
            store,
            config: ReconcileConfig::default(),
            descriptors,
        }
    }

    /// Override the configuration.
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Reconcile one payload against the aggregate root.
    ///
    /// Collections absent from the payload are skipped untouched; a
    /// present-but-empty collection asserts the fetched world is empty
    /// and, under full authority, deletes everything persisted.
    pub async fn reconcile(
        &self,
        root_id: Uuid,
        payload: &RefreshPayload,
        target: &RefreshTarget,
    ) -> ReconcileResult<ReconcileSummary> {
        let started = Instant::now();
        info!(
            root_id = %root_id,
            records = payload.record_count(),
            full_authority = target.has_full_authority(),
            "reconciliation started"
        );

        self.store.begin(root_id).await.map_err(|e| match e {
            StoreError::TransactionActive { root_id } => {
                ReconcileError::ConcurrentReconcile { root_id }
            }
            other => ReconcileError::Persistence(other),
        })?;

        let mut summary = ReconcileSummary::new();
        let result = match self.run(root_id, payload, target, &mut summary).await {
            Ok(()) => self
                .store
                .save_root(root_id)
                .await
                .map_err(ReconcileError::Persistence),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.store
                    .commit(root_id)
                    .await
                    .map_err(ReconcileError::Persistence)?;
                summary.duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    root_id = %root_id,
                    touched = summary.total_touched(),
                    duration_ms = summary.duration_ms,
                    "reconciliation committed"
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback(root_id).await {
                    warn!(
                        root_id = %root_id,
                        error = %rollback_err,
                        "rollback failed after reconciliation error"
                    );
                }
                warn!(root_id = %root_id, error = %err, "reconciliation rolled back");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        root_id: Uuid,
        payload: &RefreshPayload,
        target: &RefreshTarget,
        summary: &mut ReconcileSummary,
    ) -> ReconcileResult<()> {
        // Per-call context for child collections: the identifiers
        // captured for each parent's creates plus the parent association
        // as it stood before this call modified it.
        let mut processed: HashMap<String, (IdMap, Association)> = HashMap::new();

        for desc in &self.descriptors {
            let Some(fetched) = payload.collection(&desc.name) else {
                debug!(root_id = %root_id, collection = %desc.name, "absent from payload, skipped");
                summary.record_skipped(&desc.name);
                continue;
            };

            let association = self
                .store
                .load_association(root_id, &desc.name)
                .await
                .map_err(|e| ReconcileError::from_store(&desc.name, e))?;

            let mut records: Vec<FetchedRecord> = fetched.to_vec();

            if let Some(link) = &desc.link {
                let report = if let Some((ids, parent)) = processed.get(&link.parent) {
                    propagator::rewrite(&mut records, link, ids, parent, &desc.key)
                } else {
                    // Parent was not in this payload; resolve against the
                    // persisted parents directly.
                    let parent = self
                        .store
                        .load_association(root_id, &link.parent)
                        .await
                        .map_err(|e| ReconcileError::from_store(&link.parent, e))?;
                    propagator::rewrite(&mut records, link, &IdMap::new(), &parent, &desc.key)
                };

                for unresolved in &report.unresolved {
                    warn!(
                        root_id = %root_id,
                        collection = %desc.name,
                        record = %unresolved.record_key,
                        reference = %unresolved.reference,
                        "parent reference unresolved, foreign key left unset"
                    );
                }
                summary.stats_mut(&desc.name).unresolved_links += report.unresolved.len() as u32;

                if self.config.strict_references {
                    if let Some(first) = report.unresolved.into_iter().next() {
                        return Err(ReconcileError::UnresolvedReference {
                            collection: desc.name.clone(),
                            natural_key: first.record_key,
                            placeholder: link.placeholder.clone(),
                            reference: first.reference,
                        });
                    }
                }
            }

            let outcome = matcher::match_records(&association, &records, &desc.key)?;
            let action = deletion::resolve(target, outcome.unmatched);
            let delete_ids = action.ids();

            if self.config.deletion_warning_threshold > 0
                && delete_ids.len() >= self.config.deletion_warning_threshold
            {
                warn!(
                    root_id = %root_id,
                    collection = %desc.name,
                    deletes = delete_ids.len(),
                    "deletion count exceeds warning threshold"
                );
            }

            let projected_creates: Vec<FetchedRecord> = outcome
                .creates
                .iter()
                .map(|r| projector::project(r, &desc.reserved))
                .collect();

            let mut changes = ChangeSet::new(desc.key.clone());
            changes.creates = projected_creates.clone();
            for (entity, record) in &outcome.updates {
                changes
                    .updates
                    .push((entity.id, projector::project(record, &desc.reserved)));
            }
            for id in &delete_ids {
                changes.deletes.push((*id, desc.deletion));
            }

            let created = self
                .store
                .bulk_apply(root_id, &desc.name, changes)
                .await
                .map_err(|e| ReconcileError::from_store(&desc.name, e))?;

            let mut ids = IdMap::new();
            let pairs: Vec<(&FetchedRecord, &PersistedEntity)> =
                projected_creates.iter().zip(created.iter()).collect();
            ids.capture(&pairs, &desc.key);

            let stats = summary.stats_mut(&desc.name);
            stats.created += created.len() as u32;
            stats.updated += outcome.updates.len() as u32;
            match desc.deletion {
                crate::deletion::DeletionMode::Disconnect => {
                    stats.disconnected += delete_ids.len() as u32
                }
                crate::deletion::DeletionMode::Purge => stats.purged += delete_ids.len() as u32,
            }

            info!(
                root_id = %root_id,
                collection = %desc.name,
                created = created.len(),
                updated = outcome.updates.len(),
                deleted = delete_ids.len(),
                "collection reconciled"
            );

            processed.insert(desc.name.clone(), (ids, association));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::middleware_collections;
    use crate::store::memory::MemoryStore;
    use mantle_connector::record::FieldSet;

    fn reconciler(store: Arc<MemoryStore>) -> Reconciler<MemoryStore> {
        Reconciler::new(store, middleware_collections())
    }

    #[tokio::test]
    async fn test_empty_payload_skips_every_collection() {
        let store = Arc::new(MemoryStore::new());
        let engine = reconciler(store.clone());
        let root = Uuid::new_v4();

        let summary = engine
            .reconcile(root, &RefreshPayload::new(), &RefreshTarget::ManagementSystem)
            .await
            .unwrap();

        assert_eq!(summary.total_touched(), 0);
        assert_eq!(
            summary.skipped,
            vec!["servers".to_string(), "deployments".to_string()]
        );
    }

    #[tokio::test]
    async fn test_creates_and_saves_root() {
        let store = Arc::new(MemoryStore::new());
        let engine = reconciler(store.clone());
        let root = Uuid::new_v4();

        let payload = RefreshPayload::new()
            .with("servers", vec![FieldSet::new().with("ems_ref", "s1")]);
        let summary = engine
            .reconcile(root, &payload, &RefreshTarget::ManagementSystem)
            .await
            .unwrap();

        assert_eq!(summary.stats("servers").created, 1);
        assert_eq!(store.active_entities(root, "servers").await.len(), 1);
        assert_eq!(store.root_saved_count(root).await, 1);
    }

    #[tokio::test]
    async fn test_transaction_released_after_success() {
        let store = Arc::new(MemoryStore::new());
        let engine = reconciler(store.clone());
        let root = Uuid::new_v4();

        engine
            .reconcile(root, &RefreshPayload::new(), &RefreshTarget::ManagementSystem)
            .await
            .unwrap();

        // A second call can begin its own transaction.
        engine
            .reconcile(root, &RefreshPayload::new(), &RefreshTarget::ManagementSystem)
            .await
            .unwrap();
    }
}
