//! In-memory inventory store
//!
//! Reference implementation of [`InventoryStore`] used by tests and
//! embedded deployments. Transactions snapshot the root's state on
//! `begin` and restore it on `rollback`; disconnected entities are
//! retained for audit but excluded from loaded associations, so a
//! natural key that reappears after a disconnect becomes a new entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::association::Association;
use crate::deletion::DeletionMode;
use crate::entity::PersistedEntity;
use crate::store::{ChangeSet, InventoryStore, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct RootState {
    /// Entities per collection, in persistence order. Disconnected rows
    /// stay in place.
    collections: HashMap<String, Vec<PersistedEntity>>,
    /// Times the root itself was saved.
    saved: u64,
    /// Last root save.
    saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StoreState {
    roots: HashMap<Uuid, RootState>,
    /// Snapshot taken at `begin`, keyed by root. Presence marks an open
    /// transaction.
    snapshots: HashMap<Uuid, RootState>,
    /// Fail the next `bulk_apply` against this collection (test hook).
    fail_on_collection: Option<String>,
}

/// In-memory transactional store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bulk_apply` fail for the named collection, simulating a
    /// persistence outage partway through a reconciliation call.
    pub async fn fail_on_collection(&self, collection: Option<String>) {
        self.state.lock().await.fail_on_collection = collection;
    }

    /// All entities of a collection, including disconnected rows.
    pub async fn all_entities(&self, root_id: Uuid, collection: &str) -> Vec<PersistedEntity> {
        let state = self.state.lock().await;
        state
            .roots
            .get(&root_id)
            .and_then(|r| r.collections.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Active entities of a collection.
    pub async fn active_entities(&self, root_id: Uuid, collection: &str) -> Vec<PersistedEntity> {
        self.all_entities(root_id, collection)
            .await
            .into_iter()
            .filter(PersistedEntity::is_active)
            .collect()
    }

    /// Look up one entity by identifier.
    pub async fn entity(&self, root_id: Uuid, id: Uuid) -> Option<PersistedEntity> {
        let state = self.state.lock().await;
        state.roots.get(&root_id).and_then(|r| {
            r.collections
                .values()
                .flat_map(|v| v.iter())
                .find(|e| e.id == id)
                .cloned()
        })
    }

    /// How many times the aggregate root was saved.
    pub async fn root_saved_count(&self, root_id: Uuid) -> u64 {
        let state = self.state.lock().await;
        state.roots.get(&root_id).map(|r| r.saved).unwrap_or(0)
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    #[instrument(skip(self))]
    async fn begin(&self, root_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.snapshots.contains_key(&root_id) {
            return Err(StoreError::TransactionActive { root_id });
        }
        let snapshot = state.roots.entry(root_id).or_default().clone();
        state.snapshots.insert(root_id, snapshot);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit(&self, root_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .snapshots
            .remove(&root_id)
            .map(|_| ())
            .ok_or(StoreError::NoTransaction { root_id })
    }

    #[instrument(skip(self))]
    async fn rollback(&self, root_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let snapshot = state
            .snapshots
            .remove(&root_id)
            .ok_or(StoreError::NoTransaction { root_id })?;
        state.roots.insert(root_id, snapshot);
        Ok(())
    }

    async fn load_association(&self, root_id: Uuid, collection: &str) -> StoreResult<Association> {
        let state = self.state.lock().await;
        let entities = state
            .roots
            .get(&root_id)
            .and_then(|r| r.collections.get(collection))
            .map(|v| {
                v.iter()
                    .filter(|e| e.is_active())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(Association::with_entities(root_id, collection, entities))
    }

    #[instrument(skip(self, changes), fields(creates = changes.creates.len(), updates = changes.updates.len(), deletes = changes.deletes.len()))]
    async fn bulk_apply(
        &self,
        root_id: Uuid,
        collection: &str,
        changes: ChangeSet,
    ) -> StoreResult<Vec<PersistedEntity>> {
        let mut state = self.state.lock().await;
        if !state.snapshots.contains_key(&root_id) {
            return Err(StoreError::NoTransaction { root_id });
        }
        if state.fail_on_collection.as_deref() == Some(collection) {
            return Err(StoreError::Unavailable(format!(
                "simulated failure applying {collection}"
            )));
        }

        let root = state.roots.entry(root_id).or_default();
        let entities = root.collections.entry(collection.to_string()).or_default();
        let now = Utc::now();

        for (id, record) in &changes.updates {
            if let Some(entity) = entities.iter_mut().find(|e| e.id == *id) {
                entity.apply(record);
            }
        }

        for (id, mode) in &changes.deletes {
            match mode {
                DeletionMode::Disconnect => {
                    if let Some(entity) = entities.iter_mut().find(|e| e.id == *id) {
                        entity.disconnect(now);
                    }
                }
                DeletionMode::Purge => {
                    entities.retain(|e| e.id != *id);
                }
            }
        }

        let mut created = Vec::with_capacity(changes.creates.len());
        for record in &changes.creates {
            let natural_key = changes
                .key
                .composite_key(record)
                .unwrap_or_else(|| "?".to_string());
            let clash = entities.iter().any(|e| {
                e.is_active()
                    && changes.key.composite_key(&e.fields).as_deref() == Some(natural_key.as_str())
            });
            if clash {
                return Err(StoreError::Validation {
                    collection: collection.to_string(),
                    natural_key,
                    message: "duplicate natural key".to_string(),
                });
            }
            let entity = PersistedEntity::new(root_id, collection, record.clone());
            entities.push(entity.clone());
            created.push(entity);
        }

        Ok(created)
    }

    #[instrument(skip(self))]
    async fn save_root(&self, root_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.snapshots.contains_key(&root_id) {
            return Err(StoreError::NoTransaction { root_id });
        }
        let root = state.roots.entry(root_id).or_default();
        root.saved += 1;
        root.saved_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::KeySpec;
    use mantle_connector::record::FieldSet;

    fn change_set() -> ChangeSet {
        ChangeSet::new(KeySpec::single("ems_ref"))
    }

    #[tokio::test]
    async fn test_create_requires_transaction() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();

        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "s1"));

        let err = store.bulk_apply(root, "servers", changes).await.unwrap_err();
        assert!(matches!(err, StoreError::NoTransaction { .. }));
    }

    #[tokio::test]
    async fn test_begin_is_exclusive_per_root() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();

        store.begin(root).await.unwrap();
        let err = store.begin(root).await.unwrap_err();
        assert!(matches!(err, StoreError::TransactionActive { .. }));

        // A different root is unaffected.
        store.begin(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_creates_return_in_creation_order() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        store.begin(root).await.unwrap();

        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "s1"));
        changes.creates.push(FieldSet::new().with("ems_ref", "s2"));

        let created = store.bulk_apply(root, "servers", changes).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].fields.get_str("ems_ref"), Some("s1"));
        assert_eq!(created[1].fields.get_str("ems_ref"), Some("s2"));
    }

    #[tokio::test]
    async fn test_duplicate_natural_key_rejected() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        store.begin(root).await.unwrap();

        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "s1"));
        changes.creates.push(FieldSet::new().with("ems_ref", "s1"));

        let err = store.bulk_apply(root, "servers", changes).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Validation { natural_key, .. } if natural_key == "s1")
        );
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();

        store.begin(root).await.unwrap();
        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "s1"));
        store.bulk_apply(root, "servers", changes).await.unwrap();
        store.commit(root).await.unwrap();

        store.begin(root).await.unwrap();
        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "s2"));
        store.bulk_apply(root, "servers", changes).await.unwrap();
        store.rollback(root).await.unwrap();

        let active = store.active_entities(root, "servers").await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].fields.get_str("ems_ref"), Some("s1"));
    }

    #[tokio::test]
    async fn test_disconnected_entities_not_loaded() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();

        store.begin(root).await.unwrap();
        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "s1"));
        let created = store.bulk_apply(root, "servers", changes).await.unwrap();
        let id = created[0].id;

        let mut changes = change_set();
        changes.deletes.push((id, DeletionMode::Disconnect));
        store.bulk_apply(root, "servers", changes).await.unwrap();
        store.commit(root).await.unwrap();

        let assoc = store.load_association(root, "servers").await.unwrap();
        assert!(assoc.is_empty());

        // The row is retained for audit.
        let all = store.all_entities(root, "servers").await;
        assert_eq!(all.len(), 1);
        assert!(all[0].deleted_on.is_some());
    }

    #[tokio::test]
    async fn test_purge_removes_row() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();

        store.begin(root).await.unwrap();
        let mut changes = change_set();
        changes.creates.push(FieldSet::new().with("ems_ref", "d1"));
        let created = store.bulk_apply(root, "deployments", changes).await.unwrap();

        let mut changes = change_set();
        changes.deletes.push((created[0].id, DeletionMode::Purge));
        store.bulk_apply(root, "deployments", changes).await.unwrap();
        store.commit(root).await.unwrap();

        assert!(store.all_entities(root, "deployments").await.is_empty());
    }
}
