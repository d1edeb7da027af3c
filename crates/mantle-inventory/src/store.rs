//! Persistence collaborator contract
//!
//! The reconcile engine consumes persistence through this trait; the
//! actual ORM/database lives behind it. One reconciliation call maps to
//! one transaction: `begin` → loads and bulk applies → `save_root` →
//! `commit`, or `rollback` on any failure. No partial state survives a
//! failed call.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use mantle_connector::record::FetchedRecord;

use crate::association::Association;
use crate::deletion::DeletionMode;
use crate::entity::PersistedEntity;
use crate::matcher::KeySpec;

pub mod memory;

/// Changes to apply to one association in a single bulk operation.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Natural-key declaration; the store enforces key uniqueness for
    /// creates against it.
    pub key: KeySpec,

    /// Records to persist as new entities.
    pub creates: Vec<FetchedRecord>,

    /// Field updates keyed by internal identifier.
    pub updates: Vec<(Uuid, FetchedRecord)>,

    /// Entities to delete, with their mechanics.
    pub deletes: Vec<(Uuid, DeletionMode)>,
}

impl ChangeSet {
    /// Create an empty change set for a key spec.
    pub fn new(key: KeySpec) -> Self {
        Self {
            key,
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    /// Check whether there is anything to apply.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Errors surfaced by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record failed a store-side constraint.
    #[error("validation failed in {collection} for '{natural_key}': {message}")]
    Validation {
        collection: String,
        natural_key: String,
        message: String,
    },

    /// A transaction is already open for this aggregate root.
    #[error("transaction already active for root {root_id}")]
    TransactionActive { root_id: Uuid },

    /// The operation requires an open transaction.
    #[error("no active transaction for root {root_id}")]
    NoTransaction { root_id: Uuid },

    /// The store is unreachable or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional persistence for inventory aggregates.
///
/// Implementations must serialize reconciliation at aggregate-root
/// granularity: `begin` fails with [`StoreError::TransactionActive`]
/// while another call holds the same root.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Open the exclusive transaction for an aggregate root.
    async fn begin(&self, root_id: Uuid) -> StoreResult<()>;

    /// Commit the open transaction.
    async fn commit(&self, root_id: Uuid) -> StoreResult<()>;

    /// Roll back the open transaction, discarding every change since
    /// `begin`.
    async fn rollback(&self, root_id: Uuid) -> StoreResult<()>;

    /// Load the current active entities of one collection, fresh from
    /// the store (never a cached view).
    async fn load_association(&self, root_id: Uuid, collection: &str) -> StoreResult<Association>;

    /// Apply creates, updates and deletes to one collection.
    ///
    /// Returns the newly created entities in creation order so their
    /// identifiers can be propagated to dependent collections.
    async fn bulk_apply(
        &self,
        root_id: Uuid,
        collection: &str,
        changes: ChangeSet,
    ) -> StoreResult<Vec<PersistedEntity>>;

    /// Persist the aggregate root itself, finalizing root-level
    /// counters/timestamps.
    async fn save_root(&self, root_id: Uuid) -> StoreResult<()>;
}
