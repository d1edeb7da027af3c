//! Inventory reconciliation engine
//!
//! Reconciles fetched inventory snapshots into the persisted object
//! graph under an aggregate root: matching by natural key, projecting
//! fields, rewriting parent references into foreign keys, and applying
//! creates, updates, and deletes in one transaction. Persistence lives
//! behind the [`store::InventoryStore`] trait; providers that fetch the
//! snapshots live behind `mantle_connector::InventoryProvider`.

pub mod association;
pub mod config;
pub mod deletion;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod projector;
pub mod propagator;
pub mod store;
pub mod summary;

pub use association::Association;
pub use config::ReconcileConfig;
pub use deletion::{DeleteAction, DeletionMode};
pub use descriptor::{middleware_collections, CollectionDescriptor, LinkRule};
pub use entity::{Lifecycle, PersistedEntity};
pub use error::{ReconcileError, ReconcileResult};
pub use matcher::{KeySpec, MatchOutcome};
pub use orchestrator::Reconciler;
pub use propagator::{IdMap, RewriteReport, UnresolvedLink};
pub use store::{ChangeSet, InventoryStore, StoreError, StoreResult};
pub use summary::{CollectionStats, ReconcileSummary};
