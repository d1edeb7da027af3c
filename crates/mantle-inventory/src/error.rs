//! Reconciliation error types
//!
//! All errors propagate to the reconciler's caller; this engine does not
//! log-and-swallow or retry internally — retry policy belongs upstream.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors that can occur during a reconciliation call.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A record failed collaborator-side constraints. Not retried here;
    /// the offending natural key is surfaced to the caller.
    #[error("validation rejected in {collection} for '{natural_key}': {message}")]
    ValidationRejected {
        collection: String,
        natural_key: String,
        message: String,
    },

    /// Two persisted entities share a natural key within one association.
    /// Internal invariant violation — fatal, never silently resolved.
    #[error("ambiguous match in {collection}: duplicate natural key '{key}'")]
    AmbiguousMatch { collection: String, key: String },

    /// A relationship placeholder could not be resolved to any parent,
    /// newly created or pre-existing. Raised only in strict mode; the
    /// permissive default leaves the foreign key unset with a warning.
    #[error("unresolved reference in {collection}: record '{natural_key}' references unknown {placeholder} '{reference}'")]
    UnresolvedReference {
        collection: String,
        natural_key: String,
        placeholder: String,
        reference: String,
    },

    /// Another reconciliation call already holds the aggregate root.
    #[error("reconciliation already in progress for root {root_id}")]
    ConcurrentReconcile { root_id: Uuid },

    /// Persistence collaborator failure. The whole call aborts without
    /// partial commit; callers must retry the full payload.
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl ReconcileError {
    /// Map a store error into the reconciliation error taxonomy,
    /// attaching the collection being processed.
    pub(crate) fn from_store(collection: &str, err: StoreError) -> Self {
        match err {
            StoreError::Validation {
                natural_key,
                message,
                ..
            } => ReconcileError::ValidationRejected {
                collection: collection.to_string(),
                natural_key,
                message,
            },
            StoreError::TransactionActive { root_id } => {
                ReconcileError::ConcurrentReconcile { root_id }
            }
            other => ReconcileError::Persistence(other),
        }
    }
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
