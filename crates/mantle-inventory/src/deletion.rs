//! Deletion policy
//!
//! Decides which entities a reconciliation call may delete. Absence from
//! a full-authority batch licenses deleting everything unmatched; a
//! scoped batch deletes nothing it did not explicitly name. The policy
//! only selects entities — the mechanics (soft disconnect vs hard purge)
//! are declared per collection and executed by the persistence
//! collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mantle_connector::payload::RefreshTarget;

use crate::entity::PersistedEntity;

/// How deletion is carried out for a collection's entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionMode {
    /// Soft delete: sever the parent link, stamp `deleted_on`, keep the
    /// row for audit.
    Disconnect,

    /// Hard delete: remove the row.
    Purge,
}

/// What a reconciliation call is allowed to delete.
#[derive(Debug, Clone)]
pub enum DeleteAction {
    /// Delete every unmatched entity (full-collection authority).
    DeleteAll(Vec<PersistedEntity>),

    /// Delete nothing (partial-authority batch).
    DeleteNone,

    /// Delete exactly the named entities, independent of the match pass.
    DeleteExplicit(Vec<Uuid>),
}

impl DeleteAction {
    /// Internal identifiers this action deletes.
    pub fn ids(&self) -> Vec<Uuid> {
        match self {
            DeleteAction::DeleteAll(entities) => entities.iter().map(|e| e.id).collect(),
            DeleteAction::DeleteNone => Vec::new(),
            DeleteAction::DeleteExplicit(ids) => ids.clone(),
        }
    }
}

/// Resolve the delete action for one collection pass.
pub fn resolve(target: &RefreshTarget, unmatched: Vec<PersistedEntity>) -> DeleteAction {
    match target {
        RefreshTarget::ManagementSystem => DeleteAction::DeleteAll(unmatched),
        RefreshTarget::Scoped => DeleteAction::DeleteNone,
        RefreshTarget::ScopedWithDeletes { ids } => DeleteAction::DeleteExplicit(ids.clone()),
    }
}
