//! Associations
//!
//! An association is the ordered collection of active entities of one
//! kind under one aggregate root, addressable by natural key during
//! matching. Natural keys are unique within an association at a given
//! instant; the matcher treats a duplicate as a fatal invariant
//! violation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::PersistedEntity;

/// Active entities of one collection under one aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    /// Owning aggregate root.
    pub root_id: Uuid,

    /// Collection name (e.g. "servers").
    pub name: String,

    entities: Vec<PersistedEntity>,
}

impl Association {
    /// Create an empty association.
    pub fn new(root_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            root_id,
            name: name.into(),
            entities: Vec::new(),
        }
    }

    /// Create an association from already-loaded entities.
    pub fn with_entities(
        root_id: Uuid,
        name: impl Into<String>,
        entities: Vec<PersistedEntity>,
    ) -> Self {
        Self {
            root_id,
            name: name.into(),
            entities,
        }
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the association is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over entities in persistence order.
    pub fn iter(&self) -> impl Iterator<Item = &PersistedEntity> {
        self.entities.iter()
    }

    /// Entities as a slice.
    pub fn entities(&self) -> &[PersistedEntity] {
        &self.entities
    }

    /// Find an entity by the value of a single field.
    ///
    /// Used as the fallback resolution path when a relationship
    /// placeholder references a parent that was not part of this pass's
    /// creates.
    pub fn find_by_field(&self, field: &str, value: &str) -> Option<&PersistedEntity> {
        self.entities
            .iter()
            .find(|e| e.fields.get_str(field) == Some(value))
    }
}
