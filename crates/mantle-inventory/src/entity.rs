//! Persisted entities and their lifecycle
//!
//! A persisted entity is a durable record (server, deployment, ...) owned
//! by one aggregate root. Entities move through a two-state lifecycle:
//! `active` until a full-authority refresh stops reporting them, then
//! `disconnected` — soft-deleted, retained for audit with an immutable
//! deletion timestamp, and excluded from active queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mantle_connector::record::FieldSet;

/// Entity lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Entity is visible and linked to its parent.
    Active,

    /// Entity was soft-deleted: link to parent severed, deletion
    /// timestamp set, record retained for audit.
    Disconnected,
}

impl Lifecycle {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Disconnected => "disconnected",
        }
    }
}

impl std::str::FromStr for Lifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Lifecycle::Active),
            "disconnected" => Ok(Lifecycle::Disconnected),
            _ => Err(format!("Unknown lifecycle state: {s}")),
        }
    }
}

/// A durable inventory record owned by one aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntity {
    /// Stable internal identifier, assigned by the persistence layer.
    pub id: Uuid,

    /// Owning aggregate root (the management system).
    pub root_id: Uuid,

    /// Collection this entity belongs to (e.g. "servers").
    pub collection: String,

    /// Scalar attributes, including the natural-key fields and any
    /// foreign keys populated during reconciliation.
    pub fields: FieldSet,

    /// Lifecycle state.
    pub lifecycle: Lifecycle,

    /// When the entity was disconnected. Set exactly once; never cleared
    /// or overwritten within this subsystem.
    pub deleted_on: Option<DateTime<Utc>>,

    /// When the entity was first persisted.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl PersistedEntity {
    /// Create a new active entity from fetched fields.
    pub fn new(root_id: Uuid, collection: impl Into<String>, fields: FieldSet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            root_id,
            collection: collection.into(),
            fields,
            lifecycle: Lifecycle::Active,
            deleted_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the entity is active.
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// Apply updated fields from a fetched record.
    pub fn apply(&mut self, fields: &FieldSet) {
        self.fields.merge(fields);
        self.updated_at = Utc::now();
    }

    /// Disconnect the entity: sever it from its parent and stamp the
    /// deletion timestamp.
    ///
    /// This is the only mutation entry point for the soft-delete
    /// transition. Disconnecting an already-disconnected entity is a
    /// no-op; the timestamp never changes once set.
    pub fn disconnect(&mut self, now: DateTime<Utc>) {
        if self.lifecycle == Lifecycle::Disconnected {
            return;
        }
        self.lifecycle = Lifecycle::Disconnected;
        self.deleted_on = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> PersistedEntity {
        PersistedEntity::new(
            Uuid::new_v4(),
            "servers",
            FieldSet::new().with("ems_ref", "s1").with("name", "Server1"),
        )
    }

    #[test]
    fn test_lifecycle_roundtrip() {
        for state in [Lifecycle::Active, Lifecycle::Disconnected] {
            let parsed: Lifecycle = state.as_str().parse().unwrap();
            assert_eq!(state, parsed);
        }
    }

    #[test]
    fn test_new_entity_is_active() {
        let e = entity();
        assert!(e.is_active());
        assert!(e.deleted_on.is_none());
        assert_eq!(e.fields.get_str("ems_ref"), Some("s1"));
    }

    #[test]
    fn test_disconnect_sets_timestamp_once() {
        let mut e = entity();
        let first = Utc::now();
        e.disconnect(first);

        assert!(!e.is_active());
        assert_eq!(e.deleted_on, Some(first));

        // A second disconnect must not move the timestamp.
        let later = first + chrono::Duration::seconds(60);
        e.disconnect(later);
        assert_eq!(e.deleted_on, Some(first));
    }

    #[test]
    fn test_apply_merges_fields() {
        let mut e = entity();
        e.apply(&FieldSet::new().with("name", "Renamed"));

        assert_eq!(e.fields.get_str("name"), Some("Renamed"));
        assert_eq!(e.fields.get_str("ems_ref"), Some("s1"));
    }
}
