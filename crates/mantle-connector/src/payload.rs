//! Refresh payload and target scope
//!
//! A provider fetch produces one [`RefreshPayload`]: a mapping from
//! collection name to the records discovered for that collection. The
//! accompanying [`RefreshTarget`] states how much authority the payload
//! carries over records it does NOT mention.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::record::FetchedRecord;

/// A snapshot of fetched inventory, keyed by collection name.
///
/// A collection that is absent from the payload means "no data supplied;
/// leave the persisted collection alone". A collection present with an
/// empty sequence is a legitimate instruction that the provider reported
/// nothing, which under full authority deletes every existing entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshPayload {
    /// Fetched records per collection.
    #[serde(flatten)]
    collections: HashMap<String, Vec<FetchedRecord>>,
}

impl RefreshPayload {
    /// Create an empty payload (every collection absent).
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
        }
    }

    /// Insert a collection's records, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, records: Vec<FetchedRecord>) {
        self.collections.insert(name.into(), records);
    }

    /// Insert a collection using builder pattern.
    pub fn with(mut self, name: impl Into<String>, records: Vec<FetchedRecord>) -> Self {
        self.insert(name, records);
        self
    }

    /// Get a collection's records, or `None` if the collection was not
    /// supplied at all.
    pub fn collection(&self, name: &str) -> Option<&[FetchedRecord]> {
        self.collections.get(name).map(|v| v.as_slice())
    }

    /// Check whether the payload mentions a collection (even as empty).
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Names of all supplied collections.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(|s| s.as_str())
    }

    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(|v| v.len()).sum()
    }
}

/// Authority scope of a reconciliation call.
///
/// A refresh of the whole management system carries full authority over
/// its records; a refresh of a single target does not. Only the former
/// licenses deleting records absent from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RefreshTarget {
    /// The payload represents the complete current state of the
    /// management system; anything absent may be deleted.
    ManagementSystem,

    /// The payload covers only specific entities; absence carries no
    /// meaning and nothing is deleted.
    Scoped,

    /// Scoped refresh that additionally names entities to delete,
    /// independent of the match pass.
    ScopedWithDeletes {
        /// Internal identifiers of entities to delete.
        ids: Vec<Uuid>,
    },
}

impl RefreshTarget {
    /// Whether this target may delete entities absent from the payload.
    pub fn has_full_authority(&self) -> bool {
        matches!(self, RefreshTarget::ManagementSystem)
    }
}
