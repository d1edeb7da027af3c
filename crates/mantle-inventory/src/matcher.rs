//! Record matching
//!
//! Partitions one fetched batch against one persisted association:
//! records with a known natural key pair up for update, unknown keys
//! become creates, and persisted entities nobody claimed are handed to
//! the deletion policy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mantle_connector::record::{FetchedRecord, FieldSet};

use crate::association::Association;
use crate::entity::PersistedEntity;
use crate::error::{ReconcileError, ReconcileResult};

/// Natural-key declaration for one collection.
///
/// The composite key is derived from one or more fields of the record.
/// Matching is case-sensitive exact equality unless the key is declared
/// case-insensitive (used for method lookup by class + scope, where the
/// source system folds case).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySpec {
    /// Fields making up the composite key, in order.
    pub fields: Vec<String>,

    /// Fold key values to lowercase before comparison.
    #[serde(default)]
    pub case_insensitive: bool,
}

impl KeySpec {
    /// Create a composite key spec.
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        }
    }

    /// Create a single-field key spec (the common `ems_ref` case).
    pub fn single(field: impl Into<String>) -> Self {
        Self::new([field.into()])
    }

    /// Declare the key case-insensitive.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Compute the composite key for a field set, or `None` if any key
    /// field is missing or non-string.
    pub fn composite_key(&self, fields: &FieldSet) -> Option<String> {
        let mut parts = Vec::with_capacity(self.fields.len());
        for name in &self.fields {
            let value = fields.get_str(name)?;
            if self.case_insensitive {
                parts.push(value.to_lowercase());
            } else {
                parts.push(value.to_string());
            }
        }
        // Unit separator keeps composite parts from colliding.
        Some(parts.join("\u{1f}"))
    }
}

/// Result of matching a fetched batch against an association.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Fetched records with no persisted counterpart.
    pub creates: Vec<FetchedRecord>,

    /// Persisted entity paired with the fetched record that claimed it.
    pub updates: Vec<(PersistedEntity, FetchedRecord)>,

    /// Persisted entities absent from the fetched batch.
    pub unmatched: Vec<PersistedEntity>,
}

/// Partition `fetched` against the association's active entities.
///
/// One pass builds a key → entity lookup; each fetched record removes its
/// match from the lookup, so at most one record claims a given entity.
/// When the fetched batch contains duplicate keys the first occurrence
/// wins the pairing and later duplicates fall through to creates, where
/// the store's uniqueness constraint rejects them — callers must dedupe
/// upstream.
///
/// Two persisted entities sharing a key is an invariant violation and
/// fails the call with [`ReconcileError::AmbiguousMatch`].
pub fn match_records(
    association: &Association,
    fetched: &[FetchedRecord],
    key: &KeySpec,
) -> ReconcileResult<MatchOutcome> {
    let mut lookup: HashMap<String, PersistedEntity> = HashMap::new();
    for entity in association.iter() {
        let Some(k) = key.composite_key(&entity.fields) else {
            continue;
        };
        if lookup.insert(k.clone(), entity.clone()).is_some() {
            return Err(ReconcileError::AmbiguousMatch {
                collection: association.name.clone(),
                key: k,
            });
        }
    }

    let mut outcome = MatchOutcome::default();
    for record in fetched {
        match key.composite_key(record).and_then(|k| lookup.remove(&k)) {
            Some(entity) => outcome.updates.push((entity, record.clone())),
            None => outcome.creates.push(record.clone()),
        }
    }

    // Leftovers were not claimed by any fetched record. Preserve the
    // association's persistence order for deterministic deletion.
    let mut unmatched: Vec<PersistedEntity> = lookup.into_values().collect();
    unmatched.sort_by_key(|e| e.created_at);
    outcome.unmatched = unmatched;

    Ok(outcome)
}
