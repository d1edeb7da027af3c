//! Identifier propagation
//!
//! After creates are committed, the newly assigned identifier of each
//! created entity is captured into a per-call [`IdMap`] so child
//! collections processed later in the same pass can reference parents by
//! foreign key instead of natural key. The map is scoped to one
//! reconciliation call — never a process-wide cache.

use std::collections::HashMap;
use uuid::Uuid;

use mantle_connector::record::FetchedRecord;

use crate::association::Association;
use crate::descriptor::LinkRule;
use crate::entity::PersistedEntity;
use crate::matcher::KeySpec;

/// Natural key → internal identifier for one collection's creates,
/// valid for the duration of a single reconciliation call.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    map: HashMap<String, Uuid>,
}

impl IdMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture identifiers for newly created records.
    ///
    /// `pairs` holds each create's source record alongside the persisted
    /// entity returned by the store, in creation order.
    pub fn capture(&mut self, pairs: &[(&FetchedRecord, &PersistedEntity)], key: &KeySpec) {
        for (record, entity) in pairs {
            if let Some(k) = key.composite_key(record) {
                self.map.insert(k, entity.id);
            }
        }
    }

    /// Look up the identifier for a natural key.
    pub fn get(&self, key: &KeySpec, natural_key: &str) -> Option<Uuid> {
        let folded = if key.case_insensitive {
            natural_key.to_lowercase()
        } else {
            natural_key.to_string()
        };
        self.map.get(&folded).copied()
    }

    /// Number of captured identifiers.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One reference that could not be resolved to any parent.
#[derive(Debug, Clone)]
pub struct UnresolvedLink {
    /// Natural key of the child record (if it has one).
    pub record_key: String,

    /// The parent natural key it referenced.
    pub reference: String,
}

/// Outcome of a rewrite pass over one child collection.
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    /// References resolved from this pass's creates.
    pub resolved: usize,

    /// References resolved by direct lookup against the already-persisted
    /// parent association.
    pub fallback_resolved: usize,

    /// References with no resolution path; the foreign key stays unset.
    pub unresolved: Vec<UnresolvedLink>,
}

/// Rewrite relationship placeholders into scalar foreign keys.
///
/// For each record whose `link.placeholder` names a parent natural key,
/// resolve the internal identifier from (1) the identifiers captured for
/// this pass's creates, then (2) a direct lookup of the persisted parent
/// association — parents that already existed are not in the capture
/// map. Resolved references write `link.fk_field`; unresolved ones are
/// reported and the foreign key is left unset.
pub fn rewrite(
    records: &mut [FetchedRecord],
    link: &LinkRule,
    created_ids: &IdMap,
    parent: &Association,
    child_key: &KeySpec,
) -> RewriteReport {
    let parent_key = KeySpec::single(link.key_field.clone());
    let mut report = RewriteReport::default();

    for record in records.iter_mut() {
        let Some(reference) = record.get_ref(&link.placeholder, &link.key_field) else {
            continue;
        };
        let reference = reference.to_string();

        if let Some(id) = created_ids.get(&parent_key, &reference) {
            record.set(link.fk_field.clone(), id.to_string());
            report.resolved += 1;
        } else if let Some(entity) = parent.find_by_field(&link.key_field, &reference) {
            record.set(link.fk_field.clone(), entity.id.to_string());
            report.fallback_resolved += 1;
        } else {
            report.unresolved.push(UnresolvedLink {
                record_key: child_key
                    .composite_key(record)
                    .unwrap_or_else(|| "?".to_string()),
                reference,
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use mantle_connector::record::FieldSet;

    fn link() -> LinkRule {
        LinkRule {
            placeholder: "middleware_server".to_string(),
            key_field: "ems_ref".to_string(),
            fk_field: "server_id".to_string(),
            parent: "servers".to_string(),
        }
    }

    #[test]
    fn test_capture_and_get() {
        let root = Uuid::new_v4();
        let record = FieldSet::new().with("ems_ref", "s1");
        let entity = PersistedEntity::new(root, "servers", record.clone());

        let mut ids = IdMap::new();
        ids.capture(&[(&record, &entity)], &KeySpec::single("ems_ref"));

        assert_eq!(ids.len(), 1);
        assert_eq!(ids.get(&KeySpec::single("ems_ref"), "s1"), Some(entity.id));
        assert_eq!(ids.get(&KeySpec::single("ems_ref"), "s2"), None);
    }

    #[test]
    fn test_rewrite_from_created_ids() {
        let root = Uuid::new_v4();
        let parent_record = FieldSet::new().with("ems_ref", "s1");
        let parent_entity = PersistedEntity::new(root, "servers", parent_record.clone());

        let mut ids = IdMap::new();
        ids.capture(&[(&parent_record, &parent_entity)], &KeySpec::single("ems_ref"));

        let mut records = vec![FieldSet::new()
            .with("ems_ref", "d1")
            .with_ref("middleware_server", "ems_ref", "s1")];

        let empty_parent = Association::new(root, "servers");
        let report = rewrite(
            &mut records,
            &link(),
            &ids,
            &empty_parent,
            &KeySpec::single("ems_ref"),
        );

        assert_eq!(report.resolved, 1);
        assert_eq!(
            records[0].get_str("server_id"),
            Some(parent_entity.id.to_string().as_str())
        );
    }

    #[test]
    fn test_rewrite_falls_back_to_persisted_parent() {
        let root = Uuid::new_v4();
        let existing = PersistedEntity::new(root, "servers", FieldSet::new().with("ems_ref", "s9"));
        let parent = Association::with_entities(root, "servers", vec![existing.clone()]);

        let mut records = vec![FieldSet::new()
            .with("ems_ref", "d1")
            .with_ref("middleware_server", "ems_ref", "s9")];

        let report = rewrite(
            &mut records,
            &link(),
            &IdMap::new(),
            &parent,
            &KeySpec::single("ems_ref"),
        );

        assert_eq!(report.fallback_resolved, 1);
        assert_eq!(
            records[0].get_str("server_id"),
            Some(existing.id.to_string().as_str())
        );
    }

    #[test]
    fn test_rewrite_reports_unresolved() {
        let root = Uuid::new_v4();
        let mut records = vec![FieldSet::new()
            .with("ems_ref", "d1")
            .with_ref("middleware_server", "ems_ref", "missing")];

        let report = rewrite(
            &mut records,
            &link(),
            &IdMap::new(),
            &Association::new(root, "servers"),
            &KeySpec::single("ems_ref"),
        );

        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].record_key, "d1");
        assert_eq!(report.unresolved[0].reference, "missing");
        assert!(!records[0].has("server_id"));
    }

    #[test]
    fn test_records_without_placeholder_are_skipped() {
        let root = Uuid::new_v4();
        let mut records = vec![FieldSet::new().with("ems_ref", "d1")];

        let report = rewrite(
            &mut records,
            &link(),
            &IdMap::new(),
            &Association::new(root, "servers"),
            &KeySpec::single("ems_ref"),
        );

        assert_eq!(report.resolved + report.fallback_resolved, 0);
        assert!(report.unresolved.is_empty());
    }
}
