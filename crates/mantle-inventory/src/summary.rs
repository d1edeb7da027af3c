//! Reconciliation run summary
//!
//! Per-collection counters accumulated during one reconciliation call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one collection pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Entities created.
    #[serde(default)]
    pub created: u32,
    /// Entities updated.
    #[serde(default)]
    pub updated: u32,
    /// Entities soft-deleted.
    #[serde(default)]
    pub disconnected: u32,
    /// Entities hard-deleted.
    #[serde(default)]
    pub purged: u32,
    /// Relationship placeholders left without a foreign key.
    #[serde(default)]
    pub unresolved_links: u32,
}

impl CollectionStats {
    /// Total entities touched by this pass.
    pub fn touched(&self) -> u32 {
        self.created + self.updated + self.disconnected + self.purged
    }
}

/// Summary of one reconciliation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Counters per collection name.
    #[serde(default)]
    pub collections: HashMap<String, CollectionStats>,

    /// Collections skipped because the payload did not supply them.
    #[serde(default)]
    pub skipped: Vec<String>,

    /// Total duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl ReconcileSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for a collection (zeroes if it never ran).
    pub fn stats(&self, collection: &str) -> CollectionStats {
        self.collections.get(collection).copied().unwrap_or_default()
    }

    /// Mutable counters for a collection.
    pub fn stats_mut(&mut self, collection: &str) -> &mut CollectionStats {
        self.collections.entry(collection.to_string()).or_default()
    }

    /// Record a skipped collection.
    pub fn record_skipped(&mut self, collection: &str) {
        self.skipped.push(collection.to_string());
    }

    /// Total entities touched across all collections.
    pub fn total_touched(&self) -> u32 {
        self.collections.values().map(CollectionStats::touched).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulation() {
        let mut summary = ReconcileSummary::new();
        summary.stats_mut("servers").created += 2;
        summary.stats_mut("servers").updated += 1;
        summary.stats_mut("deployments").purged += 1;
        summary.record_skipped("datasources");

        assert_eq!(summary.stats("servers").created, 2);
        assert_eq!(summary.stats("servers").touched(), 3);
        assert_eq!(summary.total_touched(), 4);
        assert_eq!(summary.stats("unknown").touched(), 0);
        assert_eq!(summary.skipped, vec!["datasources".to_string()]);
    }

    #[test]
    fn test_serialization() {
        let mut summary = ReconcileSummary::new();
        summary.stats_mut("servers").created = 1;

        let json = serde_json::to_string(&summary).unwrap();
        let parsed: ReconcileSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stats("servers").created, 1);
    }
}
