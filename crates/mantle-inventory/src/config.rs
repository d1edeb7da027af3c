//! Reconciliation configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the reconcile engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Abort a collection when a relationship placeholder cannot be
    /// resolved to any parent. The default is permissive: the foreign
    /// key is left unset with a warning, since partial-batch refreshes
    /// legitimately omit parents.
    #[serde(default = "default_strict_references")]
    pub strict_references: bool,

    /// Warn when a single collection pass deletes more than this many
    /// entities (0 disables the warning). A guard against a provider
    /// briefly reporting an empty world.
    #[serde(default = "default_deletion_warning_threshold")]
    pub deletion_warning_threshold: usize,
}

fn default_strict_references() -> bool {
    false
}

fn default_deletion_warning_threshold() -> usize {
    100
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            strict_references: default_strict_references(),
            deletion_warning_threshold: default_deletion_warning_threshold(),
        }
    }
}
