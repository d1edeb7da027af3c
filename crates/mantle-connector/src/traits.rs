//! Provider trait
//!
//! The contract an inventory provider implements. The wire protocol used
//! to talk to the management system stays behind this trait.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::payload::{RefreshPayload, RefreshTarget};

/// A source of inventory snapshots for one management system.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Human-readable provider name for logging.
    fn display_name(&self) -> &str;

    /// Verify the provider can reach its management system.
    async fn test_connection(&self) -> ProviderResult<()>;

    /// Fetch the inventory covered by `target`.
    ///
    /// A full-authority target must return the complete current state of
    /// every collection it supplies; a scoped target may supply partial
    /// collections covering only the refreshed entities.
    async fn fetch_inventory(&self, target: &RefreshTarget) -> ProviderResult<RefreshPayload>;
}
