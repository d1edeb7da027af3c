//! # Mantle Connector Framework
//!
//! Provider contract and record types for mantle inventory refresh.
//!
//! A provider talks to one external management system and produces
//! [`RefreshPayload`] snapshots of its resources. The reconcile engine
//! (the `mantle-inventory` crate) consumes those snapshots; the wire
//! protocol behind each provider is not this crate's concern.

pub mod error;
pub mod payload;
pub mod record;
pub mod traits;

pub use error::{ProviderError, ProviderResult};
pub use payload::{RefreshPayload, RefreshTarget};
pub use record::{FetchedRecord, FieldSet, FieldValue};
pub use traits::InventoryProvider;
