//! In-memory backend for the seed document engine.
//!
//! Provides concrete implementations of every pluggable seam: records as
//! domain objects, a snapshot-capable object store, factories, capability
//! providers, and a transaction scope that reverts the store and registry.
//! Used by integration tests and the CLI harness; nothing here is durable.

pub mod backend;
pub mod factory;
pub mod provider;
pub mod record;
pub mod store;
pub mod transaction;

pub use backend::{backend, Backend};
pub use factory::RecordFactory;
pub use provider::HelperProvider;
pub use record::Record;
pub use store::RecordStore;
pub use transaction::SnapshotTransaction;
