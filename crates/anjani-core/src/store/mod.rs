//! Document store port plus the bundled implementations.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Port over the persistent data store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Open (or create) the named database.
    async fn connect(&self, database: &str) -> Result<()>;

    /// Stream every document of `collection` through `on_document`, in store order.
    ///
    /// An error returned by the callback stops the scan and is propagated.
    async fn scan(
        &self,
        collection: &str,
        on_document: &mut (dyn FnMut(Value) -> Result<()> + Send),
    ) -> Result<()>;

    async fn insert(&self, collection: &str, document: Value) -> Result<()>;
}
