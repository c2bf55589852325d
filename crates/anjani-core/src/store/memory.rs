use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{store::DataStore, Result};

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    database: Mutex<Option<String>>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a collection.
    pub fn with_collection(collection: &str, documents: Vec<Value>) -> Self {
        let mut collections = HashMap::new();
        collections.insert(collection.to_string(), documents);
        Self {
            database: Mutex::new(None),
            collections: Mutex::new(collections),
        }
    }

    pub async fn database(&self) -> Option<String> {
        self.database.lock().await.clone()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn connect(&self, database: &str) -> Result<()> {
        *self.database.lock().await = Some(database.to_string());
        Ok(())
    }

    async fn scan(
        &self,
        collection: &str,
        on_document: &mut (dyn FnMut(Value) -> Result<()> + Send),
    ) -> Result<()> {
        let docs = {
            let map = self.collections.lock().await;
            map.get(collection).cloned().unwrap_or_default()
        };
        for doc in docs {
            on_document(doc)?;
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<()> {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }
}
