use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{errors::Error, store::DataStore, Result};

/// File-backed store: one JSON array per collection at `<root>/<database>/<collection>.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    db_dir: Mutex<Option<PathBuf>>,
    // Held across read-modify-write so concurrent inserts never drop documents.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            db_dir: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    async fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        if collection.is_empty()
            || collection.contains(['/', '\\'])
            || collection.starts_with('.')
        {
            return Err(Error::Store(format!("invalid collection name: {collection:?}")));
        }
        let guard = self.db_dir.lock().await;
        let dir = guard
            .as_ref()
            .ok_or_else(|| Error::Store("store is not connected".to_string()))?;
        Ok(dir.join(format!("{collection}.json")))
    }
}

async fn read_collection(path: &Path) -> Result<Vec<Value>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replace `path` atomically through a uniquely named temp file in the same directory.
async fn write_collection(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::Store(format!("no parent directory for {}", path.display())))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Store(format!("collection write task failed: {e}")))?
}

#[async_trait]
impl DataStore for JsonFileStore {
    async fn connect(&self, database: &str) -> Result<()> {
        if database.is_empty() || database.contains(['/', '\\']) {
            return Err(Error::Store(format!("invalid database name: {database:?}")));
        }
        let dir = self.root.join(database);
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!("data store at {}", dir.display());
        *self.db_dir.lock().await = Some(dir);
        Ok(())
    }

    async fn scan(
        &self,
        collection: &str,
        on_document: &mut (dyn FnMut(Value) -> Result<()> + Send),
    ) -> Result<()> {
        let path = self.collection_path(collection).await?;
        for doc in read_collection(&path).await? {
            on_document(doc)?;
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<()> {
        let path = self.collection_path(collection).await?;
        let _write = self.write_lock.lock().await;
        let mut docs = read_collection(&path).await?;
        docs.push(document);

        // Write-then-rename so a crash never leaves a truncated collection.
        write_collection(path, serde_json::to_vec_pretty(&docs)?).await
    }
}
