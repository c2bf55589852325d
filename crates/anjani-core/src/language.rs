use std::{
    collections::{BTreeMap, HashMap},
    io::ErrorKind,
    path::Path,
};

use crate::Result;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Language assets: language code → (key → text).
#[derive(Clone, Debug, Default)]
pub struct Languages {
    by_code: BTreeMap<String, HashMap<String, String>>,
}

impl Languages {
    /// Load every `*.json` file in `dir`; the file stem is the language code.
    ///
    /// A missing directory yields an empty set. A file that cannot be read or parsed as
    /// a flat string map is an error.
    pub async fn load_dir(dir: &Path) -> Result<Self> {
        let mut rd = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("language directory {} not found", dir.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut by_code = BTreeMap::new();
        while let Some(ent) = rd.next_entry().await? {
            let path = ent.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = tokio::fs::read_to_string(&path).await?;
            let strings: HashMap<String, String> = serde_json::from_str(&raw)?;
            tracing::debug!("loaded language {code} ({} strings)", strings.len());
            by_code.insert(code.to_string(), strings);
        }

        Ok(Self { by_code })
    }

    pub fn insert(&mut self, code: &str, strings: HashMap<String, String>) {
        self.by_code.insert(code.to_string(), strings);
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Text for `key` in `lang`, falling back to [`DEFAULT_LANGUAGE`].
    pub fn get(&self, lang: &str, key: &str) -> Option<&str> {
        self.by_code
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.by_code.get(DEFAULT_LANGUAGE).and_then(|m| m.get(key)))
            .map(String::as_str)
    }
}
