use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use crate::redact::Redactor;

pub const API_ID: &str = "API_ID";
pub const API_HASH: &str = "API_HASH";
pub const BOT_TOKEN: &str = "BOT_TOKEN";
pub const OWNER_ID: &str = "OWNER_ID";
pub const LOG_CHANNEL: &str = "LOG_CHANNEL";
pub const DB_NAME: &str = "DB_NAME";
pub const DATA_DIR: &str = "DATA_DIR";
pub const LANGUAGE_DIR: &str = "LANGUAGE_DIR";

/// Every key the bot reads. Anything else in the environment is ignored.
const KNOWN_KEYS: &[&str] = &[
    API_ID,
    API_HASH,
    BOT_TOKEN,
    OWNER_ID,
    LOG_CHANNEL,
    DB_NAME,
    DATA_DIR,
    LANGUAGE_DIR,
];

/// Immutable snapshot of the bot configuration.
///
/// Values are kept raw: callers coerce them (integer parsing, presence checks) and
/// decide locally whether a bad value is fatal.
#[derive(Clone, Debug, Default)]
pub struct Config {
    values: HashMap<&'static str, String>,
}

impl Config {
    /// Snapshot the process environment, after loading `.env` if present.
    ///
    /// Variables already set in the environment win over `.env` entries.
    pub fn load() -> Self {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = KNOWN_KEYS
            .iter()
            .filter_map(|&key| lookup(key).map(|v| (key, v)))
            .collect();
        Self { values }
    }

    /// Build a snapshot from literal pairs. Unknown keys are dropped.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map: HashMap<&str, &str> = pairs.into_iter().collect();
        Self::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    /// Raw value known under `name`, or `None` if unset.
    pub fn get_config(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn db_name(&self) -> &str {
        self.get_config(DB_NAME)
            .and_then(non_empty)
            .unwrap_or("AnjaniBot")
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.get_config(DATA_DIR).and_then(non_empty).unwrap_or("data"))
    }

    pub fn language_dir(&self) -> PathBuf {
        PathBuf::from(
            self.get_config(LANGUAGE_DIR)
                .and_then(non_empty)
                .unwrap_or("language"),
        )
    }

    /// Redactor for the transport secrets (API id, API hash, bot token).
    pub fn redactor(&self) -> Redactor {
        Redactor::new([
            self.get_config(API_ID),
            self.get_config(API_HASH),
            self.get_config(BOT_TOKEN),
        ])
    }
}

fn load_dotenv_if_present(path: &Path) {
    if !path.is_file() {
        return;
    }
    // dotenvy never overrides variables that are already set.
    if let Err(e) = dotenvy::from_path(path) {
        tracing::warn!("{}", dotenv_failure(path, &e));
    }
}

/// Parse errors carry the offending line, which may hold a secret; report position only.
fn dotenv_failure(path: &Path, e: &dotenvy::Error) -> String {
    match e {
        dotenvy::Error::LineParse(_, index) => {
            format!("failed to parse {} at byte {index}", path.display())
        }
        dotenvy::Error::Io(io) => format!("failed to read {}: {}", path.display(), io.kind()),
        _ => format!("failed to load {}", path.display()),
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
