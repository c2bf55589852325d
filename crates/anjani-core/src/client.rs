use std::{fmt, sync::Arc};

use crate::{
    config::{Config, API_HASH, API_ID, BOT_TOKEN, OWNER_ID},
    domain::UserId,
    errors::Error,
    redact::Redactor,
    messaging::{
        port::{BotClient, ClientBuilder},
        types::SessionMode,
    },
    state::StaffRoster,
    Result,
};

/// Validated transport credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_id: i64,
    /// `API_ID` exactly as configured, so redaction matches it byte for byte.
    pub api_id_raw: String,
    pub api_hash: String,
    pub bot_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read and validate `API_ID`, `API_HASH`, `BOT_TOKEN`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_id_raw = cfg.get_config(API_ID).unwrap_or_default().to_string();
        let api_id = api_id_raw
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Config("API ID is not a valid integer".to_string()))?;

        let api_hash = required_str(cfg, API_HASH)
            .ok_or_else(|| Error::Config("API HASH must be a string".to_string()))?;

        let bot_token = required_str(cfg, BOT_TOKEN)
            .ok_or_else(|| Error::Config("BOT TOKEN must be a string".to_string()))?;

        Ok(Self {
            api_id,
            api_id_raw,
            api_hash,
            bot_token,
        })
    }

    pub fn redactor(&self) -> Redactor {
        Redactor::new([
            Some(self.api_id_raw.as_str()),
            Some(self.api_hash.as_str()),
            Some(self.bot_token.as_str()),
        ])
    }
}

fn required_str(cfg: &Config, key: &str) -> Option<String> {
    cfg.get_config(key)
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// `OWNER_ID`, or `0` when absent or not an integer.
pub fn owner_id(cfg: &Config) -> UserId {
    UserId(
        cfg.get_config(OWNER_ID)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0),
    )
}

/// Validates credentials and builds the (not yet connected) messaging client.
pub struct ClientFactory {
    builder: Arc<dyn ClientBuilder>,
}

impl ClientFactory {
    pub fn new(builder: Arc<dyn ClientBuilder>) -> Self {
        Self { builder }
    }

    /// Build an in-memory-session client and the owner-only roster.
    ///
    /// Nothing is constructed unless all transport credentials are valid.
    pub fn init_client(&self, cfg: &Config) -> Result<(Arc<dyn BotClient>, StaffRoster)> {
        let creds = Credentials::from_config(cfg)?;
        let client = self.builder.build(&creds, SessionMode::InMemory)?;
        Ok((client, StaffRoster::with_owner(owner_id(cfg))))
    }
}
