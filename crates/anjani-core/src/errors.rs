/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so the lifecycle
/// controller can treat failures consistently (fatal vs logged-and-swallowed).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin {name} failed to register: {reason}")]
    Plugin { name: String, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("unknown staff rank: {0}")]
    UnknownRank(String),

    #[error("client is not started")]
    NotStarted,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
