use std::{fmt, str::FromStr};

use tokio::sync::RwLock;

use crate::{domain::UserId, errors::Error, language::Languages};

/// The bot's own account, populated once the client is online.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub identifier: i64,
    pub username: String,
    pub name: String,
}

/// Stored staff rank. The owner is never stored; it comes from config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rank {
    Dev,
    Sudo,
}

impl FromStr for Rank {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Rank::Dev),
            "sudo" => Ok(Rank::Sudo),
            other => Err(Error::UnknownRank(other.to_string())),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rank::Dev => "dev",
            Rank::Sudo => "sudo",
        })
    }
}

/// Privileged users by role.
///
/// Lists keep store scan order and may hold duplicates if the store does.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaffRoster {
    pub owner: UserId,
    pub dev: Vec<UserId>,
    pub sudo: Vec<UserId>,
}

impl StaffRoster {
    pub fn with_owner(owner: UserId) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn push(&mut self, rank: Rank, user: UserId) {
        match rank {
            Rank::Dev => self.dev.push(user),
            Rank::Sudo => self.sudo.push(user),
        }
    }

    pub fn members(&self, rank: Rank) -> &[UserId] {
        match rank {
            Rank::Dev => &self.dev,
            Rank::Sudo => &self.sudo,
        }
    }

    /// Owner, dev or sudo.
    pub fn is_staff(&self, user: UserId) -> bool {
        (self.owner.0 != 0 && self.owner == user)
            || self.dev.contains(&user)
            || self.sudo.contains(&user)
    }
}

/// State shared with plugin handlers.
///
/// Only the lifecycle controller writes; every write happens before the client starts
/// dispatching (languages) or before the startup notification (identity, roster).
#[derive(Debug, Default)]
pub struct BotState {
    identity: RwLock<Option<BotIdentity>>,
    staff: RwLock<StaffRoster>,
    languages: RwLock<Languages>,
}

impl BotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn identity(&self) -> Option<BotIdentity> {
        self.identity.read().await.clone()
    }

    pub async fn staff(&self) -> StaffRoster {
        self.staff.read().await.clone()
    }

    pub async fn is_staff(&self, user: UserId) -> bool {
        self.staff.read().await.is_staff(user)
    }

    /// Localized text for `key`, falling back to English.
    pub async fn text(&self, lang: &str, key: &str) -> Option<String> {
        self.languages.read().await.get(lang, key).map(str::to_string)
    }

    pub async fn set_identity(&self, identity: BotIdentity) {
        *self.identity.write().await = Some(identity);
    }

    pub async fn set_staff(&self, staff: StaffRoster) {
        *self.staff.write().await = staff;
    }

    pub async fn set_languages(&self, languages: Languages) {
        *self.languages.write().await = languages;
    }
}
