use std::sync::Arc;

use serde::Deserialize;

use crate::{
    domain::UserId,
    messaging::{port::BotClient, types::SelfUser},
    state::{BotIdentity, Rank, StaffRoster},
    store::DataStore,
    Result,
};

pub const STAFF_COLLECTION: &str = "STAFF";

/// One document of the `STAFF` collection.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct StaffRecord {
    #[serde(rename = "_id")]
    pub id: i64,
    pub rank: String,
}

impl From<SelfUser> for BotIdentity {
    fn from(me: SelfUser) -> Self {
        let name = match me.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {last}", me.first_name),
            _ => me.first_name,
        };
        Self {
            identifier: me.id.0,
            username: me.username.unwrap_or_default(),
            name,
        }
    }
}

/// Loads the bot identity and the staff roster once the client is online.
pub struct IdentityLoader {
    store: Arc<dyn DataStore>,
}

impl IdentityLoader {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Query self-identity, then rebuild dev/sudo from the store keeping `owner`.
    pub async fn load_all_attribute(
        &self,
        client: &dyn BotClient,
        owner: UserId,
    ) -> Result<(BotIdentity, StaffRoster)> {
        let identity = BotIdentity::from(client.get_me().await?);
        let staff = self.load_staff(owner).await?;
        Ok((identity, staff))
    }

    /// Stream every `STAFF` record into a fresh roster. An unknown rank is fatal.
    pub async fn load_staff(&self, owner: UserId) -> Result<StaffRoster> {
        let mut staff = StaffRoster::with_owner(owner);
        self.store
            .scan(STAFF_COLLECTION, &mut |doc| {
                let record: StaffRecord = serde_json::from_value(doc)?;
                let rank = record.rank.parse::<Rank>()?;
                staff.push(rank, UserId(record.id));
                Ok(())
            })
            .await?;
        Ok(staff)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{errors::Error, lifecycle::testing::FakeClient, store::MemoryStore};

    fn loader(docs: Vec<serde_json::Value>) -> IdentityLoader {
        IdentityLoader::new(Arc::new(MemoryStore::with_collection(STAFF_COLLECTION, docs)))
    }

    #[test]
    fn name_joins_first_and_last_with_one_space() {
        let me = SelfUser {
            id: UserId(10),
            username: Some("anjani_bot".to_string()),
            first_name: "Anjani".to_string(),
            last_name: Some("Bot".to_string()),
        };
        let id = BotIdentity::from(me.clone());
        assert_eq!(id.identifier, 10);
        assert_eq!(id.username, "anjani_bot");
        assert_eq!(id.name, "Anjani Bot");

        let id = BotIdentity::from(SelfUser {
            last_name: None,
            username: None,
            ..me
        });
        assert_eq!(id.name, "Anjani");
        assert_eq!(id.username, "");
    }

    #[tokio::test]
    async fn roster_keeps_owner_and_scan_order() {
        let loader = loader(vec![
            json!({"_id": 1, "rank": "dev"}),
            json!({"_id": 2, "rank": "sudo"}),
            json!({"_id": 3, "rank": "dev"}),
        ]);
        let client = FakeClient::default();
        let (identity, staff) = loader.load_all_attribute(&client, UserId(99)).await.unwrap();

        assert_eq!(identity, BotIdentity::from(FakeClient::default_me()));
        assert_eq!(
            staff,
            StaffRoster {
                owner: UserId(99),
                dev: vec![UserId(1), UserId(3)],
                sudo: vec![UserId(2)],
            }
        );
        assert_eq!(client.calls(), vec!["get_me"]);
    }

    #[tokio::test]
    async fn duplicates_are_kept() {
        let loader = loader(vec![
            json!({"_id": 4, "rank": "sudo"}),
            json!({"_id": 4, "rank": "sudo"}),
        ]);
        let staff = loader.load_staff(UserId(0)).await.unwrap();
        assert_eq!(staff.sudo, vec![UserId(4), UserId(4)]);
    }

    #[tokio::test]
    async fn unknown_rank_is_fatal() {
        let loader = loader(vec![
            json!({"_id": 1, "rank": "dev"}),
            json!({"_id": 2, "rank": "owner"}),
        ]);
        let err = loader.load_staff(UserId(0)).await.unwrap_err();
        assert!(matches!(err, Error::UnknownRank(r) if r == "owner"));
    }

    #[tokio::test]
    async fn malformed_record_is_fatal() {
        let loader = loader(vec![json!({"rank": "dev"})]);
        assert!(matches!(
            loader.load_staff(UserId(0)).await,
            Err(Error::Json(_))
        ));
    }
}
