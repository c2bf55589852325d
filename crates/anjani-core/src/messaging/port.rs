use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    client::Credentials,
    domain::{ChatId, MessageRef},
    messaging::types::{SelfUser, SendOptions, SessionMode},
    plugin::HandlerRegistry,
    state::BotState,
    Result,
};

/// Port over the messaging-client library.
///
/// Call order is `connect` → `start` → `idle` → `stop`; `get_me` and `send_message`
/// are only valid after `start`.
#[async_trait]
pub trait BotClient: Send + Sync {
    /// Authenticate with the service. Does not receive updates yet.
    async fn connect(&self) -> Result<()>;

    /// Go online and begin dispatching updates to `handlers`.
    async fn start(&self, handlers: Arc<HandlerRegistry>, state: Arc<BotState>) -> Result<()>;

    /// Stop receiving updates and tear down the session.
    async fn stop(&self) -> Result<()>;

    /// Wait until the client disconnects or the process is asked to terminate.
    async fn idle(&self) -> Result<()>;

    async fn get_me(&self) -> Result<SelfUser>;

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageRef>;
}

/// Constructs a not-yet-connected client from validated credentials.
pub trait ClientBuilder: Send + Sync {
    fn build(&self, creds: &Credentials, session: SessionMode) -> Result<Arc<dyn BotClient>>;
}
