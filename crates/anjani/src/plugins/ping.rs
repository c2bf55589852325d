use std::sync::Arc;

use async_trait::async_trait;

use anjani_core::{
    language::DEFAULT_LANGUAGE,
    plugin::{CommandContext, CommandHandler, Plugin, Registrar},
    Result,
};

pub struct Ping;

impl Plugin for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn register(&self, registrar: &mut Registrar) -> Result<()> {
        registrar.command("ping", Arc::new(PingCommand))
    }
}

struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<Option<String>> {
        let reply = ctx
            .state
            .text(DEFAULT_LANGUAGE, "ping-reply")
            .await
            .unwrap_or_else(|| "Pong!".to_string());
        Ok(Some(reply))
    }
}
