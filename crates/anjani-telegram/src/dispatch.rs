//! Update routing: `/command` messages go to the plugin handler registered for them.

use std::sync::Arc;

use teloxide::{
    dispatching::{DefaultKey, Dispatcher},
    dptree,
    prelude::*,
    types::Message,
};

use anjani_core::{
    domain::{ChatId, UserId},
    plugin::{parse_command, CommandContext, HandlerRegistry},
    redact::Redactor,
    state::BotState,
};

pub struct DispatchContext {
    pub handlers: Arc<HandlerRegistry>,
    pub state: Arc<BotState>,
    /// Our own username, used to ignore `/cmd@other_bot`.
    pub username: Option<String>,
    pub redactor: Redactor,
}

pub(crate) fn build(
    bot: Bot,
    ctx: Arc<DispatchContext>,
) -> Dispatcher<Bot, teloxide::RequestError, DefaultKey> {
    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .default_handler(|_upd| async {})
        .build()
}

/// Turn a message into a command invocation, if it is one addressed to us.
pub fn command_context(
    text: &str,
    chat_id: i64,
    sender: Option<u64>,
    ctx: &DispatchContext,
) -> Option<CommandContext> {
    let (command, args) = parse_command(text, ctx.username.as_deref())?;
    Some(CommandContext {
        chat_id: ChatId(chat_id),
        sender: sender.map(|id| UserId(id as i64)),
        command,
        args,
        state: ctx.state.clone(),
    })
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    ctx: Arc<DispatchContext>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(cmd) = command_context(text, msg.chat.id.0, msg.from().map(|u| u.id.0), &ctx) else {
        return Ok(());
    };

    let command = cmd.command.clone();
    match ctx.handlers.dispatch(cmd).await {
        Ok(Some(reply)) => {
            bot.send_message(msg.chat.id, reply).await?;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                "command /{command} failed: {}",
                ctx.redactor.redact(&e.to_string())
            );
        }
    }
    Ok(())
}
