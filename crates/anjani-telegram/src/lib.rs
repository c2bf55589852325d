//! Telegram adapter (teloxide).
//!
//! This crate implements the `anjani-core` BotClient port over the Telegram Bot API.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;

use teloxide::{
    dispatching::ShutdownToken,
    prelude::*,
    types::{
        ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
        KeyboardRemove,
    },
};

use tokio::{sync::Mutex, task::JoinHandle};

pub mod dispatch;

use anjani_core::{
    client::Credentials,
    domain::{ChatId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::{BotClient, ClientBuilder},
        types::{InlineKeyboard, ParseMode, ReplyMarkup, SelfUser, SendOptions, SessionMode},
    },
    plugin::HandlerRegistry,
    redact::Redactor,
    state::BotState,
    Result,
};

/// Builds [`TelegramClient`]s from validated credentials.
#[derive(Clone, Copy, Debug, Default)]
pub struct TelegramClientBuilder;

impl ClientBuilder for TelegramClientBuilder {
    fn build(&self, creds: &Credentials, session: SessionMode) -> Result<Arc<dyn BotClient>> {
        Ok(Arc::new(TelegramClient::new(creds, session)))
    }
}

struct Running {
    shutdown: ShutdownToken,
    task: JoinHandle<()>,
}

pub struct TelegramClient {
    bot: Bot,
    session: SessionMode,
    redactor: Redactor,
    username: Mutex<Option<String>>,
    started: AtomicBool,
    running: Mutex<Option<Running>>,
}

impl TelegramClient {
    pub fn new(creds: &Credentials, session: SessionMode) -> Self {
        Self {
            bot: Bot::new(creds.bot_token.clone()),
            session,
            redactor: creds.redactor(),
            username: Mutex::new(None),
            started: AtomicBool::new(false),
            running: Mutex::new(None),
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(&self, e: teloxide::RequestError) -> Error {
        Error::External(format!(
            "telegram error: {}",
            self.redactor.redact(&e.to_string())
        ))
    }

    // `idle` holds the `running` lock for as long as it waits, so this must not take it.
    fn ensure_started(&self) -> Result<()> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }
        Ok(())
    }
}

/// Bot API parse mode; `None` sends the text as plain text.
pub(crate) fn tg_parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
    match mode {
        ParseMode::Default | ParseMode::Html => Some(teloxide::types::ParseMode::Html),
        ParseMode::Disabled => None,
        ParseMode::Markdown => Some(teloxide::types::ParseMode::MarkdownV2),
    }
}

pub(crate) fn tg_inline_keyboard(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.callback_data.clone()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub(crate) fn tg_reply_markup(markup: &ReplyMarkup) -> teloxide::types::ReplyMarkup {
    match markup {
        ReplyMarkup::InlineKeyboard(kb) => {
            teloxide::types::ReplyMarkup::InlineKeyboard(tg_inline_keyboard(kb))
        }
        ReplyMarkup::ReplyKeyboard(rows) => {
            let rows: Vec<Vec<KeyboardButton>> = rows
                .iter()
                .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect())
                .collect();
            teloxide::types::ReplyMarkup::Keyboard(KeyboardMarkup::new(rows))
        }
        ReplyMarkup::RemoveKeyboard => {
            teloxide::types::ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
        }
        ReplyMarkup::ForceReply => teloxide::types::ReplyMarkup::ForceReply(ForceReply::new()),
    }
}

#[async_trait]
impl BotClient for TelegramClient {
    async fn connect(&self) -> Result<()> {
        // The Bot API has no session to restore; `session` only matters for MTProto.
        tracing::debug!("connecting with session mode {:?}", self.session);
        let me = self.bot.get_me().await.map_err(|e| self.map_err(e))?;
        tracing::info!("authorized as @{}", me.user.username.as_deref().unwrap_or("?"));
        *self.username.lock().await = me.user.username.clone();
        Ok(())
    }

    async fn start(&self, handlers: Arc<HandlerRegistry>, state: Arc<BotState>) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(Error::External("telegram client already started".to_string()));
        }

        let ctx = Arc::new(dispatch::DispatchContext {
            handlers,
            state,
            username: self.username.lock().await.clone(),
            redactor: self.redactor.clone(),
        });
        let mut dispatcher = dispatch::build(self.bot.clone(), ctx);
        let shutdown = dispatcher.shutdown_token();
        let task = tokio::spawn(async move {
            dispatcher.dispatch().await;
        });

        *running = Some(Running { shutdown, task });
        self.started.store(true, Ordering::SeqCst);
        tracing::info!("telegram dispatcher started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::SeqCst);
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };

        match running.shutdown.shutdown() {
            Ok(done) => {
                done.await;
                running
                    .task
                    .await
                    .map_err(|e| Error::External(format!("dispatcher task failed: {e}")))?;
            }
            // Dispatcher never got to run (or already finished); nothing to drain.
            Err(_) => running.task.abort(),
        }
        tracing::info!("telegram dispatcher stopped");
        Ok(())
    }

    async fn idle(&self) -> Result<()> {
        let mut guard = self.running.lock().await;
        let Some(running) = guard.as_mut() else {
            return Err(Error::NotStarted);
        };

        let finished = tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                tracing::info!("received Ctrl-C");
                false
            }
            res = &mut running.task => {
                if let Err(e) = res {
                    tracing::warn!("dispatcher task ended abnormally: {e}");
                }
                true
            }
        };

        if finished {
            // The task is spent; `stop` must not await it again.
            *guard = None;
        }
        Ok(())
    }

    async fn get_me(&self) -> Result<SelfUser> {
        self.ensure_started()?;
        let me = self.bot.get_me().await.map_err(|e| self.map_err(e))?;
        let user = me.user;
        Ok(SelfUser {
            id: UserId(user.id.0 as i64),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageRef> {
        let mut req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
        if let Some(mode) = tg_parse_mode(opts.parse_mode) {
            req = req.parse_mode(mode);
        }
        if let Some(v) = opts.disable_web_page_preview {
            req = req.disable_web_page_preview(v);
        }
        if let Some(v) = opts.disable_notification {
            req = req.disable_notification(v);
        }
        if let Some(markup) = &opts.reply_markup {
            req = req.reply_markup(tg_reply_markup(markup));
        }

        let msg = req.await.map_err(|e| self.map_err(e))?;
        Ok(MessageRef {
            chat_id,
            message_id: msg.id.0,
        })
    }
}
