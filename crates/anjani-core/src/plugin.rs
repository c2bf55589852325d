//! Plugin registry.
//!
//! Plugins are an explicit, ordered list of [`Plugin`] values. Each one registers its
//! command handlers into a [`Registrar`]; the frozen result is a [`HandlerRegistry`]
//! handed to the client before it starts receiving updates.

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    state::BotState,
    Result,
};

/// Everything a command handler gets to see about one invocation.
#[derive(Clone, Debug)]
pub struct CommandContext {
    pub chat_id: ChatId,
    pub sender: Option<UserId>,
    pub command: String,
    pub args: String,
    pub state: Arc<BotState>,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle one command. `Some(text)` is sent back to the chat.
    async fn handle(&self, ctx: CommandContext) -> Result<Option<String>>;
}

/// A feature module.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn register(&self, registrar: &mut Registrar) -> Result<()>;
}

struct Registered {
    plugin: &'static str,
    handler: Arc<dyn CommandHandler>,
}

/// Collects command handlers while plugins register.
#[derive(Default)]
pub struct Registrar {
    current: &'static str,
    commands: BTreeMap<String, Registered>,
}

impl Registrar {
    /// Register `handler` for `/name`. Names are case-insensitive and must be unique.
    pub fn command(&mut self, name: &str, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let key = name.trim_start_matches('/').to_lowercase();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(Error::Plugin {
                name: self.current.to_string(),
                reason: format!("invalid command name {name:?}"),
            });
        }
        if let Some(existing) = self.commands.get(&key) {
            return Err(Error::Plugin {
                name: self.current.to_string(),
                reason: format!("command /{key} already registered by {}", existing.plugin),
            });
        }
        self.commands.insert(
            key,
            Registered {
                plugin: self.current,
                handler,
            },
        );
        Ok(())
    }
}

/// Frozen set of command handlers, keyed by lower-case command name.
#[derive(Default)]
pub struct HandlerRegistry {
    plugins: Vec<&'static str>,
    commands: BTreeMap<String, Registered>,
}

impl HandlerRegistry {
    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands
            .get(&command.to_lowercase())
            .map(|r| r.handler.clone())
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Plugin names in registration order.
    pub fn plugins(&self) -> &[&'static str] {
        &self.plugins
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Route `ctx` to its handler. Unknown commands are ignored.
    pub async fn dispatch(&self, ctx: CommandContext) -> Result<Option<String>> {
        let Some(handler) = self.get(&ctx.command) else {
            return Ok(None);
        };
        handler.handle(ctx).await
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("plugins", &self.plugins)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Register every plugin, in list order. The first failure aborts the whole load.
pub fn load_all_modules(plugins: &[Arc<dyn Plugin>]) -> Result<HandlerRegistry> {
    let mut registrar = Registrar::default();
    let mut names = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        registrar.current = plugin.name();
        plugin.register(&mut registrar)?;
        tracing::debug!("registered plugin {}", plugin.name());
        names.push(plugin.name());
    }
    tracing::info!("loaded {} plugin(s): {}", names.len(), names.join(", "));
    Ok(HandlerRegistry {
        plugins: names,
        commands: registrar.commands,
    })
}

/// Split `/cmd@bot args` into `("cmd", "args")`.
///
/// Commands addressed to a different bot (`/cmd@other`) yield `None`.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<(String, String)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((h, a)) => (h, a.trim()),
        None => (rest, ""),
    };
    let (name, target) = match head.split_once('@') {
        Some((n, t)) => (n, Some(t)),
        None => (head, None),
    };
    if name.is_empty() {
        return None;
    }
    if let (Some(target), Some(me)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(me) {
            return None;
        }
    }
    Some((name.to_lowercase(), args.to_string()))
}
