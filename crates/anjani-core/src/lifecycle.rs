//! Startup/shutdown sequencing.
//!
//! `start` walks the states strictly in order; any failure leaves the controller in the
//! last state it reached and propagates to the caller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    client::ClientFactory,
    config::{Config, LOG_CHANNEL},
    domain::{ChatId, MessageRef},
    errors::Error,
    identity::IdentityLoader,
    language::Languages,
    messaging::{
        port::{BotClient, ClientBuilder},
        types::SendOptions,
    },
    plugin::{load_all_modules, Plugin},
    redact::Redactor,
    state::BotState,
    store::DataStore,
    Result,
};

pub const STARTUP_MESSAGE: &str = "Bot started successfully...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    ClientReady,
    StoreConnected,
    PluginsLoaded,
    ClientStarted,
    /// Identity and roster loaded.
    Running,
    Stopped,
}

pub struct LifecycleController {
    cfg: Arc<Config>,
    factory: ClientFactory,
    store: Arc<dyn DataStore>,
    identity: IdentityLoader,
    plugins: Vec<Arc<dyn Plugin>>,
    redactor: Redactor,
    state: Arc<BotState>,
    client: Option<Arc<dyn BotClient>>,
    phase: LifecycleState,
}

impl LifecycleController {
    pub fn new(
        cfg: Arc<Config>,
        builder: Arc<dyn ClientBuilder>,
        store: Arc<dyn DataStore>,
        plugins: Vec<Arc<dyn Plugin>>,
    ) -> Self {
        let redactor = cfg.redactor();
        Self {
            factory: ClientFactory::new(builder),
            identity: IdentityLoader::new(store.clone()),
            cfg,
            store,
            plugins,
            redactor,
            state: Arc::new(BotState::new()),
            client: None,
            phase: LifecycleState::Uninitialized,
        }
    }

    pub fn phase(&self) -> LifecycleState {
        self.phase
    }

    pub fn state(&self) -> Arc<BotState> {
        self.state.clone()
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("Starting Bot Client...");

        let (client, staff) = self.factory.init_client(&self.cfg)?;
        let owner = staff.owner;
        self.state.set_staff(staff).await;
        self.client = Some(client.clone());
        self.phase = LifecycleState::ClientReady;

        self.store.connect(self.cfg.db_name()).await?;
        self.phase = LifecycleState::StoreConnected;

        let languages = Languages::load_dir(&self.cfg.language_dir()).await?;
        tracing::info!("loaded {} language(s)", languages.len());
        self.state.set_languages(languages).await;

        let handlers = Arc::new(load_all_modules(&self.plugins)?);
        self.phase = LifecycleState::PluginsLoaded;

        client.connect().await?;
        client.start(handlers, self.state.clone()).await?;
        self.phase = LifecycleState::ClientStarted;

        let (identity, staff) = self.identity.load_all_attribute(&*client, owner).await?;
        tracing::info!(
            "logged in as @{} ({}), {} dev(s), {} sudo(s)",
            identity.username,
            identity.identifier,
            staff.dev.len(),
            staff.sudo.len()
        );
        self.state.set_identity(identity).await;
        self.state.set_staff(staff).await;
        self.phase = LifecycleState::Running;

        self.channel_log(STARTUP_MESSAGE, SendOptions::default())
            .await?;
        Ok(())
    }

    /// Start, idle until disconnected, then stop.
    ///
    /// Cancelling `interrupt` while `start` is in flight returns early: no idle, no stop.
    /// Once idling began, `stop` always runs.
    pub async fn run(&mut self, interrupt: CancellationToken) -> Result<()> {
        let started = tokio::select! {
            res = self.start() => Some(res),
            _ = interrupt.cancelled() => None,
        };
        match started {
            Some(res) => res?,
            None => {
                tracing::warn!("Received interrupt while connecting");
                return Ok(());
            }
        }

        tracing::info!("Idling");
        let idled = self.idle().await;
        let stopped = self.stop().await;
        idled.and(stopped)
    }

    async fn idle(&self) -> Result<()> {
        let client = self.client.as_ref().ok_or(Error::NotStarted)?;
        client.idle().await
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.phase == LifecycleState::Stopped {
            return Ok(());
        }
        tracing::info!("Stopping Bot Client...");
        self.phase = LifecycleState::Stopped;
        match &self.client {
            Some(client) => client.stop().await,
            None => Ok(()),
        }
    }

    /// Send `text` to the configured log channel.
    ///
    /// Returns `Ok(None)` without sending when `LOG_CHANNEL` is absent or not an integer.
    pub async fn channel_log(&self, text: &str, opts: SendOptions) -> Result<Option<MessageRef>> {
        let Some(log_channel) = self
            .cfg
            .get_config(LOG_CHANNEL)
            .and_then(|v| v.trim().parse::<i64>().ok())
        else {
            tracing::warn!(
                "LOG_CHANNEL is not set or not valid, message '{}' not sent.",
                self.redactor.redact(text)
            );
            return Ok(None);
        };

        let client = self.client.as_ref().ok_or(Error::NotStarted)?;
        let sent = client
            .send_message(ChatId(log_channel), text, &opts)
            .await?;
        Ok(Some(sent))
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::{EventLog, FakeBuilder, FakeClient};
    use super::*;
    use crate::{
        config::{API_HASH, API_ID, BOT_TOKEN, LANGUAGE_DIR, OWNER_ID},
        domain::UserId,
        identity::STAFF_COLLECTION,
        messaging::types::{ParseMode, ReplyMarkup},
        plugin::{CommandContext, CommandHandler, Registrar},
        state::StaffRoster,
        store::MemoryStore,
    };

    struct Harness {
        client: Arc<FakeClient>,
        builder: Arc<FakeBuilder>,
        store: Arc<MemoryStore>,
        controller: LifecycleController,
        _lang_dir: tempfile::TempDir,
    }

    fn harness(extra: &[(&str, &str)], client: FakeClient, plugins: Vec<Arc<dyn Plugin>>) -> Harness {
        let lang_dir = tempfile::tempdir().unwrap();
        let lang_path = lang_dir.path().to_string_lossy().to_string();
        let mut pairs = vec![
            (API_ID, "12345"),
            (API_HASH, "0123456789abcdef"),
            (BOT_TOKEN, "111:AAA"),
            (LANGUAGE_DIR, lang_path.as_str()),
        ];
        pairs.extend_from_slice(extra);
        let cfg = Arc::new(Config::from_pairs(pairs));

        let client = Arc::new(client);
        let builder = Arc::new(FakeBuilder::with_client(client.clone()));
        let store = Arc::new(MemoryStore::with_collection(
            STAFF_COLLECTION,
            vec![
                json!({"_id": 1, "rank": "dev"}),
                json!({"_id": 2, "rank": "sudo"}),
                json!({"_id": 3, "rank": "dev"}),
            ],
        ));
        let controller = LifecycleController::new(cfg, builder.clone(), store.clone(), plugins);
        Harness {
            client,
            builder,
            store,
            controller,
            _lang_dir: lang_dir,
        }
    }

    struct Noop;

    #[async_trait::async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _ctx: CommandContext) -> Result<Option<String>> {
            Ok(None)
        }
    }

    /// Records its registration into the shared event log.
    struct LoggingPlugin {
        name: &'static str,
        log: EventLog,
        fail: bool,
    }

    impl Plugin for LoggingPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn register(&self, registrar: &mut Registrar) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("register:{}", self.name));
            if self.fail {
                return Err(Error::Plugin {
                    name: self.name.to_string(),
                    reason: "boom".to_string(),
                });
            }
            registrar.command(self.name, Arc::new(Noop))
        }
    }

    fn logging_plugin(name: &'static str, log: &EventLog, fail: bool) -> Arc<dyn Plugin> {
        Arc::new(LoggingPlugin {
            name,
            log: log.clone(),
            fail,
        })
    }

    #[tokio::test]
    async fn start_reaches_running_and_notifies_once() {
        let mut h = harness(
            &[(LOG_CHANNEL, "-100123"), (OWNER_ID, "42")],
            FakeClient::default(),
            Vec::new(),
        );
        h.controller.start().await.unwrap();

        assert_eq!(h.controller.phase(), LifecycleState::Running);
        assert_eq!(
            h.client.calls(),
            vec!["connect", "start", "get_me", "send_message"]
        );
        let sent = h.client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(-100123));
        assert_eq!(sent[0].1, STARTUP_MESSAGE);
        assert_eq!(sent[0].2, SendOptions::default());
        assert_eq!(h.store.database().await.as_deref(), Some("AnjaniBot"));

        let state = h.controller.state();
        let identity = state.identity().await.unwrap();
        assert_eq!(identity.identifier, 5000);
        assert_eq!(identity.name, "Anjani");
        assert_eq!(
            state.staff().await,
            StaffRoster {
                owner: UserId(42),
                dev: vec![UserId(1), UserId(3)],
                sudo: vec![UserId(2)],
            }
        );
    }

    #[tokio::test]
    async fn plugins_register_in_order_before_client_starts() {
        let log = EventLog::default();
        let plugins = vec![
            logging_plugin("b", &log, false),
            logging_plugin("a", &log, false),
        ];
        let mut h = harness(&[], FakeClient::with_log(log.clone()), plugins);
        h.controller.start().await.unwrap();
        assert_eq!(
            h.client.calls(),
            vec!["register:b", "register:a", "connect", "start", "get_me"]
        );
    }

    #[tokio::test]
    async fn config_error_aborts_before_any_activity() {
        // Later pairs win in `from_pairs`.
        let mut h = harness(&[(API_ID, "not-a-number")], FakeClient::default(), Vec::new());
        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(h.controller.phase(), LifecycleState::Uninitialized);
        assert!(h.builder.built().is_empty());
        assert_eq!(h.store.database().await, None);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn plugin_failure_aborts_before_client_starts() {
        let log = EventLog::default();
        let plugins = vec![
            logging_plugin("ok", &log, false),
            logging_plugin("bad", &log, true),
            logging_plugin("never", &log, false),
        ];
        let mut h = harness(&[], FakeClient::with_log(log.clone()), plugins);
        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(err, Error::Plugin { name, .. } if name == "bad"));
        assert_eq!(h.controller.phase(), LifecycleState::StoreConnected);
        assert_eq!(h.client.calls(), vec!["register:ok", "register:bad"]);
    }

    #[tokio::test]
    async fn unknown_rank_fails_start_after_client_started() {
        let mut h = harness(&[], FakeClient::default(), Vec::new());
        h.store
            .insert(STAFF_COLLECTION, json!({"_id": 9, "rank": "admin"}))
            .await
            .unwrap();
        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(err, Error::UnknownRank(r) if r == "admin"));
        assert_eq!(h.controller.phase(), LifecycleState::ClientStarted);
    }

    #[tokio::test]
    async fn languages_are_available_to_plugins_after_start() {
        let lang_dir = tempfile::tempdir().unwrap();
        std::fs::write(lang_dir.path().join("en.json"), r#"{"greet":"Hi"}"#).unwrap();
        let lang_path = lang_dir.path().to_string_lossy().to_string();
        let mut h = harness(
            &[(LANGUAGE_DIR, lang_path.as_str())],
            FakeClient::default(),
            Vec::new(),
        );
        h.controller.start().await.unwrap();
        let state = h.controller.state();
        assert_eq!(state.text("id", "greet").await.as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn run_idles_then_stops() {
        let mut h = harness(&[], FakeClient::default(), Vec::new());
        h.controller.run(CancellationToken::new()).await.unwrap();
        assert_eq!(
            h.client.calls(),
            vec!["connect", "start", "get_me", "idle", "stop"]
        );
        assert_eq!(h.controller.phase(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn run_stops_even_when_idle_fails() {
        let client = FakeClient {
            fail_idle: true,
            ..FakeClient::default()
        };
        let mut h = harness(&[], client, Vec::new());
        let err = h.controller.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::External(_)));
        assert_eq!(h.client.calls().last().map(String::as_str), Some("stop"));
        assert_eq!(h.controller.phase(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn interrupt_during_start_skips_idle_and_stop() {
        let client = FakeClient {
            hang_on_start: true,
            ..FakeClient::default()
        };
        let mut h = harness(&[], client, Vec::new());
        let interrupt = CancellationToken::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        h.controller.run(interrupt).await.unwrap();
        let calls = h.client.calls();
        assert!(!calls.iter().any(|c| c == "idle"), "{calls:?}");
        assert!(!calls.iter().any(|c| c == "stop"), "{calls:?}");
        assert_ne!(h.controller.phase(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn run_propagates_start_failure_without_stopping() {
        let mut h = harness(&[(BOT_TOKEN, "")], FakeClient::default(), Vec::new());
        let err = h.controller.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Config(m) if m == "BOT TOKEN must be a string"));
        assert_eq!(h.controller.phase(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut h = harness(&[], FakeClient::default(), Vec::new());
        h.controller.start().await.unwrap();
        h.controller.stop().await.unwrap();
        h.controller.stop().await.unwrap();
        assert_eq!(
            h.client.calls().iter().filter(|c| *c == "stop").count(),
            1
        );
    }

    #[tokio::test]
    async fn channel_log_without_valid_channel_sends_nothing() {
        for extra in [vec![], vec![(LOG_CHANNEL, "not-a-channel")]] {
            let mut h = harness(&extra, FakeClient::default(), Vec::new());
            h.controller.start().await.unwrap();
            let res = h
                .controller
                .channel_log("hello", SendOptions::default())
                .await
                .unwrap();
            assert_eq!(res, None);
            assert!(h.client.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn channel_log_passes_options_through() {
        let mut h = harness(&[(LOG_CHANNEL, "777")], FakeClient::default(), Vec::new());
        h.controller.start().await.unwrap();

        let opts = SendOptions::default()
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .disable_notification(false)
            .reply_markup(ReplyMarkup::ForceReply);
        let sent = h
            .controller
            .channel_log("<b>audit</b>", opts.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.chat_id, ChatId(777));
        assert_eq!(sent.message_id, 2);

        let all = h.client.sent();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], (ChatId(777), "<b>audit</b>".to_string(), opts));
    }

    #[tokio::test]
    async fn failed_startup_notice_fails_start_after_running() {
        let client = FakeClient {
            fail_send: true,
            ..FakeClient::default()
        };
        let mut h = harness(&[(LOG_CHANNEL, "-100123")], client, Vec::new());
        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(err, Error::External(m) if m == "chat not found"));
        assert_eq!(h.controller.phase(), LifecycleState::Running);
        assert!(h.client.sent().is_empty());
    }

    #[tokio::test]
    async fn run_skips_idle_and_stop_when_startup_notice_fails() {
        let client = FakeClient {
            fail_send: true,
            ..FakeClient::default()
        };
        let mut h = harness(&[(LOG_CHANNEL, "-100123")], client, Vec::new());
        let err = h.controller.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::External(_)));
        assert_eq!(
            h.client.calls(),
            vec!["connect", "start", "get_me", "send_message"]
        );
        assert_eq!(h.controller.phase(), LifecycleState::Running);
    }

    #[tokio::test]
    async fn channel_log_before_start_is_not_started() {
        let h = harness(&[(LOG_CHANNEL, "777")], FakeClient::default(), Vec::new());
        let err = h
            .controller
            .channel_log("early", SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotStarted));
    }

    #[test]
    fn default_send_options_leave_everything_unset() {
        let opts = SendOptions::default();
        assert_eq!(opts.parse_mode, ParseMode::Default);
        assert_eq!(opts.disable_web_page_preview, None);
        assert_eq!(opts.disable_notification, None);
        assert_eq!(opts.reply_markup, None);
    }
}
