use std::{process::ExitCode, sync::Arc};

use tokio_util::sync::CancellationToken;

use anjani_core::{config::Config, lifecycle::LifecycleController, store::JsonFileStore};
use anjani_telegram::TelegramClientBuilder;

mod plugins;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = anjani_core::logging::init("anjani") {
        eprintln!("{e}");
    }

    let cfg = Arc::new(Config::load());
    let redactor = cfg.redactor();
    let store = Arc::new(JsonFileStore::new(cfg.data_dir()));

    let mut bot = LifecycleController::new(
        cfg,
        Arc::new(TelegramClientBuilder),
        store,
        plugins::builtin(),
    );

    // Only observed while starting; once idling, the client watches Ctrl-C itself.
    let interrupt = CancellationToken::new();
    let trigger = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    match bot.run(interrupt).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("bot failed: {}", redactor.redact(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}
