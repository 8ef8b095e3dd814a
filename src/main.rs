use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use filerelay::bot::{handle_callback, handle_message, handlers, BotState};
use filerelay::config::Config;
use filerelay::convert::Converter;
use filerelay::telegram_log;

const PRUNE_EVERY: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "filerelay.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("filerelay.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file in {:?}: {e}", log_dir);
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let tg_layer = telegram_log::TelegramLogLayer::new(bot.clone(), log_chat_id);
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting filerelay...");
    info!("Loaded config from {config_path}");
    if config.allowed_users.is_empty() {
        info!("Serving all users");
    } else {
        info!("Allowed users: {:?}", config.allowed_users);
    }

    let converter = match Converter::new(config.convert_settings()) {
        Ok(converter) => converter,
        Err(e) => {
            error!("Failed to set up converter: {e}");
            std::process::exit(1);
        }
    };
    if !converter.media_tools_available() {
        warn!("ffmpeg not found at {:?}; audio and video conversions will fail", config.ffmpeg_path);
    }
    info!(
        "Up to {} concurrent conversions, {}s timeout, {} MB upload limit",
        config.max_concurrent_conversions,
        config.conversion_timeout.as_secs(),
        config.max_file_size_bytes / (1024 * 1024)
    );

    let state = Arc::new(BotState::new(config, converter, &bot).await);
    handlers::register_commands(&bot).await;
    spawn_session_pruner(Arc::clone(&state));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Drop sessions idle for over an hour.
fn spawn_session_pruner(state: Arc<BotState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_EVERY);
        loop {
            interval.tick().await;
            let removed = state.sessions.prune(Utc::now(), TimeDelta::hours(1)).await;
            if removed > 0 {
                debug!("Pruned {removed} idle session(s), {} active", state.sessions.len().await);
            }
        }
    });
}
