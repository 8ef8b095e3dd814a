//! Telegram front end: menus, sessions, uploads and conversion jobs.

pub mod handlers;
pub mod i18n;
pub mod job;
pub mod keyboard;
pub mod session;
pub mod telegram;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Config;
use crate::convert::Converter;

pub use handlers::{handle_callback, handle_message};
pub use i18n::Lang;
pub use session::{Claim, PendingFile, SessionStore};
pub use telegram::TelegramClient;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the main menu")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "change the language")]
    Language,
}

pub struct BotState {
    pub config: Config,
    pub converter: Arc<Converter>,
    pub sessions: SessionStore,
    /// Bounds conversions running at once.
    pub permits: Arc<Semaphore>,
    pub telegram: TelegramClient,
    /// Used to recognise `/command@this_bot` in groups.
    pub bot_username: String,
}

impl BotState {
    pub async fn new(config: Config, converter: Converter, bot: &Bot) -> Self {
        let bot_username = match bot.get_me().await {
            Ok(me) => {
                info!("Bot user ID: {}, username: @{}", me.id, me.username());
                me.username().to_string()
            }
            Err(e) => {
                warn!("Failed to get bot info: {e}");
                String::new()
            }
        };

        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_conversions)),
            config,
            converter: Arc::new(converter),
            sessions: SessionStore::new(),
            telegram: TelegramClient::new(bot.clone()),
            bot_username,
        }
    }
}
