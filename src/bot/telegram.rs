//! Thin wrapper over the teloxide `Bot` for the calls the relay makes.
//!
//! Failures are logged and returned as strings; callers decide whether a
//! failed send matters.

use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send an HTML message, optionally with an inline keyboard.
    pub async fn send_html(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, String> {
        let mut request = self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            request = request.reply_markup(markup);
        }

        request.await.map(|msg| msg.id).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    pub async fn edit_html(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), String> {
        let mut request = self
            .bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            request = request.reply_markup(markup);
        }

        request.await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to edit message {}: {e}", message_id.0);
            warn!("{}", msg);
            msg
        })
    }

    /// Download a Telegram file into `dest`, overwriting it. Returns bytes written.
    pub async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        let mut out = tokio::fs::File::create(dest)
            .await
            .map_err(|e| format!("Failed to open {:?}: {e}", dest))?;
        self.bot
            .download_file(&file.path, &mut out)
            .await
            .map_err(|e| format!("Failed to download file: {e}"))?;
        out.flush().await.map_err(|e| format!("Failed to flush {:?}: {e}", dest))?;

        let size = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
        info!("📥 Downloaded {} ({} bytes)", file.path, size);
        Ok(size)
    }

    /// Upload a local file as a document.
    pub async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), String> {
        debug!("📤 Sending {:?} as {} to chat {}", path, file_name, chat_id);

        let input = InputFile::file(path.to_path_buf()).file_name(file_name.to_string());
        self.bot
            .send_document(chat_id, input)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send document: {e}");
                warn!("{}", msg);
                msg
            })
    }
}
