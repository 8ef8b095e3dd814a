//! Mirrors log events into an operator chat.
//!
//! WARN and ERROR go out immediately. INFO from this crate is batched and
//! flushed every few seconds; INFO from dependencies is dropped.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BATCH: usize = 50;
/// Telegram rejects messages over 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4000;
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

enum Forward {
    Now(String),
    Batched(String),
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<Forward>,
}

impl TelegramLogLayer {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Forward>();

        tokio::spawn(async move {
            let mut batch: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(Forward::Now(text)) => send_log(&bot, chat_id, &text).await,
                            Some(Forward::Batched(text)) => {
                                batch.push(text);
                                if batch.len() >= MAX_BATCH {
                                    flush(&bot, chat_id, &mut batch).await;
                                }
                            }
                            None => {
                                flush(&bot, chat_id, &mut batch).await;
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => flush(&bot, chat_id, &mut batch).await,
                }
            }
        });

        Self { tx }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{head}...")
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    if let Err(e) = bot.send_message(chat_id, truncate(text)).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, batch: &mut Vec<String>) {
    if batch.is_empty() {
        return;
    }
    let combined = batch.join("\n");
    batch.clear();
    send_log(bot, chat_id, &combined).await;
}

/// Whether an event should be forwarded, and how.
fn classify(level: Level, target: &str, message: String) -> Option<Forward> {
    match level {
        Level::ERROR => Some(Forward::Now(format!("❌ [{target}] {message}"))),
        Level::WARN => Some(Forward::Now(format!("⚠️ [{target}] {message}"))),
        Level::INFO if target.starts_with(CRATE_TARGET) => Some(Forward::Batched(message)),
        _ => None,
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message.push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::INFO {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let Some(msg) = classify(*meta.level(), meta.target(), visitor.message) else {
            return;
        };
        if self.tx.send(msg).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}
