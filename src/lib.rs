//! Telegram file-conversion relay.
//!
//! [`convert`] holds the format matrix and the conversion dispatcher; [`bot`]
//! is the Telegram front end that feeds it.

pub mod bot;
pub mod config;
pub mod convert;
pub mod telegram_log;
