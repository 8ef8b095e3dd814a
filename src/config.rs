use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::{ChatId, UserId};
use thiserror::Error;

use crate::convert::{ConvertSettings, ImageOptions, MediaTools};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Environment variable that overrides `telegram_bot_token`.
pub const TOKEN_ENV: &str = "BOT_TOKEN";

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
    /// Scratch directory for in-flight files. Defaults to `<data_dir>/temp`.
    temp_dir: Option<String>,
    /// Users allowed to use the bot. Empty means everyone.
    #[serde(default)]
    allowed_users: Vec<u64>,
    log_chat_id: Option<i64>,
    #[serde(default = "default_max_file_size_mb")]
    max_file_size_mb: u32,
    #[serde(default = "default_max_concurrent_conversions")]
    max_concurrent_conversions: usize,
    #[serde(default = "default_conversion_timeout_secs")]
    conversion_timeout_secs: u64,
    #[serde(default = "default_jpeg_quality")]
    jpeg_quality: u8,
    /// RGB colour transparent pixels are flattened onto for JPEG output.
    #[serde(default = "default_jpeg_background")]
    jpeg_background: [u8; 3],
    #[serde(default = "default_mp3_bitrate")]
    mp3_bitrate: String,
    ffmpeg_path: Option<String>,
    ffprobe_path: Option<String>,
}

fn default_max_file_size_mb() -> u32 {
    20
}

fn default_max_concurrent_conversions() -> usize {
    4
}

fn default_conversion_timeout_secs() -> u64 {
    300
}

fn default_jpeg_quality() -> u8 {
    95
}

fn default_jpeg_background() -> [u8; 3] {
    [255, 255, 255]
}

fn default_mp3_bitrate() -> String {
    "192k".to_string()
}

pub struct Config {
    /// Path to the config file.
    pub config_path: PathBuf,
    pub telegram_bot_token: String,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub allowed_users: HashSet<UserId>,
    pub log_chat_id: Option<ChatId>,
    pub max_file_size_bytes: u64,
    pub max_concurrent_conversions: usize,
    pub conversion_timeout: Duration,
    pub jpeg_quality: u8,
    pub jpeg_background: [u8; 3],
    pub mp3_bitrate: String,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Config {
    /// Load from a JSON file. `BOT_TOKEN` in the environment wins over the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_token(path, std::env::var(TOKEN_ENV).ok())
    }

    /// Load from a JSON file with an explicit token override.
    pub fn load_with_token<P: AsRef<Path>>(
        path: P,
        token_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let telegram_bot_token = token_override
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(file.telegram_bot_token);
        validate_token(&telegram_bot_token)?;

        if file.max_concurrent_conversions == 0 {
            return Err(ConfigError::Validation("max_concurrent_conversions must be at least 1".into()));
        }
        if file.conversion_timeout_secs == 0 {
            return Err(ConfigError::Validation("conversion_timeout_secs must be at least 1".into()));
        }
        if file.max_file_size_mb == 0 {
            return Err(ConfigError::Validation("max_file_size_mb must be at least 1".into()));
        }
        if !(1..=100).contains(&file.jpeg_quality) {
            return Err(ConfigError::Validation("jpeg_quality must be between 1 and 100".into()));
        }
        if file.mp3_bitrate.trim().is_empty() {
            return Err(ConfigError::Validation("mp3_bitrate must not be empty".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let temp_dir = file
            .temp_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("temp"));

        Ok(Self {
            config_path,
            telegram_bot_token,
            data_dir,
            temp_dir,
            allowed_users: file.allowed_users.into_iter().map(UserId).collect(),
            log_chat_id: file.log_chat_id.map(ChatId),
            max_file_size_bytes: u64::from(file.max_file_size_mb) * 1024 * 1024,
            max_concurrent_conversions: file.max_concurrent_conversions,
            conversion_timeout: Duration::from_secs(file.conversion_timeout_secs),
            jpeg_quality: file.jpeg_quality,
            jpeg_background: file.jpeg_background,
            mp3_bitrate: file.mp3_bitrate,
            ffmpeg_path: PathBuf::from(file.ffmpeg_path.unwrap_or_else(|| "ffmpeg".to_string())),
            ffprobe_path: PathBuf::from(file.ffprobe_path.unwrap_or_else(|| "ffprobe".to_string())),
        })
    }

    /// Whether the user may use the bot.
    pub fn is_allowed(&self, user_id: UserId) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }

    /// Settings for the conversion dispatcher.
    pub fn convert_settings(&self) -> ConvertSettings {
        ConvertSettings {
            temp_dir: self.temp_dir.clone(),
            image: ImageOptions {
                jpeg_background: self.jpeg_background,
                jpeg_quality: self.jpeg_quality,
            },
            media: MediaTools {
                ffmpeg: self.ffmpeg_path.clone(),
                ffprobe: self.ffprobe_path.clone(),
                mp3_bitrate: self.mp3_bitrate.clone(),
            },
        }
    }
}

fn validate_token(token: &str) -> Result<(), ConfigError> {
    if token.is_empty() {
        return Err(ConfigError::Validation(format!(
            "telegram_bot_token is required (or set {TOKEN_ENV})"
        )));
    }
    // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
    let token_parts: Vec<&str> = token.split(':').collect();
    if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
        return Err(ConfigError::Validation(
            "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
        }"#);
        let config = Config::load_with_token(file.path(), None).expect("should load valid config");
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.temp_dir, PathBuf::from("./temp"));
        assert_eq!(config.max_file_size_bytes, 20 * 1024 * 1024);
        assert_eq!(config.max_concurrent_conversions, 4);
        assert_eq!(config.conversion_timeout, Duration::from_secs(300));
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.jpeg_background, [255, 255, 255]);
        assert_eq!(config.mp3_bitrate, "192k");
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(config.log_chat_id.is_none());
    }

    #[test]
    fn test_full_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "data_dir": "/var/lib/filerelay",
            "temp_dir": "/tmp/filerelay",
            "allowed_users": [42, 7],
            "log_chat_id": -100123,
            "max_file_size_mb": 10,
            "max_concurrent_conversions": 2,
            "conversion_timeout_secs": 60,
            "jpeg_quality": 80,
            "jpeg_background": [0, 0, 0],
            "mp3_bitrate": "128k",
            "ffmpeg_path": "/usr/local/bin/ffmpeg",
            "ffprobe_path": "/usr/local/bin/ffprobe"
        }"#);
        let config = Config::load_with_token(file.path(), None).unwrap();
        assert_eq!(config.temp_dir, PathBuf::from("/tmp/filerelay"));
        assert_eq!(config.log_chat_id, Some(ChatId(-100123)));
        assert!(config.is_allowed(UserId(42)));
        assert!(!config.is_allowed(UserId(1)));

        let settings = config.convert_settings();
        assert_eq!(settings.image.jpeg_quality, 80);
        assert_eq!(settings.image.jpeg_background, [0, 0, 0]);
        assert_eq!(settings.media.mp3_bitrate, "128k");
        assert_eq!(settings.media.ffprobe, PathBuf::from("/usr/local/bin/ffprobe"));
    }

    #[test]
    fn test_empty_allow_list_allows_everyone() {
        let file = write_config(r#"{ "telegram_bot_token": "1:x" }"#);
        let config = Config::load_with_token(file.path(), None).unwrap();
        assert!(config.is_allowed(UserId(123)));
    }

    #[test]
    fn test_token_override() {
        let file = write_config(r#"{}"#);
        let config = Config::load_with_token(file.path(), Some("987:secret".to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, "987:secret");
    }

    #[test]
    fn test_blank_override_falls_back_to_file() {
        let file = write_config(r#"{ "telegram_bot_token": "1:fromfile" }"#);
        let config = Config::load_with_token(file.path(), Some("  ".to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, "1:fromfile");
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{ "telegram_bot_token": "" }"#);
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{ "telegram_bot_token": "invalid_token_no_colon" }"#);
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{ "telegram_bot_token": "notanumber:ABCdef" }"#);
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let file = write_config(r#"{ "telegram_bot_token": "123456789:" }"#);
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "max_concurrent_conversions": 0
        }"#);
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(err.to_string().contains("max_concurrent_conversions"));
    }

    #[test]
    fn test_jpeg_quality_out_of_range() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "jpeg_quality": 0
        }"#);
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load_with_token("/nonexistent/path/config.json", None));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load_with_token(file.path(), None));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
