//! Update handlers: commands, uploads and button presses.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, User};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{debug, info, warn};

use super::i18n::{fill, Lang, Texts};
use super::job::{self, received_text, unsupported_text, Job};
use super::keyboard::{self, Callback, Menu};
use super::session::{Claim, PendingFile};
use super::{BotState, Command};
use crate::convert::{is_supported, Format, FormatFamily};

/// Why an upload could not be matched to a format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// No extension and no recognised MIME type.
    UnknownType,
    /// An extension outside the matrix, e.g. `"exe"`.
    Unsupported(String),
}

/// Which kind of Telegram attachment carried the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Photo,
    Audio,
    Video,
}

/// Detect a format from the file name, falling back to the MIME type.
pub fn detect_format(file_name: Option<&str>, mime: Option<&str>) -> Result<Format, UploadError> {
    let ext = file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str());
    if let Some(ext) = ext {
        return Format::from_extension(ext).ok_or_else(|| UploadError::Unsupported(ext.to_ascii_lowercase()));
    }
    mime.and_then(Format::from_mime).ok_or(UploadError::UnknownType)
}

/// Whether an upload may be used for an armed menu selection.
/// Any image satisfies an image source.
pub fn matches_selection(uploaded: Format, selected: Format) -> bool {
    uploaded == selected
        || (uploaded.family() == FormatFamily::Image && selected.family() == FormatFamily::Image)
}

fn extract_upload(msg: &Message) -> Option<(UploadKind, Result<PendingFile, UploadError>)> {
    let pending = |id: &teloxide::types::FileId, size: u32, source: Format, name: String| PendingFile {
        file_id: id.0.clone(),
        source,
        file_name: name,
        size: u64::from(size),
    };

    if let Some(doc) = msg.document() {
        let mime = doc.mime_type.as_ref().map(|m| m.to_string());
        let result = detect_format(doc.file_name.as_deref(), mime.as_deref()).map(|format| {
            let name = doc.file_name.clone().unwrap_or_else(|| format!("file.{format}"));
            pending(&doc.file.id, doc.file.size, format, name)
        });
        return Some((UploadKind::Document, result));
    }

    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        let file = pending(&photo.file.id, photo.file.size, Format::Jpg, "photo.jpg".to_string());
        return Some((UploadKind::Photo, Ok(file)));
    }

    if let Some(audio) = msg.audio() {
        let mime = audio.mime_type.as_ref().map(|m| m.to_string());
        let result = detect_format(audio.file_name.as_deref(), mime.as_deref()).map(|format| {
            let name = audio.file_name.clone().unwrap_or_else(|| format!("audio.{format}"));
            pending(&audio.file.id, audio.file.size, format, name)
        });
        return Some((UploadKind::Audio, result));
    }

    if let Some(voice) = msg.voice() {
        let file = pending(&voice.file.id, voice.file.size, Format::Ogg, "voice.ogg".to_string());
        return Some((UploadKind::Audio, Ok(file)));
    }

    if let Some(video) = msg.video() {
        let mime = video.mime_type.as_ref().map(|m| m.to_string());
        let result = match detect_format(video.file_name.as_deref(), mime.as_deref()) {
            Err(UploadError::UnknownType) => Ok(Format::Mp4),
            other => other,
        }
        .map(|format| {
            let name = video.file_name.clone().unwrap_or_else(|| format!("video.{format}"));
            pending(&video.file.id, video.file.size, format, name)
        });
        return Some((UploadKind::Video, result));
    }

    None
}

async fn user_lang(state: &BotState, user: &User) -> Lang {
    state.sessions.lang(user.id, user.language_code.as_deref()).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let lang = user_lang(&state, user).await;
    let t = lang.texts();

    if !state.config.is_allowed(user.id) {
        info!("Denied user {} ({})", user.first_name, user.id);
        bot.send_message(msg.chat.id, t.access_denied).await.ok();
        return Ok(());
    }

    if let Some(text) = msg.text() {
        match Command::parse(text, &state.bot_username) {
            Ok(cmd) => handle_command(&state, &msg, user, cmd, t).await,
            Err(_) => {
                state.telegram.send_html(msg.chat.id, t.welcome, Some(keyboard::main_menu(t))).await.ok();
            }
        }
        return Ok(());
    }

    let Some((kind, upload)) = extract_upload(&msg) else {
        return Ok(());
    };

    let file = match upload {
        Ok(file) => file,
        Err(UploadError::UnknownType) => {
            state.telegram.send_html(msg.chat.id, t.file_type_error, None).await.ok();
            return Ok(());
        }
        Err(UploadError::Unsupported(ext)) => {
            let text = fill(t.unsupported_format, &[("ext", &html::escape(&ext.to_ascii_uppercase()))]);
            state.telegram.send_html(msg.chat.id, &text, None).await.ok();
            return Ok(());
        }
    };

    info!(
        "📎 Upload from {} ({}): {} [{}], {} bytes",
        user.first_name, user.id, file.file_name, file.source, file.size
    );

    if file.size > state.config.max_file_size_bytes {
        let size = format!("{:.1}", file.size as f64 / (1024.0 * 1024.0));
        let limit = (state.config.max_file_size_bytes / (1024 * 1024)).to_string();
        let text = fill(t.too_large, &[("size", &size), ("limit", &limit)]);
        state.telegram.send_html(msg.chat.id, &text, None).await.ok();
        return Ok(());
    }

    if let Some((selected, target)) = state.sessions.armed(user.id).await
        && matches_selection(file.source, selected)
        && is_supported(file.source, target)
    {
        if !state.sessions.try_begin(user.id).await {
            // Keep the upload so it can be converted once the running job ends.
            let markup = keyboard::convert_menu(file.source);
            state.sessions.stash_pending(user.id, file).await;
            state.telegram.send_html(msg.chat.id, t.busy, Some(markup)).await.ok();
            return Ok(());
        }
        debug!("Upload matches armed selection {selected} -> {target}");
        let job = Job { user: user.id, chat: msg.chat.id, file, target, lang };
        tokio::spawn(job::run(Arc::clone(&state), job));
        return Ok(());
    }

    let template = match kind {
        UploadKind::Document => t.file_received,
        UploadKind::Photo => t.photo_received,
        UploadKind::Audio => t.audio_received,
        UploadKind::Video => t.video_received,
    };
    let text = received_text(template, &file);
    let markup = keyboard::convert_menu(file.source);
    state.sessions.stash_pending(user.id, file).await;
    state.telegram.send_html(msg.chat.id, &text, Some(markup)).await.ok();

    Ok(())
}

async fn handle_command(state: &BotState, msg: &Message, user: &User, cmd: Command, t: &Texts) {
    info!("Command {:?} from {} ({})", cmd, user.first_name, user.id);
    match cmd {
        Command::Start => {
            state.sessions.reset(user.id).await;
            state.telegram.send_html(msg.chat.id, t.welcome, Some(keyboard::main_menu(t))).await.ok();
        }
        Command::Help => {
            state.telegram.send_html(msg.chat.id, t.help, Some(keyboard::back_menu(t))).await.ok();
        }
        Command::Language => {
            state
                .telegram
                .send_html(msg.chat.id, t.select_language, Some(keyboard::language_menu()))
                .await
                .ok();
        }
    }
}

/// Show a menu in place of the pressed message, or as a new message.
async fn show(state: &BotState, chat: ChatId, message: Option<MessageId>, text: &str, markup: Option<InlineKeyboardMarkup>) {
    if let Some(id) = message
        && state.telegram.edit_html(chat, id, text, markup.clone()).await.is_ok()
    {
        return;
    }
    state.telegram.send_html(chat, text, markup).await.ok();
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let user = &q.from;
    let lang = user_lang(&state, user).await;
    let t = lang.texts();

    if !state.config.is_allowed(user.id) {
        bot.answer_callback_query(q.id.clone()).text(t.access_denied).await.ok();
        return Ok(());
    }
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query: {e}");
    }

    let Some(message) = q.regular_message() else {
        return Ok(());
    };
    let chat = message.chat.id;
    let message_id = Some(message.id);

    let Some(callback) = q.data.as_deref().and_then(Callback::parse) else {
        warn!("Unparseable callback data {:?} from {}", q.data, user.id);
        state.telegram.send_html(chat, t.invalid_request, None).await.ok();
        return Ok(());
    };
    debug!("Callback {callback} from {}", user.id);

    match callback {
        Callback::Back | Callback::Menu(Menu::Main) => {
            state.sessions.reset(user.id).await;
            show(&state, chat, message_id, t.welcome, Some(keyboard::main_menu(t))).await;
        }
        Callback::Menu(Menu::Family(family)) => {
            let text = match family {
                FormatFamily::Document => t.document_conversion,
                FormatFamily::Image => t.image_conversion,
                FormatFamily::Audio => t.audio_conversion,
                FormatFamily::Video => t.video_conversion,
            };
            show(&state, chat, message_id, text, Some(keyboard::family_menu(t, family))).await;
        }
        Callback::Menu(Menu::Direct) => {
            show(&state, chat, message_id, t.direct_upload, Some(keyboard::back_menu(t))).await;
        }
        Callback::Menu(Menu::Language) => {
            show(&state, chat, message_id, t.select_language, Some(keyboard::language_menu())).await;
        }
        Callback::Source(source) => {
            state.sessions.select_source(user.id, source).await;
            let text = fill(t.choose_target, &[("source", source.label())]);
            show(&state, chat, message_id, &text, Some(keyboard::target_menu(t, source))).await;
        }
        Callback::Target(target) => match state.sessions.select_target(user.id, target).await {
            Some((source, target)) if is_supported(source, target) => {
                let text = fill(
                    t.ready_convert,
                    &[("source", source.label()), ("target", target.label())],
                );
                show(&state, chat, message_id, &text, Some(keyboard::back_menu(t))).await;
            }
            Some((source, target)) => {
                let text = unsupported_text(t, source, target);
                show(&state, chat, message_id, &text, Some(keyboard::target_menu(t, source))).await;
            }
            None => {
                state.telegram.send_html(chat, t.start_over, None).await.ok();
            }
        },
        Callback::Convert(target) => match state.sessions.claim_pending(user.id).await {
            Claim::Busy => {
                state.telegram.send_html(chat, t.busy, None).await.ok();
            }
            Claim::Missing => {
                state.telegram.send_html(chat, t.pending_missing, None).await.ok();
            }
            Claim::Ready(file) => {
                let job = Job { user: user.id, chat, file, target, lang };
                tokio::spawn(job::run(Arc::clone(&state), job));
            }
        },
        Callback::Lang(new_lang) => {
            state.sessions.set_lang(user.id, new_lang).await;
            let nt = new_lang.texts();
            let text = format!("{}\n\n{}", nt.language_set, nt.welcome);
            show(&state, chat, message_id, &text, Some(keyboard::main_menu(nt))).await;
        }
    }

    Ok(())
}

/// Register the command list shown by Telegram clients.
pub async fn register_commands(bot: &Bot) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register commands: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_format(Some("Report.PDF"), None), Ok(Format::Pdf));
        assert_eq!(detect_format(Some("song.mp3"), Some("audio/ogg")), Ok(Format::Mp3));
        assert_eq!(detect_format(Some("photo.jpeg"), None), Ok(Format::Jpeg));
    }

    #[test]
    fn test_detect_unknown_extension() {
        assert_eq!(
            detect_format(Some("setup.EXE"), Some("application/pdf")),
            Err(UploadError::Unsupported("exe".to_string()))
        );
    }

    #[test]
    fn test_detect_falls_back_to_mime() {
        assert_eq!(detect_format(Some("README"), Some("text/plain; charset=utf-8")), Ok(Format::Txt));
        assert_eq!(detect_format(None, Some("video/mp4")), Ok(Format::Mp4));
        assert_eq!(detect_format(Some("README"), None), Err(UploadError::UnknownType));
        assert_eq!(detect_format(None, Some("application/zip")), Err(UploadError::UnknownType));
    }

    #[test]
    fn test_matches_selection() {
        assert!(matches_selection(Format::Pdf, Format::Pdf));
        assert!(matches_selection(Format::Jpg, Format::Png));
        assert!(matches_selection(Format::Webp, Format::Jpeg));
        assert!(!matches_selection(Format::Mp3, Format::Wav));
        assert!(!matches_selection(Format::Docx, Format::Pdf));
    }

    #[test]
    fn test_commands_parse() {
        assert!(matches!(Command::parse("/start", "filerelay_bot"), Ok(Command::Start)));
        assert!(matches!(Command::parse("/help@filerelay_bot", "filerelay_bot"), Ok(Command::Help)));
        assert!(matches!(Command::parse("/language", "filerelay_bot"), Ok(Command::Language)));
        assert!(Command::parse("hello", "filerelay_bot").is_err());
    }
}
