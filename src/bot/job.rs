//! One conversion from a user's upload to the delivered result.
//!
//! download, convert on the blocking pool under a semaphore and a timeout,
//! then deliver. Both temporary files are `TempPath`s owned by the blocking
//! task and are removed when it ends.

use std::sync::Arc;
use std::time::Duration;

use teloxide::types::{ChatId, MessageId, UserId};
use teloxide::utils::html;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

use super::i18n::{fill, Lang, Texts};
use super::keyboard;
use super::session::PendingFile;
use super::BotState;
use crate::convert::format::describe;
use crate::convert::{allowed_targets, is_supported, ConversionRequest, ConvertError, Format};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("download failed: {0}")]
    Download(String),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("conversion timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("conversion task failed: {0}")]
    Task(String),
    #[error("delivery failed: {0}")]
    Deliver(String),
}

impl JobError {
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Download(_) => "download",
            JobError::Convert(e) => e.kind(),
            JobError::TimedOut(_) => "timeout",
            JobError::Task(_) => "task",
            JobError::Deliver(_) => "deliver",
        }
    }

    /// Localised text shown to the user.
    pub fn user_message(&self, t: &Texts) -> String {
        match self {
            JobError::Convert(ConvertError::Unsupported { from, to }) => unsupported_text(t, *from, *to),
            JobError::Convert(ConvertError::NoAudioTrack) => t.no_audio_track.to_string(),
            JobError::Convert(ConvertError::Library { .. }) => t.conversion_failed.to_string(),
            JobError::TimedOut(_) => t.timed_out.to_string(),
            JobError::Download(_)
            | JobError::Convert(_)
            | JobError::Task(_)
            | JobError::Deliver(_) => t.error_occurred.to_string(),
        }
    }
}

/// "X → Y is not supported", listing what X can become instead.
pub fn unsupported_text(t: &Texts, from: Format, to: Format) -> String {
    let alternatives = describe(allowed_targets(from));
    fill(
        t.unsupported_pair,
        &[("source", from.label()), ("target", to.label()), ("targets", &alternatives)],
    )
}

/// A conversion requested by a user.
#[derive(Debug, Clone)]
pub struct Job {
    pub user: UserId,
    pub chat: ChatId,
    pub file: PendingFile,
    pub target: Format,
    pub lang: Lang,
}

/// Run a job to completion, reporting the outcome in the chat.
///
/// The caller must already have marked the user busy; the flag is cleared
/// when the job ends.
pub async fn run(state: Arc<BotState>, job: Job) {
    let request_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    let span = info_span!("convert", request_id = %request_id, user = job.user.0);
    run_inner(state, job).instrument(span).await;
}

async fn run_inner(state: Arc<BotState>, job: Job) {
    let t = job.lang.texts();
    let source = job.file.source;

    if !is_supported(source, job.target) {
        warn!("Rejected {source} -> {}: not in matrix", job.target);
        let text = unsupported_text(t, source, job.target);
        state.sessions.stash_pending(job.user, job.file).await;
        state.sessions.release(job.user).await;
        state
            .telegram
            .send_html(job.chat, &text, Some(keyboard::convert_menu(source)))
            .await
            .ok();
        return;
    }

    info!(
        "Job: {} ({} bytes) {source} -> {}",
        job.file.file_name, job.file.size, job.target
    );
    let labels = [("source", source.label()), ("target", job.target.label())];
    let status = state
        .telegram
        .send_html(job.chat, &fill(t.converting, &labels), None)
        .await
        .ok();

    let result = execute(&state, &job).await;

    let text = match &result {
        Ok(()) => fill(t.conversion_completed, &labels),
        Err(e) => {
            match e {
                JobError::Convert(ConvertError::Library { .. } | ConvertError::NoAudioTrack)
                | JobError::TimedOut(_) => warn!("Job failed ({}): {e}", e.kind()),
                _ => error!("Job failed ({}): {e}", e.kind()),
            }
            e.user_message(t)
        }
    };
    report(&state, job.chat, status, &text).await;

    state.sessions.finish(job.user).await;
}

async fn execute(state: &Arc<BotState>, job: &Job) -> Result<(), JobError> {
    let permit = Arc::clone(&state.permits)
        .acquire_owned()
        .await
        .map_err(|e| JobError::Task(e.to_string()))?;

    let input = state.converter.stage_input(job.file.source)?;
    state
        .telegram
        .download(&job.file.file_id, &input)
        .await
        .map_err(JobError::Download)?;

    let converter = Arc::clone(&state.converter);
    let target = job.target;
    let request = ConversionRequest {
        input: input.to_path_buf(),
        source: job.file.source,
        target,
    };
    // The task holds the permit and both temp files until it ends, even after a timeout.
    let task = tokio::task::spawn_blocking(move || {
        let output = converter.run(&request);
        drop(input);
        drop(permit);
        output
    });

    let timeout = state.config.conversion_timeout;
    let output = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => return Err(JobError::Task(join_err.to_string())),
        Err(_) => return Err(JobError::TimedOut(timeout)),
    };

    let t = job.lang.texts();
    let caption = fill(t.success_caption, &[("target", target.label())]);
    state
        .telegram
        .send_document(job.chat, output.path(), &output.file_name(), &caption)
        .await
        .map_err(JobError::Deliver)?;

    info!("✅ Delivered {} to chat {}", output.file_name(), job.chat);
    Ok(())
}

/// Edit the status message, or send a fresh one if there is none.
async fn report(state: &BotState, chat: ChatId, status: Option<MessageId>, text: &str) {
    let edited = match status {
        Some(id) => state.telegram.edit_html(chat, id, text, None).await.is_ok(),
        None => false,
    };
    if !edited {
        state.telegram.send_html(chat, text, None).await.ok();
    }
}

/// Upload summary shown when asking for a target.
pub fn received_text(template: &str, file: &PendingFile) -> String {
    let size_kb = format!("{:.1}", file.size as f64 / 1024.0);
    fill(
        template,
        &[
            ("name", &html::escape(&file.file_name)),
            ("size", &size_kb),
            ("type", file.source.label()),
        ],
    )
}
