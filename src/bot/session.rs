//! Per-user conversation state, held in memory.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use teloxide::types::UserId;
use tokio::sync::Mutex;

use super::i18n::Lang;
use crate::convert::Format;

/// An uploaded file waiting for the user to pick a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// Telegram file id. Kept here because callback data is capped at 64 bytes.
    pub file_id: String,
    pub source: Format,
    pub file_name: String,
    pub size: u64,
}

/// Outcome of [`SessionStore::claim_pending`].
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    /// A conversion is already running; the pending upload stays put.
    Busy,
    /// Nothing is waiting.
    Missing,
    /// The upload was taken and the user is now busy.
    Ready(PendingFile),
}

#[derive(Debug, Clone)]
pub struct Session {
    /// Explicit choice via /language; `None` follows the Telegram client language.
    pub lang: Option<Lang>,
    /// Source picked from the menus.
    pub source: Option<Format>,
    /// Target picked from the menus; with `source` set, the next upload converts.
    pub target: Option<Format>,
    pub pending: Option<PendingFile>,
    pub busy: bool,
    pub touched: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            lang: None,
            source: None,
            target: None,
            pending: None,
            busy: false,
            touched: Utc::now(),
        }
    }

    /// The armed menu selection, if both halves are chosen.
    pub fn armed(&self) -> Option<(Format, Format)> {
        self.source.zip(self.target)
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with<R>(&self, user: UserId, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(user).or_insert_with(Session::new);
        session.touched = Utc::now();
        f(session)
    }

    /// The user's language: explicit choice, else the client language, else English.
    pub async fn lang(&self, user: UserId, client_code: Option<&str>) -> Lang {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&user)
            .and_then(|s| s.lang)
            .unwrap_or_else(|| Lang::detect(client_code))
    }

    pub async fn set_lang(&self, user: UserId, lang: Lang) {
        self.with(user, |s| s.lang = Some(lang)).await;
    }

    /// Pick a source from the menus. Clears any earlier target.
    pub async fn select_source(&self, user: UserId, source: Format) {
        self.with(user, |s| {
            s.source = Some(source);
            s.target = None;
        })
        .await;
    }

    /// Pick a target for the selected source. Returns the armed pair, or
    /// `None` if no source was selected first.
    pub async fn select_target(&self, user: UserId, target: Format) -> Option<(Format, Format)> {
        self.with(user, |s| {
            s.source?;
            s.target = Some(target);
            s.armed()
        })
        .await
    }

    pub async fn armed(&self, user: UserId) -> Option<(Format, Format)> {
        let sessions = self.sessions.lock().await;
        sessions.get(&user).and_then(Session::armed)
    }

    /// Remember an upload until a target is chosen. Replaces any older one.
    pub async fn stash_pending(&self, user: UserId, file: PendingFile) {
        self.with(user, |s| s.pending = Some(file)).await;
    }

    #[cfg(test)]
    pub async fn take_pending(&self, user: UserId) -> Option<PendingFile> {
        self.with(user, |s| s.pending.take()).await
    }

    /// Take the pending upload and mark the user busy in one step.
    pub async fn claim_pending(&self, user: UserId) -> Claim {
        self.with(user, |s| {
            if s.busy {
                return Claim::Busy;
            }
            match s.pending.take() {
                Some(file) => {
                    s.busy = true;
                    Claim::Ready(file)
                }
                None => Claim::Missing,
            }
        })
        .await
    }

    /// Mark the user busy. Returns `false` if a conversion is already running.
    pub async fn try_begin(&self, user: UserId) -> bool {
        self.with(user, |s| {
            if s.busy {
                false
            } else {
                s.busy = true;
                true
            }
        })
        .await
    }

    /// Clear the busy flag for a job that never started.
    pub async fn release(&self, user: UserId) {
        self.with(user, |s| s.busy = false).await;
    }

    /// End a conversion: clears the busy flag and the menu selection.
    pub async fn finish(&self, user: UserId) {
        self.with(user, |s| {
            s.busy = false;
            s.source = None;
            s.target = None;
        })
        .await;
    }

    /// Drop menu selection and pending upload, keeping language and busy flag.
    pub async fn reset(&self, user: UserId) {
        self.with(user, |s| {
            s.source = None;
            s.target = None;
            s.pending = None;
        })
        .await;
    }

    /// Remove idle sessions. Busy sessions are kept. Returns how many were removed.
    pub async fn prune(&self, now: DateTime<Utc>, max_idle: TimeDelta) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.busy || now - s.touched <= max_idle);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
