//! The single live user-list message and its periodic refresh.

use std::time::Duration;

use chrono::{DateTime, Utc};
use teloxide::types::ParseMode;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::format::format_user_list;
use crate::teamspeak::{TeamSpeakError, UserList, WebQueryClient};
use crate::telegram::{EditError, TelegramClient};
use crate::telegram_log::LOCAL_ONLY_TARGET;

pub const ALREADY_LIVE_TEXT: &str = "Live message already exists. Please wait for it to update.";

/// Where the user list comes from.
#[allow(async_fn_in_trait)]
pub trait UserSource {
    async fn user_list(&self) -> Result<UserList, TeamSpeakError>;
}

/// Where the live message is posted and edited.
#[allow(async_fn_in_trait)]
pub trait LivePublisher {
    async fn post(&self, chat_id: i64, text: &str) -> Result<i64, String>;
    async fn edit(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), EditError>;
}

impl UserSource for WebQueryClient {
    async fn user_list(&self) -> Result<UserList, TeamSpeakError> {
        self.fetch_user_list().await
    }
}

impl LivePublisher for TelegramClient {
    async fn post(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.send_message(chat_id, text, Some(ParseMode::MarkdownV2), None).await
    }

    async fn edit(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), EditError> {
        self.edit_markdown(chat_id, message_id, text).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Last text rendered into the message.
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum StartOutcome {
    Created(LiveMessage),
    AlreadyLive(LiveMessage),
}

#[derive(Debug, PartialEq)]
pub enum RefreshOutcome {
    /// No live message to refresh.
    Idle,
    Unchanged,
    Edited,
    /// Message disappeared on Telegram's side; state cleared.
    Dropped,
    Failed(String),
}

#[derive(Debug)]
pub enum LiveError {
    TeamSpeak(TeamSpeakError),
    Telegram(String),
}

impl std::fmt::Display for LiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveError::TeamSpeak(e) => write!(f, "TeamSpeak query failed: {e}"),
            LiveError::Telegram(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LiveError {}

/// Where the "already exists" notice goes: under the live message when it
/// lives in the same chat, otherwise under the command itself.
pub fn already_live_reply_target(existing: &LiveMessage, chat_id: i64, command_message_id: i64) -> i64 {
    if existing.chat_id == chat_id {
        existing.message_id
    } else {
        command_message_id
    }
}

/// Holds at most one live message for the whole process.
///
/// The slot stays locked for the whole of `start` and `refresh`, so a
/// `/tslive` racing the scheduled refresh can't create a second message.
#[derive(Default)]
pub struct LiveBoard {
    slot: Mutex<Option<LiveMessage>>,
}

impl LiveBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<LiveMessage> {
        self.slot.lock().await.clone()
    }

    pub async fn start<S, P>(&self, chat_id: i64, source: &S, publisher: &P) -> Result<StartOutcome, LiveError>
    where
        S: UserSource,
        P: LivePublisher,
    {
        let mut slot = self.slot.lock().await;
        if let Some(existing) = slot.as_ref() {
            return Ok(StartOutcome::AlreadyLive(existing.clone()));
        }

        let list = source.user_list().await.map_err(LiveError::TeamSpeak)?;
        let text = format_user_list(&list);
        let message_id = publisher.post(chat_id, &text).await.map_err(LiveError::Telegram)?;

        let live = LiveMessage {
            chat_id,
            message_id,
            text,
            posted_at: Utc::now(),
        };
        info!("📌 Live message {} created in chat {}", message_id, chat_id);
        *slot = Some(live.clone());
        Ok(StartOutcome::Created(live))
    }

    pub async fn refresh<S, P>(&self, source: &S, publisher: &P) -> RefreshOutcome
    where
        S: UserSource,
        P: LivePublisher,
    {
        let mut slot = self.slot.lock().await;
        let Some(live) = slot.as_mut() else {
            // Idle is the normal state, keep it out of the log chat
            warn!(target: LOCAL_ONLY_TARGET, "No live message to update.");
            return RefreshOutcome::Idle;
        };

        let list = match source.user_list().await {
            Ok(list) => list,
            Err(e) => {
                warn!("Live refresh: TeamSpeak query failed: {e}");
                return RefreshOutcome::Failed(e.to_string());
            }
        };

        let text = format_user_list(&list);
        if text == live.text {
            return RefreshOutcome::Unchanged;
        }

        match publisher.edit(live.chat_id, live.message_id, &text).await {
            Ok(()) | Err(EditError::NotModified) => {
                live.text = text;
                RefreshOutcome::Edited
            }
            Err(EditError::Gone) => {
                let age = Utc::now() - live.posted_at;
                warn!(
                    "Live message {} in chat {} is gone after {} min, dropping it",
                    live.message_id,
                    live.chat_id,
                    age.num_minutes()
                );
                *slot = None;
                RefreshOutcome::Dropped
            }
            Err(EditError::Other(e)) => RefreshOutcome::Failed(e),
        }
    }

    /// Refresh after `first_delay`, then every `period`. Never returns.
    pub async fn run_refresher<S, P>(&self, source: &S, publisher: &P, first_delay: Duration, period: Duration)
    where
        S: UserSource,
        P: LivePublisher,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + first_delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let outcome = self.refresh(source, publisher).await;
            debug!("Live refresh: {:?}", outcome);
        }
    }
}
