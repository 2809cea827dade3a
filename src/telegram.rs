//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReplyParameters};
use teloxide::{ApiError, RequestError};
use tracing::{info, warn};

/// Why an edit didn't go through.
#[derive(Debug)]
pub enum EditError {
    /// Text is identical to what Telegram already shows.
    NotModified,
    /// The message was deleted or is otherwise unreachable.
    Gone,
    Other(String),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::NotModified => write!(f, "message is not modified"),
            EditError::Gone => write!(f, "message to edit not found"),
            EditError::Other(e) => write!(f, "{e}"),
        }
    }
}

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }

        if let Some(msg_id) = reply_to_message_id {
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32));
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    pub async fn edit_markdown(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), EditError> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map(|_| ())
            .map_err(|e| {
                let err = classify_edit_error(e);
                match &err {
                    EditError::NotModified => {}
                    EditError::Gone => info!("Message {} in chat {} is gone", message_id, chat_id),
                    EditError::Other(msg) => warn!("{}", msg),
                }
                err
            })
    }
}

/// Map an edit failure onto what the live message should do about it.
pub fn classify_edit_error(error: RequestError) -> EditError {
    match error {
        RequestError::Api(ApiError::MessageNotModified) => EditError::NotModified,
        RequestError::Api(ApiError::MessageToEditNotFound | ApiError::MessageIdInvalid | ApiError::ChatNotFound) => {
            EditError::Gone
        }
        other => EditError::Other(format!("Failed to edit message: {other}")),
    }
}
