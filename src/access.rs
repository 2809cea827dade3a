//! Group allow-list applied to every update before any handler runs.

use std::collections::HashSet;

use teloxide::types::{ChatId, Update};
use tracing::error;

pub struct AccessGuard {
    allowed_groups: HashSet<ChatId>,
}

impl AccessGuard {
    pub fn new(allowed_groups: HashSet<ChatId>) -> Self {
        Self { allowed_groups }
    }

    /// Updates that carry no chat are dropped without logging.
    pub fn admits_update(&self, update: &Update) -> bool {
        match update.chat() {
            Some(chat) => self.admits(chat.id, chat.title()),
            None => false,
        }
    }

    pub fn admits(&self, chat_id: ChatId, title: Option<&str>) -> bool {
        if self.allowed_groups.contains(&chat_id) {
            return true;
        }
        error!("Unauthorized access to group {} ({})", chat_id, title.unwrap_or("no title"));
        false
    }
}
