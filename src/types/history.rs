use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Author, ChatId, Message, Rating};
use crate::utils::nullable::{bool_or_false, string_or_empty};

/// Body of `POST get_history`.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryParams {
    /// The session token.
    pub token: String,
    /// The chat to load, as a decimal string.
    pub chat_id: String,
}

/// One stored message as returned by `get_history`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Backend role name.
    pub role: Author,
    /// Raw message text.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub content: String,
    /// Stored rating.
    #[serde(default)]
    pub rating: Rating,
    /// Position within the chat.
    pub order_in_chat: i64,
    /// Owning chat, when reported.
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    /// The content is search-engine output.
    #[serde(default, deserialize_with = "bool_or_false")]
    pub search_response: bool,
    /// The bot asked for a search.
    #[serde(default, deserialize_with = "bool_or_false")]
    pub search_request: bool,
    /// When the message was stored.
    #[serde(default, deserialize_with = "crate::utils::time::deserialize_option")]
    pub created_at: Option<OffsetDateTime>,
}

impl HistoryEntry {
    /// Converts the entry into a transcript message of `chat_id`.
    pub fn into_message(self, chat_id: ChatId) -> Message {
        Message::from_wire(
            self.role,
            self.content,
            self.order_in_chat,
            Some(self.chat_id.unwrap_or(chat_id)),
            self.search_request,
            self.search_response,
            self.rating,
        )
    }
}

/// Response of `POST get_history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    /// The chat's stored messages, in no particular order.
    pub history: Vec<HistoryEntry>,
}

/// Body of `POST get_historybar`.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryBarParams {
    /// The session token.
    pub token: String,
}

/// Response of `POST get_historybar`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryBarResponse {
    /// The user's chats.
    pub chats: Vec<crate::types::ChatSummary>,
}
