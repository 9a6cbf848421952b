use serde::{Deserialize, Serialize};

use crate::types::{Author, ChatId, Message, Rating};
use crate::utils::nullable::{bool_or_false, string_or_empty};

/// A bot message as returned by `ask` and `search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotReply {
    /// Raw message text.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub content: String,
    /// Position assigned by the backend.
    pub order_in_chat: i64,
    /// Chat the message was stored in.
    pub chat_id: ChatId,
    /// The content is search-engine output.
    #[serde(default, deserialize_with = "bool_or_false")]
    pub search_response: bool,
    /// The bot asked for a search; a `search` call must follow.
    #[serde(default, deserialize_with = "bool_or_false")]
    pub search_request: bool,
    /// Backend role, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl From<BotReply> for Message {
    fn from(reply: BotReply) -> Self {
        // Replies are always rendered as bot output, whatever role the
        // backend stored.
        Message::from_wire(
            Author::Bot,
            reply.content,
            reply.order_in_chat,
            Some(reply.chat_id),
            reply.search_request,
            reply.search_response,
            Rating::Neutral,
        )
    }
}
