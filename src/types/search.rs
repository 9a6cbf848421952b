use serde::{Deserialize, Serialize};

use crate::types::{BotReply, ChatId, LanguageModel};

/// Body of `POST search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    /// The chat whose last message requested the search.
    pub chat_id: ChatId,
    /// The session token.
    pub password: String,
    /// The selected model.
    pub language_model: LanguageModel,
}

/// Response of `POST search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The search results and the bot's follow-up, in any order.
    pub response: Vec<BotReply>,
}
