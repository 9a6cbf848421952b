use serde::Serialize;
use time::OffsetDateTime;

use crate::types::{ChatId, LanguageModel};

/// Body of `POST ask`.
///
/// The backend reads the session token from the `password` field.
#[derive(Debug, Clone, Serialize)]
pub struct AskParams {
    /// The user's query.
    pub user_input: String,
    /// The signed-in user's email.
    pub email: String,
    /// The session token.
    pub password: String,
    /// Position of the user's message in the chat.
    pub order_in_chat: i64,
    /// The active chat, or null to start a new one.
    pub chat_id: Option<ChatId>,
    /// When the query was submitted.
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,
    /// The selected model.
    pub language_model: LanguageModel,
}
