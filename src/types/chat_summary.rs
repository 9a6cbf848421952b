use serde::{Deserialize, Serialize};

use crate::types::ChatId;
use crate::utils::nullable::string_or_empty;

/// An entry in the chat history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    /// The chat's id.
    pub chat_id: ChatId,
    /// The chat's title; empty when the backend has not titled it yet.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
}
