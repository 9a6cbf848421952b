//! Domain and wire types.

pub mod ask;
pub mod author;
pub mod bot_reply;
pub mod chat_id;
pub mod chat_summary;
pub mod csrf;
pub mod history;
pub mod language_model;
pub mod message;
pub mod message_content;
pub mod rating;
pub mod search;

pub use ask::AskParams;
pub use author::Author;
pub use bot_reply::BotReply;
pub use chat_id::ChatId;
pub use chat_summary::ChatSummary;
pub use csrf::CsrfResponse;
pub use history::{
    HistoryBarParams, HistoryBarResponse, HistoryEntry, HistoryParams, HistoryResponse,
};
pub use language_model::LanguageModel;
pub use message::{Message, RatingSync};
pub use message_content::{MessageContent, SearchResult};
pub use rating::{Rating, Vote};
pub use search::{SearchParams, SearchResponse};
