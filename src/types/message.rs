use crate::types::{Author, ChatId, MessageContent, Rating};

/// Whether a message's local rating has been persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum RatingSync {
    /// Local and remote ratings agree.
    #[default]
    Synced,
    /// A rating update is in flight.
    Pending,
    /// The last rating update failed; the local rating was not persisted.
    Unsynced(String),
}

impl RatingSync {
    /// Returns true if the last rating update failed.
    pub fn is_unsynced(&self) -> bool {
        matches!(self, RatingSync::Unsynced(_))
    }
}

/// A message in a chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Who wrote the message.
    pub author: Author,
    /// The message body.
    pub content: MessageContent,
    /// Position within the chat; unique and strictly increasing.
    pub order_in_chat: i64,
    /// The user's rating.
    pub rating: Rating,
    /// The chat this message belongs to, unset until the backend assigns one.
    pub chat_id: Option<ChatId>,
    /// The bot asked to run a search.
    pub search_request: bool,
    /// The content is search-engine output.
    pub search_response: bool,
    /// Search results are expanded for display.
    pub is_open: bool,
    /// Persistence state of `rating`.
    pub rating_sync: RatingSync,
    pub(crate) rating_revision: u64,
}

impl Message {
    /// Creates a locally-constructed user message.
    pub fn user(text: impl Into<String>, order_in_chat: i64, chat_id: Option<ChatId>) -> Self {
        Self {
            author: Author::User,
            content: MessageContent::Text(text.into()),
            order_in_chat,
            rating: Rating::Neutral,
            chat_id,
            search_request: false,
            search_response: false,
            is_open: false,
            rating_sync: RatingSync::Synced,
            rating_revision: 0,
        }
    }

    /// Creates a message from fields received over the wire.
    pub fn from_wire(
        author: Author,
        content: String,
        order_in_chat: i64,
        chat_id: Option<ChatId>,
        search_request: bool,
        search_response: bool,
        rating: Rating,
    ) -> Self {
        Self {
            author,
            content: MessageContent::from_wire(content, search_response),
            order_in_chat,
            rating,
            chat_id,
            search_request,
            search_response,
            is_open: false,
            rating_sync: RatingSync::Synced,
            rating_revision: 0,
        }
    }

    /// The label shown next to the message.
    pub fn label(&self) -> &'static str {
        if self.author == Author::User {
            "User"
        } else if self.search_request {
            "Search Query"
        } else if self.search_response {
            "Search Results"
        } else if self.author.is_bot() {
            "GPT"
        } else {
            ""
        }
    }

    /// Only bot messages carry vote buttons.
    pub fn is_ratable(&self) -> bool {
        self.author.is_bot()
    }
}
