//! The list of the user's past chats.

use crate::auth::SessionManager;
use crate::client::CongressGpt;
use crate::controller::ChatController;
use crate::error::{Error, Result};
use crate::types::{ChatId, ChatSummary, Message};

/// How a chat is picked from the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSelection {
    /// Zero-based position in [`HistorySelector::chats`].
    Index(usize),
    /// A chat id, whether listed or not.
    Id(ChatId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadKey {
    token: String,
    highest_chat_id: Option<ChatId>,
}

/// Keeps the chat list in step with the session and the newest chat.
///
/// The list is reloaded only when the session token or the highest chat id
/// seen by the controller changes, so a new chat appears after its first
/// reply without refetching on every turn.
#[derive(Debug)]
pub struct HistorySelector {
    client: CongressGpt,
    chats: Vec<ChatSummary>,
    loaded: Option<LoadKey>,
}

impl HistorySelector {
    pub fn new(client: CongressGpt) -> Self {
        Self {
            client,
            chats: Vec::new(),
            loaded: None,
        }
    }

    /// Reloads the list if the token or `highest_chat_id` changed since the
    /// last successful load.  Returns true if a reload happened.
    ///
    /// A failed reload keeps the previous list.
    pub async fn refresh(
        &mut self,
        session: &SessionManager,
        highest_chat_id: Option<ChatId>,
    ) -> Result<bool> {
        let token = session.valid_token().await?;
        let key = LoadKey {
            token: token.as_str().to_string(),
            highest_chat_id,
        };
        if self.loaded.as_ref() == Some(&key) {
            return Ok(false);
        }
        self.load(key).await?;
        Ok(true)
    }

    /// Reloads the list unconditionally.
    pub async fn force_refresh(
        &mut self,
        session: &SessionManager,
        highest_chat_id: Option<ChatId>,
    ) -> Result<()> {
        let token = session.valid_token().await?;
        self.load(LoadKey {
            token: token.as_str().to_string(),
            highest_chat_id,
        })
        .await
    }

    async fn load(&mut self, key: LoadKey) -> Result<()> {
        match self.client.history_bar(&key.token).await {
            Ok(chats) => {
                tracing::debug!(chats = chats.len(), "loaded chat list");
                self.chats = chats;
                self.loaded = Some(key);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load chat list");
                Err(err)
            }
        }
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    /// Resolves `selection` to a chat id.
    pub fn resolve(&self, selection: ChatSelection) -> Result<ChatId> {
        match selection {
            ChatSelection::Id(chat_id) => Ok(chat_id),
            ChatSelection::Index(index) => self
                .chats
                .get(index)
                .map(|chat| chat.chat_id)
                .ok_or_else(|| {
                    Error::not_found(
                        format!("no chat at position {index}"),
                        Some("chat".to_string()),
                        Some(index.to_string()),
                    )
                }),
        }
    }

    /// Opens the selected chat in `controller`.
    pub async fn select(
        &self,
        controller: &ChatController,
        selection: ChatSelection,
    ) -> Result<Vec<Message>> {
        let chat_id = self.resolve(selection)?;
        controller.load_history(chat_id).await
    }

    /// Returns true if `chat_id` is the controller's active chat.
    pub fn is_active(&self, controller: &ChatController, chat_id: ChatId) -> bool {
        controller.chat_id() == Some(chat_id)
    }
}
