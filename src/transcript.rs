//! The ordered message list of one chat.

use crate::error::{Error, Result};
use crate::types::{ChatId, HistoryEntry, Message};

/// Messages of a single chat, strictly increasing by `order_in_chat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// The order index the next locally-composed message takes.
    pub fn next_order(&self) -> i64 {
        self.messages
            .last()
            .map_or(0, |message| message.order_in_chat + 1)
    }

    /// Appends a message whose order is beyond every held message.
    pub fn push(&mut self, message: Message) -> Result<()> {
        if let Some(last) = self.messages.last()
            && message.order_in_chat <= last.order_in_chat
        {
            return Err(Error::protocol(format!(
                "message order {} does not follow {}",
                message.order_in_chat, last.order_in_chat
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Appends a batch after sorting it ascending.
    ///
    /// Either the whole batch is appended or none of it.
    pub fn extend_sorted(&mut self, mut batch: Vec<Message>) -> Result<()> {
        batch.sort_by_key(|message| message.order_in_chat);
        let mut last = self.messages.last().map(|message| message.order_in_chat);
        for message in &batch {
            if last.is_some_and(|last| message.order_in_chat <= last) {
                return Err(Error::protocol(format!(
                    "message order {} is out of sequence",
                    message.order_in_chat
                )));
            }
            last = Some(message.order_in_chat);
        }
        self.messages.extend(batch);
        Ok(())
    }

    /// Builds a transcript from stored history for `chat_id`.
    ///
    /// Entries are sorted ascending.  Entries for other chats and repeated
    /// order indices are dropped.
    pub fn from_history(chat_id: ChatId, entries: Vec<HistoryEntry>) -> Self {
        let mut messages: Vec<Message> = entries
            .into_iter()
            .filter(|entry| match entry.chat_id {
                Some(other) if other != chat_id => {
                    tracing::warn!(%chat_id, other = %other, order_in_chat = entry.order_in_chat, "dropping history entry from another chat");
                    false
                }
                _ => true,
            })
            .map(|entry| entry.into_message(chat_id))
            .collect();
        messages.sort_by_key(|message| message.order_in_chat);
        messages.dedup_by(|later, earlier| {
            let duplicate = later.order_in_chat == earlier.order_in_chat;
            if duplicate {
                tracing::warn!(%chat_id, order_in_chat = later.order_in_chat, "dropping duplicate history entry");
            }
            duplicate
        });
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, order_in_chat: i64) -> Option<&Message> {
        self.index_of(order_in_chat).map(|index| &self.messages[index])
    }

    pub fn get_mut(&mut self, order_in_chat: i64) -> Option<&mut Message> {
        self.index_of(order_in_chat)
            .map(move |index| &mut self.messages[index])
    }

    fn index_of(&self, order_in_chat: i64) -> Option<usize> {
        self.messages
            .binary_search_by_key(&order_in_chat, |message| message.order_in_chat)
            .ok()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
