//! The chat transcript controller.
//!
//! [`ChatController`] owns the visible transcript of one chat and drives the
//! request flows that change it: submitting a query (and the search follow-up
//! the bot may ask for), loading a stored chat, starting a new chat, and
//! rating replies.
//!
//! All state lives behind a short-lived `std::sync::Mutex` that is never held
//! across an `.await`.  Every operation that replaces the transcript bumps a
//! generation counter, and every network completion re-checks the generation
//! it started under before touching state; completions that lost the race are
//! discarded with [`Error::Abort`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use time::OffsetDateTime;

use crate::auth::SessionManager;
use crate::client::CongressGpt;
use crate::error::{Error, Result};
use crate::observability::{
    RATING_UPDATE_ERRORS, RATING_UPDATES, TRANSCRIPT_REJECTED, TRANSCRIPT_STALE,
    TRANSCRIPT_SUBMIT_DURATION, TRANSCRIPT_SUBMITS,
};
use crate::rating::RatingStore;
use crate::transcript::Transcript;
use crate::types::{
    AskParams, ChatId, LanguageModel, Message, Rating, RatingSync, SearchParams, Vote,
};

/// Queries longer than this many whitespace-separated words are rejected.
pub const MAX_QUERY_WORDS: usize = 500;

/// What the controller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Input is enabled.
    Idle,
    /// A query is in flight; input is disabled.
    Pending,
    /// A stored chat is being loaded.
    LoadingHistory,
}

#[derive(Debug, Default)]
struct State {
    transcript: Transcript,
    chat_id: Option<ChatId>,
    highest_chat_id: Option<ChatId>,
    model: LanguageModel,
    generation: u64,
    next_slot: u64,
    in_flight: Option<u64>,
    loading: Option<u64>,
    rating_revision: u64,
}

impl State {
    fn observe_chat_id(&mut self, chat_id: ChatId) {
        if self.highest_chat_id.is_none_or(|highest| chat_id > highest) {
            self.highest_chat_id = Some(chat_id);
        }
    }

    fn ensure_current(&self, generation: u64, operation: &str) -> Result<()> {
        if self.generation == generation {
            return Ok(());
        }
        TRANSCRIPT_STALE.click();
        tracing::debug!(
            operation,
            started = generation,
            current = self.generation,
            "discarding stale completion"
        );
        Err(Error::abort(format!(
            "{operation} completed after the transcript was replaced"
        )))
    }

    fn finish_rating(&mut self, order_in_chat: i64, revision: u64, outcome: &Result<()>) {
        let Some(message) = self.transcript.get_mut(order_in_chat) else {
            return;
        };
        if message.rating_revision != revision {
            return;
        }
        message.rating_sync = match outcome {
            Ok(()) => RatingSync::Synced,
            Err(err) => RatingSync::Unsynced(err.to_string()),
        };
    }
}

/// Releases the single in-flight slot when a submit finishes or is dropped.
struct InFlight {
    state: Arc<Mutex<State>>,
    slot: u64,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.in_flight == Some(self.slot) {
            state.in_flight = None;
        }
    }
}

/// Clears the loading marker when a history load finishes or is dropped.
struct Loading {
    state: Arc<Mutex<State>>,
    generation: u64,
}

impl Drop for Loading {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.loading == Some(self.generation) {
            state.loading = None;
        }
    }
}

/// Controller for the transcript of the active chat.
///
/// Cloning is cheap and yields another handle to the same transcript, so a
/// clone can be moved into a spawned task while the first handle keeps serving
/// reads.
#[derive(Clone)]
pub struct ChatController {
    client: CongressGpt,
    session: SessionManager,
    ratings: Arc<dyn RatingStore>,
    state: Arc<Mutex<State>>,
}

impl ChatController {
    /// Creates a controller with an empty transcript and no active chat.
    pub fn new(
        client: CongressGpt,
        session: SessionManager,
        ratings: Arc<dyn RatingStore>,
    ) -> Self {
        Self {
            client,
            session,
            ratings,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the API client.
    pub fn client(&self) -> &CongressGpt {
        &self.client
    }

    /// Returns the session manager.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Sends a query and appends the exchange to the transcript.
    ///
    /// The user's message is appended before any network call.  On success
    /// the bot's reply is appended, followed by the search results batch when
    /// the reply asks for a search.  Returns the messages the server added.
    ///
    /// Fails without a network call if the text is empty, longer than
    /// [`MAX_QUERY_WORDS`] words, or another query or history load is already
    /// in flight.  A failed request leaves only the user's message behind.
    /// Replies for a chat other than the active one are a protocol error and
    /// are not appended.
    pub async fn submit_query(&self, text: &str) -> Result<Vec<Message>> {
        validate_query(text).inspect_err(|_| TRANSCRIPT_REJECTED.click())?;

        let (guard, generation, order_in_chat, chat_id, model) = {
            let mut state = self.state();
            if state.in_flight.is_some() {
                TRANSCRIPT_REJECTED.click();
                return Err(Error::busy("a query is already in flight"));
            }
            if state.loading.is_some() {
                TRANSCRIPT_REJECTED.click();
                return Err(Error::busy("a chat is being loaded"));
            }
            let order_in_chat = state.transcript.next_order();
            let chat_id = state.chat_id;
            state
                .transcript
                .push(Message::user(text, order_in_chat, chat_id))?;
            state.next_slot += 1;
            let slot = state.next_slot;
            state.in_flight = Some(slot);
            let guard = InFlight {
                state: Arc::clone(&self.state),
                slot,
            };
            (guard, state.generation, order_in_chat, chat_id, state.model)
        };

        TRANSCRIPT_SUBMITS.click();
        let started = Instant::now();
        let result = self
            .exchange(text, generation, order_in_chat, chat_id, model)
            .await;
        TRANSCRIPT_SUBMIT_DURATION.add(started.elapsed().as_secs_f64());
        drop(guard);
        if let Err(err) = &result
            && !err.is_abort()
        {
            tracing::error!(order_in_chat, chat_id = ?chat_id, error = %err, "query failed");
        }
        result
    }

    async fn exchange(
        &self,
        text: &str,
        generation: u64,
        order_in_chat: i64,
        chat_id: Option<ChatId>,
        model: LanguageModel,
    ) -> Result<Vec<Message>> {
        let token = self.session.valid_token().await?;
        let params = AskParams {
            user_input: text.to_string(),
            email: self.session.user_email().unwrap_or_default(),
            password: token.as_str().to_string(),
            order_in_chat,
            chat_id,
            created_at: OffsetDateTime::now_utc(),
            language_model: model,
        };
        let reply = self.client.ask(&params).await?;
        let reply_chat_id = reply.chat_id;
        let reply = Message::from(reply);
        let search_request = reply.search_request;
        let mut added = vec![reply.clone()];
        {
            let mut state = self.state();
            state.ensure_current(generation, "ask")?;
            if let Some(expected) = chat_id
                && expected != reply_chat_id
            {
                return Err(foreign_chat("ask", expected, reply_chat_id));
            }
            state.transcript.push(reply)?;
            if state.chat_id.is_none() {
                state.chat_id = Some(reply_chat_id);
            }
            state.observe_chat_id(reply_chat_id);
        }
        tracing::debug!(chat_id = %reply_chat_id, order_in_chat, search_request, "bot replied");
        if !search_request {
            return Ok(added);
        }

        let params = SearchParams {
            chat_id: reply_chat_id,
            password: token.as_str().to_string(),
            language_model: model,
        };
        let mut batch: Vec<Message> = self
            .client
            .search(&params)
            .await?
            .into_iter()
            .map(Message::from)
            .collect();
        batch.sort_by_key(|message| message.order_in_chat);
        {
            let mut state = self.state();
            state.ensure_current(generation, "search")?;
            if let Some(other) = batch
                .iter()
                .filter_map(|message| message.chat_id)
                .find(|id| *id != reply_chat_id)
            {
                return Err(foreign_chat("search", reply_chat_id, other));
            }
            state.transcript.extend_sorted(batch.clone())?;
            for message in &batch {
                if let Some(id) = message.chat_id {
                    state.observe_chat_id(id);
                }
            }
        }
        tracing::debug!(chat_id = %reply_chat_id, results = batch.len(), "search results appended");
        added.extend(batch);
        Ok(added)
    }

    /// Replaces the transcript with the stored messages of `chat_id`.
    ///
    /// Any in-flight query is abandoned: its completion will be discarded and
    /// input is re-enabled.  On failure the transcript and active chat are
    /// left as they were.
    pub async fn load_history(&self, chat_id: ChatId) -> Result<Vec<Message>> {
        let (_loading, generation) = {
            let mut state = self.state();
            state.generation += 1;
            state.in_flight = None;
            state.loading = Some(state.generation);
            let loading = Loading {
                state: Arc::clone(&self.state),
                generation: state.generation,
            };
            (loading, state.generation)
        };
        tracing::debug!(%chat_id, generation, "loading history");

        let result = async {
            let token = self.session.valid_token().await?;
            self.client.history(token.as_str(), chat_id).await
        }
        .await;
        let entries = match result {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(%chat_id, error = %err, "failed to load history");
                return Err(err);
            }
        };

        let transcript = Transcript::from_history(chat_id, entries);
        let mut state = self.state();
        state.ensure_current(generation, "load_history")?;
        state.generation += 1;
        state.transcript = transcript;
        state.chat_id = Some(chat_id);
        state.observe_chat_id(chat_id);
        Ok(state.transcript.messages().to_vec())
    }

    /// Clears the transcript and active chat, then checks that the session
    /// token is still usable.
    ///
    /// The chat is cleared even if the token check fails.
    pub async fn start_new_chat(&self) -> Result<()> {
        {
            let mut state = self.state();
            state.generation += 1;
            state.chat_id = None;
            state.transcript.clear();
            state.in_flight = None;
            state.loading = None;
        }
        tracing::debug!("started a new chat");
        if let Err(err) = self.session.valid_token().await {
            tracing::warn!(error = %err, "session is not usable");
            return Err(err);
        }
        Ok(())
    }

    /// Applies `vote` to the bot message at `order_in_chat` and persists it.
    ///
    /// Voting for the active button clears the rating; voting for the other
    /// sets it.  The local rating changes immediately and is marked pending
    /// until the store answers.  A failed update leaves the message
    /// [`RatingSync::Unsynced`] and returns the error.
    pub async fn set_rating(&self, order_in_chat: i64, vote: Vote) -> Result<Rating> {
        let (chat_id, rating, revision) = {
            let mut state = self.state();
            let Some(chat_id) = state.chat_id else {
                return Err(Error::validation(
                    "cannot rate a message before the chat exists",
                    Some("chat_id".to_string()),
                ));
            };
            state.rating_revision += 1;
            let revision = state.rating_revision;
            let message = state
                .transcript
                .get_mut(order_in_chat)
                .ok_or_else(|| missing_message(order_in_chat))?;
            if !message.is_ratable() {
                return Err(Error::validation(
                    format!("message {order_in_chat} cannot be rated"),
                    Some("order_in_chat".to_string()),
                ));
            }
            let rating = message.rating.toggle(vote);
            message.rating = rating;
            message.rating_sync = RatingSync::Pending;
            message.rating_revision = revision;
            (chat_id, rating, revision)
        };

        let outcome = self.persist_rating(chat_id, order_in_chat, rating).await;
        self.state()
            .finish_rating(order_in_chat, revision, &outcome);
        outcome.map(|()| rating)
    }

    async fn persist_rating(&self, chat_id: ChatId, order_in_chat: i64, rating: Rating) -> Result<()> {
        RATING_UPDATES.click();
        let result = async {
            let token = self.session.valid_token().await?;
            self.ratings
                .update_rating(token.as_str(), chat_id, order_in_chat, rating)
                .await
        }
        .await;
        if let Err(err) = &result {
            RATING_UPDATE_ERRORS.click();
            tracing::warn!(%chat_id, order_in_chat, error = %err, "rating update failed");
        }
        result
    }

    /// Re-sends every rating whose last update failed.
    ///
    /// Returns the number of ratings that are now persisted.  Those that fail
    /// again stay unsynced.
    pub async fn resync_ratings(&self) -> Result<usize> {
        let (chat_id, pending) = {
            let mut state = self.state();
            let Some(chat_id) = state.chat_id else {
                return Ok(0);
            };
            let unsynced: Vec<(i64, Rating)> = state
                .transcript
                .messages()
                .iter()
                .filter(|message| message.rating_sync.is_unsynced())
                .map(|message| (message.order_in_chat, message.rating))
                .collect();
            let mut pending = Vec::with_capacity(unsynced.len());
            for (order_in_chat, rating) in unsynced {
                state.rating_revision += 1;
                let revision = state.rating_revision;
                if let Some(message) = state.transcript.get_mut(order_in_chat) {
                    message.rating_sync = RatingSync::Pending;
                    message.rating_revision = revision;
                }
                pending.push((order_in_chat, rating, revision));
            }
            (chat_id, pending)
        };

        let mut synced = 0;
        for (order_in_chat, rating, revision) in pending {
            let outcome = self.persist_rating(chat_id, order_in_chat, rating).await;
            if outcome.is_ok() {
                synced += 1;
            }
            self.state()
                .finish_rating(order_in_chat, revision, &outcome);
        }
        tracing::info!(%chat_id, synced, "resynced ratings");
        Ok(synced)
    }

    /// Expands or collapses the message at `order_in_chat`; returns the new
    /// state.
    pub fn toggle_open(&self, order_in_chat: i64) -> Result<bool> {
        let mut state = self.state();
        let message = state
            .transcript
            .get_mut(order_in_chat)
            .ok_or_else(|| missing_message(order_in_chat))?;
        message.is_open = !message.is_open;
        Ok(message.is_open)
    }

    /// Sets the language model used by later queries.
    pub fn set_model(&self, model: LanguageModel) {
        self.state().model = model;
    }

    /// The language model sent with each query.
    pub fn model(&self) -> LanguageModel {
        self.state().model
    }

    /// The active chat, unset until the first reply of a new chat arrives.
    pub fn chat_id(&self) -> Option<ChatId> {
        self.state().chat_id
    }

    /// The largest chat id seen in any response.
    pub fn highest_chat_id(&self) -> Option<ChatId> {
        self.state().highest_chat_id
    }

    /// A snapshot of the transcript.
    pub fn messages(&self) -> Vec<Message> {
        self.state().transcript.messages().to_vec()
    }

    /// What the controller is doing right now.
    pub fn phase(&self) -> Phase {
        let state = self.state();
        if state.loading.is_some() {
            Phase::LoadingHistory
        } else if state.in_flight.is_some() {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ChatController")
            .field("chat_id", &state.chat_id)
            .field("messages", &state.transcript.len())
            .field("generation", &state.generation)
            .finish()
    }
}

fn missing_message(order_in_chat: i64) -> Error {
    Error::not_found(
        format!("no message at position {order_in_chat}"),
        Some("message".to_string()),
        Some(order_in_chat.to_string()),
    )
}

fn foreign_chat(operation: &str, expected: ChatId, got: ChatId) -> Error {
    Error::protocol(format!(
        "{operation} returned a message for chat {got} while chat {expected} is active"
    ))
}

/// Checks a query against the input rules without sending it.
pub fn validate_query(text: &str) -> Result<()> {
    let words = text.split_whitespace().count();
    if words == 0 {
        return Err(Error::validation(
            "Input cannot be empty",
            Some("user_input".to_string()),
        ));
    }
    if words > MAX_QUERY_WORDS {
        return Err(Error::validation(
            format!("Input exceeds {MAX_QUERY_WORDS} words ({words})"),
            Some("user_input".to_string()),
        ));
    }
    Ok(())
}
