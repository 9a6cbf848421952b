//! Session-scoped cache for the backend's anti-forgery token.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;

/// Holds the CSRF token for the lifetime of one API client.
///
/// The token is fetched on first use and reused for every mutating call.
/// Concurrent first uses share a single fetch.  The cache is cleared with
/// [`CsrfCache::invalidate`] when the server rejects a token, and never
/// outlives the client that owns it.
#[derive(Debug, Clone, Default)]
pub struct CsrfCache {
    token: Arc<Mutex<Option<String>>>,
}

impl CsrfCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, fetching it with `fetch` if absent.
    ///
    /// A failed fetch leaves the cache empty so the next call tries again.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = fetch().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Returns the cached token without fetching.
    pub async fn peek(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    /// Drops the cached token.
    pub async fn invalidate(&self) {
        self.token.lock().await.take();
    }
}
