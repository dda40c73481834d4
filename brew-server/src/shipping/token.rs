//! Bearer token cache for the shipping provider
//!
//! The provider issues tokens valid for about ten days. The cache refreshes
//! ahead of that and holds the lock across the login call, so concurrent
//! callers that find the token stale wait for one refresh instead of each
//! logging in.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default lifetime, one day short of the provider's validity
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(9 * 24 * 60 * 60);

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct TokenCache {
    ttl: Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token, or run `login` once to obtain a fresh one
    pub async fn get_valid_token<F, Fut, E>(&self, login: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.token.clone());
        }

        let token = login().await?;
        tracing::debug!(ttl_secs = self.ttl.as_secs(), "Shipping token refreshed");
        *slot = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        Ok(token)
    }

    /// Drop the cached token, e.g. after the provider answered 401
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL)
    }
}
