//! "Is the stored token still accepted?" query
//!
//! Presence of a token is not proof of a session. [`JobdmClient::check_auth`]
//! asks the backend via `GET /api/auth/me` and caches a positive answer for a
//! short time. It only reports; acting on an unauthenticated result is up to
//! the caller.

use super::JobdmClient;
use super::error::ClientError;
use super::token_store::TokenManager;
use crate::types::User;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Authentication status of the current session
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Authenticated(User),
    Unauthenticated {
        /// Display message when the check failed, `None` when no token was stored
        error: Option<String>,
    },
}

impl AuthStatus {
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated { .. } => None,
        }
    }
}

struct CachedUser {
    generation: u64,
    checked_at: Instant,
    user: User,
}

/// Cache and coalescing for auth checks
pub struct AuthCheck {
    tokens: TokenManager,
    ttl: Duration,
    cache: Mutex<Option<CachedUser>>,
}

impl AuthCheck {
    pub(crate) fn new(tokens: TokenManager, ttl: Duration) -> Self {
        Self {
            tokens,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Drop any cached result
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }

    /// Resolve the status, calling `fetch` only when the cache cannot answer
    ///
    /// Calls are serialized, so a burst of checks results in one fetch. A
    /// cached user is discarded once the TTL passes or the stored tokens are
    /// written or cleared.
    pub(crate) async fn resolve<F, Fut>(&self, fetch: F) -> AuthStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<User, ClientError>>,
    {
        if !self.tokens.has_access_token() {
            return AuthStatus::Unauthenticated { error: None };
        }

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.generation == self.tokens.generation() && cached.checked_at.elapsed() < self.ttl
            {
                trace!("Auth check answered from cache");
                return AuthStatus::Authenticated(cached.user.clone());
            }
        }
        *cache = None;

        match fetch().await {
            Ok(user) => {
                // Read after the fetch: a refresh during the call is part of this answer
                *cache = Some(CachedUser {
                    generation: self.tokens.generation(),
                    checked_at: Instant::now(),
                    user: user.clone(),
                });
                AuthStatus::Authenticated(user)
            }
            Err(err) => {
                debug!(error = %err, "Auth check failed");
                AuthStatus::Unauthenticated {
                    error: Some(err.user_message()),
                }
            }
        }
    }
}

impl JobdmClient {
    /// Check whether the stored access token is accepted by the backend
    ///
    /// Without a stored token this returns immediately without a network call.
    pub async fn check_auth(&self) -> AuthStatus {
        self.auth_check().resolve(|| self.current_user()).await
    }
}
