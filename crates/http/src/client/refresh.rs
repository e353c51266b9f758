//! Session refresh protocol
//!
//! Invoked by the interceptor after a protected request fails with 401.
//! Refreshes are serialized: when several requests fail together, the first
//! one performs the refresh and the rest reuse the token it stored.

use super::error::ClientError;
use super::session::{ExpiryReason, SessionEvent, SessionEvents};
use super::token_store::TokenManager;
use crate::types::{ApiResponse, RefreshRequest, RefreshResponse, TokenPair};
use tokio::sync::Mutex;

/// Why the session could not be recovered
#[derive(Debug)]
pub enum ExpiryCause {
    /// No refresh token was stored; no refresh call was made
    MissingRefreshToken,
    /// The refresh call itself failed
    RefreshFailed(ClientError),
}

impl ExpiryCause {
    pub const fn reason(&self) -> ExpiryReason {
        match self {
            Self::MissingRefreshToken => ExpiryReason::MissingRefreshToken,
            Self::RefreshFailed(_) => ExpiryReason::RefreshFailed,
        }
    }
}

/// Result of a recovery attempt
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A usable access token is stored; retry with it
    Refreshed { access_token: String },
    /// Tokens were cleared and [`SessionEvent::Expired`] was published
    SessionExpired(ExpiryCause),
}

/// Performs token refreshes against `POST /api/auth/refresh`
pub struct SessionRefresher {
    http: reqwest::Client,
    refresh_url: String,
    tokens: TokenManager,
    events: SessionEvents,
    in_flight: Mutex<()>,
}

impl SessionRefresher {
    /// `http` must be a plain client; refresh calls never pass through the
    /// interceptor
    pub fn new(
        http: reqwest::Client,
        refresh_url: impl Into<String>,
        tokens: TokenManager,
        events: SessionEvents,
    ) -> Self {
        Self {
            http,
            refresh_url: refresh_url.into(),
            tokens,
            events,
            in_flight: Mutex::new(()),
        }
    }

    /// Recover a session after a 401
    ///
    /// `failed_token` is the access token the failed request carried. If the
    /// stored token has changed since, another request already refreshed and
    /// no new refresh is issued.
    pub async fn recover(&self, failed_token: Option<&str>) -> RefreshOutcome {
        let _guard = self.in_flight.lock().await;

        if let Some(current) = self.tokens.access_token() {
            if !current.is_empty() && failed_token != Some(current.as_str()) {
                debug!("Access token was already refreshed by a concurrent request");
                return RefreshOutcome::Refreshed {
                    access_token: current,
                };
            }
        }

        let Some(refresh_token) = self.tokens.refresh_token() else {
            return self.expire(ExpiryCause::MissingRefreshToken);
        };

        match self.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.tokens
                    .set_tokens(&tokens.access_token, &tokens.refresh_token);
                info!(expires_in = %tokens.expires_in, "Session refreshed");
                self.events.emit(SessionEvent::Refreshed);
                RefreshOutcome::Refreshed {
                    access_token: tokens.access_token,
                }
            }
            Err(err) => self.expire(ExpiryCause::RefreshFailed(err)),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        debug!(url = %self.refresh_url, "Refreshing session");
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::from_response(status, &body));
        }

        let envelope: ApiResponse<RefreshResponse> = serde_json::from_str(&body)
            .map_err(|e| ClientError::MalformedResponse(format!("refresh response: {e}")))?;

        match envelope {
            ApiResponse {
                success: true,
                data: Some(RefreshResponse { tokens }),
                ..
            } if !tokens.access_token.is_empty() && !tokens.refresh_token.is_empty() => {
                Ok(tokens)
            }
            ApiResponse {
                success: false,
                message,
                ..
            } => Err(ClientError::Rejected(
                message.unwrap_or_else(|| "Token refresh failed".to_string()),
            )),
            _ => Err(ClientError::MalformedResponse(
                "refresh response did not contain a token pair".into(),
            )),
        }
    }

    fn expire(&self, cause: ExpiryCause) -> RefreshOutcome {
        match &cause {
            ExpiryCause::MissingRefreshToken => {
                warn!("No refresh token stored, ending session");
            }
            ExpiryCause::RefreshFailed(err) => {
                warn!(error = %err, "Token refresh failed, ending session");
            }
        }
        self.tokens.remove_tokens();
        self.events.emit(SessionEvent::Expired {
            reason: cause.reason(),
        });
        RefreshOutcome::SessionExpired(cause)
    }
}
