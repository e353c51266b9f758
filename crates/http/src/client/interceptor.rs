//! Request/response interception for bearer authentication
//!
//! The request side attaches the stored access token. The response side
//! decides whether a failure is a session expiry worth recovering from and
//! drives [`SessionRefresher`] when it is.

use super::endpoints::PublicEndpoints;
use super::error::ClientError;
use super::refresh::{ExpiryCause, RefreshOutcome, SessionRefresher};
use super::token_store::TokenManager;
use reqwest::Request;
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// One logical request across its original attempt and at most one retry
pub struct InFlightRequest {
    template: Request,
    retried: bool,
    replacement_token: Option<String>,
}

impl InFlightRequest {
    pub fn new(request: Request) -> Self {
        Self {
            template: request,
            retried: false,
            replacement_token: None,
        }
    }

    /// A request whose 401 is reported as-is, without a refresh attempt
    pub fn without_refresh(request: Request) -> Self {
        Self {
            template: request,
            retried: true,
            replacement_token: None,
        }
    }

    pub const fn retried(&self) -> bool {
        self.retried
    }

    /// Target path of the request
    pub fn path(&self) -> &str {
        self.template.url().path()
    }

    fn attempt(&self) -> Result<Request, ClientError> {
        self.template.try_clone().ok_or_else(|| {
            ClientError::Configuration("request body cannot be replayed".into())
        })
    }
}

/// Outcome of the response phase for a failed attempt
#[derive(Debug)]
pub enum Recovery {
    /// Send the request again
    Retry,
    /// Give up and report this error
    Fail(ClientError),
}

/// Attaches credentials and recovers from expired sessions
pub struct AuthInterceptor {
    tokens: TokenManager,
    refresher: SessionRefresher,
    public: PublicEndpoints,
}

impl AuthInterceptor {
    pub fn new(
        tokens: TokenManager,
        refresher: SessionRefresher,
        public: PublicEndpoints,
    ) -> Self {
        Self {
            tokens,
            refresher,
            public,
        }
    }

    /// Build the next attempt of `in_flight` with credentials attached
    ///
    /// Returns the request and the access token it carries, if any.
    pub fn prepare(
        &self,
        in_flight: &InFlightRequest,
    ) -> Result<(Request, Option<String>), ClientError> {
        let mut request = in_flight.attempt()?;
        let token = in_flight
            .replacement_token
            .clone()
            .or_else(|| self.tokens.access_token())
            .filter(|t| !t.is_empty());

        if let Some(token) = &token {
            attach_token(&mut request, token)?;
        }
        Ok((request, token))
    }

    /// Whether a failed attempt should go through the refresh protocol
    pub fn should_refresh(&self, in_flight: &InFlightRequest, error: &ClientError) -> bool {
        error.is_unauthorized() && !in_flight.retried() && !self.public.matches(in_flight.path())
    }

    /// Response phase for a failed attempt
    pub async fn recover(
        &self,
        in_flight: &mut InFlightRequest,
        used_token: Option<&str>,
        error: ClientError,
    ) -> Recovery {
        if !self.should_refresh(in_flight, &error) {
            return Recovery::Fail(error);
        }
        in_flight.retried = true;
        debug!(path = %in_flight.path(), "Received 401, attempting session recovery");

        match self.refresher.recover(used_token).await {
            RefreshOutcome::Refreshed { access_token } => {
                in_flight.replacement_token = Some(access_token);
                Recovery::Retry
            }
            RefreshOutcome::SessionExpired(ExpiryCause::MissingRefreshToken) => {
                Recovery::Fail(error)
            }
            RefreshOutcome::SessionExpired(ExpiryCause::RefreshFailed(refresh_error)) => {
                Recovery::Fail(refresh_error)
            }
        }
    }
}

/// Set `Authorization: Bearer <token>` on a request
pub fn attach_token(request: &mut Request, token: &str) -> Result<(), ClientError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ClientError::Configuration("access token is not a valid header value".into())
    })?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}
