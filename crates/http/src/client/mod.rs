//! JobDM HTTP client

pub mod auth;
pub mod auth_check;
pub mod endpoints;
pub mod error;
pub mod interceptor;
pub mod refresh;
pub mod session;
pub mod token_store;
pub mod user;

use crate::config::{ClientConfig, normalize_base_url};
use crate::types::ApiResponse;
use auth_check::AuthCheck;
use endpoints::PublicEndpoints;
use error::ClientError;
use interceptor::{AuthInterceptor, InFlightRequest, Recovery};
use refresh::SessionRefresher;
use reqwest::{Client, ClientBuilder, Method, Response};
use session::{SessionEvent, SessionEvents};
use std::sync::Arc;
use std::time::Duration;
use token_store::{TokenManager, TokenStore};
use tokio::sync::broadcast;

/// JobDM API client
///
/// Cheap to clone; clones share the token store, the refresh lock and the
/// auth-check cache.
#[derive(Clone)]
pub struct JobdmClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: String,
    tokens: TokenManager,
    events: SessionEvents,
    interceptor: AuthInterceptor,
    auth_check: AuthCheck,
}

impl JobdmClient {
    /// Create a new client with default configuration and in-memory tokens
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> JobdmClientBuilder {
        JobdmClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Token handle shared with the interceptor
    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Subscribe to session lifecycle events
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.inner.events.emit(event);
    }

    /// Cached "is the stored token still accepted" query
    pub fn auth_check(&self) -> &AuthCheck {
        &self.inner.auth_check
    }

    /// Create a request builder for a path under the base URL
    ///
    /// Credentials are attached when the request is sent, not here.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        self.inner.http.request(method, url)
    }

    /// Send a request through the interceptor and decode the response envelope
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        decode_envelope(response).await
    }

    /// Send a request through the interceptor, returning the raw success response
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        self.dispatch(InFlightRequest::new(request.build()?)).await
    }

    /// Send with credentials attached but without 401 recovery
    pub(crate) async fn send_without_refresh(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ClientError> {
        self.dispatch(InFlightRequest::without_refresh(request.build()?))
            .await
    }

    async fn dispatch(&self, mut in_flight: InFlightRequest) -> Result<Response, ClientError> {
        loop {
            let (request, used_token) = self.inner.interceptor.prepare(&in_flight)?;
            debug!(
                method = %request.method(),
                path = %request.url().path(),
                authenticated = used_token.is_some(),
                retried = in_flight.retried(),
                "Sending request"
            );

            let error = match self.inner.http.execute(request).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    // An unreadable body falls back to the status-keyed message
                    let body = response.text().await.unwrap_or_else(|e| {
                        debug!(%status, error = %e, "Failed to read error response body");
                        String::new()
                    });
                    ClientError::from_response(status, &body)
                }
                Err(err) => ClientError::Request(err),
            };

            match self
                .inner
                .interceptor
                .recover(&mut in_flight, used_token.as_deref(), error)
                .await
            {
                Recovery::Retry => {}
                Recovery::Fail(error) => return Err(error),
            }
        }
    }
}

/// Decode an `ApiResponse<T>` body, requiring `success` and a payload
async fn decode_envelope<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ClientError> {
    let body = response.bytes().await?;
    let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;

    match envelope {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiResponse {
            success: true,
            data: None,
            ..
        } => Err(ClientError::MalformedResponse(
            "response did not contain data".into(),
        )),
        ApiResponse { message, .. } => Err(ClientError::Rejected(
            message.unwrap_or_else(|| "Request failed".to_string()),
        )),
    }
}

/// Builder for JobdmClient
#[derive(Default)]
pub struct JobdmClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    auth_check_ttl: Option<Duration>,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl JobdmClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::default()
            .base_url(config.api_url.clone())
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .auth_check_ttl(config.auth_check_ttl())
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set how long a successful auth check is reused
    pub fn auth_check_ttl(mut self, ttl: Duration) -> Self {
        self.auth_check_ttl = Some(ttl);
        self
    }

    /// Set the token store; defaults to an in-memory store
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<JobdmClient, ClientError> {
        let defaults = ClientConfig::default();
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let base_url = normalize_base_url(&base_url)?;

        let timeout = self.timeout.unwrap_or_else(|| defaults.timeout());
        if timeout.is_zero() {
            return Err(ClientError::Configuration(
                "timeout must be greater than zero".into(),
            ));
        }

        let http = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(self.user_agent.unwrap_or(defaults.user_agent.clone()))
            .build()?;

        let tokens = self
            .token_store
            .map_or_else(TokenManager::in_memory, TokenManager::new);
        let events = SessionEvents::new();

        let refresher = SessionRefresher::new(
            http.clone(),
            format!("{base_url}{}", endpoints::auth::REFRESH),
            tokens.clone(),
            events.clone(),
        );
        let interceptor =
            AuthInterceptor::new(tokens.clone(), refresher, PublicEndpoints::default());
        let auth_check = AuthCheck::new(
            tokens.clone(),
            self.auth_check_ttl
                .unwrap_or_else(|| defaults.auth_check_ttl()),
        );

        Ok(JobdmClient {
            inner: Arc::new(Inner {
                http,
                base_url,
                tokens,
                events,
                interceptor,
                auth_check,
            }),
        })
    }
}
