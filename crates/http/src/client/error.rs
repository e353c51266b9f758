//! Client error types

use crate::types::{ApiErrorBody, FieldErrors};
use reqwest::StatusCode;
use thiserror::Error;

/// Message shown for transport failures
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your internet connection.";

/// Message shown when nothing more specific is known
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error, including timeouts
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Credentials rejected or session expired (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other 4xx, possibly carrying field-level messages
    #[error("Bad request {status}: {message}")]
    Validation {
        status: u16,
        message: String,
        errors: FieldErrors,
    },

    /// Server returned a 5xx or an unexpected status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose envelope reported `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A success envelope without the expected payload
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from an HTTP status code and the raw response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        let (message, errors) = match parsed {
            Some(body) => (body.message, body.errors.unwrap_or_default()),
            None if body.trim().is_empty() => (None, FieldErrors::new()),
            None => (Some(body.to_string()), FieldErrors::new()),
        };
        let message = message.unwrap_or_default();

        match status.as_u16() {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            code @ 400..=499 => Self::Validation {
                status: code,
                message,
                errors,
            },
            code => Self::Server {
                status: code,
                message,
            },
        }
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures where no response was received
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// True for a 401 response
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Field-level validation messages; empty unless this is a validation error
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Self::Validation { errors, .. } => errors.clone(),
            _ => FieldErrors::new(),
        }
    }

    /// Human-readable message for display
    pub fn user_message(&self) -> String {
        let backend_message = match self {
            Self::Request(_) => return NETWORK_ERROR_MESSAGE.to_string(),
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Rejected(m)
            | Self::Validation { message: m, .. }
            | Self::Server { message: m, .. } => Some(m.as_str()),
            Self::MalformedResponse(_) | Self::Serialization(_) | Self::Configuration(_) => None,
        };

        if let Some(message) = backend_message.filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }

        match self.status() {
            Some(400) => "Invalid request. Please check your input.",
            Some(401) => "Unauthorized. Please login again.",
            Some(403) => "Access denied. You do not have permission.",
            Some(404) => "Resource not found.",
            Some(500) => "Server error. Please try again later.",
            _ => GENERIC_ERROR_MESSAGE,
        }
        .to_string()
    }
}
