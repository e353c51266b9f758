//! Session lifecycle events
//!
//! The client never navigates anywhere itself. It publishes what happened to
//! the session and lets the shell that owns the user interface decide.

use tokio::sync::broadcast;

/// Notice to show when a session cannot be recovered
pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please login again.";

const EVENT_CAPACITY: usize = 16;

/// Why a session was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// A protected call returned 401 and no refresh token was stored
    MissingRefreshToken,
    /// The refresh call failed or returned an unusable payload
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens were issued by login or OTP verification
    LoggedIn,
    /// Tokens were replaced by a refresh
    Refreshed,
    /// Tokens were cleared; the user has to log in again
    Expired { reason: ExpiryReason },
    /// The user logged out
    LoggedOut,
}

impl SessionEvent {
    /// User-facing notice for events that need one
    pub const fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Expired { .. } => Some(SESSION_EXPIRED_NOTICE),
            _ => None,
        }
    }
}

/// Fan-out of [`SessionEvent`]s to any number of listeners
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; dropped silently when nobody is listening
    pub fn emit(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        let _ = self.sender.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
