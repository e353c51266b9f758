//! JobDM HTTP client
//!
//! Typed access to the JobDM REST backend. Every authenticated call goes
//! through [`client::interceptor::AuthInterceptor`], which attaches the stored
//! access token and, on a 401 from a protected endpoint, runs the session
//! refresh protocol before retrying the original request once.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod config;
pub mod types;

pub use client::error::ClientError;
pub use client::session::{ExpiryReason, SessionEvent};
pub use client::token_store::{FileTokenStore, MemoryTokenStore, TokenManager, TokenStore};
pub use client::{JobdmClient, JobdmClientBuilder};
pub use config::ClientConfig;
