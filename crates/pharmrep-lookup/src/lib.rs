//! Chat-style doctor lookup.
//!
//! This crate turns free-text questions ("cardiologist in Giza", "Dr. Mona")
//! into doctor searches against the CRM API and renders the answers as chat
//! replies.

pub mod query;
pub mod replies;
pub mod session;

pub use query::*;
pub use replies::*;
pub use session::*;

use pharmrep_core::api::ApiError;
use thiserror::Error;

/// Lookup errors.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Nothing to search for")]
    EmptyQuery,

    #[error("Search failed: {0}")]
    Api(#[from] ApiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LookupError {
    /// Short explanation suitable for a chat bubble.
    pub fn user_message(&self) -> String {
        match self {
            LookupError::EmptyQuery => "there was nothing to search for".into(),
            LookupError::Api(e) if e.is_timeout() => "the server took too long to respond".into(),
            LookupError::Api(ApiError::Transport(_)) => "the server could not be reached".into(),
            LookupError::Api(ApiError::Http { status, message }) => {
                format!("the server answered {} ({})", status, shorten(message))
            }
            LookupError::Api(ApiError::Application(message)) => shorten(message),
            LookupError::Api(_) | LookupError::Json(_) => "the server sent an unexpected response".into(),
        }
    }
}

pub type LookupResult<T> = Result<T, LookupError>;

const SERVER_TEXT_LIMIT: usize = 120;

/// First line of server-supplied text, whitespace collapsed and capped.
fn shorten(message: &str) -> String {
    let line = message.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SERVER_TEXT_LIMIT {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(SERVER_TEXT_LIMIT).collect();
    cut.push('…');
    cut
}
