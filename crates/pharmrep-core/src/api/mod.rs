//! Typed wrappers over the remote CRM API.
//!
//! One method per endpoint on [`ApiClient`]; HTTP goes through an
//! [`HttpTransport`] so tests can script the server with [`MockTransport`].

mod client;
mod mock;
mod transport;

pub use client::*;
pub use mock::*;
pub use transport::*;

use thiserror::Error;

/// API errors, one variant per failure kind.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No HTTP response (connect failure, timeout)
    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    /// Non-2xx response with the server-supplied message
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// `{success: false, message}` inside a 2xx response
    #[error("Request failed: {0}")]
    Application(String),

    /// Successful call that returned nothing for the requested record
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport(e) if e.is_timeout())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_)) || self.status() == Some(404)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = ApiError::from(TransportError::Timeout("10s".into()));
        assert!(timeout.is_timeout());
        assert_eq!(timeout.status(), None);

        let missing = ApiError::Http {
            status: 404,
            message: "Not Found".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_timeout());

        assert!(ApiError::NotFound("user 7".into()).is_not_found());
        assert!(!ApiError::Application("nope".into()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = ApiError::Http {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}
