//! Error types for webhook exchanges.
//!
//! Every failure of a send cycle is classified at the call site into one of
//! four tagged variants. The session turns the variant into a single
//! user-visible error message; nothing propagates further up.

use std::time::Duration;

use thiserror::Error;

/// Shown when an attempt does not settle before its deadline.
pub const TIMEOUT_TEXT: &str = "Request timed out. Please try again.";

/// Shown when the webhook could not be reached at all.
pub const NETWORK_TEXT: &str = "Unable to connect. Please check your connection.";

/// Shown for anything that is not otherwise classified.
pub const UNKNOWN_TEXT: &str = "Sorry, something went wrong.";

/// Webhook exchange error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The attempt did not settle before its deadline.
    #[error("request timeout after {}ms", .after.as_millis())]
    Timeout {
        /// Deadline that elapsed.
        after: Duration,
    },

    /// No response was received (DNS, connect, TLS, reset...).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The webhook answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase, possibly empty.
        reason: String,
    },

    /// Anything else, e.g. a reply body that is not JSON.
    #[error("{0}")]
    Unknown(String),
}

impl ChatError {
    /// Text of the error message appended to the conversation.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } => TIMEOUT_TEXT.to_string(),
            Self::NetworkFailure(_) => NETWORK_TEXT.to_string(),
            Self::HttpStatus { .. } => format!("Server error: {self}"),
            Self::Unknown(_) => UNKNOWN_TEXT.to_string(),
        }
    }

    /// Whether the webhook never produced a response for this attempt.
    ///
    /// Only these failures trigger the GET fallback.
    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NetworkFailure(_))
    }
}

/// Result type alias for webhook operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_text() {
        let err = ChatError::Timeout {
            after: Duration::from_millis(15_000),
        };
        assert_eq!(err.user_message(), TIMEOUT_TEXT);
        assert_eq!(err.to_string(), "request timeout after 15000ms");
    }

    #[test]
    fn test_http_status_embeds_code() {
        let err = ChatError::HttpStatus {
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "Server error: HTTP 500: Internal Server Error"
        );
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(ChatError::NetworkFailure("refused".into()).is_unanswered());
        assert!(
            ChatError::Timeout {
                after: Duration::from_secs(1)
            }
            .is_unanswered()
        );
        assert!(
            !ChatError::HttpStatus {
                status: 404,
                reason: String::new()
            }
            .is_unanswered()
        );
        assert!(!ChatError::Unknown("bad json".into()).is_unanswered());
    }

    #[test]
    fn test_unknown_is_generic() {
        let err = ChatError::Unknown("expected value at line 1".into());
        assert_eq!(err.user_message(), UNKNOWN_TEXT);
        assert_eq!(ChatError::NetworkFailure("x".into()).user_message(), NETWORK_TEXT);
    }
}
