//! Failure taxonomy for page fetches
//!
//! Every failure below the coordinator is classified into one of these
//! variants before it crosses the coordinator boundary. Callers only ever see
//! this closed set plus the display string from [`Failure::user_message`].

use thiserror::Error;

/// Why a page fetch did not produce a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// A newer request superseded this one
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a non-2xx status
    #[error("HTTP {status}")]
    Http {
        /// Response status code
        status: u16,
    },

    /// The host reports no network connectivity
    #[error("network offline")]
    NetworkOffline,

    /// Anything else: transport errors, malformed bodies, crashed tasks
    #[error("unexpected failure: {reason}")]
    Unexpected {
        /// Diagnostic detail for logs
        reason: String,
        /// Whether another attempt may succeed
        transient: bool,
    },
}

impl Failure {
    /// Creates a non-retryable `Unexpected` failure
    pub fn unexpected(reason: impl Into<String>) -> Self {
        Failure::Unexpected {
            reason: reason.into(),
            transient: false,
        }
    }

    /// Creates a retryable `Unexpected` failure
    pub fn transient(reason: impl Into<String>) -> Self {
        Failure::Unexpected {
            reason: reason.into(),
            transient: true,
        }
    }

    /// Maps a non-success status code to a failure
    pub fn from_status(status: u16) -> Self {
        Failure::Http { status }
    }

    /// Whether this failure is a supersession
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Failure::Cancelled)
    }

    /// Whether the retrier may attempt the request again
    ///
    /// Only server errors (5xx) and transient transport errors qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Failure::Http { status } => *status >= 500,
            Failure::Unexpected { transient, .. } => *transient,
            Failure::Cancelled | Failure::NetworkOffline => false,
        }
    }

    /// Message to show the user, or `None` when the failure must stay silent
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            Failure::Cancelled => return None,
            Failure::Http { status: 400 } => {
                "Bad request. Check your search and try again.".to_string()
            }
            Failure::Http { status: 404 } => "The requested resource was not found.".to_string(),
            Failure::Http { status } if *status >= 500 => {
                "Server error. Please try again later.".to_string()
            }
            Failure::Http { status } => format!("HTTP error {}.", status),
            Failure::NetworkOffline => {
                "No internet connection. Check your network and try again.".to_string()
            }
            Failure::Unexpected { .. } => "Something went wrong. Please try again.".to_string(),
        };
        Some(message)
    }
}
