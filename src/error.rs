//! Error taxonomy for the resolution pipeline.
//!
//! Every stage returns a [`ResolveError`] so callers can tell an auth
//! rejection apart from a missing track or a generic upstream failure. The
//! type is `Clone` because a single credential refresh fans its outcome out
//! to every waiter.

use thiserror::Error;

/// Failure raised anywhere between credential scraping and the final URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No token could be scraped from the platform's public assets.
    #[error("credential acquisition failed: {0}")]
    CredentialAcquisition(String),

    /// The upstream rejected the credential (401/403).
    #[error("upstream rejected the credential")]
    UpstreamAuth,

    /// Non-auth upstream failure. `status` is `None` for network errors.
    #[error("upstream error{}: {message}", status_suffix(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// The upstream has no such content.
    #[error("content not found")]
    NotFound,

    /// No variant satisfies the requested capabilities.
    #[error("no acceptable variant")]
    NoVariant,

    /// Caller supplied missing or malformed input.
    #[error("{0}")]
    Validation(String),
}

impl ResolveError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Network failures and 5xx responses. These are the only errors the
    /// transient-retry policy touches.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => status.map_or(true, |s| s >= 500),
            _ => false,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_decode() {
            return Self::upstream(status, format!("malformed response: {err}"));
        }
        Self::upstream(status, err.to_string())
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        Self::upstream(None, format!("malformed response: {err}"))
    }
}

impl From<url::ParseError> for ResolveError {
    fn from(err: url::ParseError) -> Self {
        Self::Validation(format!("invalid url: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
