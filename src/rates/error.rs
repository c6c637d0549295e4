//! Rate lookup error types

use serde::Serialize;
use thiserror::Error;

/// Rate lookup error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RateError {
    pub kind: RateErrorKind,
    pub message: String,
}

impl RateError {
    pub fn new(kind: RateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RateErrorKind::Network, message)
    }

    pub fn http(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("Rate service returned HTTP {status}")
        } else {
            format!("Rate service returned HTTP {status}: {body}")
        };
        Self::new(RateErrorKind::Http, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(RateErrorKind::InvalidResponse, message)
    }
}

impl From<reqwest::Error> for RateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::invalid_response(format!("Undecodable rate response: {e}"))
        } else if let Some(status) = e.status() {
            Self::http(status.as_u16(), "")
        } else {
            Self::network(format!("Rate request failed: {e}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateErrorKind {
    /// Connect failures and timeouts
    Network,
    /// Non-2xx status from the service
    Http,
    /// Body did not contain a usable rate
    InvalidResponse,
}
