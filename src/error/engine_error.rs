//! Failures reported by the remote execution engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";

/// Error returned by a [`RemoteEngine`](crate::core::engine::RemoteEngine) call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
            retry_after_ms: None,
        }
    }

    pub fn rate_limited(retry_after_ms: Option<u64>) -> Self {
        let retry = retry_after_ms.unwrap_or(1000);
        Self {
            message: format!("Rate limit exceeded. Retry after {}ms", retry),
            code: Some(RATE_LIMIT_EXCEEDED.to_string()),
            status: Some(429),
            retry_after_ms,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Rate-limited errors are the only ones worth retrying.
    pub fn is_rate_limited(&self) -> bool {
        self.code.as_deref() == Some(RATE_LIMIT_EXCEEDED) || self.status == Some(429)
    }
}
