// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error taxonomy for the prediction workflow
//!
//! - `ValidationError`: rejected locally, never reaches the network
//! - `TransportError`: a failed `/predict` call, surfaced to the user
//! - `StatsFetchError`: a failed `/stats` call, logged only
//! - `ProjectionError`: a statistics payload the charts cannot represent
//! - `ConfigError`: unusable client configuration

use thiserror::Error;

/// Message shown when a transport failure carries no server detail
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some text to analyze")]
    EmptyInput,

    #[error("Text must be at least 10 characters long")]
    TooShort,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The service answered with a non-success status
    #[error("service returned {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// The request never produced a response (connect failure, timeout, ...)
    #[error("request failed: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Text for the inline error banner: the server's `detail` verbatim when
    /// present and non-blank, otherwise the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("statistics refresh failed: {0}")]
pub struct StatsFetchError(#[from] pub TransportError);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("unknown prediction class '{0}' (expected 'Fake News' or 'Real News')")]
    UnknownClass(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid service base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("timeout must be greater than zero seconds")]
    ZeroTimeout,

    #[error("timeout of {secs}s exceeds the {max}s limit")]
    TimeoutTooLarge { secs: u64, max: u64 },

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
