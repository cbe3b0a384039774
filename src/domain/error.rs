//! Error Types - Fetch Failures and Contract Violations
//!
//! `FetchError` is absorbed by the polling loop and never escapes the
//! registry. `SubscribeError` and `FeedKeyError` report caller misuse
//! synchronously.

use std::time::Duration;

use thiserror::Error;

/// Classified outcome of a failed feed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure: DNS, refused connection, non-2xx status.
    #[error("network error: {0}")]
    Network(String),
    /// The fetch did not complete within its deadline.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    /// The body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Well-formed but empty payload; stale data is preferred.
    #[error("empty payload")]
    Empty,
}

impl FetchError {
    /// Short label used for metrics and structured logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Decode(_) => "decode",
            Self::Empty => "empty",
        }
    }
}

/// Contract violation reported at subscribe time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// Zero interval or zero timeout.
    #[error("invalid poll schedule: {0}")]
    InvalidSchedule(String),
    /// Subscribing requires a running tokio runtime to host the poller.
    #[error("no tokio runtime available to run the poller")]
    NoRuntime,
    /// The registry was shut down while the subscription was set up.
    #[error("feed registry is shut down")]
    RegistryClosed,
}

/// Malformed feed key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedKeyError {
    #[error("feed name must not be empty")]
    EmptyName,
    #[error("invalid feed name {0:?}: use lowercase letters, digits, '-' or '_'")]
    InvalidName(String),
    #[error("invalid feed limit {0:?}")]
    InvalidLimit(String),
    #[error("feed limit must be greater than zero")]
    ZeroLimit,
}
