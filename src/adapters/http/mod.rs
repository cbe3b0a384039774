//! HTTP Adapters - Dashboard API Transport
//!
//! Implements the `FeedTransport` port over reqwest.

pub mod client;

pub use client::{ApiClient, ApiClientConfig};
