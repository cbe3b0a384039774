//! Use Cases Layer - Feed Polling Core
//!
//! Orchestrates domain types with the transport port to keep every
//! subscribed feed polled, cached and projected for rendering.
//!
//! Use cases:
//! - `FetchGuard`: deadline + error classification around one GET
//! - `FeedCache`: last-known-good slot per key, single writer
//! - `PollingController`: single-flight periodic refresh task
//! - `FeedRegistry`: reference-counted table of live feeds
//! - `ViewAdapter`: render-safe `{data, is_loading, is_stale}` view

pub mod feed_cache;
pub mod feed_registry;
pub mod fetch_guard;
pub mod polling_controller;
pub mod view_adapter;

pub use feed_cache::FeedCache;
pub use feed_registry::{FeedRegistry, SubscriptionHandle};
pub use fetch_guard::FetchGuard;
pub use polling_controller::{ControllerPhase, PollingController};
pub use view_adapter::{FeedView, ViewAdapter};
