//! Domain layer - Feed identity, cache entries and payloads.
//!
//! Pure data and rules with no I/O (hexagonal architecture inner ring).
//! Everything here is testable in isolation.

pub mod entry;
pub mod error;
pub mod feed;
pub mod payloads;

// Re-export core types for convenience
pub use entry::{FeedEntry, FeedState};
pub use error::{FeedKeyError, FetchError, SubscribeError};
pub use feed::{FeedKey, FeedKind, PollSchedule};
pub use payloads::{
    Deal, FeedPayload, FeedValue, ItemId, MarketQuote, NewsItem, Sentiment, WhaleAlert,
};
