//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `FeedTransport`: raw GET of a same-origin feed path
//! - `FeedTelemetry`: fetch outcomes, commits and subscriber counts

pub mod telemetry;
pub mod transport;

pub use telemetry::{FeedTelemetry, NoopTelemetry};
pub use transport::FeedTransport;
