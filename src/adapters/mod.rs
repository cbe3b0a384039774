//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies.
//!
//! Adapter categories:
//! - `http`: rate-limited same-origin client for the dashboard API
//! - `metrics`: Prometheus export and health checks

pub mod http;
pub mod metrics;
