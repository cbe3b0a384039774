//! microterm-feeds - Library Root
//!
//! Polling, caching and staleness core for the microterm dashboard
//! feeds. Re-exports all modules for integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
