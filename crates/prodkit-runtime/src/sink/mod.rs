//! `MetricsSink` implementations.
//!
//! - `StatsdSink`: DogStatsD datagrams over UDP.
//! - `MemorySink`: in-process store, rendered as text at `/metrics` when no
//!   statsd address is configured and used by tests to observe emissions.

pub mod memory;
pub mod statsd;

pub use memory::{Emission, EmissionKind, MemorySink};
pub use statsd::StatsdSink;
