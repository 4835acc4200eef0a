//! prodkit runtime library entry.
//!
//! This crate wires the runtime-metrics reporter, the allocation counters,
//! the metrics sinks and the `/healthz` HTTP surface into one stack. It is
//! consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod alloc;
pub mod app_state;
pub mod config;
pub mod ops;
pub mod reporter;
pub mod router;
pub mod sink;

pub use reporter::{Reporter, ReporterConfig, StatsHandle};
