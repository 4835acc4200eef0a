//! prodkit core: runtime-free contracts shared by the reporter and the health surface.
//!
//! This crate defines the snapshot model, service identity, tag helpers, the
//! metrics-sink seam and the error surface. It intentionally carries no
//! async runtime so it can be reused by alternative sinks and samplers.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! Fallible paths surface as `ProdkitError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod sink;
pub mod stats;
pub mod svcinfo;
pub mod tags;

/// Shared result type.
pub use error::{ProdkitError, Result};
pub use sink::MetricsSink;
pub use stats::{MemStats, RuntimeStats, SizeClassStats, Stats, ToolchainInfo};
pub use svcinfo::{BuildMetadata, ServiceInfo};
