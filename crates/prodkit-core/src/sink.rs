//! Metrics sink seam.
//!
//! The reporter only ever talks to a backend through this trait. Calls are
//! best-effort: callers log and drop errors instead of retrying.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Backend accepting gauges, counters and timings (DogStatsD-style).
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn gauge(&self, name: &str, value: f64, tags: &[String], rate: f64) -> Result<()>;
    async fn count(&self, name: &str, delta: i64, tags: &[String], rate: f64) -> Result<()>;
    async fn timing(&self, name: &str, value: Duration, tags: &[String], rate: f64) -> Result<()>;
}
