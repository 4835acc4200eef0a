//! In-process metrics sink.
//!
//! Series are keyed by `(name, sorted tags)` in `DashMap`s: gauges keep the
//! latest value (stored as `f64` bits), counters sum their deltas and timings
//! keep a count and a nanosecond sum. `render` produces a Prometheus-style
//! text dump. A recording sink additionally keeps every emission in order.

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use prodkit_core::error::{ProdkitError, Result};
use prodkit_core::MetricsSink;

type SeriesKey = (String, Vec<String>);

fn series_key(name: &str, tags: &[String]) -> SeriesKey {
    let mut tags = tags.to_vec();
    tags.sort();
    (name.to_string(), tags)
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn render_labels(tags: &[String]) -> String {
    tags.iter()
        .map(|t| match t.split_once(':') {
            Some((k, v)) => format!("{}=\"{}\"", k, escape_label(v)),
            None => format!("tag=\"{}\"", escape_label(t)),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn metric_name(name: &str) -> String {
    name.replace('.', "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionKind {
    Gauge,
    Count,
    Timing,
}

/// One call made against the sink.
#[derive(Debug, Clone)]
pub struct Emission {
    pub kind: EmissionKind,
    pub name: String,
    /// Gauge value, counter delta, or timing in nanoseconds.
    pub value: f64,
    pub tags: Vec<String>,
    pub rate: f64,
    pub at: Instant,
}

#[derive(Default)]
struct TimingSeries {
    count: AtomicU64,
    sum_nanos: AtomicU64,
}

#[derive(Default)]
pub struct MemorySink {
    gauges: DashMap<SeriesKey, AtomicU64>,
    counters: DashMap<SeriesKey, AtomicI64>,
    timings: DashMap<SeriesKey, TimingSeries>,
    log: Option<Mutex<Vec<Emission>>>,
    failing: AtomicBool,
}

impl MemorySink {
    /// Latest-value store without an emission log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that also records every emission in order.
    pub fn recording() -> Self {
        Self {
            log: Some(Mutex::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Make every call fail (after recording it).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.log.as_ref().map(|l| l.lock().clone()).unwrap_or_default()
    }

    /// Recorded emissions with the given name.
    pub fn named(&self, name: &str) -> Vec<Emission> {
        self.log
            .as_ref()
            .map(|l| l.lock().iter().filter(|e| e.name == name).cloned().collect())
            .unwrap_or_default()
    }

    pub fn gauge_value(&self, name: &str, tags: &[String]) -> Option<f64> {
        self.gauges
            .get(&series_key(name, tags))
            .map(|g| f64::from_bits(g.load(Ordering::Relaxed)))
    }

    pub fn counter_value(&self, name: &str, tags: &[String]) -> Option<i64> {
        self.counters
            .get(&series_key(name, tags))
            .map(|c| c.load(Ordering::Relaxed))
    }

    /// Number of distinct gauge series.
    pub fn gauge_series(&self) -> usize {
        self.gauges.len()
    }

    fn record(&self, kind: EmissionKind, name: &str, value: f64, tags: &[String], rate: f64) -> Result<()> {
        if let Some(log) = &self.log {
            log.lock().push(Emission {
                kind,
                name: name.to_string(),
                value,
                tags: tags.to_vec(),
                rate,
                at: Instant::now(),
            });
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(ProdkitError::Sink(format!("{name}: sink unavailable")));
        }
        Ok(())
    }

    /// Render in Prometheus text exposition format (timings in nanoseconds).
    pub fn render(&self) -> String {
        let mut out = String::new();

        let mut gauges: Vec<_> = self
            .gauges
            .iter()
            .map(|r| (r.key().clone(), f64::from_bits(r.value().load(Ordering::Relaxed))))
            .collect();
        gauges.sort_by(|a, b| a.0.cmp(&b.0));
        let mut last_name = String::new();
        for ((name, tags), val) in gauges {
            let name = metric_name(&name);
            if name != last_name {
                let _ = writeln!(out, "# TYPE {} gauge", name);
                last_name = name.clone();
            }
            let _ = writeln!(out, "{}{{{}}} {}", name, render_labels(&tags), val);
        }

        let mut counters: Vec<_> = self
            .counters
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        counters.sort_by(|a, b| a.0.cmp(&b.0));
        for ((name, tags), val) in counters {
            let name = format!("{}_total", metric_name(&name));
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{}{{{}}} {}", name, render_labels(&tags), val);
        }

        let mut timings: Vec<_> = self
            .timings
            .iter()
            .map(|r| {
                let t = r.value();
                (
                    r.key().clone(),
                    t.count.load(Ordering::Relaxed),
                    t.sum_nanos.load(Ordering::Relaxed),
                )
            })
            .collect();
        timings.sort_by(|a, b| a.0.cmp(&b.0));
        for ((name, tags), count, sum) in timings {
            let name = format!("{}_nanos", metric_name(&name));
            let labels = render_labels(&tags);
            let _ = writeln!(out, "# TYPE {} summary", name);
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, count);
        }

        out
    }
}

#[async_trait]
impl MetricsSink for MemorySink {
    async fn gauge(&self, name: &str, value: f64, tags: &[String], rate: f64) -> Result<()> {
        self.record(EmissionKind::Gauge, name, value, tags, rate)?;
        self.gauges
            .entry(series_key(name, tags))
            .or_insert_with(|| AtomicU64::new(0))
            .store(value.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    async fn count(&self, name: &str, delta: i64, tags: &[String], rate: f64) -> Result<()> {
        self.record(EmissionKind::Count, name, delta as f64, tags, rate)?;
        self.counters
            .entry(series_key(name, tags))
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
        Ok(())
    }

    async fn timing(&self, name: &str, value: Duration, tags: &[String], rate: f64) -> Result<()> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        self.record(EmissionKind::Timing, name, nanos as f64, tags, rate)?;
        let series = self.timings.entry(series_key(name, tags)).or_default();
        series.count.fetch_add(1, Ordering::Relaxed);
        series.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        Ok(())
    }
}
