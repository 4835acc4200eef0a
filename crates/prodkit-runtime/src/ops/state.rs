//! Health state shared by the `/healthz` handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prodkit_core::MetricsSink;

use crate::reporter::StatsHandle;

/// Exit code used by `/healthz/diediedie`.
pub const DIE_EXIT_CODE: i32 = 255;

/// Action run by `/healthz/diediedie`.
pub type ExitHook = Arc<dyn Fn() + Send + Sync>;

fn exit_process() {
    std::process::exit(DIE_EXIT_CODE)
}

/// Wiring for `Healthz::new`.
#[derive(Clone)]
pub struct HealthzOptions {
    /// Sink for per-request timings (`healthz.ready`, ...).
    pub sink: Option<Arc<dyn MetricsSink>>,
    /// Sample rate for those timings.
    pub sample_rate: f64,
    /// Snapshot source for `/healthz/stats`.
    pub stats: Option<StatsHandle>,
    /// Report alive as soon as the endpoints exist.
    pub alive_on_start: bool,
    /// Replaces `process::exit(255)` in `/healthz/diediedie`.
    pub on_die: Option<ExitHook>,
}

impl Default for HealthzOptions {
    fn default() -> Self {
        Self {
            sink: None,
            sample_rate: 1.0,
            stats: None,
            alive_on_start: false,
            on_die: None,
        }
    }
}

/// Liveness/readiness flags plus optional collaborators. Cheap to clone.
#[derive(Clone)]
pub struct Healthz {
    inner: Arc<HealthzInner>,
}

struct HealthzInner {
    alive: AtomicBool,
    ready: AtomicBool,
    sink: Option<Arc<dyn MetricsSink>>,
    sample_rate: f64,
    stats: Option<StatsHandle>,
    on_die: ExitHook,
}

impl Healthz {
    /// Starts not ready, and not alive unless `alive_on_start` is set.
    pub fn new(opts: HealthzOptions) -> Self {
        let on_die: ExitHook = match opts.on_die {
            Some(hook) => hook,
            None => Arc::new(exit_process),
        };
        Self {
            inner: Arc::new(HealthzInner {
                alive: AtomicBool::new(opts.alive_on_start),
                ready: AtomicBool::new(false),
                sink: opts.sink,
                sample_rate: opts.sample_rate,
                stats: opts.stats,
                on_die,
            }),
        }
    }

    pub fn ready(&self) {
        self.inner.ready.store(true, Ordering::SeqCst);
    }

    pub fn not_ready(&self) {
        self.inner.ready.store(false, Ordering::SeqCst);
    }

    pub fn alive(&self) {
        self.inner.alive.store(true, Ordering::SeqCst);
    }

    pub fn not_alive(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Healthy only when both alive and ready.
    pub fn is_healthy(&self) -> bool {
        self.is_alive() && self.is_ready()
    }

    pub(crate) fn stats(&self) -> Option<&StatsHandle> {
        self.inner.stats.as_ref()
    }

    pub(crate) fn die(&self) {
        (self.inner.on_die)();
    }

    /// Best-effort request timing; failures are only logged.
    pub(crate) async fn record_timing(&self, name: &str, elapsed: std::time::Duration, tag: String) {
        let Some(sink) = &self.inner.sink else { return };
        if let Err(e) = sink.timing(name, elapsed, &[tag], self.inner.sample_rate).await {
            tracing::debug!(metric = name, error = %e, "sink rejected timing");
        }
    }
}
