//! Shared application state for the prodkit binary.
//!
//! Built once at startup from the loaded config; the router and the
//! shutdown path read from it.

use std::sync::Arc;

use prodkit_core::error::Result;
use prodkit_core::MetricsSink;

use crate::config::ProdkitConfig;
use crate::ops::{Healthz, HealthzOptions};
use crate::reporter::StatsHandle;
use crate::sink::{MemorySink, StatsdSink};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ProdkitConfig,
    sink: Arc<dyn MetricsSink>,
    memory: Option<Arc<MemorySink>>,
}

impl AppState {
    /// Connect the configured sink. Without a statsd section metrics go to an
    /// in-process store served at `/metrics`.
    pub async fn new(cfg: ProdkitConfig) -> Result<Self> {
        let (sink, memory): (Arc<dyn MetricsSink>, Option<Arc<MemorySink>>) = match &cfg.statsd {
            Some(statsd) => (Arc::new(StatsdSink::connect(&statsd.addr).await?), None),
            None => {
                tracing::info!("no statsd section, serving metrics in process at /metrics");
                let memory = Arc::new(MemorySink::new());
                (memory.clone(), Some(memory))
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, sink, memory }),
        })
    }

    pub fn cfg(&self) -> &ProdkitConfig {
        &self.inner.cfg
    }

    pub fn sink(&self) -> Arc<dyn MetricsSink> {
        Arc::clone(&self.inner.sink)
    }

    pub fn memory_sink(&self) -> Option<Arc<MemorySink>> {
        self.inner.memory.clone()
    }

    /// Health state wired to this state's sink and the given snapshot.
    pub fn healthz(&self, stats: StatsHandle) -> Healthz {
        let section = &self.inner.cfg.healthz;
        Healthz::new(HealthzOptions {
            sink: Some(self.sink()),
            sample_rate: section.sample_rate,
            stats: Some(stats),
            alive_on_start: section.alive_on_start,
            on_die: None,
        })
    }
}
