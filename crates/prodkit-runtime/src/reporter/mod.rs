//! Runtime-metrics reporter.
//!
//! A background task samples process and runtime statistics every period,
//! installs them in a shared snapshot and pushes them to a `MetricsSink`.
//!
//! - `scheduler`: the tick loop and its cancellation
//! - `sampler`: stat capture (`Sampler` trait, `ProcessSampler`)
//! - `exporter`: snapshot -> named measurements
//! - `store`: read/write-locked latest snapshot

pub mod exporter;
pub mod sampler;
mod scheduler;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use prodkit_core::error::{ProdkitError, Result};
use prodkit_core::{BuildMetadata, MetricsSink, ServiceInfo, Stats};

pub use exporter::Exporter;
pub use sampler::{foreign_calls, record_foreign_call, ProcessSampler, Sampler};
pub use store::StatsHandle;

use scheduler::Worker;

/// Time between two ticks unless configured otherwise.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Reporter settings, fixed before the loop starts.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Time between tick starts.
    pub period: Duration,
    /// `key:value` labels added to every measurement.
    pub default_tags: Vec<String>,
    /// Sample rate handed to the sink, in `(0, 1]`.
    pub sample_rate: f64,
    /// Build identity; environment variables fill the gaps.
    pub build: BuildMetadata,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            default_tags: Vec::new(),
            sample_rate: 1.0,
            build: BuildMetadata::compiled(),
        }
    }
}

impl ReporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(ProdkitError::InvalidConfig("reporter period must be greater than zero".into()));
        }
        if !(self.sample_rate > 0.0 && self.sample_rate <= 1.0) {
            return Err(ProdkitError::InvalidConfig(
                "reporter sample_rate must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Handle to a running reporter.
///
/// Dropping it detaches the worker; call `cancel` or `shutdown` to stop it.
pub struct Reporter {
    config: ReporterConfig,
    store: StatsHandle,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl Reporter {
    /// Start sampling the current process.
    pub async fn start(sink: Arc<dyn MetricsSink>, config: ReporterConfig) -> Result<Self> {
        Self::start_with_sampler(sink, config, ProcessSampler::new()).await
    }

    /// Start with a custom sampler. Sends the `startup` counter, then spawns
    /// the worker; must be called inside a tokio runtime.
    pub async fn start_with_sampler<S: Sampler>(
        sink: Arc<dyn MetricsSink>,
        config: ReporterConfig,
        sampler: S,
    ) -> Result<Self> {
        config.validate()?;

        let toolchain = sampler.toolchain();
        let service = ServiceInfo::resolve(&config.build);
        let exporter = Exporter::new(
            sink,
            config.sample_rate,
            config.default_tags.clone(),
            &toolchain,
            &service,
        );

        let store = StatsHandle::new(Stats {
            toolchain,
            service,
            ..Stats::default()
        });

        exporter.startup().await;

        let token = CancellationToken::new();
        let worker = Worker {
            sampler: Box::new(sampler),
            exporter,
            store: store.clone(),
            period: config.period,
            token: token.clone(),
        };
        let worker = tokio::spawn(worker.run());

        Ok(Self {
            config,
            store,
            token,
            worker: Some(worker),
        })
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Copy of the latest snapshot.
    pub fn stats(&self) -> Stats {
        self.store.get()
    }

    /// Read handle for HTTP handlers and other tasks.
    pub fn handle(&self) -> StatsHandle {
        self.store.clone()
    }

    /// Stop after the current tick. Safe to call more than once.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the worker to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        self.token.cancel();
        if let Some(worker) = self.worker.take() {
            worker
                .await
                .map_err(|e| ProdkitError::Internal(format!("reporter worker failed: {e}")))?;
        }
        Ok(())
    }
}
