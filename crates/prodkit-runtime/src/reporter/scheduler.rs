//! Tick loop.
//!
//! Each cycle samples, swaps the snapshot, exports, then waits out whatever
//! is left of the period. Cancellation is observed at the wait only, so an
//! in-flight export always completes.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use super::exporter::Exporter;
use super::sampler::Sampler;
use super::store::StatsHandle;

pub(crate) struct Worker {
    pub(crate) sampler: Box<dyn Sampler>,
    pub(crate) exporter: Exporter,
    pub(crate) store: StatsHandle,
    pub(crate) period: Duration,
    pub(crate) token: CancellationToken,
}

impl Worker {
    pub(crate) async fn run(mut self) {
        tracing::info!(period_ms = millis(self.period), "reporter started");

        let mut last_num_gc = 0u32;
        let wait = sleep(Duration::ZERO);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = &mut wait => {}
            }

            let start = Instant::now();
            last_num_gc = self.tick(last_num_gc).await;
            let elapsed = start.elapsed();

            if elapsed >= self.period {
                tracing::warn!(
                    elapsed_ms = millis(elapsed),
                    period_ms = millis(self.period),
                    "reporter tick overran its period"
                );
            }
            wait.as_mut().reset(Instant::now() + next_wait(self.period, elapsed));
        }

        tracing::info!("reporter stopped");
    }

    /// One sample-and-export pass; returns the collection count it saw.
    async fn tick(&mut self, last_num_gc: u32) -> u32 {
        let (runtime, mem) = self.sampler.sample();
        self.store.replace(runtime.clone(), mem.clone());
        self.exporter.export(&runtime, &mem, last_num_gc).await;
        mem.num_gc
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Remaining part of the period; zero once the pass used it all up.
pub(crate) fn next_wait(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}
