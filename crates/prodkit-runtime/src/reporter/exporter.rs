//! Snapshot -> measurements.
//!
//! Metric names are kept byte-for-byte compatible with existing dashboards
//! (`go.*`, `info`, `startup`).

use std::sync::Arc;
use std::time::Duration;

use prodkit_core::{tags, MemStats, MetricsSink, RuntimeStats, ServiceInfo, ToolchainInfo};

pub const STARTUP: &str = "startup";
pub const PAUSE_NS: &str = "go.mem.pause_ns";
pub const MALLOCS_BY_SIZE: &str = "go.mem.mallocs_by_size";
pub const FREES_BY_SIZE: &str = "go.mem.frees_by_size";
pub const NUM_CPU: &str = "go.num_cpu";
pub const NUM_CGO_CALLS: &str = "go.num_cgo_calls";
pub const GOROUTINES: &str = "go.goroutines";
pub const MAX_PROCS: &str = "go.max_procs";
pub const RUNTIME_INFO: &str = "go.runtime";
pub const SERVICE_INFO: &str = "info";

/// Pushes measurements to the sink. Label sets are built once.
pub struct Exporter {
    sink: Arc<dyn MetricsSink>,
    rate: f64,
    default_tags: Vec<String>,
    runtime_tags: Vec<String>,
    info_tags: Vec<String>,
}

impl Exporter {
    pub fn new(
        sink: Arc<dyn MetricsSink>,
        rate: f64,
        default_tags: Vec<String>,
        toolchain: &ToolchainInfo,
        service: &ServiceInfo,
    ) -> Self {
        let runtime_tags = tags::extend(
            &default_tags,
            [
                tags::tag("version", &toolchain.version),
                tags::tag("arch", &toolchain.arch),
                tags::tag("os", &toolchain.os),
            ],
        );

        Self {
            sink,
            rate,
            default_tags,
            runtime_tags,
            info_tags: service.tags(),
        }
    }

    /// One-off process start signal, never sampled.
    pub async fn startup(&self) {
        if let Err(e) = self.sink.count(STARTUP, 1, &[], 1.0).await {
            tracing::debug!(metric = STARTUP, error = %e, "sink rejected counter");
        }
    }

    /// Full export for one tick. `last_num_gc` is the collection count seen
    /// by the previous tick.
    pub async fn export(&self, runtime: &RuntimeStats, mem: &MemStats, last_num_gc: u32) {
        self.export_mem(mem, last_num_gc).await;
        self.export_runtime(runtime).await;
        self.gauge(RUNTIME_INFO, 1.0, &self.runtime_tags).await;
        if !self.info_tags.is_empty() {
            self.gauge(SERVICE_INFO, 1.0, &self.info_tags).await;
        }
    }

    async fn export_mem(&self, mem: &MemStats, last_num_gc: u32) {
        let gauges = [
            ("go.mem.total_alloc", mem.total_alloc),
            ("go.mem.alloc", mem.alloc),
            ("go.mem.sys", mem.sys),
            ("go.mem.lookups", mem.lookups),
            ("go.mem.mallocs", mem.mallocs),
            ("go.mem.frees", mem.frees),
            ("go.mem.heap_alloc", mem.heap_alloc),
            ("go.mem.heap_sys", mem.heap_sys),
            ("go.mem.heap_idle", mem.heap_idle),
            ("go.mem.heap_inuse", mem.heap_inuse),
            ("go.mem.heap_released", mem.heap_released),
            ("go.mem.heap_objects", mem.heap_objects),
            ("go.mem.stack_inuse", mem.stack_inuse),
            ("go.mem.stack_sys", mem.stack_sys),
            ("go.mem.mspan_inuse", mem.mspan_inuse),
            ("go.mem.mspan_sys", mem.mspan_sys),
            ("go.mem.mcache_inuse", mem.mcache_inuse),
            ("go.mem.mcache_sys", mem.mcache_sys),
            ("go.mem.buck_hash_sys", mem.buck_hash_sys),
            ("go.mem.gc_sys", mem.gc_sys),
            ("go.mem.other_sys", mem.other_sys),
            ("go.mem.next_gc", mem.next_gc),
            ("go.mem.last_gc", mem.last_gc),
            ("go.mem.pause_total_ns", mem.pause_total_ns),
        ];
        for (name, value) in gauges {
            self.gauge(name, value as f64, &self.default_tags).await;
        }

        // Inclusive on both ends: the previous tick's last pause is resent.
        for gc in last_num_gc..=mem.num_gc {
            let Some(pause) = mem.pause_at(gc) else { continue };
            self.timing(PAUSE_NS, pause, &self.default_tags).await;
        }

        self.gauge("go.mem.num_gc", f64::from(mem.num_gc), &self.default_tags).await;
        self.gauge("go.mem.num_forced_gc", f64::from(mem.num_forced_gc), &self.default_tags)
            .await;
        self.gauge("go.mem.gc_cpu_fraction", mem.gc_cpu_fraction, &self.default_tags)
            .await;

        for class in &mem.by_size {
            let tags = tags::extend(&self.default_tags, [tags::tag("size", class.size)]);
            self.gauge(MALLOCS_BY_SIZE, class.mallocs as f64, &tags).await;
            self.gauge(FREES_BY_SIZE, class.frees as f64, &tags).await;
        }
    }

    async fn export_runtime(&self, runtime: &RuntimeStats) {
        self.gauge(NUM_CPU, runtime.num_cpu as f64, &self.default_tags).await;
        self.gauge(NUM_CGO_CALLS, runtime.num_foreign_calls as f64, &self.default_tags)
            .await;
        self.gauge(GOROUTINES, runtime.num_tasks as f64, &self.default_tags).await;
        self.gauge(MAX_PROCS, runtime.max_procs as f64, &self.default_tags).await;
    }

    async fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        if let Err(e) = self.sink.gauge(name, value, tags, self.rate).await {
            tracing::debug!(metric = name, error = %e, "sink rejected gauge");
        }
    }

    async fn timing(&self, name: &str, value: Duration, tags: &[String]) {
        if let Err(e) = self.sink.timing(name, value, tags, self.rate).await {
            tracing::debug!(metric = name, error = %e, "sink rejected timing");
        }
    }
}
