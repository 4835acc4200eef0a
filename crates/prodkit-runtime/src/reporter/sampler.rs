//! Runtime and memory statistics capture.

use std::sync::atomic::{AtomicU64, Ordering};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::runtime::Handle;

use prodkit_core::{MemStats, RuntimeStats, ToolchainInfo};

use crate::alloc;

static FOREIGN_CALLS: AtomicU64 = AtomicU64::new(0);

/// Count one call across an FFI boundary.
pub fn record_foreign_call() {
    FOREIGN_CALLS.fetch_add(1, Ordering::Relaxed);
}

/// Foreign calls recorded so far.
pub fn foreign_calls() -> u64 {
    FOREIGN_CALLS.load(Ordering::Relaxed)
}

/// Source of the dynamic snapshot fields.
///
/// Owned by the reporter's worker, so `sample` may keep mutable caches.
pub trait Sampler: Send + 'static {
    /// Fixed for the life of the reporter; read once at start.
    fn toolchain(&self) -> ToolchainInfo {
        ToolchainInfo::current()
    }

    fn sample(&mut self) -> (RuntimeStats, MemStats);
}

/// Samples the current process: tokio runtime metrics, the counting
/// allocator and OS-level memory from `sysinfo`.
pub struct ProcessSampler {
    system: System,
    pid: Option<Pid>,
    runtime: Option<Handle>,
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "current pid unavailable, process memory will read zero");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
            runtime: Handle::try_current().ok(),
        }
    }

    fn runtime_stats(&self) -> RuntimeStats {
        let (num_tasks, max_procs) = match &self.runtime {
            Some(handle) => {
                let m = handle.metrics();
                (m.num_alive_tasks(), m.num_workers())
            }
            None => (0, 0),
        };

        RuntimeStats {
            num_cpu: num_cpus::get(),
            num_foreign_calls: foreign_calls(),
            num_tasks,
            max_procs,
        }
    }

    fn mem_stats(&mut self) -> MemStats {
        let counters = alloc::counters();
        let in_use = counters.in_use();

        let mut mem = MemStats {
            alloc: in_use,
            total_alloc: counters.total_alloc,
            mallocs: counters.mallocs,
            frees: counters.frees,
            heap_alloc: in_use,
            heap_inuse: in_use,
            heap_objects: counters.live_objects(),
            by_size: counters.by_size,
            ..MemStats::default()
        };

        if let Some(pid) = self.pid {
            self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing().with_memory(),
            );
            if let Some(process) = self.system.process(pid) {
                mem.sys = process.virtual_memory();
                mem.heap_sys = process.memory();
            }
        }

        mem
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for ProcessSampler {
    fn sample(&mut self) -> (RuntimeStats, MemStats) {
        let runtime = self.runtime_stats();
        let mem = self.mem_stats();
        (runtime, mem)
    }
}
