//! Snapshot model.
//!
//! A `Stats` value is one consistent capture of everything the reporter
//! tracks. Toolchain and service identity are fixed for the life of a
//! reporter; runtime counters and memory statistics are replaced wholesale on
//! every tick.

use std::time::Duration;

use serde::Serialize;

use crate::svcinfo::ServiceInfo;

/// Capacity of the GC pause-time ring.
pub const PAUSE_RING_CAPACITY: usize = 256;

/// Toolchain used to build the binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainInfo {
    pub arch: String,
    pub os: String,
    pub version: String,
}

impl ToolchainInfo {
    /// Target triple pieces plus the compiler version captured at build time.
    pub fn current() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            version: env!("PRODKIT_RUSTC_VERSION").to_string(),
        }
    }
}

/// Scheduler and process counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    /// Logical CPUs available to the process.
    pub num_cpu: usize,
    /// Foreign (FFI) calls made so far.
    pub num_foreign_calls: u64,
    /// Alive async tasks.
    pub num_tasks: usize,
    /// Parallelism limit (runtime worker threads).
    pub max_procs: usize,
}

/// Allocation counters for one size class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeClassStats {
    /// Upper bound, in bytes, of allocations counted in this class.
    pub size: u32,
    pub mallocs: u64,
    pub frees: u64,
}

/// Memory statistics block.
///
/// Byte counts unless noted. GC fields stay zero (and `pause_ns` empty) for
/// processes without a collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemStats {
    pub alloc: u64,
    pub total_alloc: u64,
    pub sys: u64,
    pub lookups: u64,
    pub mallocs: u64,
    pub frees: u64,

    pub heap_alloc: u64,
    pub heap_sys: u64,
    pub heap_idle: u64,
    pub heap_inuse: u64,
    pub heap_released: u64,
    pub heap_objects: u64,

    pub stack_inuse: u64,
    pub stack_sys: u64,
    pub mspan_inuse: u64,
    pub mspan_sys: u64,
    pub mcache_inuse: u64,
    pub mcache_sys: u64,
    pub buck_hash_sys: u64,
    pub gc_sys: u64,
    pub other_sys: u64,

    pub next_gc: u64,
    /// Unix nanoseconds of the last collection.
    pub last_gc: u64,
    pub pause_total_ns: u64,
    /// Pause-time ring; the pause of collection `n` lives at `n % PAUSE_RING_CAPACITY`.
    pub pause_ns: Vec<u64>,
    pub num_gc: u32,
    pub num_forced_gc: u32,
    pub gc_cpu_fraction: f64,

    pub by_size: Vec<SizeClassStats>,
}

impl MemStats {
    /// Pause recorded for collection number `gc`, if the ring has that slot.
    pub fn pause_at(&self, gc: u32) -> Option<Duration> {
        let idx = usize::try_from(gc).ok()? % PAUSE_RING_CAPACITY;
        self.pause_ns.get(idx).map(|ns| Duration::from_nanos(*ns))
    }
}

/// One consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub toolchain: ToolchainInfo,
    pub runtime: RuntimeStats,
    pub mem: MemStats,
    pub service: ServiceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_at_wraps_around_ring() {
        let mut mem = MemStats {
            pause_ns: vec![0; PAUSE_RING_CAPACITY],
            ..Default::default()
        };
        mem.pause_ns[3] = 1_500;

        assert_eq!(mem.pause_at(3), Some(Duration::from_nanos(1_500)));
        assert_eq!(mem.pause_at(259), Some(Duration::from_nanos(1_500)));
    }

    #[test]
    fn pause_at_missing_slot_is_none() {
        let mem = MemStats::default();
        assert!(mem.pause_at(0).is_none());
    }

    #[test]
    fn toolchain_reports_target() {
        let t = ToolchainInfo::current();
        assert_eq!(t.arch, std::env::consts::ARCH);
        assert_eq!(t.os, std::env::consts::OS);
        assert!(!t.version.is_empty());
    }
}
