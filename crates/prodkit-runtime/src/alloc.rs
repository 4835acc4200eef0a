//! Counting global allocator.
//!
//! Wraps another `GlobalAlloc` and keeps process-wide allocation counters,
//! including per-size-class malloc/free counts. Install it in the binary:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: prodkit_runtime::alloc::CountingAlloc = prodkit_runtime::alloc::CountingAlloc::system();
//! ```
//!
//! Without it every counter reads zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

use prodkit_core::SizeClassStats;

/// Smallest size class, in bytes.
const MIN_CLASS: usize = 8;
/// Largest size class; bigger allocations are counted in totals only.
const MAX_CLASS: usize = 32 * 1024;
/// 8, 16, 32, ..., 32768
pub const NUM_SIZE_CLASSES: usize = 13;

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU64 = AtomicU64::new(0);

static TOTAL_ALLOC: AtomicU64 = AtomicU64::new(0);
static TOTAL_FREED: AtomicU64 = AtomicU64::new(0);
static MALLOCS: AtomicU64 = AtomicU64::new(0);
static FREES: AtomicU64 = AtomicU64::new(0);
static CLASS_MALLOCS: [AtomicU64; NUM_SIZE_CLASSES] = [ZERO; NUM_SIZE_CLASSES];
static CLASS_FREES: [AtomicU64; NUM_SIZE_CLASSES] = [ZERO; NUM_SIZE_CLASSES];

/// `GlobalAlloc` wrapper that counts every allocation and free.
pub struct CountingAlloc<A = System> {
    inner: A,
}

impl CountingAlloc<System> {
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A> CountingAlloc<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

/// Index of the size class holding `size` bytes.
pub fn size_class(size: usize) -> Option<usize> {
    if size > MAX_CLASS {
        return None;
    }
    let rounded = size.max(MIN_CLASS).next_power_of_two();
    Some((rounded.trailing_zeros() - MIN_CLASS.trailing_zeros()) as usize)
}

/// Upper bound of size class `idx`.
pub fn class_size(idx: usize) -> u32 {
    (MIN_CLASS << idx) as u32
}

fn record_alloc(size: usize) {
    TOTAL_ALLOC.fetch_add(size as u64, Ordering::Relaxed);
    MALLOCS.fetch_add(1, Ordering::Relaxed);
    if let Some(idx) = size_class(size) {
        CLASS_MALLOCS[idx].fetch_add(1, Ordering::Relaxed);
    }
}

fn record_free(size: usize) {
    TOTAL_FREED.fetch_add(size as u64, Ordering::Relaxed);
    FREES.fetch_add(1, Ordering::Relaxed);
    if let Some(idx) = size_class(size) {
        CLASS_FREES[idx].fetch_add(1, Ordering::Relaxed);
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAlloc<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        record_free(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            record_free(layout.size());
            record_alloc(new_size);
        }
        new_ptr
    }
}

/// Point-in-time copy of the allocation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocCounters {
    pub total_alloc: u64,
    pub total_freed: u64,
    pub mallocs: u64,
    pub frees: u64,
    /// Classes that have seen at least one allocation.
    pub by_size: Vec<SizeClassStats>,
}

impl AllocCounters {
    /// Live bytes.
    pub fn in_use(&self) -> u64 {
        self.total_alloc.saturating_sub(self.total_freed)
    }

    /// Live objects.
    pub fn live_objects(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }
}

/// Read the process-wide counters.
pub fn counters() -> AllocCounters {
    let by_size = (0..NUM_SIZE_CLASSES)
        .filter_map(|idx| {
            let mallocs = CLASS_MALLOCS[idx].load(Ordering::Relaxed);
            if mallocs == 0 {
                return None;
            }
            Some(SizeClassStats {
                size: class_size(idx),
                mallocs,
                frees: CLASS_FREES[idx].load(Ordering::Relaxed),
            })
        })
        .collect();

    AllocCounters {
        total_alloc: TOTAL_ALLOC.load(Ordering::Relaxed),
        total_freed: TOTAL_FREED.load(Ordering::Relaxed),
        mallocs: MALLOCS.load(Ordering::Relaxed),
        frees: FREES.load(Ordering::Relaxed),
        by_size,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn size_classes_round_up_to_power_of_two() {
        assert_eq!(size_class(0), Some(0));
        assert_eq!(size_class(8), Some(0));
        assert_eq!(size_class(9), Some(1));
        assert_eq!(size_class(16), Some(1));
        assert_eq!(size_class(4096), Some(9));
        assert_eq!(size_class(32 * 1024), Some(NUM_SIZE_CLASSES - 1));
        assert_eq!(size_class(32 * 1024 + 1), None);
    }

    #[test]
    fn class_size_matches_index() {
        assert_eq!(class_size(0), 8);
        assert_eq!(class_size(1), 16);
        assert_eq!(class_size(NUM_SIZE_CLASSES - 1), 32 * 1024);
    }

    #[test]
    fn wrapper_counts_alloc_and_free() {
        let a = CountingAlloc::system();
        let layout = Layout::from_size_align(24, 8).unwrap();
        let before = counters();

        unsafe {
            let p = a.alloc(layout);
            assert!(!p.is_null());
            a.dealloc(p, layout);
        }

        let after = counters();
        assert!(after.mallocs > before.mallocs);
        assert!(after.frees > before.frees);
        assert!(after.total_alloc >= before.total_alloc + 24);
        let class = after.by_size.iter().find(|c| c.size == 32).unwrap();
        assert!(class.mallocs >= 1 && class.frees >= 1);
    }
}
