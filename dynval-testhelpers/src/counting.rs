//! Per-thread allocation accounting.

use core::alloc::{GlobalAlloc, Layout};
use core::cell::Cell;
use core::fmt;
use std::alloc::System;

thread_local! {
    static BLOCKS: Cell<isize> = const { Cell::new(0) };
    static BYTES: Cell<isize> = const { Cell::new(0) };
    static FAIL_AFTER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Global allocator that forwards to [`System`] and counts what the current
/// thread has allocated but not yet freed.
///
/// Counters are thread-local so parallel tests don't see each other.
pub struct CountingAlloc;

fn adjust(blocks: isize, bytes: isize) {
    // `try_with` fails only during thread teardown; those frees are not ours
    let _ = BLOCKS.try_with(|c| c.set(c.get() + blocks));
    let _ = BYTES.try_with(|c| c.set(c.get() + bytes));
}

/// Returns `false` when an injected failure is due.
fn permit() -> bool {
    FAIL_AFTER
        .try_with(|budget| match budget.get() {
            None => true,
            Some(0) => false,
            Some(n) => {
                budget.set(Some(n - 1));
                true
            }
        })
        .unwrap_or(true)
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !permit() {
            return core::ptr::null_mut();
        }
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            adjust(1, layout.size() as isize);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if !permit() {
            return core::ptr::null_mut();
        }
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            adjust(1, layout.size() as isize);
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if !permit() {
            return core::ptr::null_mut();
        }
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            adjust(0, new_size as isize - layout.size() as isize);
        }
        new_ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        adjust(-1, -(layout.size() as isize));
    }
}

/// Live allocations on the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocStats {
    /// Blocks allocated and not yet freed
    pub blocks: isize,
    /// Bytes in those blocks
    pub bytes: isize,
}

impl AllocStats {
    /// Snapshot of the current thread's counters.
    pub fn current() -> Self {
        Self {
            blocks: BLOCKS.with(Cell::get),
            bytes: BYTES.with(Cell::get),
        }
    }

    /// Change from `earlier` to `self`.
    pub fn since(self, earlier: AllocStats) -> AllocStats {
        AllocStats {
            blocks: self.blocks - earlier.blocks,
            bytes: self.bytes - earlier.bytes,
        }
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} blocks / {} bytes", self.blocks, self.bytes)
    }
}

/// Whether [`CountingAlloc`] is the global allocator of this binary.
pub fn counting_active() -> bool {
    let before = AllocStats::current();
    let probe = core::hint::black_box(Box::new(0u64));
    let during = AllocStats::current();
    drop(probe);
    during.blocks == before.blocks + 1
}

/// Runs `f` and panics if it left allocations behind on this thread.
///
/// Panics up front if [`CountingAlloc`] isn't registered, since every check
/// would pass vacuously.
#[track_caller]
pub fn assert_no_leaks<R>(f: impl FnOnce() -> R) -> R {
    assert!(
        counting_active(),
        "assert_no_leaks needs `#[global_allocator] static A: CountingAlloc = CountingAlloc;`"
    );
    let before = AllocStats::current();
    let result = f();
    let delta = AllocStats::current().since(before);
    tracing::debug!(%delta, "allocation delta");
    assert_eq!(delta, AllocStats::default(), "leaked {delta}");
    result
}

/// Runs `f` and returns what it left live.
pub fn measure<R>(f: impl FnOnce() -> R) -> (R, AllocStats) {
    let before = AllocStats::current();
    let result = f();
    (result, AllocStats::current().since(before))
}

/// Makes every allocation after the next `n` on this thread fail, until the
/// guard drops.
#[must_use = "failures stop when the guard is dropped"]
pub fn fail_allocations_after(n: usize) -> FailureGuard {
    FAIL_AFTER.with(|budget| budget.set(Some(n)));
    FailureGuard { _private: () }
}

/// Restores normal allocation when dropped.
pub struct FailureGuard {
    _private: (),
}

impl FailureGuard {
    /// Allocations still permitted before failures start.
    pub fn remaining(&self) -> usize {
        FAIL_AFTER.with(|budget| budget.get().unwrap_or(usize::MAX))
    }
}

impl Drop for FailureGuard {
    fn drop(&mut self) {
        FAIL_AFTER.with(|budget| budget.set(None));
    }
}
