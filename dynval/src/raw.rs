//! The four allocation primitives every container goes through.
//!
//! They forward to `alloc::alloc`, so the process-wide `#[global_allocator]`
//! is the override point. Null returns are turned into
//! [`Error::AllocationFailure`] instead of aborting.

use alloc::alloc::{Layout, alloc, alloc_zeroed, dealloc, realloc};
use core::ptr::NonNull;

use crate::error::{Error, Result};
use crate::trace::warn_alloc;

fn checked(ptr: *mut u8, layout: Layout) -> Result<NonNull<u8>> {
    match NonNull::new(ptr) {
        Some(ptr) => Ok(ptr),
        None => {
            warn_alloc!(
                size = layout.size(),
                align = layout.align(),
                "allocator returned null"
            );
            Err(Error::alloc(layout))
        }
    }
}

/// Safety: `layout` must have a non-zero size.
pub(crate) unsafe fn allocate(layout: Layout) -> Result<NonNull<u8>> {
    debug_assert!(layout.size() != 0);
    checked(unsafe { alloc(layout) }, layout)
}

/// Safety: `layout` must have a non-zero size.
pub(crate) unsafe fn allocate_zeroed(layout: Layout) -> Result<NonNull<u8>> {
    debug_assert!(layout.size() != 0);
    checked(unsafe { alloc_zeroed(layout) }, layout)
}

/// Resizes a block in place or by moving it. On failure the old block is
/// left untouched and still owned by the caller.
///
/// Safety: `ptr` must have been allocated with `old`, and `new` must share
/// its alignment and have a non-zero size.
pub(crate) unsafe fn reallocate(ptr: NonNull<u8>, old: Layout, new: Layout) -> Result<NonNull<u8>> {
    debug_assert_eq!(old.align(), new.align());
    debug_assert!(new.size() != 0);
    checked(unsafe { realloc(ptr.as_ptr(), old, new.size()) }, new)
}

/// Safety: `ptr` must have been allocated with `layout` and not yet released.
pub(crate) unsafe fn release(ptr: NonNull<u8>, layout: Layout) {
    unsafe { dealloc(ptr.as_ptr(), layout) }
}
