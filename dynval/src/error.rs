//! Error type shared by every fallible container operation.

use core::alloc::Layout;
use core::fmt;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Why a container operation could not complete.
///
/// Any owned input handed to the failing operation has already been dropped
/// by the time the caller sees one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The allocator returned null for a request of this shape.
    AllocationFailure {
        /// Requested size in bytes
        size: usize,
        /// Requested alignment in bytes
        align: usize,
    },
    /// A capacity or allocation-size computation would wrap.
    CapacityOverflow,
    /// An array index was outside the accepted range.
    OutOfBounds {
        /// The rejected index
        index: usize,
        /// Element count at the time of the call
        len: usize,
    },
}

impl Error {
    pub(crate) const fn alloc(layout: Layout) -> Self {
        Error::AllocationFailure {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Returns `true` for both allocator refusal and size-arithmetic overflow.
    #[must_use]
    pub const fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            Error::AllocationFailure { .. } | Error::CapacityOverflow
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AllocationFailure { size, align } => {
                write!(f, "allocation of {size} bytes (align {align}) failed")
            }
            Error::CapacityOverflow => f.write_str("capacity overflow"),
            Error::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
        }
    }
}

impl core::error::Error for Error {}

impl From<core::alloc::LayoutError> for Error {
    fn from(_: core::alloc::LayoutError) -> Self {
        Error::CapacityOverflow
    }
}

/// Unwraps the result of an allocation for infallible surfaces
/// (`FromIterator`, `Extend`, `value!`), the way `Vec` does.
#[track_caller]
pub(crate) fn infallible<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::AllocationFailure { size, align }) => {
            match Layout::from_size_align(size, align) {
                Ok(layout) => alloc::alloc::handle_alloc_error(layout),
                Err(_) => panic!("capacity overflow"),
            }
        }
        Err(Error::CapacityOverflow) => panic!("capacity overflow"),
        Err(err @ Error::OutOfBounds { .. }) => panic!("{err}"),
    }
}
