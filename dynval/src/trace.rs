//! Logging shims that compile to nothing unless tracing is wanted.
//!
//! Tracing is enabled when either:
//! - The `tracing` feature is enabled
//! - Running the crate's own unit tests (`cfg(test)`)

#[cfg(any(test, feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(any(test, feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

// Not named `warn`: a `use` of that name would clash with the `#[warn]` attribute
#[cfg(any(test, feature = "tracing"))]
macro_rules! warn_alloc {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! warn_alloc {
    ($($arg:tt)*) => {};
}

pub(crate) use {debug, trace, warn_alloc};
