//! `dynval` provides an owning dynamic `Value` type for JSON-shaped data with
//! binary-safe strings.
//!
//! # Features
//!
//! - **Nine value cases**: Null, Bool, I32, I64, F32, F64, String, Array, Map
//! - **Single ownership**: every container has exactly one owner; dropping a
//!   `Value` releases its whole subtree
//! - **Byte strings**: [`VString`] holds arbitrary bytes, `NUL` included, and
//!   keeps a terminator past the end for C interop
//! - **Chained hash maps**: [`VMap`] hashes keys with 32-bit FNV-1a and keeps
//!   its load factor below [`MAX_LOAD_FACTOR`]
//! - **Fallible allocation**: growth returns [`Error`] instead of aborting
//!
//! # Design
//!
//! Each container is one heap block: a small header followed by its storage
//! (bytes, `Value` slots, or bucket heads). Map entries are separate nodes, so
//! a resize relinks them rather than moving them.
//!
//! Floats compare with a fixed absolute tolerance ([`F32_EPSILON`],
//! [`F64_EPSILON`]), so `Value` equality is not transitive for floats near
//! each other.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]

extern crate alloc;

/// Capacity used by `new()` constructors and as the floor for growth.
pub const DEFAULT_CAPACITY: usize = 8;

mod macros;
mod raw;
mod trace;

mod error;
pub use error::{Error, Result};

mod value;
pub use value::*;

mod string;
pub use string::{VString, fnv1a};

mod array;
pub use array::*;

mod map;
pub use map::*;

mod format;
pub use format::format_value;
