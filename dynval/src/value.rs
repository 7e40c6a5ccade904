//! Core `Value` type.
//!
//! A `Value` is one of nine cases. The six primitive cases are plain data;
//! the three compound cases each own exactly one heap container:
//!
//! | Case     | Payload              |
//! |----------|----------------------|
//! | `Null`   | none                 |
//! | `Bool`   | `bool`               |
//! | `I32`    | `i32`                |
//! | `I64`    | `i64`                |
//! | `F32`    | `f32`                |
//! | `F64`    | `f64`                |
//! | `String` | owned [`VString`]    |
//! | `Array`  | owned [`VArray`]     |
//! | `Map`    | owned [`VMap`]       |
//!
//! Container handles are move-only. Dropping a `Value` releases its whole
//! subtree exactly once; [`Value::destroy`] does the same in place and leaves
//! `Null` behind, so destroying twice is harmless.

use core::fmt::{self, Debug, Formatter};

use crate::array::VArray;
use crate::error::Result;
use crate::map::VMap;
use crate::string::VString;

/// Tolerance for `F32` equality.
pub const F32_EPSILON: f32 = 1e-6;

/// Tolerance for `F64` equality.
pub const F64_EPSILON: f64 = 1e-14;

/// Enum distinguishing the value cases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    /// Null value
    Null,
    /// Boolean value
    Bool,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Byte string
    String,
    /// Array of values
    Array,
    /// Map from byte-string keys to values
    Map,
}

/// A dynamically-typed value.
#[derive(Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Owned byte string
    String(VString),
    /// Owned array
    Array(VArray),
    /// Owned map
    Map(VMap),
}

impl Value {
    // === Compound constructors ===

    /// A `String` value holding a copy of `bytes`, or `Null` if allocation fails.
    #[must_use]
    pub fn new_string(bytes: &[u8]) -> Self {
        VString::from_bytes(bytes).map_or(Value::Null, Value::String)
    }

    /// An empty `Array` value, or `Null` if allocation fails.
    #[must_use]
    pub fn new_array() -> Self {
        VArray::new().map_or(Value::Null, Value::Array)
    }

    /// An empty `Map` value, or `Null` if allocation fails.
    #[must_use]
    pub fn new_map() -> Self {
        VMap::new().map_or(Value::Null, Value::Map)
    }

    /// Releases whatever this value owns and leaves `Null` in its place.
    pub fn destroy(&mut self) {
        *self = Value::Null;
    }

    /// Takes this value, replacing it with `Null`.
    pub const fn take(&mut self) -> Value {
        core::mem::replace(self, Value::Null)
    }

    /// Allocates an independent copy of the whole tree.
    pub fn deep_copy(&self) -> Result<Value> {
        Ok(match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::I32(n) => Value::I32(*n),
            Value::I64(n) => Value::I64(*n),
            Value::F32(x) => Value::F32(*x),
            Value::F64(x) => Value::F64(*x),
            Value::String(s) => Value::String(s.deep_copy()?),
            Value::Array(a) => Value::Array(a.deep_copy()?),
            Value::Map(m) => Value::Map(m.deep_copy()?),
        })
    }

    // === Type checking ===

    /// Returns the case of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
        }
    }

    /// Returns `true` if this is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is a boolean.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns `true` if this is a string.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Returns `true` if this is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns `true` if this is a map.
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns `true` for the two container-owning cases and strings.
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Value::String(_) | Value::Array(_) | Value::Map(_))
    }

    // === Payload access ===
    //
    // No coercion between cases: `I32(1).as_i64()` is `None`.

    /// The payload of a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The payload of an `I32`.
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(n) => Some(*n),
            _ => None,
        }
    }

    /// The payload of an `I64`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(n) => Some(*n),
            _ => None,
        }
    }

    /// The payload of an `F32`.
    #[must_use]
    pub const fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(x) => Some(*x),
            _ => None,
        }
    }

    /// The payload of an `F64`.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(x) => Some(*x),
            _ => None,
        }
    }

    /// Borrows the string payload.
    #[must_use]
    pub const fn as_string(&self) -> Option<&VString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Mutably borrows the string payload.
    pub const fn as_string_mut(&mut self) -> Option<&mut VString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows the array payload.
    #[must_use]
    pub const fn as_array(&self) -> Option<&VArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Mutably borrows the array payload.
    pub const fn as_array_mut(&mut self) -> Option<&mut VArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrows the map payload.
    #[must_use]
    pub const fn as_map(&self) -> Option<&VMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrows the map payload.
    pub const fn as_map_mut(&mut self) -> Option<&mut VMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Moves the string payload out, or gives the value back.
    pub fn into_string(self) -> Result<VString, Value> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other),
        }
    }

    /// Moves the array payload out, or gives the value back.
    pub fn into_array(self) -> Result<VArray, Value> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(other),
        }
    }

    /// Moves the map payload out, or gives the value back.
    pub fn into_map(self) -> Result<VMap, Value> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(other),
        }
    }
}

// === PartialEq ===

/// Structural equality.
///
/// Cases must match; there is no numeric coercion. Floats compare by absolute
/// difference against [`F32_EPSILON`] / [`F64_EPSILON`], so this is not an
/// equivalence relation once floats are involved. Maps compare by key lookup,
/// independent of bucket layout.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => (a - b).abs() < F32_EPSILON,
            (Value::F64(a), Value::F64(b)) => (a - b).abs() < F64_EPSILON,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

// === Formatting ===

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => Debug::fmt(b, f),
            Value::I32(n) => write!(f, "{n}i32"),
            Value::I64(n) => write!(f, "{n}i64"),
            Value::F32(x) => write!(f, "{x:?}f32"),
            Value::F64(x) => write!(f, "{x:?}f64"),
            Value::String(s) => Debug::fmt(s, f),
            Value::Array(a) => Debug::fmt(a, f),
            Value::Map(m) => Debug::fmt(m, f),
        }
    }
}

// === From implementations ===

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::F32(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::F64(x)
    }
}

/// Collapses to `Null` if the copy cannot be allocated.
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::new_string(s.as_bytes())
    }
}

/// Collapses to `Null` if the copy cannot be allocated.
impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::new_string(bytes)
    }
}

impl From<VString> for Value {
    fn from(s: VString) -> Self {
        Value::String(s)
    }
}

impl From<VArray> for Value {
    fn from(a: VArray) -> Self {
        Value::Array(a)
    }
}

impl From<VMap> for Value {
    fn from(m: VMap) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
