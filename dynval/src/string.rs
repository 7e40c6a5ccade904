//! Byte string value type.

use alloc::alloc::Layout;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::ffi::CStr;
use core::fmt::{self, Debug, Formatter, Write};
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use core::ptr::{self, NonNull};

use crate::DEFAULT_CAPACITY;
use crate::error::{Error, Result};
use crate::raw;
use crate::trace::trace;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over `bytes`.
#[must_use]
pub const fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Header for heap-allocated strings.
#[repr(C, align(8))]
struct StringHeader {
    /// Used bytes, excluding the trailing NUL
    len: usize,
    /// Usable bytes, excluding the reserved NUL slot
    cap: usize,
    // `cap + 1` bytes of data follow immediately after
}

/// An owning, growable byte string.
///
/// The bytes carry no encoding. One extra byte past `len` is always `0`, so
/// [`as_bytes_with_nul`](Self::as_bytes_with_nul) can be handed to C-style
/// consumers; nothing in this crate treats an embedded `0` as a terminator.
pub struct VString {
    ptr: NonNull<StringHeader>,
}

// Safety: VString uniquely owns its heap block, like `Vec<u8>`.
unsafe impl Send for VString {}
unsafe impl Sync for VString {}

impl VString {
    fn layout(cap: usize) -> Result<Layout> {
        let data = cap.checked_add(1).ok_or(Error::CapacityOverflow)?;
        Ok(Layout::new::<StringHeader>()
            .extend(Layout::array::<u8>(data)?)?
            .0
            .pad_to_align())
    }

    fn alloc(cap: usize) -> Result<NonNull<StringHeader>> {
        let layout = Self::layout(cap)?;
        unsafe {
            let ptr = raw::allocate(layout)?.cast::<StringHeader>();
            ptr.write(StringHeader { len: 0, cap });
            ptr.add(1).cast::<u8>().write(0);
            Ok(ptr)
        }
    }

    fn header(&self) -> &StringHeader {
        unsafe { self.ptr.as_ref() }
    }

    fn header_mut(&mut self) -> &mut StringHeader {
        unsafe { self.ptr.as_mut() }
    }

    fn data_ptr(&self) -> *const u8 {
        // Go through the raw pointer so provenance covers the trailing data
        unsafe { self.ptr.as_ptr().add(1).cast() }
    }

    fn data_ptr_mut(&mut self) -> *mut u8 {
        unsafe { self.ptr.as_ptr().add(1).cast() }
    }

    /// Creates an empty string with the default capacity.
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty string able to hold at least `cap` bytes.
    ///
    /// Requests of `usize::MAX - 1` or more are rejected up front because the
    /// extra NUL slot would wrap.
    pub fn with_capacity(cap: usize) -> Result<Self> {
        if cap >= usize::MAX - 1 {
            return Err(Error::CapacityOverflow);
        }
        let ptr = Self::alloc(cap.max(DEFAULT_CAPACITY))?;
        Ok(VString { ptr })
    }

    /// Creates a string holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut s = Self::with_capacity(bytes.len())?;
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), s.data_ptr_mut(), bytes.len());
            s.data_ptr_mut().add(bytes.len()).write(0);
        }
        s.header_mut().len = bytes.len();
        Ok(s)
    }

    /// Creates a string holding a copy of the bytes before `s`'s terminator.
    pub fn from_cstr(s: &CStr) -> Result<Self> {
        Self::from_bytes(s.to_bytes())
    }

    /// Returns the number of bytes, excluding the trailing NUL.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header().len
    }

    /// Returns `true` if the string has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bytes that fit without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.header().cap
    }

    /// Returns the bytes, excluding the trailing NUL.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.data_ptr(), self.len()) }
    }

    /// Returns the bytes including the trailing NUL.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.data_ptr(), self.len() + 1) }
    }

    /// Returns the bytes as `&str` if they happen to be valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// FNV-1a hash of the bytes. Equal strings hash equally.
    #[must_use]
    pub fn fnv1a(&self) -> u32 {
        fnv1a(self.as_bytes())
    }

    /// Makes room for at least `additional` more bytes.
    ///
    /// When growth is needed, capacity doubles from
    /// `max(capacity, DEFAULT_CAPACITY)` until it exceeds `len + additional`.
    /// On failure the string is unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let cap = self.capacity();
        let required = self
            .len()
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        if required <= cap {
            return Ok(());
        }

        let mut new_cap = cap.max(DEFAULT_CAPACITY);
        while new_cap <= required {
            new_cap = new_cap.checked_mul(2).ok_or(Error::CapacityOverflow)?;
        }

        let old_layout = Self::layout(cap)?;
        let new_layout = Self::layout(new_cap)?;
        let ptr = unsafe { raw::reallocate(self.ptr.cast(), old_layout, new_layout)? };
        self.ptr = ptr.cast();
        self.header_mut().cap = new_cap;
        trace!(old = cap, new = new_cap, "grew string");
        Ok(())
    }

    /// Appends a copy of `bytes`. Appending nothing always succeeds.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.reserve(bytes.len())?;
        let len = self.len();
        unsafe {
            let dst = self.data_ptr_mut().add(len);
            ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
            dst.add(bytes.len()).write(0);
        }
        self.header_mut().len = len + bytes.len();
        Ok(())
    }

    /// Appends the bytes of a NUL-terminated C string.
    pub fn push_cstr(&mut self, s: &CStr) -> Result<()> {
        self.push_bytes(s.to_bytes())
    }

    /// Appends the bytes of another string.
    pub fn push_vstring(&mut self, other: &VString) -> Result<()> {
        self.push_bytes(other.as_bytes())
    }

    /// Drops every byte, keeping the allocation.
    pub fn clear(&mut self) {
        self.header_mut().len = 0;
        unsafe { self.data_ptr_mut().write(0) };
    }

    /// Allocates an independent copy.
    pub fn deep_copy(&self) -> Result<VString> {
        Self::from_bytes(self.as_bytes())
    }
}

impl Drop for VString {
    fn drop(&mut self) {
        // The layout was validated when the block was allocated
        if let Ok(layout) = Self::layout(self.capacity()) {
            unsafe { raw::release(self.ptr.cast(), layout) }
        }
    }
}

impl Deref for VString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for VString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Borrow<[u8]> for VString {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl TryFrom<&[u8]> for VString {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl TryFrom<&str> for VString {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::from_bytes(s.as_bytes())
    }
}

// === Comparison ===

impl PartialEq for VString {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr == other.ptr {
            return true;
        }
        self.len() == other.len() && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for VString {}

impl PartialEq<[u8]> for VString {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&[u8]> for VString {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == *other
    }
}

impl PartialEq<str> for VString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for VString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<CStr> for VString {
    fn eq(&self, other: &CStr) -> bool {
        self.as_bytes() == other.to_bytes()
    }
}

impl PartialEq<&CStr> for VString {
    fn eq(&self, other: &&CStr) -> bool {
        self.as_bytes() == other.to_bytes()
    }
}

impl PartialOrd for VString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for VString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

// === Formatting ===

/// Writes `bytes` as text, replacing invalid UTF-8 with U+FFFD.
pub(crate) fn write_lossy(f: &mut dyn Write, bytes: &[u8]) -> fmt::Result {
    for chunk in bytes.utf8_chunks() {
        f.write_str(chunk.valid())?;
        if !chunk.invalid().is_empty() {
            f.write_char(char::REPLACEMENT_CHARACTER)?;
        }
    }
    Ok(())
}

impl Debug for VString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => Debug::fmt(s, f),
            None => write!(f, "b{:?}", self.as_bytes()),
        }
    }
}

impl fmt::Display for VString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_lossy(f, self.as_bytes())
    }
}
