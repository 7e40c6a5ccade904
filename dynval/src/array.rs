//! Array value type.

use alloc::alloc::Layout;
use core::cmp::Ordering;
use core::fmt::{self, Debug, Formatter};
use core::iter::FromIterator;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use crate::DEFAULT_CAPACITY;
use crate::error::{Error, Result, infallible};
use crate::raw;
use crate::trace::trace;
use crate::value::Value;

/// Header for heap-allocated arrays.
#[repr(C, align(8))]
struct ArrayHeader {
    /// Number of live elements
    len: usize,
    /// Number of slots (every slot past `len` holds `Null`)
    cap: usize,
    // Array of Value follows immediately after
}

const _: () = assert!(align_of::<Value>() <= align_of::<ArrayHeader>());

/// An owning, growable array of [`Value`]s.
///
/// Slots in `[len, capacity)` always hold `Null`, so releasing the array only
/// has to walk the live prefix.
pub struct VArray {
    ptr: NonNull<ArrayHeader>,
}

// Safety: VArray uniquely owns its elements, like `Vec<Value>`.
unsafe impl Send for VArray {}
unsafe impl Sync for VArray {}

impl VArray {
    fn layout(cap: usize) -> Result<Layout> {
        Ok(Layout::new::<ArrayHeader>()
            .extend(Layout::array::<Value>(cap)?)?
            .0
            .pad_to_align())
    }

    fn alloc(cap: usize) -> Result<NonNull<ArrayHeader>> {
        let layout = Self::layout(cap)?;
        unsafe {
            let ptr = raw::allocate(layout)?.cast::<ArrayHeader>();
            ptr.write(ArrayHeader { len: 0, cap });
            let items = ptr.add(1).cast::<Value>();
            for i in 0..cap {
                items.add(i).write(Value::Null);
            }
            Ok(ptr)
        }
    }

    fn header(&self) -> &ArrayHeader {
        unsafe { self.ptr.as_ref() }
    }

    fn header_mut(&mut self) -> &mut ArrayHeader {
        unsafe { self.ptr.as_mut() }
    }

    fn items_ptr(&self) -> *const Value {
        // Go through the raw pointer so provenance covers the trailing slots
        unsafe { self.ptr.as_ptr().add(1).cast() }
    }

    fn items_ptr_mut(&mut self) -> *mut Value {
        unsafe { self.ptr.as_ptr().add(1).cast() }
    }

    /// Reallocates to exactly `new_cap` slots, nulling any new ones.
    /// Callers guarantee `new_cap >= len`.
    fn resize(&mut self, new_cap: usize) -> Result<()> {
        let old_cap = self.capacity();
        debug_assert!(new_cap >= self.len());
        let old_layout = Self::layout(old_cap)?;
        let new_layout = Self::layout(new_cap)?;
        let ptr = unsafe { raw::reallocate(self.ptr.cast(), old_layout, new_layout)? };
        self.ptr = ptr.cast();
        self.header_mut().cap = new_cap;
        let items = self.items_ptr_mut();
        for i in old_cap..new_cap {
            unsafe { items.add(i).write(Value::Null) };
        }
        trace!(old = old_cap, new = new_cap, "resized array");
        Ok(())
    }

    fn next_capacity(cap: usize) -> Result<usize> {
        if cap < DEFAULT_CAPACITY {
            Ok(DEFAULT_CAPACITY)
        } else {
            cap.checked_mul(2).ok_or(Error::CapacityOverflow)
        }
    }

    /// Creates an empty array with the default capacity.
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty array with room for exactly `cap` elements.
    ///
    /// A zero capacity allocates no element storage until the first push.
    pub fn with_capacity(cap: usize) -> Result<Self> {
        let ptr = Self::alloc(cap)?;
        Ok(VArray { ptr })
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header().len
    }

    /// Returns `true` if the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.header().cap
    }

    /// Returns a slice of the elements.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        unsafe { core::slice::from_raw_parts(self.items_ptr(), self.len()) }
    }

    /// Returns a mutable slice of the elements.
    pub fn as_mut_slice(&mut self) -> &mut [Value] {
        let len = self.len();
        unsafe { core::slice::from_raw_parts_mut(self.items_ptr_mut(), len) }
    }

    #[cfg(test)]
    fn spare_slots(&self) -> &[Value] {
        unsafe {
            core::slice::from_raw_parts(
                self.items_ptr().add(self.len()),
                self.capacity() - self.len(),
            )
        }
    }

    /// Makes room for at least `additional` more elements, growing by the
    /// usual doubling steps. On failure the array is unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let cap = self.capacity();
        let required = self
            .len()
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        if required <= cap {
            return Ok(());
        }
        let mut new_cap = cap;
        while new_cap < required {
            new_cap = Self::next_capacity(new_cap)?;
        }
        self.resize(new_cap)
    }

    /// Appends `value`. If the array cannot grow, `value` is dropped and the
    /// error returned.
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.reserve(1)?;
        let len = self.len();
        unsafe {
            // The spare slot holds Null, which needs no drop
            self.items_ptr_mut().add(len).write(value);
        }
        self.header_mut().len = len + 1;
        Ok(())
    }

    /// Removes the last element, or returns `Null` if there is none.
    pub fn pop(&mut self) -> Value {
        let len = self.len();
        if len == 0 {
            return Value::Null;
        }
        self.header_mut().len = len - 1;
        unsafe { ptr::replace(self.items_ptr_mut().add(len - 1), Value::Null) }
    }

    /// Borrows the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_slice().get(index)
    }

    /// Mutably borrows the element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.as_mut_slice().get_mut(index)
    }

    /// Replaces the element at `index`, releasing the previous one.
    /// Out of range, `value` is dropped instead.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.len();
        match self.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::OutOfBounds { index, len }),
        }
    }

    /// Inserts `value` at `index`, shifting later elements up.
    ///
    /// `index == len` appends. Past that, or if the array cannot grow,
    /// `value` is dropped and the error returned.
    pub fn insert_at(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(Error::OutOfBounds { index, len });
        }
        self.reserve(1)?;
        unsafe {
            let slot = self.items_ptr_mut().add(index);
            // Shift elements to the right over the Null spare slot
            ptr::copy(slot, slot.add(1), len - index);
            slot.write(value);
        }
        self.header_mut().len = len + 1;
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting later elements down.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        let len = self.len();
        if index >= len {
            return None;
        }
        unsafe {
            let slot = self.items_ptr_mut().add(index);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, len - index - 1);
            self.items_ptr_mut().add(len - 1).write(Value::Null);
            self.header_mut().len = len - 1;
            Some(value)
        }
    }

    /// Releases the element at `index`, shifting later elements down.
    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        let len = self.len();
        self.remove(index)
            .map(drop)
            .ok_or(Error::OutOfBounds { index, len })
    }

    /// Releases every element past the first `len`.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        self.header_mut().len = len;
        let items = self.items_ptr_mut();
        for i in len..old_len {
            drop(unsafe { ptr::replace(items.add(i), Value::Null) });
        }
    }

    /// Releases every element in ascending index order. Capacity is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Reallocates so that capacity equals length.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let len = self.len();
        if len == self.capacity() {
            return Ok(());
        }
        self.resize(len)
    }

    /// Sorts in place with a three-way comparator. Not stable.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        if self.len() < 2 {
            return;
        }
        self.as_mut_slice().sort_unstable_by(compare);
    }

    /// Builds a new array holding deep copies of the elements `predicate`
    /// accepts. On failure the partial result is released.
    pub fn filter<P>(&self, mut predicate: P) -> Result<VArray>
    where
        P: FnMut(&Value) -> bool,
    {
        let mut out = VArray::new()?;
        for value in self.as_slice() {
            if predicate(value) {
                out.push(value.deep_copy()?)?;
            }
        }
        Ok(out)
    }

    /// Builds a new array from `transform` applied to each element in order.
    /// On failure the partial result is released.
    pub fn map<F>(&self, mut transform: F) -> Result<VArray>
    where
        F: FnMut(&Value) -> Value,
    {
        let mut out = VArray::with_capacity(self.len())?;
        for value in self.as_slice() {
            out.push(transform(value))?;
        }
        Ok(out)
    }

    /// Returns `true` if some element is structurally equal to `needle`.
    #[must_use]
    pub fn contains(&self, needle: &Value) -> bool {
        self.as_slice().iter().any(|v| v == needle)
    }

    /// Index of the first element equal to `needle` at or after `start`.
    #[must_use]
    pub fn index_of(&self, needle: &Value, start: usize) -> Option<usize> {
        self.as_slice()
            .get(start..)?
            .iter()
            .position(|v| v == needle)
            .map(|i| i + start)
    }

    /// Index of the last element equal to `needle`.
    #[must_use]
    pub fn last_index_of(&self, needle: &Value) -> Option<usize> {
        self.as_slice().iter().rposition(|v| v == needle)
    }

    /// Borrows the first element equal to `needle`.
    #[must_use]
    pub fn find(&self, needle: &Value) -> Option<&Value> {
        self.as_slice().iter().find(|v| *v == needle)
    }

    /// Borrows the last element equal to `needle`.
    #[must_use]
    pub fn find_last(&self, needle: &Value) -> Option<&Value> {
        self.as_slice().iter().rev().find(|v| *v == needle)
    }

    /// Allocates an independent copy of the array and everything under it.
    pub fn deep_copy(&self) -> Result<VArray> {
        let mut out = VArray::with_capacity(self.len())?;
        for value in self.as_slice() {
            out.push(value.deep_copy()?)?;
        }
        Ok(out)
    }
}

impl Drop for VArray {
    fn drop(&mut self) {
        self.clear();
        // The layout was validated when the block was allocated
        if let Ok(layout) = Self::layout(self.capacity()) {
            unsafe { raw::release(self.ptr.cast(), layout) }
        }
    }
}

// === Iterator ===

/// Iterator over owned `Value`s from a `VArray`.
pub struct ArrayIntoIter {
    array: VArray,
    front: usize,
}

impl Iterator for ArrayIntoIter {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.array.get_mut(self.front)?.take();
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len() - self.front;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ArrayIntoIter {}

impl IntoIterator for VArray {
    type Item = Value;
    type IntoIter = ArrayIntoIter;

    fn into_iter(self) -> Self::IntoIter {
        ArrayIntoIter {
            array: self,
            front: 0,
        }
    }
}

impl<'a> IntoIterator for &'a VArray {
    type Item = &'a Value;
    type IntoIter = core::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a mut VArray {
    type Item = &'a mut Value;
    type IntoIter = core::slice::IterMut<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

// === Deref ===

impl Deref for VArray {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        self.as_slice()
    }
}

impl DerefMut for VArray {
    fn deref_mut(&mut self) -> &mut [Value] {
        self.as_mut_slice()
    }
}

impl AsRef<[Value]> for VArray {
    fn as_ref(&self) -> &[Value] {
        self.as_slice()
    }
}

// === Comparison ===

impl PartialEq for VArray {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Debug for VArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self.as_slice(), f)
    }
}

// === FromIterator / Extend ===

impl<T: Into<Value>> FromIterator<T> for VArray {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut array = infallible(VArray::with_capacity(lower.max(DEFAULT_CAPACITY)));
        for v in iter {
            infallible(array.push(v.into()));
        }
        array
    }
}

impl<T: Into<Value>> Extend<T> for VArray {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        infallible(self.reserve(lower));
        for v in iter {
            infallible(self.push(v.into()));
        }
    }
}
