//! Map value type.
//!
//! A separately-chained hash table keyed by [`VString`]. Each bucket head
//! points at a singly-linked chain of heap entries; new entries go to the
//! front of their chain. An entry caches the FNV-1a hash of its key, so
//! lookups compare hashes before bytes and resizing never rehashes keys.
//! Resizing relinks the existing entry nodes, so a value never moves in
//! memory while it stays in the map.
//!
//! Iteration runs in bucket-scan order, which is unspecified and changes
//! whenever the table resizes.

use alloc::alloc::Layout;
use core::fmt::{self, Debug, Formatter};
use core::iter::{FromIterator, FusedIterator};
use core::marker::PhantomData;
use core::ops::Index;
use core::ptr::{self, NonNull};

use crate::DEFAULT_CAPACITY;
use crate::error::{Error, Result, infallible};
use crate::raw;
use crate::string::{VString, fnv1a};
use crate::trace::debug;
use crate::value::Value;

/// Resize is triggered when an insert would bring `len / capacity` to this.
pub const MAX_LOAD_FACTOR: f64 = 0.75;

type Link = Option<NonNull<Entry>>;

/// One key/value pair in a bucket chain.
struct Entry {
    hash: u32,
    next: Link,
    key: VString,
    value: Value,
}

impl Entry {
    fn layout() -> Layout {
        Layout::new::<Entry>()
    }

    fn matches(&self, hash: u32, key: &[u8]) -> bool {
        self.hash == hash && self.key.as_bytes() == key
    }
}

/// Header for heap-allocated maps.
#[repr(C, align(8))]
struct MapHeader {
    /// Entries across all chains
    len: usize,
    /// Number of buckets
    cap: usize,
    // Array of bucket heads follows immediately after
}

const _: () = assert!(align_of::<Link>() <= align_of::<MapHeader>());

/// An owning hash map from byte-string keys to [`Value`]s.
pub struct VMap {
    ptr: NonNull<MapHeader>,
}

// Safety: VMap uniquely owns every entry, key and value it links to.
unsafe impl Send for VMap {}
unsafe impl Sync for VMap {}

impl VMap {
    fn layout(cap: usize) -> Result<Layout> {
        Ok(Layout::new::<MapHeader>()
            .extend(Layout::array::<Link>(cap)?)?
            .0
            .pad_to_align())
    }

    /// Allocates a block whose bucket heads are all empty.
    fn alloc(len: usize, cap: usize) -> Result<NonNull<MapHeader>> {
        let layout = Self::layout(cap)?;
        unsafe {
            // All-zero bytes are `None` for every bucket head
            let ptr = raw::allocate_zeroed(layout)?.cast::<MapHeader>();
            ptr.write(MapHeader { len, cap });
            Ok(ptr)
        }
    }

    fn header(&self) -> &MapHeader {
        unsafe { self.ptr.as_ref() }
    }

    fn header_mut(&mut self) -> &mut MapHeader {
        unsafe { self.ptr.as_mut() }
    }

    fn buckets(&self) -> &[Link] {
        unsafe {
            core::slice::from_raw_parts(
                self.ptr.as_ptr().add(1).cast::<Link>(),
                self.capacity(),
            )
        }
    }

    fn buckets_mut(&mut self) -> &mut [Link] {
        let cap = self.capacity();
        unsafe {
            core::slice::from_raw_parts_mut(self.ptr.as_ptr().add(1).cast::<Link>(), cap)
        }
    }

    fn bucket_index(hash: u32, cap: usize) -> usize {
        hash as usize % cap
    }

    fn find_entry(&self, key: &[u8]) -> Option<NonNull<Entry>> {
        self.find_hashed(fnv1a(key), key)
    }

    fn find_hashed(&self, hash: u32, key: &[u8]) -> Option<NonNull<Entry>> {
        let cap = self.capacity();
        if cap == 0 {
            return None;
        }
        let mut link = self.buckets()[Self::bucket_index(hash, cap)];
        while let Some(entry) = link {
            let entry_ref = unsafe { entry.as_ref() };
            if entry_ref.matches(hash, key) {
                return Some(entry);
            }
            link = entry_ref.next;
        }
        None
    }

    /// Moves every entry into a fresh bucket array of `new_cap` buckets.
    /// On failure the map is unchanged.
    fn rehash(&mut self, new_cap: usize) -> Result<()> {
        let old_cap = self.capacity();
        let new_ptr = Self::alloc(self.len(), new_cap)?;
        let new_buckets = unsafe {
            core::slice::from_raw_parts_mut(new_ptr.as_ptr().add(1).cast::<Link>(), new_cap)
        };

        for head in self.buckets_mut() {
            let mut link = head.take();
            while let Some(mut entry) = link {
                let entry_mut = unsafe { entry.as_mut() };
                link = entry_mut.next;
                let slot = &mut new_buckets[Self::bucket_index(entry_mut.hash, new_cap)];
                entry_mut.next = *slot;
                *slot = Some(entry);
            }
        }

        if let Ok(layout) = Self::layout(old_cap) {
            unsafe { raw::release(self.ptr.cast(), layout) }
        }
        self.ptr = new_ptr;
        debug!(
            entries = self.len(),
            old = old_cap,
            new = new_cap,
            "rehashed map"
        );
        Ok(())
    }

    /// Makes sure one more entry fits under the load factor.
    fn grow_for_insert(&mut self) -> Result<()> {
        let cap = self.capacity();
        if cap == 0 {
            return self.rehash(DEFAULT_CAPACITY);
        }
        if (self.len() + 1) as f64 / cap as f64 >= MAX_LOAD_FACTOR {
            let new_cap = cap.checked_mul(2).ok_or(Error::CapacityOverflow)?;
            return self.rehash(new_cap);
        }
        Ok(())
    }

    /// Creates an empty map with the default number of buckets.
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty map with `cap` buckets.
    ///
    /// A zero capacity allocates no buckets until the first insert.
    pub fn with_capacity(cap: usize) -> Result<Self> {
        Ok(VMap {
            ptr: Self::alloc(0, cap)?,
        })
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header().len
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of buckets.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.header().cap
    }

    /// Returns `len / capacity`, or `0.0` before any bucket exists.
    #[must_use]
    pub fn load_factor(&self) -> f64 {
        match self.capacity() {
            0 => 0.0,
            cap => self.len() as f64 / cap as f64,
        }
    }

    /// Associates `value` with `key`.
    ///
    /// If the key is already present its value is released and replaced, and
    /// the stored key is kept while `key` is dropped. On failure both `key`
    /// and `value` are dropped.
    pub fn insert(&mut self, key: VString, value: Value) -> Result<()> {
        self.grow_for_insert()?;

        let hash = key.fnv1a();
        if let Some(mut entry) = self.find_hashed(hash, key.as_bytes()) {
            unsafe { entry.as_mut() }.value = value;
            return Ok(());
        }

        let node = unsafe { raw::allocate(Entry::layout())? }.cast::<Entry>();
        let cap = self.capacity();
        let head = &mut self.buckets_mut()[Self::bucket_index(hash, cap)];
        unsafe {
            node.write(Entry {
                hash,
                next: *head,
                key,
                value,
            });
        }
        *head = Some(node);
        self.header_mut().len += 1;
        Ok(())
    }

    /// Associates `value` with a copy of `key`.
    ///
    /// If the key copy cannot be allocated, `value` is dropped.
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: Value) -> Result<()> {
        let key = VString::from_bytes(key.as_ref())?;
        self.insert(key, value)
    }

    /// Borrows the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Value> {
        self.find_entry(key.as_ref())
            .map(|entry| unsafe { &(*entry.as_ptr()).value })
    }

    /// Mutably borrows the value stored under `key`.
    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut Value> {
        self.find_entry(key.as_ref())
            .map(|entry| unsafe { &mut (*entry.as_ptr()).value })
    }

    /// Borrows the stored key and value for `key`.
    #[must_use]
    pub fn get_key_value(&self, key: impl AsRef<[u8]>) -> Option<(&VString, &Value)> {
        self.find_entry(key.as_ref()).map(|entry| {
            let entry = unsafe { &*entry.as_ptr() };
            (&entry.key, &entry.value)
        })
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.find_entry(key.as_ref()).is_some()
    }

    /// Unlinks the entry for `key`, releasing its key and node and handing
    /// back the value.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<Value> {
        let key = key.as_ref();
        let cap = self.capacity();
        if cap == 0 {
            return None;
        }
        let hash = fnv1a(key);
        let mut link: *mut Link = &mut self.buckets_mut()[Self::bucket_index(hash, cap)];
        unsafe {
            while let Some(entry) = *link {
                if entry.as_ref().matches(hash, key) {
                    *link = entry.as_ref().next;
                    let Entry { value, .. } = entry.read();
                    raw::release(entry.cast(), Entry::layout());
                    self.header_mut().len -= 1;
                    return Some(value);
                }
                link = &raw mut (*entry.as_ptr()).next;
            }
        }
        None
    }

    /// Releases the entry for `key`. Returns `false` if there was none.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> bool {
        self.remove(key).is_some()
    }

    /// Releases every entry in bucket-scan order. Buckets are kept.
    pub fn clear(&mut self) {
        self.header_mut().len = 0;
        for head in self.buckets_mut() {
            let mut link = head.take();
            while let Some(entry) = link {
                unsafe {
                    link = entry.as_ref().next;
                    drop(entry.read());
                    raw::release(entry.cast(), Entry::layout());
                }
            }
        }
    }

    /// Iterates over `(key, value)` pairs in bucket-scan order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buckets: self.buckets().iter(),
            entry: None,
            remaining: self.len(),
            _marker: PhantomData,
        }
    }

    /// Iterates over `(key, value)` pairs with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_> {
        IterMut {
            buckets: self.buckets().iter(),
            entry: None,
            remaining: self.len(),
            _marker: PhantomData,
        }
    }

    /// Iterates over keys in bucket-scan order.
    pub fn keys(&self) -> impl Iterator<Item = &VString> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over values in bucket-scan order.
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Iterates over mutable values in bucket-scan order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Allocates an independent copy with the same bucket count.
    pub fn deep_copy(&self) -> Result<VMap> {
        let mut out = VMap::with_capacity(self.capacity())?;
        for (key, value) in self {
            out.insert(key.deep_copy()?, value.deep_copy()?)?;
        }
        Ok(out)
    }

    #[cfg(test)]
    fn assert_well_formed(&self) {
        let cap = self.capacity();
        let mut seen = 0;
        for (index, head) in self.buckets().iter().enumerate() {
            let mut link = *head;
            while let Some(entry) = link {
                let entry = unsafe { entry.as_ref() };
                assert_eq!(entry.hash, entry.key.fnv1a(), "stale cached hash");
                assert_eq!(
                    Self::bucket_index(entry.hash, cap),
                    index,
                    "entry {:?} in the wrong bucket",
                    entry.key
                );
                seen += 1;
                link = entry.next;
            }
        }
        assert_eq!(seen, self.len(), "len disagrees with chain contents");
    }
}

impl Drop for VMap {
    fn drop(&mut self) {
        self.clear();
        // The layout was validated when the block was allocated
        if let Ok(layout) = Self::layout(self.capacity()) {
            unsafe { raw::release(self.ptr.cast(), layout) }
        }
    }
}

// === Iterators ===

/// Borrowing iterator over a [`VMap`].
pub struct Iter<'a> {
    buckets: core::slice::Iter<'a, Link>,
    entry: Link,
    remaining: usize,
    _marker: PhantomData<&'a VMap>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a VString, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.entry {
                let entry = unsafe { &*entry.as_ptr() };
                self.entry = entry.next;
                self.remaining -= 1;
                return Some((&entry.key, &entry.value));
            }
            self.entry = *self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

/// Iterator over a [`VMap`] yielding mutable values.
pub struct IterMut<'a> {
    buckets: core::slice::Iter<'a, Link>,
    entry: Link,
    remaining: usize,
    _marker: PhantomData<&'a mut VMap>,
}

impl<'a> Iterator for IterMut<'a> {
    type Item = (&'a VString, &'a mut Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.entry {
                // Each entry is yielded once, so the `&mut` never aliases
                let entry = unsafe { &mut *entry.as_ptr() };
                self.entry = entry.next;
                self.remaining -= 1;
                return Some((&entry.key, &mut entry.value));
            }
            self.entry = *self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IterMut<'_> {}
impl FusedIterator for IterMut<'_> {}

impl<'a> IntoIterator for &'a VMap {
    type Item = (&'a VString, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut VMap {
    type Item = (&'a VString, &'a mut Value);
    type IntoIter = IterMut<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// === Comparison ===

/// Equal when both hold the same keys with structurally equal values,
/// whatever their bucket counts.
impl PartialEq for VMap {
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl Debug for VMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Index<&str> for VMap {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key {key:?} not found in map"),
        }
    }
}

// === FromIterator / Extend ===

impl<K: AsRef<[u8]>, V: Into<Value>> FromIterator<(K, V)> for VMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = infallible(VMap::new());
        map.extend(iter);
        map
    }
}

impl<K: AsRef<[u8]>, V: Into<Value>> Extend<(K, V)> for VMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            infallible(self.set(key, value.into()));
        }
    }
}
