use std::borrow::Borrow;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::RandomState;
use std::marker::PhantomData;
use std::mem;
use std::ops::Index;
use std::ptr::{self, NonNull};

use super::node::{Bucket, Link, Node, NodeRef, Prev};
use super::{
    CursorMut, Drain, IntoKeys, IntoValues, Iter, IterMut, KeyNotFound, Keys, Values, ValuesMut,
};
use crate::collections::hash::policy::{self, DefaultEqual, KeyEqual, KeyHasher, SENTINEL_BUCKETS};
use crate::memory::{Allocator, Global};
use crate::util::error::{CapacityOverflow, IndexOutOfBounds, ReserveError};
use crate::util::fmt::DebugIter;
use crate::util::option::OptionExtension;
use crate::util::result::ResultExtension;

const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// A map of unique keys to values, stored as a single chain of nodes threaded through an array of
/// buckets.
///
/// Every entry lives in its own node, and nodes never move: references to keys and values stay
/// valid across rehashing, until the entry is removed. Nodes that hash into the same bucket form a
/// contiguous run of the chain, and each bucket points at the link right before its run, which
/// makes inserting at the start of a run and unlinking any node `O(1)` once it has been found.
/// Iteration follows the chain.
///
/// Hashing and key equality are policies: `H` is a [`KeyHasher`] (every
/// [`BuildHasher`](std::hash::BuildHasher) is one) and `E` a [`KeyEqual`]. The hash of every key is
/// cached in its node, so rehashing never calls `H`.
///
/// Unlike the standard library's map, [`insert`](HashMap::insert) never replaces the value of an
/// existing key, use [`insert_or_assign`](HashMap::insert_or_assign) for that.
///
/// # Load Factor
/// The map keeps `len / bucket_count <= max_load_factor` (1.0 unless configured) after every
/// operation. When an insertion would break that, the bucket count grows to the smallest value in
/// the [growth sequence](policy::next_bucket_count) that fits. A map that has never held an entry
/// reports a single bucket and allocates nothing.
///
/// # Time Complexity
/// For this analysis of time complexity, variables are defined as follows:
/// - `n`: The number of entries in the HashMap.
/// - `r`: The length of the run the key hashes into.
///
/// | Method | Complexity |
/// |-|-|
/// | `len` | `O(1)` |
/// | `insert` | `O(r)`*, `O(n)` |
/// | `get` | `O(r)` |
/// | `remove` | `O(r)` |
/// | `rehash` | `O(n + bucket_count)` |
/// | `iter` | `O(n)` |
///
/// \* If the insertion triggers a rehash, `insert` will take `O(n)`.
pub struct HashMap<K, V, H = RandomState, E = DefaultEqual, A: Allocator = Global> {
    pub(crate) head: Link<K, V>,
    pub(crate) buckets: Option<NonNull<Bucket<K, V>>>,
    pub(crate) bucket_count: usize,
    pub(crate) len: usize,
    pub(crate) max_load_factor: f32,
    pub(crate) hasher: H,
    pub(crate) equal: E,
    pub(crate) alloc: A,
    pub(crate) _phantom: PhantomData<(K, V)>,
}

impl<K, V> HashMap<K, V> {
    /// Creates a new, empty HashMap with a random hasher. Nothing is allocated until the first
    /// insertion.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::hash::HashMap;
    /// let map: HashMap<u8, u8> = HashMap::new();
    /// assert_eq!(map.bucket_count(), 1);
    /// assert_eq!(map.load_factor(), 0.0);
    /// ```
    pub fn new() -> HashMap<K, V> {
        HashMap::with_policies(RandomState::new(), DefaultEqual)
    }

    /// Creates a new, empty HashMap with at least `bucket_count` buckets.
    ///
    /// # Panics
    /// Panics if the bucket array can't be allocated.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::hash::HashMap;
    /// let map: HashMap<u8, u8> = HashMap::with_buckets(16);
    /// assert_eq!(map.bucket_count(), 23);
    /// ```
    pub fn with_buckets(bucket_count: usize) -> HashMap<K, V> {
        HashMap::with_parts(bucket_count, RandomState::new(), DefaultEqual, Global)
    }
}

impl<K, V, H> HashMap<K, V, H> {
    /// Creates a new, empty HashMap that hashes keys with `hasher`.
    pub fn with_hasher(hasher: H) -> HashMap<K, V, H> {
        HashMap::with_policies(hasher, DefaultEqual)
    }
}

impl<K, V, H, E> HashMap<K, V, H, E> {
    /// Creates a new, empty HashMap with the provided hashing and equality policies.
    pub fn with_policies(hasher: H, equal: E) -> HashMap<K, V, H, E> {
        HashMap::with_parts(0, hasher, equal, Global)
    }
}

impl<K, V, A: Allocator> HashMap<K, V, RandomState, DefaultEqual, A> {
    /// Creates a new, empty HashMap that allocates from `alloc`.
    pub fn new_in(alloc: A) -> HashMap<K, V, RandomState, DefaultEqual, A> {
        HashMap::with_parts(0, RandomState::new(), DefaultEqual, alloc)
    }
}

impl<K, V, H, E, A: Allocator> HashMap<K, V, H, E, A> {
    /// Creates a new, empty HashMap from all of its parts. If `bucket_count` is above 1, the bucket
    /// array is allocated straight away, with at least that many buckets.
    ///
    /// # Panics
    /// Panics if the bucket array can't be allocated.
    pub fn with_parts(
        bucket_count: usize,
        hasher: H,
        equal: E,
        alloc: A,
    ) -> HashMap<K, V, H, E, A> {
        let mut map = HashMap {
            head: None,
            buckets: None,
            bucket_count: SENTINEL_BUCKETS,
            len: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            hasher,
            equal,
            alloc,
            _phantom: PhantomData,
        };
        map.rehash(bucket_count);
        map
    }

    /// Returns the number of entries in the HashMap.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the HashMap contains no entries.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the largest number of entries a HashMap of `K` and `V` can hold.
    pub const fn max_len() -> usize {
        isize::MAX as usize / mem::size_of::<Node<K, V>>()
    }

    /// Returns the number of buckets.
    pub const fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Returns the number of entries stored in bucket `index`.
    ///
    /// # Panics
    /// Panics if `index >= bucket_count`.
    pub fn bucket_len(&self, index: usize) -> usize {
        if index >= self.bucket_count {
            Err(IndexOutOfBounds {
                index,
                len: self.bucket_count,
            }).throw()
        }

        let mut len = 0;
        let mut cursor = match self.bucket(index) {
            Some(prev) => self.next_of(prev),
            None => None,
        };
        while let Some(node) = cursor {
            if self.index_for(node.hash()) != index {
                break;
            }
            len += 1;
            cursor = node.next();
        }
        len
    }

    /// Returns the average number of entries per bucket.
    pub fn load_factor(&self) -> f32 {
        self.len as f32 / self.bucket_count as f32
    }

    /// Returns the largest load factor the HashMap allows before growing.
    pub const fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Sets the largest load factor the HashMap allows, growing it right away if the current load
    /// is above the new maximum.
    ///
    /// # Panics
    /// Panics if `max_load_factor` isn't positive, or if growing fails.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::hash::HashMap;
    /// let mut map: HashMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
    /// map.set_max_load_factor(0.25);
    /// assert!(map.load_factor() <= 0.25);
    /// ```
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        assert!(max_load_factor > 0.0, "Max load factor must be positive!");
        self.max_load_factor = max_load_factor;
        self.try_grow_for(self.len).throw()
    }

    /// Rebuilds the bucket array with at least `bucket_count` buckets, and at least as many as the
    /// current entries need. Rehashing an empty map to 1 or fewer buckets frees the array.
    ///
    /// Entries aren't moved in memory, only relinked.
    ///
    /// # Panics
    /// Panics if the bucket array can't be allocated.
    pub fn rehash(&mut self, bucket_count: usize) {
        self.try_rehash(bucket_count).throw()
    }

    /// Rebuilds the bucket array with at least `bucket_count` buckets. On failure, the HashMap is
    /// unchanged.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the bucket count can't be represented or the allocator fails.
    pub fn try_rehash(&mut self, bucket_count: usize) -> Result<(), ReserveError> {
        if self.len == 0 && bucket_count <= SENTINEL_BUCKETS {
            if self.buckets.is_some() {
                self.try_rehash_to(SENTINEL_BUCKETS)?;
            }
            return Ok(());
        }

        let min = self.min_buckets(self.len).ok_or(CapacityOverflow)?;
        let target =
            policy::next_bucket_count(usize::max(bucket_count, min)).ok_or(CapacityOverflow)?;
        if target != self.bucket_count {
            self.try_rehash_to(target)?;
        }
        Ok(())
    }

    /// Makes sure that `additional` more entries can be inserted without rehashing.
    ///
    /// # Panics
    /// Panics if the new length would exceed [`max_len`](HashMap::max_len) or the allocator
    /// fails.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional).throw()
    }

    /// Makes sure that `additional` more entries can be inserted without rehashing. Never shrinks
    /// the bucket array.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the new length would exceed [`max_len`](HashMap::max_len) or
    /// the allocator fails.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        let len = self.len.checked_add(additional).ok_or(CapacityOverflow)?;
        self.try_grow_for(len)
    }

    /// Returns a reference to the hashing policy.
    pub const fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns a reference to the equality policy.
    pub const fn key_eq(&self) -> &E {
        &self.equal
    }

    /// Returns a reference to the HashMap's allocator.
    pub const fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns an iterator over the entries, in chain order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            next: self.head,
            len: self.len,
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over the entries with mutable values, in chain order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            next: self.head,
            len: self.len,
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over the keys, in chain order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Returns an iterator over the values, in chain order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Returns an iterator over mutable references to the values, in chain order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut(self.iter_mut())
    }

    /// Consumes the HashMap and returns an iterator over its keys.
    pub fn into_keys(self) -> IntoKeys<K, V, H, E, A> {
        IntoKeys(self.into_iter())
    }

    /// Consumes the HashMap and returns an iterator over its values.
    pub fn into_values(self) -> IntoValues<K, V, H, E, A> {
        IntoValues(self.into_iter())
    }

    /// Returns a cursor positioned at the first entry of the chain. The cursor can remove entries
    /// while walking the chain, without looking their keys up again.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::hash::HashMap;
    /// let mut map: HashMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    /// let mut cursor = map.cursor_front_mut();
    /// while let Some((_, value)) = cursor.current() {
    ///     if value % 2 == 0 {
    ///         cursor.remove_current();
    ///     } else {
    ///         cursor.move_next();
    ///     }
    /// }
    /// assert_eq!(map.len(), 5);
    /// ```
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V, H, E, A> {
        let current = self.head;
        CursorMut {
            map: self,
            prev: Prev::Head,
            current,
        }
    }

    /// Removes every entry, returning them through an iterator. Entries that aren't consumed are
    /// dropped along with the iterator. The bucket array is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V, H, E, A> {
        Drain { map: self }
    }

    /// Drops every entry. The bucket array is kept.
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        self.len = 0;
        if let Some(buckets) = self.buckets {
            for index in 0..self.bucket_count {
                // SAFETY: index < bucket_count.
                unsafe { buckets.add(index).write(None) }
            }
        }

        while let Some(node) = cursor {
            cursor = node.next();
            // SAFETY: The node is no longer reachable from the map.
            unsafe { self.free_node(node) }
        }
    }

    /// Keeps only the entries for which `f` returns true.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut f: F) {
        let mut prev = Prev::Head;
        let mut cursor = self.head;
        while let Some(node) = cursor {
            cursor = node.next();
            let (key, value) = node.entry_mut();
            if f(key, value) {
                prev = Prev::Node(node);
            } else {
                self.unlink(prev, node);
                // SAFETY: The node has just been unlinked.
                unsafe { self.free_node(node) }
            }
        }
    }

    /// Exchanges the contents and policies of two HashMaps.
    ///
    /// If the allocator propagates on swap, the allocators are exchanged too. If it doesn't and the
    /// allocators are unequal, every entry is moved into memory from its new owner's allocator.
    ///
    /// # Panics
    /// Panics if entries have to be moved and an allocator fails. Both HashMaps are then left
    /// holding only the entries moved so far, the rest are dropped.
    pub fn swap(&mut self, other: &mut HashMap<K, V, H, E, A>) {
        self.swap_policies(other);
        if A::PROPAGATE_ON_SWAP {
            self.swap_storage(other);
            mem::swap(&mut self.alloc, &mut other.alloc);
        } else if self.alloc == other.alloc {
            self.swap_storage(other);
        } else {
            let mine = Detached::take(self);
            let theirs = Detached::take(other);
            self.adopt(theirs);
            other.adopt(mine);
        }
    }

    /// Replaces the contents and policies of the HashMap with those of `source`, the way a move
    /// assignment does.
    ///
    /// # Panics
    /// Panics if entries have to be moved and the allocator fails. The HashMap is left holding the
    /// entries moved so far.
    pub fn assign_from(&mut self, mut source: HashMap<K, V, H, E, A>) {
        if A::PROPAGATE_ON_MOVE_ASSIGN {
            *self = source;
            return;
        }
        self.swap_policies(&mut source);
        if self.alloc == source.alloc {
            self.swap_storage(&mut source);
        } else {
            self.clear();
            self.free_buckets();
            self.adopt(Detached::take(&mut source));
        }
    }

    /// Unlinks the first node of the chain and returns its entry.
    pub(crate) fn pop_front(&mut self) -> Option<(K, V)> {
        let node = self.head?;
        Some(self.remove_node(Prev::Head, node))
    }

    /// Unlinks `node`, which follows `prev`, and returns its entry.
    pub(super) fn remove_node(&mut self, prev: Prev<K, V>, node: NodeRef<K, V>) -> (K, V) {
        self.unlink(prev, node);
        // SAFETY: The node has just been unlinked.
        unsafe { self.take_node(node) }
    }

    const fn index_for(&self, hash: u64) -> usize {
        (hash % self.bucket_count as u64) as usize
    }

    fn bucket(&self, index: usize) -> Bucket<K, V> {
        match self.buckets {
            // SAFETY: Buckets are only indexed with index_for, which is below bucket_count.
            Some(buckets) => unsafe { buckets.add(index).read() },
            None => None,
        }
    }

    fn bucket_mut(&mut self, index: usize) -> &mut Bucket<K, V> {
        // SAFETY: Only called while the map holds entries, so the array exists, and index is below
        // bucket_count.
        unsafe { self.buckets.unreachable().add(index).as_mut() }
    }

    const fn next_of(&self, prev: Prev<K, V>) -> Link<K, V> {
        match prev {
            Prev::Head => self.head,
            Prev::Node(node) => node.next(),
        }
    }

    fn set_next(&mut self, prev: Prev<K, V>, link: Link<K, V>) {
        match prev {
            Prev::Head => self.head = link,
            Prev::Node(node) => *node.next_mut() = link,
        }
    }

    /// Finds the node holding `key`, along with the link before it.
    fn find<Q: ?Sized>(&self, hash: u64, key: &Q) -> Option<(Prev<K, V>, NodeRef<K, V>)>
    where
        K: Borrow<Q>,
        E: KeyEqual<Q>,
    {
        let index = self.index_for(hash);
        let mut prev = self.bucket(index)?;
        // SAFETY: A bucket that isn't empty is followed by at least one node.
        let mut node = unsafe { self.next_of(prev).unreachable() };
        loop {
            if node.hash() == hash && self.equal.key_eq(node.key().borrow(), key) {
                return Some((prev, node));
            }
            let next = node.next()?;
            if self.index_for(next.hash()) != index {
                return None;
            }
            prev = Prev::Node(node);
            node = next;
        }
    }

    /// Adds `node` at the start of its bucket's run.
    fn link(&mut self, node: NodeRef<K, V>) {
        let index = self.index_for(node.hash());
        match self.bucket(index) {
            Some(prev) => {
                *node.next_mut() = self.next_of(prev);
                self.set_next(prev, Some(node));
            },
            None => {
                // The bucket is empty, start a new run at the head of the chain.
                *node.next_mut() = self.head;
                if let Some(old_head) = self.head {
                    let old_index = self.index_for(old_head.hash());
                    *self.bucket_mut(old_index) = Some(Prev::Node(node));
                }
                self.head = Some(node);
                *self.bucket_mut(index) = Some(Prev::Head);
            },
        }
        self.len += 1;
    }

    /// Removes `node`, which follows `prev`, from the chain, updating every bucket that pointed at
    /// the links involved.
    fn unlink(&mut self, prev: Prev<K, V>, node: NodeRef<K, V>) {
        let index = self.index_for(node.hash());
        let next = node.next();
        let next_index = next.map(|next| self.index_for(next.hash()));

        if self.bucket(index) == Some(prev) {
            // The node starts its run. If it was the only node of the run, the bucket empties.
            if next_index != Some(index) {
                if let Some(next_index) = next_index {
                    *self.bucket_mut(next_index) = Some(prev);
                }
                *self.bucket_mut(index) = None;
            }
        } else if let Some(next_index) = next_index {
            // The node ends its run, the next run now starts after prev.
            if next_index != index {
                *self.bucket_mut(next_index) = Some(prev);
            }
        }

        self.set_next(prev, next);
        self.len -= 1;
    }

    /// Returns the fewest buckets that hold `len` entries within the max load factor.
    fn min_buckets(&self, len: usize) -> Option<usize> {
        let estimate = (len as f64 / self.max_load_factor as f64).ceil();
        if !(estimate < usize::MAX as f64) {
            return None;
        }
        let mut count = estimate as usize;
        while self.exceeds(len, count) {
            count = count.checked_add(1)?;
        }
        Some(count)
    }

    fn exceeds(&self, len: usize, bucket_count: usize) -> bool {
        len as f64 > bucket_count as f64 * self.max_load_factor as f64
    }

    /// Grows the bucket array if `len` entries wouldn't fit within the max load factor.
    fn try_grow_for(&mut self, len: usize) -> Result<(), ReserveError> {
        if len > Self::max_len() {
            return Err(CapacityOverflow.into());
        }
        let sentinel = self.buckets.is_none() && len > 0;
        if sentinel || self.exceeds(len, self.bucket_count) {
            let min = self.min_buckets(len).ok_or(CapacityOverflow)?;
            let target = policy::next_bucket_count(min).ok_or(CapacityOverflow)?;
            self.try_rehash_to(target)?;
        }
        Ok(())
    }

    /// Replaces the bucket array with one of `bucket_count` buckets and relinks every node. Only an
    /// empty map may go back to the sentinel.
    fn try_rehash_to(&mut self, bucket_count: usize) -> Result<(), ReserveError> {
        debug_assert!(bucket_count != SENTINEL_BUCKETS || self.len == 0);
        let buckets = if bucket_count == SENTINEL_BUCKETS {
            None
        } else {
            let buckets = self.alloc.allocate_array::<Bucket<K, V>>(bucket_count)?;
            for index in 0..bucket_count {
                // SAFETY: index < bucket_count.
                unsafe { buckets.add(index).write(None) }
            }
            Some(buckets)
        };

        let old_buckets = mem::replace(&mut self.buckets, buckets);
        let old_count = mem::replace(&mut self.bucket_count, bucket_count);

        let mut cursor = self.head.take();
        self.len = 0;
        while let Some(node) = cursor {
            cursor = node.next();
            self.link(node);
        }

        if let Some(old_buckets) = old_buckets {
            // SAFETY: The old array was allocated with old_count buckets.
            unsafe { self.alloc.deallocate_array(old_buckets, old_count) }
        }
        Ok(())
    }

    fn try_allocate_node(
        &self,
        hash: u64,
        key: K,
        value: V,
    ) -> Result<NodeRef<K, V>, ReserveError> {
        let ptr = self.alloc.allocate_one::<Node<K, V>>()?;
        let node = Node {
            next: None,
            hash,
            key,
            value,
        };
        // SAFETY: The slot has just been allocated for a node.
        unsafe { self.alloc.construct(ptr, node) }
        Ok(NodeRef(ptr))
    }

    /// # Safety
    /// The node must be unlinked and must not be used again.
    unsafe fn take_node(&self, node: NodeRef<K, V>) -> (K, V) {
        // SAFETY: Guaranteed by the caller, the node is read once and then freed.
        unsafe {
            let Node { key, value, .. } = node.0.read();
            self.alloc.deallocate_one(node.0);
            (key, value)
        }
    }

    /// # Safety
    /// The node must be unlinked and must not be used again.
    unsafe fn free_node(&self, node: NodeRef<K, V>) {
        // SAFETY: Guaranteed by the caller.
        unsafe {
            self.alloc.destroy(node.0);
            self.alloc.deallocate_one(node.0);
        }
    }

    /// Returns the bucket array to the allocator. The map must be empty.
    fn free_buckets(&mut self) {
        debug_assert_eq!(self.len, 0);
        if let Some(buckets) = self.buckets.take() {
            // SAFETY: The array was allocated with bucket_count buckets.
            unsafe { self.alloc.deallocate_array(buckets, self.bucket_count) }
        }
        self.bucket_count = SENTINEL_BUCKETS;
    }

    fn swap_policies(&mut self, other: &mut HashMap<K, V, H, E, A>) {
        mem::swap(&mut self.hasher, &mut other.hasher);
        mem::swap(&mut self.equal, &mut other.equal);
        mem::swap(&mut self.max_load_factor, &mut other.max_load_factor);
    }

    fn swap_storage(&mut self, other: &mut HashMap<K, V, H, E, A>) {
        mem::swap(&mut self.head, &mut other.head);
        mem::swap(&mut self.buckets, &mut other.buckets);
        mem::swap(&mut self.bucket_count, &mut other.bucket_count);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Moves every node of `chain` into memory from self's allocator. Self must be empty.
    ///
    /// # Panics
    /// Panics if the allocator fails. The nodes that weren't moved yet are dropped along with
    /// `chain`, through the allocator they came from.
    fn adopt(&mut self, mut chain: Detached<K, V, A>) {
        debug_assert_eq!(self.len, 0);
        if chain.buckets.is_none() {
            return;
        }
        self.try_rehash_to(chain.bucket_count).throw();

        while let Some(old) = chain.head {
            let ptr = self.alloc.allocate_one::<Node<K, V>>().throw();
            chain.head = old.next();
            // SAFETY: The node was just detached from the chain, it is moved bitwise into the new
            // slot and its old slot is freed without dropping anything.
            unsafe {
                ptr::copy_nonoverlapping(old.0.as_ptr(), ptr.as_ptr(), 1);
                chain.alloc.deallocate_one(old.0);
            }
            self.link(NodeRef(ptr));
        }
    }

    fn clone_entries_from(&mut self, source: &HashMap<K, V, H, E, A>)
    where
        K: Clone,
        V: Clone,
    {
        debug_assert_eq!(self.len, 0);
        if self.bucket_count != source.bucket_count {
            self.try_rehash_to(source.bucket_count).throw();
        }
        let mut cursor = source.head;
        while let Some(node) = cursor {
            cursor = node.next();
            let clone = self
                .try_allocate_node(node.hash(), node.key().clone(), node.value().clone())
                .throw();
            self.link(clone);
        }
    }
}

impl<K, V, H, E, A: Allocator> HashMap<K, V, H, E, A> {
    /// Inserts `value` under `key` if the key is absent. Returns a reference to the value stored
    /// under `key` and whether the insertion happened. An existing value is left untouched and the
    /// provided one is dropped.
    ///
    /// # Panics
    /// Panics if the HashMap can't grow.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::hash::HashMap;
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert("a", 1), (&mut 1, true));
    /// assert_eq!(map.insert("a", 2), (&mut 1, false));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (&mut V, bool)
    where
        H: KeyHasher<K>,
        E: KeyEqual<K>,
    {
        self.try_insert(key, value).throw()
    }

    /// Inserts `value` under `key` if the key is absent. On failure, the HashMap is unchanged.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the HashMap is at [`max_len`](HashMap::max_len) or the
    /// allocator fails.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(&mut V, bool), ReserveError>
    where
        H: KeyHasher<K>,
        E: KeyEqual<K>,
    {
        self.try_emplace(key, || value)
    }

    /// Inserts `value` under `key`, replacing the value if the key is present. Returns a reference
    /// to the stored value and whether a new entry was created.
    ///
    /// # Panics
    /// Panics if the HashMap can't grow.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (&mut V, bool)
    where
        H: KeyHasher<K>,
        E: KeyEqual<K>,
    {
        let hash = self.hasher.hash_key(&key);
        match self.find(hash, &key) {
            Some((_, node)) => {
                let stored = node.value_mut();
                *stored = value;
                (stored, false)
            },
            None => (self.try_insert_new(hash, key, value).throw().value_mut(), true),
        }
    }

    /// Inserts the value produced by `f` under `key` if the key is absent. `f` only runs if the
    /// entry is created.
    ///
    /// # Panics
    /// Panics if the HashMap can't grow. If `f` panics, the HashMap is unchanged.
    pub fn emplace<F: FnOnce() -> V>(&mut self, key: K, f: F) -> (&mut V, bool)
    where
        H: KeyHasher<K>,
        E: KeyEqual<K>,
    {
        self.try_emplace(key, f).throw()
    }

    /// Inserts the value produced by `f` under `key` if the key is absent.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the HashMap is at [`max_len`](HashMap::max_len) or the
    /// allocator fails.
    pub fn try_emplace<F: FnOnce() -> V>(
        &mut self,
        key: K,
        f: F,
    ) -> Result<(&mut V, bool), ReserveError>
    where
        H: KeyHasher<K>,
        E: KeyEqual<K>,
    {
        let hash = self.hasher.hash_key(&key);
        if let Some((_, node)) = self.find(hash, &key) {
            return Ok((node.value_mut(), false));
        }
        let value = f();
        Ok((self.try_insert_new(hash, key, value)?.value_mut(), true))
    }

    /// Returns a reference to the value under `key`, inserting [`Default::default`] first if the
    /// key is absent.
    ///
    /// # Panics
    /// Panics if the HashMap can't grow.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        H: KeyHasher<K>,
        E: KeyEqual<K>,
        V: Default,
    {
        self.emplace(key, V::default).0
    }

    /// Returns a reference to the value under `key`.
    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.get_entry(key).map(|(_, value)| value)
    }

    /// Returns a mutable reference to the value under `key`.
    pub fn get_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        let hash = self.hasher.hash_key(key);
        self.find(hash, key).map(|(_, node)| node.value_mut())
    }

    /// Returns the stored key and value for `key`.
    pub fn get_entry<Q: ?Sized>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        let hash = self.hasher.hash_key(key);
        self.find(hash, key).map(|(_, node)| node.entry())
    }

    /// Returns a reference to the value under `key`.
    ///
    /// # Errors
    /// Returns [`KeyNotFound`] if the key is absent.
    pub fn at<Q: ?Sized>(&self, key: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Returns true if the HashMap holds an entry for `key`.
    pub fn contains<Q: ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.get_entry(key).is_some()
    }

    /// Returns the number of entries for `key`, which is either 0 or 1.
    pub fn count<Q: ?Sized>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        usize::from(self.contains(key))
    }

    /// Returns the index of the bucket that `key` hashes into.
    pub fn bucket_of<Q: ?Sized>(&self, key: &Q) -> usize
    where
        H: KeyHasher<Q>,
    {
        self.index_for(self.hasher.hash_key(key))
    }

    /// Removes the entry for `key` and returns its value.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry for `key` and returns it.
    pub fn remove_entry<Q: ?Sized>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        let hash = self.hasher.hash_key(key);
        let (prev, node) = self.find(hash, key)?;
        Some(self.remove_node(prev, node))
    }

    /// Returns a cursor positioned at the entry for `key`, or [`None`] if the key is absent.
    pub fn cursor_at_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<CursorMut<'_, K, V, H, E, A>>
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        let hash = self.hasher.hash_key(key);
        let (prev, node) = self.find(hash, key)?;
        Some(CursorMut {
            map: self,
            prev,
            current: Some(node),
        })
    }

    /// Removes the entry for `key`, returning how many entries were removed (0 or 1).
    pub fn erase<Q: ?Sized>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        usize::from(self.remove_entry(key).is_some())
    }

    fn try_insert_new(
        &mut self,
        hash: u64,
        key: K,
        value: V,
    ) -> Result<NodeRef<K, V>, ReserveError> {
        self.try_grow_for(self.len + 1)?;
        let node = self.try_allocate_node(hash, key, value)?;
        self.link(node);
        Ok(node)
    }
}

/// The storage of a HashMap, taken out of it along with a copy of the allocator that owns it. Any
/// node still in the chain is dropped and freed through that allocator.
struct Detached<K, V, A: Allocator> {
    head: Link<K, V>,
    buckets: Option<NonNull<Bucket<K, V>>>,
    bucket_count: usize,
    alloc: A,
}

impl<K, V, A: Allocator> Detached<K, V, A> {
    /// Empties `map`, leaving it with the sentinel bucket.
    fn take<H, E>(map: &mut HashMap<K, V, H, E, A>) -> Detached<K, V, A> {
        map.len = 0;
        Detached {
            head: map.head.take(),
            buckets: map.buckets.take(),
            bucket_count: mem::replace(&mut map.bucket_count, SENTINEL_BUCKETS),
            alloc: map.alloc.clone(),
        }
    }
}

impl<K, V, A: Allocator> Drop for Detached<K, V, A> {
    fn drop(&mut self) {
        while let Some(node) = self.head {
            self.head = node.next();
            // SAFETY: Every node left in the chain is live and owned by the chain.
            unsafe {
                self.alloc.destroy(node.0);
                self.alloc.deallocate_one(node.0);
            }
        }
        if let Some(buckets) = self.buckets.take() {
            // SAFETY: The array was allocated with bucket_count buckets.
            unsafe { self.alloc.deallocate_array(buckets, self.bucket_count) }
        }
    }
}

impl<K, V, H, E, A: Allocator> Drop for HashMap<K, V, H, E, A> {
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        self.len = 0;
        while let Some(node) = cursor {
            cursor = node.next();
            // SAFETY: Every node is freed exactly once, the chain isn't used again.
            unsafe { self.free_node(node) }
        }
        self.free_buckets();
    }
}

impl<K, V> Default for HashMap<K, V> {
    fn default() -> Self {
        HashMap::new()
    }
}

impl<K, V, H, E, A> Clone for HashMap<K, V, H, E, A>
where
    K: Clone,
    V: Clone,
    H: Clone,
    E: Clone,
    A: Allocator,
{
    fn clone(&self) -> Self {
        let mut map = HashMap {
            head: None,
            buckets: None,
            bucket_count: SENTINEL_BUCKETS,
            len: 0,
            max_load_factor: self.max_load_factor,
            hasher: self.hasher.clone(),
            equal: self.equal.clone(),
            alloc: self.alloc.select_on_copy(),
            _phantom: PhantomData,
        };
        map.clone_entries_from(self);
        map
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        if A::PROPAGATE_ON_COPY_ASSIGN {
            if self.alloc != source.alloc {
                self.free_buckets();
            }
            self.alloc = source.alloc.clone();
        }
        self.hasher = source.hasher.clone();
        self.equal = source.equal.clone();
        self.max_load_factor = source.max_load_factor;
        self.clone_entries_from(source);
    }
}

impl<K, V, H, E, A> Extend<(K, V)> for HashMap<K, V, H, E, A>
where
    H: KeyHasher<K>,
    E: KeyEqual<K>,
    A: Allocator,
{
    /// Inserts every entry of `iter`. As with [`insert`](HashMap::insert), the first value for a
    /// key wins.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, H, E> FromIterator<(K, V)> for HashMap<K, V, H, E>
where
    H: KeyHasher<K> + Default,
    E: KeyEqual<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::with_policies(H::default(), E::default());
        map.extend(iter);
        map
    }
}

impl<K, Q, V, H, E, A> Index<&Q> for HashMap<K, V, H, E, A>
where
    K: Borrow<Q>,
    Q: ?Sized,
    H: KeyHasher<Q>,
    E: KeyEqual<Q>,
    A: Allocator,
{
    type Output = V;

    fn index(&self, key: &Q) -> &Self::Output {
        self.at(key).throw()
    }
}

impl<K, V, H, E, A> PartialEq for HashMap<K, V, H, E, A>
where
    V: PartialEq,
    H: KeyHasher<K>,
    E: KeyEqual<K>,
    A: Allocator,
{
    /// Two maps are equal if they hold the same keys with equal values, in any order.
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K, V, H, E, A> Eq for HashMap<K, V, H, E, A>
where
    V: Eq,
    H: KeyHasher<K>,
    E: KeyEqual<K>,
    A: Allocator,
{
}

impl<K: Debug, V: Debug, H, E, A: Allocator> Debug for HashMap<K, V, H, E, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashMap")
            .field("contents", &DebugIter::new(self.iter()))
            .field("len", &self.len)
            .field("bucket_count", &self.bucket_count)
            .field("max_load_factor", &self.max_load_factor)
            .finish()
    }
}

impl<K: Debug, V: Debug, H, E, A: Allocator> Display for HashMap<K, V, H, E, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        f.debug_map().entries(self.iter()).finish()
    }
}

// SAFETY: The map owns its nodes exclusively, sending it sends the keys, values and policies.
unsafe impl<K: Send, V: Send, H: Send, E: Send, A: Allocator + Send> Send
    for HashMap<K, V, H, E, A>
{
}
// SAFETY: Shared access only hands out shared references to keys, values and policies.
unsafe impl<K: Sync, V: Sync, H: Sync, E: Sync, A: Allocator + Sync> Sync
    for HashMap<K, V, H, E, A>
{
}
