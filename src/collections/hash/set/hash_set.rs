use std::borrow::Borrow;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::RandomState;
use std::ops::{BitAnd, BitOr, BitXor, Sub};

use super::{Difference, Drain, Intersection, Iter, SymmetricDifference, Union};
use crate::collections::hash::policy::{DefaultEqual, KeyEqual, KeyHasher};
use crate::collections::hash::HashMap;
use crate::memory::{Allocator, Global};
use crate::util::error::ReserveError;
use crate::util::fmt::DebugIter;

/// A set of unique values, stored the same way as the keys of a [`HashMap`].
///
/// All of the map's guarantees carry over: values never move once inserted, the load factor stays
/// within [`max_load_factor`](HashSet::max_load_factor), and iteration follows the chain.
pub struct HashSet<T, H = RandomState, E = DefaultEqual, A: Allocator = Global> {
    // The unit value takes no space in the nodes.
    pub(crate) inner: HashMap<T, (), H, E, A>,
}

impl<T> HashSet<T> {
    /// Creates a new, empty HashSet. Nothing is allocated until the first insertion.
    pub fn new() -> HashSet<T> {
        HashSet {
            inner: HashMap::new(),
        }
    }

    /// Creates a new, empty HashSet with at least `bucket_count` buckets.
    ///
    /// # Panics
    /// Panics if the bucket array can't be allocated.
    pub fn with_buckets(bucket_count: usize) -> HashSet<T> {
        HashSet {
            inner: HashMap::with_buckets(bucket_count),
        }
    }
}

impl<T, H> HashSet<T, H> {
    /// Creates a new, empty HashSet that hashes values with `hasher`.
    pub fn with_hasher(hasher: H) -> HashSet<T, H> {
        HashSet {
            inner: HashMap::with_hasher(hasher),
        }
    }
}

impl<T, H, E> HashSet<T, H, E> {
    /// Creates a new, empty HashSet with the provided hashing and equality policies.
    pub fn with_policies(hasher: H, equal: E) -> HashSet<T, H, E> {
        HashSet {
            inner: HashMap::with_policies(hasher, equal),
        }
    }
}

impl<T, A: Allocator> HashSet<T, RandomState, DefaultEqual, A> {
    /// Creates a new, empty HashSet that allocates from `alloc`.
    pub fn new_in(alloc: A) -> HashSet<T, RandomState, DefaultEqual, A> {
        HashSet {
            inner: HashMap::new_in(alloc),
        }
    }
}

impl<T, H, E, A: Allocator> HashSet<T, H, E, A> {
    /// Creates a new, empty HashSet from all of its parts.
    ///
    /// # Panics
    /// Panics if the bucket array can't be allocated.
    pub fn with_parts(bucket_count: usize, hasher: H, equal: E, alloc: A) -> HashSet<T, H, E, A> {
        HashSet {
            inner: HashMap::with_parts(bucket_count, hasher, equal, alloc),
        }
    }

    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub const fn bucket_count(&self) -> usize {
        self.inner.bucket_count()
    }

    /// Returns the number of values stored in bucket `index`.
    ///
    /// # Panics
    /// Panics if `index >= bucket_count`.
    pub fn bucket_len(&self, index: usize) -> usize {
        self.inner.bucket_len(index)
    }

    pub fn load_factor(&self) -> f32 {
        self.inner.load_factor()
    }

    pub const fn max_load_factor(&self) -> f32 {
        self.inner.max_load_factor()
    }

    /// See [`HashMap::set_max_load_factor`].
    ///
    /// # Panics
    /// Panics if `max_load_factor` isn't positive, or if growing fails.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        self.inner.set_max_load_factor(max_load_factor)
    }

    /// See [`HashMap::rehash`].
    ///
    /// # Panics
    /// Panics if the bucket array can't be allocated.
    pub fn rehash(&mut self, bucket_count: usize) {
        self.inner.rehash(bucket_count)
    }

    /// Makes sure that `additional` more values can be inserted without rehashing.
    ///
    /// # Panics
    /// Panics if the new length would be too large or the allocator fails.
    pub fn reserve(&mut self, additional: usize) {
        self.inner.reserve(additional)
    }

    /// # Errors
    /// Returns a [`ReserveError`] if the new length would be too large or the allocator fails.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        self.inner.try_reserve(additional)
    }

    pub const fn hasher(&self) -> &H {
        self.inner.hasher()
    }

    pub const fn key_eq(&self) -> &E {
        self.inner.key_eq()
    }

    pub const fn allocator(&self) -> &A {
        self.inner.allocator()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter(self.inner.keys())
    }

    /// Removes every value, returning them through an iterator.
    pub fn drain(&mut self) -> Drain<'_, T, H, E, A> {
        Drain(self.inner.drain())
    }

    pub fn clear(&mut self) {
        self.inner.clear()
    }

    /// Keeps only the values for which `f` returns true.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut f: F) {
        self.inner.retain(|item, _| f(item))
    }

    /// Exchanges the contents of two HashSets, see [`HashMap::swap`].
    pub fn swap(&mut self, other: &mut HashSet<T, H, E, A>) {
        self.inner.swap(&mut other.inner)
    }

    /// Replaces the contents of the HashSet with those of `source`, see
    /// [`HashMap::assign_from`].
    pub fn assign_from(&mut self, source: HashSet<T, H, E, A>) {
        self.inner.assign_from(source.inner)
    }
}

impl<T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> HashSet<T, H, E, A> {
    /// Adds `item` to the set, returning true if it wasn't already present. A present value is
    /// kept and `item` is dropped.
    ///
    /// # Panics
    /// Panics if the HashSet can't grow.
    pub fn insert(&mut self, item: T) -> bool {
        self.inner.insert(item, ()).1
    }

    /// Adds `item` to the set, returning whether it wasn't already present.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the HashSet can't grow. The set is unchanged.
    pub fn try_insert(&mut self, item: T) -> Result<bool, ReserveError> {
        self.inner.try_insert(item, ()).map(|(_, inserted)| inserted)
    }

    /// Replaces an equal value already in the set with `item`, returning the old value.
    ///
    /// # Panics
    /// Panics if `item` is new and the HashSet can't grow.
    pub fn replace(&mut self, item: T) -> Option<T> {
        let old = self.inner.remove_entry(&item).map(|(old, _)| old);
        self.inner.insert(item, ());
        old
    }

    pub fn contains<Q: ?Sized>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.inner.contains(item)
    }

    /// Returns a reference to the stored value equal to `item`.
    pub fn get<Q: ?Sized>(&self, item: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.inner.get_entry(item).map(|(stored, _)| stored)
    }

    /// Removes `item` from the set, returning true if it was present.
    pub fn remove<Q: ?Sized>(&mut self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.inner.remove_entry(item).is_some()
    }

    /// Removes and returns the stored value equal to `item`.
    pub fn take<Q: ?Sized>(&mut self, item: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        H: KeyHasher<Q>,
        E: KeyEqual<Q>,
    {
        self.inner.remove_entry(item).map(|(stored, _)| stored)
    }

    /// Returns the index of the bucket that `item` hashes into.
    pub fn bucket_of<Q: ?Sized>(&self, item: &Q) -> usize
    where
        H: KeyHasher<Q>,
    {
        self.inner.bucket_of(item)
    }

    /// Returns an iterator over the values in `self` that aren't in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, H, E, A>) -> Difference<'a, T, H, E, A> {
        Difference {
            inner: self.iter(),
            other,
        }
    }

    /// Returns an iterator over the values that are in exactly one of the two sets.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, H, E, A>,
    ) -> SymmetricDifference<'a, T, H, E, A> {
        SymmetricDifference {
            inner: self.difference(other).chain(other.difference(self)),
        }
    }

    /// Returns an iterator over the values in both sets.
    pub fn intersection<'a>(
        &'a self,
        other: &'a HashSet<T, H, E, A>,
    ) -> Intersection<'a, T, H, E, A> {
        Intersection {
            inner: self.iter(),
            other,
        }
    }

    /// Returns an iterator over the values in either set, without duplicates.
    pub fn union<'a>(&'a self, other: &'a HashSet<T, H, E, A>) -> Union<'a, T, H, E, A> {
        Union {
            inner: self.iter().chain(other.difference(self)),
        }
    }

    pub fn is_subset(&self, other: &HashSet<T, H, E, A>) -> bool {
        self.len() <= other.len() && self.iter().all(|item| other.contains(item))
    }

    pub fn is_superset(&self, other: &HashSet<T, H, E, A>) -> bool {
        other.is_subset(self)
    }

    pub fn is_disjoint(&self, other: &HashSet<T, H, E, A>) -> bool {
        self.intersection(other).next().is_none()
    }
}

impl<T> Default for HashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, H: Clone, E: Clone, A: Allocator> Clone for HashSet<T, H, E, A> {
    fn clone(&self) -> Self {
        HashSet {
            inner: self.inner.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.inner.clone_from(&source.inner)
    }
}

impl<T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> PartialEq for HashSet<T, H, E, A> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> Eq for HashSet<T, H, E, A> {}

impl<T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> Extend<T> for HashSet<T, H, E, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.inner.extend(iter.into_iter().map(|item| (item, ())))
    }
}

impl<T, H, E> FromIterator<T> for HashSet<T, H, E>
where
    H: KeyHasher<T> + Default,
    E: KeyEqual<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::with_policies(H::default(), E::default());
        set.extend(iter);
        set
    }
}

impl<T, const N: usize> From<[T; N]> for HashSet<T>
where
    RandomState: KeyHasher<T>,
    DefaultEqual: KeyEqual<T>,
{
    fn from(value: [T; N]) -> Self {
        value.into_iter().collect()
    }
}

impl<T, H, E> BitOr for &HashSet<T, H, E>
where
    T: Clone,
    H: KeyHasher<T> + Clone,
    E: KeyEqual<T> + Clone,
{
    type Output = HashSet<T, H, E>;

    fn bitor(self, rhs: Self) -> Self::Output {
        let mut set = HashSet::with_policies(self.hasher().clone(), self.key_eq().clone());
        set.extend(self.union(rhs).cloned());
        set
    }
}

impl<T, H, E> BitAnd for &HashSet<T, H, E>
where
    T: Clone,
    H: KeyHasher<T> + Clone,
    E: KeyEqual<T> + Clone,
{
    type Output = HashSet<T, H, E>;

    fn bitand(self, rhs: Self) -> Self::Output {
        let mut set = HashSet::with_policies(self.hasher().clone(), self.key_eq().clone());
        set.extend(self.intersection(rhs).cloned());
        set
    }
}

impl<T, H, E> BitXor for &HashSet<T, H, E>
where
    T: Clone,
    H: KeyHasher<T> + Clone,
    E: KeyEqual<T> + Clone,
{
    type Output = HashSet<T, H, E>;

    fn bitxor(self, rhs: Self) -> Self::Output {
        let mut set = HashSet::with_policies(self.hasher().clone(), self.key_eq().clone());
        set.extend(self.symmetric_difference(rhs).cloned());
        set
    }
}

impl<T, H, E> Sub for &HashSet<T, H, E>
where
    T: Clone,
    H: KeyHasher<T> + Clone,
    E: KeyEqual<T> + Clone,
{
    type Output = HashSet<T, H, E>;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut set = HashSet::with_policies(self.hasher().clone(), self.key_eq().clone());
        set.extend(self.difference(rhs).cloned());
        set
    }
}

impl<T: Debug, H, E, A: Allocator> Debug for HashSet<T, H, E, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashSet")
            .field("contents", &DebugIter::new(self.iter()))
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .field("max_load_factor", &self.max_load_factor())
            .finish()
    }
}

impl<T: Debug, H, E, A: Allocator> Display for HashSet<T, H, E, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        f.debug_set().entries(self.iter()).finish()
    }
}
