use std::iter::{Chain, FusedIterator};

use super::HashSet;
use crate::collections::hash::map::{self, IntoKeys, Keys};
use crate::collections::hash::policy::{KeyEqual, KeyHasher};
use crate::memory::Allocator;

impl<T, H, E, A: Allocator> IntoIterator for HashSet<T, H, E, A> {
    type Item = T;

    type IntoIter = IntoIter<T, H, E, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.inner.into_keys())
    }
}

/// A type for owned iteration over a [`HashSet`]. Produces values of type `T`.
pub struct IntoIter<T, H, E, A: Allocator>(pub(crate) IntoKeys<T, (), H, E, A>);

impl<T, H, E, A: Allocator> Iterator for IntoIter<T, H, E, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T, H, E, A: Allocator> ExactSizeIterator for IntoIter<T, H, E, A> {}

impl<'a, T, H, E, A: Allocator> IntoIterator for &'a HashSet<T, H, E, A> {
    type Item = &'a T;

    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A type for borrowed iteration over a [`HashSet`].
pub struct Iter<'a, T>(pub(crate) Keys<'a, T, ()>);

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter(self.0.clone())
    }
}

/// A draining iterator over a [`HashSet`].
///
/// See [`HashSet::drain`].
pub struct Drain<'a, T, H, E, A: Allocator>(pub(crate) map::Drain<'a, T, (), H, E, A>);

impl<T, H, E, A: Allocator> Iterator for Drain<'_, T, H, E, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(item, _)| item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T, H, E, A: Allocator> ExactSizeIterator for Drain<'_, T, H, E, A> {}

/// The values of one set that aren't in another.
///
/// See [`HashSet::difference`].
pub struct Difference<'a, T, H, E, A: Allocator> {
    pub(crate) inner: Iter<'a, T>,
    pub(crate) other: &'a HashSet<T, H, E, A>,
}

impl<'a, T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> Iterator
    for Difference<'a, T, H, E, A>
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let other = self.other;
        self.inner.find(|item| !other.contains(*item))
    }
}

impl<T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> FusedIterator
    for Difference<'_, T, H, E, A>
{
}

/// The values that are in exactly one of two sets.
///
/// See [`HashSet::symmetric_difference`].
pub struct SymmetricDifference<'a, T, H, E, A: Allocator> {
    pub(crate) inner: Chain<Difference<'a, T, H, E, A>, Difference<'a, T, H, E, A>>,
}

impl<'a, T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> Iterator
    for SymmetricDifference<'a, T, H, E, A>
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// The values that are in both of two sets.
///
/// See [`HashSet::intersection`].
pub struct Intersection<'a, T, H, E, A: Allocator> {
    pub(crate) inner: Iter<'a, T>,
    pub(crate) other: &'a HashSet<T, H, E, A>,
}

impl<'a, T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> Iterator
    for Intersection<'a, T, H, E, A>
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let other = self.other;
        self.inner.find(|item| other.contains(*item))
    }
}

/// The values that are in either of two sets, each produced once.
///
/// See [`HashSet::union`].
pub struct Union<'a, T, H, E, A: Allocator> {
    pub(crate) inner: Chain<Iter<'a, T>, Difference<'a, T, H, E, A>>,
}

impl<'a, T, H: KeyHasher<T>, E: KeyEqual<T>, A: Allocator> Iterator for Union<'a, T, H, E, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
