use std::iter::FusedIterator;
use std::marker::PhantomData;

use super::node::Link;
use super::HashMap;
use crate::memory::Allocator;

impl<K, V, H, E, A: Allocator> IntoIterator for HashMap<K, V, H, E, A> {
    type Item = (K, V);

    type IntoIter = IntoIter<K, V, H, E, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { map: self }
    }
}

/// A type for owned iteration over a [`HashMap`], in chain order. Produces values of type
/// `(K, V)`.
pub struct IntoIter<K, V, H, E, A: Allocator> {
    pub(crate) map: HashMap<K, V, H, E, A>,
}

impl<K, V, H, E, A: Allocator> Iterator for IntoIter<K, V, H, E, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.map.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K, V, H, E, A: Allocator> ExactSizeIterator for IntoIter<K, V, H, E, A> {}

impl<K, V, H, E, A: Allocator> FusedIterator for IntoIter<K, V, H, E, A> {}

/// A draining iterator over a [`HashMap`]. Entries that aren't consumed are dropped along with the
/// iterator.
///
/// See [`HashMap::drain`].
pub struct Drain<'a, K, V, H, E, A: Allocator> {
    pub(crate) map: &'a mut HashMap<K, V, H, E, A>,
}

impl<K, V, H, E, A: Allocator> Iterator for Drain<'_, K, V, H, E, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.map.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K, V, H, E, A: Allocator> ExactSizeIterator for Drain<'_, K, V, H, E, A> {}

impl<K, V, H, E, A: Allocator> FusedIterator for Drain<'_, K, V, H, E, A> {}

impl<K, V, H, E, A: Allocator> Drop for Drain<'_, K, V, H, E, A> {
    fn drop(&mut self) {
        self.map.clear();
    }
}

impl<'a, K, V, H, E, A: Allocator> IntoIterator for &'a HashMap<K, V, H, E, A> {
    type Item = (&'a K, &'a V);

    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A type for borrowed iteration over a [`HashMap`], in chain order.
///
/// See [`HashMap::iter`].
pub struct Iter<'a, K, V> {
    pub(crate) next: Link<K, V>,
    pub(crate) len: usize,
    pub(crate) _phantom: PhantomData<&'a (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next();
        self.len -= 1;
        Some(node.entry())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

// SAFETY: Iter only hands out shared references.
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
// SAFETY: As above.
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

impl<'a, K, V, H, E, A: Allocator> IntoIterator for &'a mut HashMap<K, V, H, E, A> {
    type Item = (&'a K, &'a mut V);

    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A type for borrowed iteration over a [`HashMap`], with mutable values. Keys can't be mutated,
/// as that would break the map's invariants.
///
/// See [`HashMap::iter_mut`].
pub struct IterMut<'a, K, V> {
    pub(crate) next: Link<K, V>,
    pub(crate) len: usize,
    pub(crate) _phantom: PhantomData<(&'a K, &'a mut V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next();
        self.len -= 1;
        Some(node.entry_mut())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

// SAFETY: Each value is handed out once, like a `&mut V`.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
// SAFETY: As above.
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

/// An owned iterator over the keys of a [`HashMap`].
///
/// See [`HashMap::into_keys`].
pub struct IntoKeys<K, V, H, E, A: Allocator>(pub(crate) IntoIter<K, V, H, E, A>);

impl<K, V, H, E, A: Allocator> Iterator for IntoKeys<K, V, H, E, A> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V, H, E, A: Allocator> ExactSizeIterator for IntoKeys<K, V, H, E, A> {}

/// A borrowed iterator over the keys of a [`HashMap`].
///
/// See [`HashMap::keys`].
pub struct Keys<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys(self.0.clone())
    }
}

/// An owned iterator over the values of a [`HashMap`].
///
/// See [`HashMap::into_values`].
pub struct IntoValues<K, V, H, E, A: Allocator>(pub(crate) IntoIter<K, V, H, E, A>);

impl<K, V, H, E, A: Allocator> Iterator for IntoValues<K, V, H, E, A> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V, H, E, A: Allocator> ExactSizeIterator for IntoValues<K, V, H, E, A> {}

/// A borrowed iterator over the values of a [`HashMap`].
///
/// See [`HashMap::values`].
pub struct Values<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A borrowed iterator over mutable references to the values of a [`HashMap`].
///
/// See [`HashMap::values_mut`].
pub struct ValuesMut<'a, K, V>(pub(crate) IterMut<'a, K, V>);

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
