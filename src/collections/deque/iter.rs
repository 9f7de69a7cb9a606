use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::slice;

use super::Deque;
use super::block::block_len;
use super::cursor::RawCursor;
use crate::memory::Allocator;

/// An iterator over references to the elements of a [`Deque`], created by [`Deque::iter`].
pub struct Iter<'a, T> {
    pub(crate) front: RawCursor<T>,
    pub(crate) back: RawCursor<T>,
    pub(crate) len: usize,
    pub(crate) _phantom: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ptr = self.front.as_ptr();
        self.len -= 1;
        // SAFETY: front was below back, so it points at an initialized element and the position
        // after it is at most back.
        unsafe {
            self.front.step_forward();
            Some(&*ptr)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.len {
            self.len = 0;
            return None;
        }
        // SAFETY: n < len, so the target is below back.
        unsafe { self.front.offset(n as isize) }
        self.len -= n;
        self.next()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: back was above front, so the position before it holds an initialized element.
        unsafe {
            self.back.step_backward();
            Some(&*self.back.as_ptr())
        }
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

// SAFETY: Iter only hands out shared references, like &[T].
unsafe impl<T: Sync> Send for Iter<'_, T> {}
// SAFETY: As above.
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

/// An iterator over mutable references to the elements of a [`Deque`], created by
/// [`Deque::iter_mut`].
pub struct IterMut<'a, T> {
    pub(crate) front: RawCursor<T>,
    pub(crate) back: RawCursor<T>,
    pub(crate) len: usize,
    pub(crate) _phantom: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ptr = self.front.as_ptr();
        self.len -= 1;
        // SAFETY: front was below back. Each element is handed out once, so the mutable references
        // never alias.
        unsafe {
            self.front.step_forward();
            Some(&mut *ptr)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.len {
            self.len = 0;
            return None;
        }
        // SAFETY: n < len, so the target is below back.
        unsafe { self.front.offset(n as isize) }
        self.len -= n;
        self.next()
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: back was above front, and each element is handed out once.
        unsafe {
            self.back.step_backward();
            Some(&mut *self.back.as_ptr())
        }
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

// SAFETY: IterMut behaves like &mut [T].
unsafe impl<T: Send> Send for IterMut<'_, T> {}
// SAFETY: As above.
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

/// An owning iterator over the elements of a [`Deque`], created by [`Deque::into_iter`].
pub struct IntoIter<T, A: Allocator> {
    pub(crate) deque: Deque<T, A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.deque.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.deque.len(), Some(self.deque.len()))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.deque.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

/// An iterator over the contiguous runs of a [`Deque`], one slice per occupied block. Created by
/// [`Deque::chunks`].
pub struct Chunks<'a, T> {
    pub(crate) front: RawCursor<T>,
    pub(crate) remaining: usize,
    pub(crate) _phantom: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Chunks<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let run = usize::min(block_len::<T>() - self.front.slot, self.remaining);
        // SAFETY: The run is initialized and stays within the current block. The position after
        // it is at most the end of the deque.
        unsafe {
            let chunk = slice::from_raw_parts(self.front.as_ptr(), run);
            self.front.offset(run as isize);
            self.remaining -= run;
            Some(chunk)
        }
    }
}

impl<T> FusedIterator for Chunks<'_, T> {}

impl<T, A: Allocator> IntoIterator for Deque<T, A> {
    type Item = T;

    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { deque: self }
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Deque<T, A> {
    type Item = &'a T;

    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Deque<T, A> {
    type Item = &'a mut T;

    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
