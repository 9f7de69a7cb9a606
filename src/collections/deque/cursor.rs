use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Add, Sub};
use std::ptr;

use super::Deque;
use super::block::{Entry, block_len};
use crate::memory::{Allocator, Global};
use crate::util::error::IndexOutOfBounds;
use crate::util::option::OptionExtension;
use crate::util::result::ResultExtension;

/// A position inside a deque's storage, made of the directory entry of the current block, the
/// start of that block and the slot within it. The end of the block is implied by
/// [`block_len`]. Storing the slot as an offset rather than a pointer keeps the arithmetic valid
/// for zero-sized types.
///
/// A raw cursor knows nothing about the bounds of the deque. Moving it outside of the occupied
/// range, inclusive of the one-past-the-end position, is undefined behavior.
pub(crate) struct RawCursor<T> {
    pub entry: *const Entry<T>,
    pub block: *mut T,
    pub slot: usize,
}

impl<T> RawCursor<T> {
    /// The cursor of a deque that has never allocated.
    pub const fn dangling() -> RawCursor<T> {
        RawCursor {
            entry: ptr::null(),
            block: ptr::null_mut(),
            slot: 0,
        }
    }

    /// # Safety
    /// `entry` must point to an occupied directory entry.
    pub unsafe fn new(entry: *const Entry<T>, slot: usize) -> RawCursor<T> {
        RawCursor {
            entry,
            // SAFETY: Guaranteed by the caller.
            block: unsafe { (*entry).unreachable().as_ptr() },
            slot,
        }
    }

    /// Returns a pointer to the slot under the cursor.
    pub fn as_ptr(&self) -> *mut T {
        self.block.wrapping_add(self.slot)
    }

    /// The signed number of positions from `origin` to `self`.
    pub fn distance_from(&self, origin: &RawCursor<T>) -> isize {
        if self.entry.is_null() || origin.entry.is_null() {
            return 0;
        }
        // SAFETY: Both cursors point into the same directory.
        let blocks = unsafe { self.entry.offset_from(origin.entry) };
        blocks * block_len::<T>() as isize + self.slot as isize - origin.slot as isize
    }

    /// Moves the cursor by `delta` positions, rebinding the block if a block boundary is crossed.
    ///
    /// # Safety
    /// The target position must lie within the occupied range of the deque, inclusive of the
    /// one-past-the-end position.
    pub unsafe fn offset(&mut self, delta: isize) {
        if delta == 0 {
            return;
        }
        let block_len = block_len::<T>() as isize;
        let target = self.slot as isize + delta;
        if (0..block_len).contains(&target) {
            self.slot = target as usize;
        } else {
            // SAFETY: Guaranteed by the caller, the target block is occupied.
            unsafe {
                *self = RawCursor::new(
                    self.entry.offset(target.div_euclid(block_len)),
                    target.rem_euclid(block_len) as usize,
                );
            }
        }
    }

    /// Moves the cursor one position forward.
    ///
    /// # Safety
    /// See [`RawCursor::offset`].
    pub unsafe fn step_forward(&mut self) {
        self.slot += 1;
        if self.slot == block_len::<T>() {
            // SAFETY: Guaranteed by the caller. The position after the last slot of a block is the
            // first slot of the next one, which is occupied.
            unsafe { *self = RawCursor::new(self.entry.add(1), 0) }
        }
    }

    /// Moves the cursor one position backward.
    ///
    /// # Safety
    /// See [`RawCursor::offset`].
    pub unsafe fn step_backward(&mut self) {
        match self.slot.checked_sub(1) {
            Some(slot) => self.slot = slot,
            // SAFETY: Guaranteed by the caller.
            None => unsafe { *self = RawCursor::new(self.entry.sub(1), block_len::<T>() - 1) },
        }
    }
}

impl<T> Clone for RawCursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawCursor<T> {}

impl<T> PartialEq for RawCursor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entry == other.entry && self.slot == other.slot
    }
}

impl<T> Eq for RawCursor<T> {}

/// A random-access position in a [`Deque`], in the range `0..=len`. Created by
/// [`Deque::cursor_front`], [`Deque::cursor_end`] and [`Deque::cursor_at`].
///
/// Cursors support the arithmetic of random-access iterators: adding or subtracting an offset
/// (`cursor + 3`) and measuring the distance between two cursors (`end - begin`). Arithmetic that
/// leaves the range `0..=len` panics.
///
/// # Examples
/// ```
/// # use core_containers::collections::deque::Deque;
/// let deque: Deque<u32> = (0..100).collect();
/// let begin = deque.cursor_front();
/// let end = deque.cursor_end();
/// assert_eq!(end - begin, 100);
///
/// let middle = begin + 40;
/// assert_eq!(middle.get(), Some(&40));
/// assert_eq!(middle + (end - middle), end);
/// ```
pub struct Cursor<'a, T, A: Allocator = Global> {
    pub(crate) raw: RawCursor<T>,
    pub(crate) deque: &'a Deque<T, A>,
    pub(crate) _phantom: PhantomData<&'a T>,
}

impl<'a, T, A: Allocator> Cursor<'a, T, A> {
    /// Returns the index of the cursor, `len` for the end position.
    pub fn index(&self) -> usize {
        self.raw.distance_from(&self.deque.raw_front()) as usize
    }

    /// Returns the element under the cursor, or [`None`] at the end position.
    pub fn get(&self) -> Option<&'a T> {
        if self.index() < self.deque.len() {
            // SAFETY: The cursor is in bounds and points to an initialized element, borrowed
            // immutably for 'a through self.deque.
            Some(unsafe { &*self.raw.as_ptr() })
        } else {
            None
        }
    }

    /// Moves the cursor by `delta` positions, returning [`None`] if that would leave the range
    /// `0..=len`.
    pub fn checked_offset(self, delta: isize) -> Option<Cursor<'a, T, A>> {
        let target = (self.index() as isize).checked_add(delta)?;
        if target < 0 || target as usize > self.deque.len() {
            return None;
        }
        let mut raw = self.raw;
        // SAFETY: The target has just been checked to be within 0..=len.
        unsafe { raw.offset(delta) }
        Some(Cursor {
            raw,
            ..self
        })
    }

    /// Moves the cursor one position forward, returning false if it is already at the end.
    pub fn move_next(&mut self) -> bool {
        match self.checked_offset(1) {
            Some(next) => {
                *self = next;
                true
            },
            None => false,
        }
    }

    /// Moves the cursor one position backward, returning false if it is already at the front.
    pub fn move_prev(&mut self) -> bool {
        match self.checked_offset(-1) {
            Some(prev) => {
                *self = prev;
                true
            },
            None => false,
        }
    }

    /// Returns the underlying deque.
    pub const fn deque(&self) -> &'a Deque<T, A> {
        self.deque
    }

    #[track_caller]
    fn offset_or_throw(self, delta: isize) -> Cursor<'a, T, A> {
        let deque = self.deque;
        let index = self.index().saturating_add_signed(delta);
        match self.checked_offset(delta) {
            Some(cursor) => cursor,
            None => Err(IndexOutOfBounds {
                index,
                len: deque.len(),
            }).throw(),
        }
    }
}

impl<T, A: Allocator> Clone for Cursor<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Allocator> Copy for Cursor<'_, T, A> {}

impl<'a, T, A: Allocator> Add<isize> for Cursor<'a, T, A> {
    type Output = Cursor<'a, T, A>;

    /// # Panics
    /// Panics if the result would leave the range `0..=len`.
    #[track_caller]
    fn add(self, rhs: isize) -> Self::Output {
        self.offset_or_throw(rhs)
    }
}

impl<'a, T, A: Allocator> Sub<isize> for Cursor<'a, T, A> {
    type Output = Cursor<'a, T, A>;

    /// # Panics
    /// Panics if the result would leave the range `0..=len`.
    #[track_caller]
    fn sub(self, rhs: isize) -> Self::Output {
        self.offset_or_throw(rhs.wrapping_neg())
    }
}

impl<'a, T, A: Allocator> Sub for Cursor<'a, T, A> {
    type Output = isize;

    /// Returns the signed distance from `rhs` to `self`.
    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert!(ptr::eq(self.deque, rhs.deque), "Cursors into different deques!");
        self.raw.distance_from(&rhs.raw)
    }
}

impl<T, A: Allocator> PartialEq for Cursor<'_, T, A> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.deque, other.deque) && self.raw == other.raw
    }
}

impl<T, A: Allocator> Eq for Cursor<'_, T, A> {}

impl<T, A: Allocator> PartialOrd for Cursor<'_, T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if ptr::eq(self.deque, other.deque) {
            Some(self.raw.distance_from(&other.raw).cmp(&0))
        } else {
            None
        }
    }
}

impl<T: Debug, A: Allocator> Debug for Cursor<'_, T, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index())
            .field("value", &self.get())
            .finish()
    }
}

