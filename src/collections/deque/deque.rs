use std::cmp::{self, Ordering};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Bound, Index, IndexMut, RangeBounds};
use std::ptr::{self, NonNull};

use super::block::{BlockCreator, Entry, block_len};
use super::cursor::{Cursor, RawCursor};
use super::iter::{Chunks, Iter, IterMut};
use crate::memory::primitives;
use crate::memory::{Allocator, Global};
use crate::util::error::{CapacityOverflow, IndexOutOfBounds, ReserveError};
use crate::util::fmt::DebugIter;
use crate::util::option::OptionExtension;
use crate::util::result::ResultExtension;

/// The length of the first directory a deque allocates.
const MIN_DIR_LEN: usize = 8;

/// A double-ended queue stored as a directory of fixed-size blocks.
///
/// Elements live in blocks of [`block_len::<T>()`](block_len) slots. The directory is an array of
/// pointers to blocks, and the elements occupy a contiguous run of slots across consecutive blocks.
/// Growing at either end only ever adds a block (and, rarely, reallocates the directory), so
/// elements never move in memory because of a push, and references to them stay valid until they
/// are removed.
///
/// Unused blocks next to either end of the occupied range are kept as a reserve, to absorb pushes
/// without allocating. Blocks that leave the occupied range because of a pop are freed.
///
/// # Time Complexity
/// For this analysis of time complexity, variables are defined as follows:
/// - `n`: The number of items in the Deque.
/// - `i`: The index of the item in question.
/// - `k`: The number of items being inserted or removed.
///
/// | Method | Complexity |
/// |-|-|
/// | `get` | `O(1)` |
/// | `len` | `O(1)` |
/// | `push_front` / `push_back` | `O(1)`* |
/// | `pop_front` / `pop_back` | `O(1)` |
/// | `insert` | `O(min(i, n-i))` |
/// | `insert_iter` | `O(k + min(i, n-i))`* |
/// | `remove` | `O(min(i, n-i))` |
/// | `erase` | `O(k + min(i, n-i))` |
/// | `truncate` | `O(k)` |
/// | `swap` | `O(1)`** |
///
/// \* Amortized, an occasional directory reallocation takes `O(n / block_len)`.
///
/// \** When both deques use equal allocators, or the allocator propagates on swap. Otherwise every
/// element is moved.
pub struct Deque<T, A: Allocator = Global> {
    pub(crate) dir: NonNull<Entry<T>>,
    pub(crate) dir_len: usize,
    // Absolute offsets of the first element and one past the last element. Offset `o` lives in
    // block `o / block_len` at slot `o % block_len`.
    pub(crate) head: usize,
    pub(crate) tail: usize,
    pub(crate) alloc: A,
    pub(crate) _phantom: PhantomData<T>,
}

impl<T> Deque<T> {
    /// Creates a new, empty Deque. Nothing is allocated until the first element is added.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let deque: Deque<u8> = Deque::new();
    /// assert!(deque.is_empty());
    /// ```
    pub const fn new() -> Deque<T> {
        Deque::new_in(Global)
    }

    /// Creates a Deque holding `len` clones of `value`.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let deque = Deque::repeat(3, 'x');
    /// assert_eq!(deque.to_string(), "!['x', 'x', 'x']");
    /// ```
    pub fn repeat(len: usize, value: T) -> Deque<T>
    where
        T: Clone,
    {
        Deque::repeat_in(len, value, Global)
    }

    /// Creates a Deque holding `len` default values.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn repeat_default(len: usize) -> Deque<T>
    where
        T: Default,
    {
        Deque::repeat_with_in(len, T::default, Global)
    }

    /// Creates a Deque holding `len` values produced by `f`, in the order they are produced.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn repeat_with<F: FnMut() -> T>(len: usize, f: F) -> Deque<T> {
        Deque::repeat_with_in(len, f, Global)
    }
}

impl<T, A: Allocator> Deque<T, A> {
    const BLOCK: usize = block_len::<T>();

    /// Creates a new, empty Deque that allocates from `alloc`.
    pub const fn new_in(alloc: A) -> Deque<T, A> {
        Deque {
            dir: NonNull::dangling(),
            dir_len: 0,
            head: 0,
            tail: 0,
            alloc,
            _phantom: PhantomData,
        }
    }

    /// Creates a Deque holding `len` clones of `value`, allocating from `alloc`.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn repeat_in(len: usize, value: T, alloc: A) -> Deque<T, A>
    where
        T: Clone,
    {
        let mut deque = Deque::new_in(alloc);
        deque.resize(len, value);
        deque
    }

    /// Creates a Deque holding `len` values produced by `f`, allocating from `alloc`.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn repeat_with_in<F: FnMut() -> T>(len: usize, f: F, alloc: A) -> Deque<T, A> {
        let mut deque = Deque::new_in(alloc);
        deque.resize_with(len, f);
        deque
    }

    /// Returns the number of elements in the Deque.
    pub const fn len(&self) -> usize {
        self.tail - self.head
    }

    /// Returns true if the Deque contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns the number of elements stored in each block.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// assert_eq!(Deque::<u32>::block_len(), 50);
    /// assert_eq!(Deque::<[u64; 8]>::block_len(), 16);
    /// ```
    pub const fn block_len() -> usize {
        Self::BLOCK
    }

    /// Returns the largest number of elements a Deque of `T` can hold.
    pub const fn max_len() -> usize {
        let size = mem::size_of::<T>();
        isize::MAX as usize / if size == 0 { 1 } else { size }
    }

    /// Returns a reference to the Deque's allocator.
    pub const fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns a reference to the element at `index`, or [`None`] if it is out of bounds.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let deque: Deque<u16> = (0..300).collect();
    /// assert_eq!(deque.get(299), Some(&299));
    /// assert_eq!(deque.get(300), None);
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            // SAFETY: The index has just been checked.
            Some(unsafe { self.get_unchecked(index) })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the element at `index`, or [`None`] if it is out of bounds.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            // SAFETY: The index has just been checked.
            Some(unsafe { self.get_unchecked_mut(index) })
        } else {
            None
        }
    }

    /// Returns a reference to the element at `index`, or an [`IndexOutOfBounds`] error.
    ///
    /// # Errors
    /// Returns [`IndexOutOfBounds`] if `index >= len`.
    pub fn try_get(&self, index: usize) -> Result<&T, IndexOutOfBounds> {
        self.get(index).ok_or(IndexOutOfBounds {
            index,
            len: self.len(),
        })
    }

    /// Returns a reference to the element at `index` without checking bounds.
    ///
    /// # Safety
    /// `index` must be less than [`len`](Deque::len).
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        // SAFETY: The caller guarantees that the index is in bounds, so the slot is initialized.
        unsafe { self.element(index).as_ref() }
    }

    /// Returns a mutable reference to the element at `index` without checking bounds.
    ///
    /// # Safety
    /// `index` must be less than [`len`](Deque::len).
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        // SAFETY: The caller guarantees that the index is in bounds, so the slot is initialized.
        unsafe { self.element(index).as_mut() }
    }

    /// Returns a reference to the first element.
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns a mutable reference to the first element.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    /// Returns a reference to the last element.
    pub fn back(&self) -> Option<&T> {
        self.get(self.len().wrapping_sub(1))
    }

    /// Returns a mutable reference to the last element.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.get_mut(self.len().wrapping_sub(1))
    }

    /// Returns true if the Deque contains an element equal to `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|item| item == value)
    }

    /// Appends `value` to the back of the Deque.
    ///
    /// # Panics
    /// Panics if the Deque is already at [`max_len`](Deque::max_len) or the allocator fails.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let mut deque = Deque::new();
    /// for i in 0..1000 {
    ///     deque.push_back(i);
    /// }
    /// assert_eq!(deque.len(), 1000);
    /// assert_eq!(deque.back(), Some(&999));
    /// ```
    pub fn push_back(&mut self, value: T) {
        self.try_push_back(value).throw()
    }

    /// Appends `value` to the back of the Deque. If the Deque can't grow, `value` is dropped and
    /// the Deque is left unchanged.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the Deque is already at [`max_len`](Deque::max_len) or the
    /// allocator fails.
    pub fn try_push_back(&mut self, value: T) -> Result<(), ReserveError> {
        self.try_reserve_back(1)?;
        // SAFETY: Reserving makes sure that the block holding the tail and the next one exist.
        unsafe { primitives::construct_at(self.slot(self.tail), value) }
        self.tail += 1;
        Ok(())
    }

    /// Prepends `value` to the front of the Deque.
    ///
    /// # Panics
    /// Panics if the Deque is already at [`max_len`](Deque::max_len) or the allocator fails.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let mut deque = Deque::new();
    /// deque.push_back(2);
    /// deque.push_front(1);
    /// assert_eq!(deque.front(), Some(&1));
    /// ```
    pub fn push_front(&mut self, value: T) {
        self.try_push_front(value).throw()
    }

    /// Prepends `value` to the front of the Deque. If the Deque can't grow, `value` is dropped and
    /// the Deque is left unchanged.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the Deque is already at [`max_len`](Deque::max_len) or the
    /// allocator fails.
    pub fn try_push_front(&mut self, value: T) -> Result<(), ReserveError> {
        self.try_reserve_front(1)?;
        self.head -= 1;
        // SAFETY: Reserving makes sure that the slot before head is in an allocated block.
        unsafe { primitives::construct_at(self.slot(self.head), value) }
        Ok(())
    }

    /// Appends the value produced by `f` to the back of the Deque and returns a reference to it.
    ///
    /// # Panics
    /// Panics if the Deque can't grow. If `f` panics, the Deque is unchanged.
    pub fn emplace_back<F: FnOnce() -> T>(&mut self, f: F) -> &mut T {
        self.push_back(f());
        // SAFETY: The Deque has just been pushed to, so it isn't empty.
        unsafe { self.back_mut().unreachable() }
    }

    /// Prepends the value produced by `f` to the front of the Deque and returns a reference to it.
    ///
    /// # Panics
    /// Panics if the Deque can't grow. If `f` panics, the Deque is unchanged.
    pub fn emplace_front<F: FnOnce() -> T>(&mut self, f: F) -> &mut T {
        self.push_front(f());
        // SAFETY: The Deque has just been pushed to, so it isn't empty.
        unsafe { self.front_mut().unreachable() }
    }

    /// Removes the last element and returns it, or [`None`] if the Deque is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.tail -= 1;
        // SAFETY: The slot at the old tail - 1 held the last element, which is now owned here.
        let value = unsafe { self.slot(self.tail).read() };
        if (self.tail + 1) % Self::BLOCK == 0 {
            // The block after the tail no longer holds any elements.
            self.release_back();
        }
        Some(value)
    }

    /// Removes the first element and returns it, or [`None`] if the Deque is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: The slot at head held the first element, which is now owned here.
        let value = unsafe { self.slot(self.head).read() };
        self.head += 1;
        if self.head % Self::BLOCK == 0 {
            self.release_front();
        }
        Some(value)
    }

    /// Inserts `value` at `index`, shifting whichever side of the Deque is shorter. When both sides
    /// are equally long, the elements after `index` are shifted back.
    ///
    /// # Panics
    /// Panics if `index > len` or the Deque can't grow.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let mut deque: Deque<u8> = (0..4).collect();
    /// deque.insert(1, 9);
    /// assert_eq!(deque.to_string(), "![0, 9, 1, 2, 3]");
    /// ```
    pub fn insert(&mut self, index: usize, value: T) -> &mut T {
        self.try_insert(index, value).throw()
    }

    /// Inserts `value` at `index`. If the Deque can't grow, `value` is dropped and the Deque is
    /// left unchanged.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the Deque is already at [`max_len`](Deque::max_len) or the
    /// allocator fails.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<&mut T, ReserveError> {
        let len = self.len();
        self.check_position(index);

        if index < len - index {
            self.try_push_front(value)?;
            for i in 0..index {
                // SAFETY: Both indices are below len + 1, the new length.
                unsafe { self.swap_unchecked(i, i + 1) }
            }
        } else {
            self.try_push_back(value)?;
            for i in (index..len).rev() {
                // SAFETY: Both indices are below len + 1, the new length.
                unsafe { self.swap_unchecked(i, i + 1) }
            }
        }

        // SAFETY: index <= len < len + 1.
        Ok(unsafe { self.get_unchecked_mut(index) })
    }

    /// Inserts the value produced by `f` at `index` and returns a reference to it. `f` runs before
    /// the Deque is modified.
    ///
    /// # Panics
    /// Panics if `index > len` or the Deque can't grow.
    pub fn emplace<F: FnOnce() -> T>(&mut self, index: usize, f: F) -> &mut T {
        self.check_position(index);
        self.insert(index, f())
    }

    /// Inserts `count` clones of `value` at `index`.
    ///
    /// # Panics
    /// Panics if `index > len` or the Deque can't grow.
    pub fn insert_n(&mut self, index: usize, count: usize, value: T)
    where
        T: Clone,
    {
        self.insert_iter(index, iter::repeat_n(value, count));
    }

    /// Inserts every item of `iter` at `index`, in order, returning how many were inserted.
    ///
    /// The whole range is added on the shorter side of `index`, then rotated into place, so that
    /// only `min(index, len - index)` existing elements are moved. If the iterator panics, the
    /// items taken from it so far are dropped and the Deque is left as it was.
    ///
    /// # Panics
    /// Panics if `index > len` or the Deque can't grow.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let mut deque: Deque<u8> = (0..6).collect();
    /// assert_eq!(deque.insert_iter(4, [10, 11, 12]), 3);
    /// assert_eq!(deque.to_string(), "![0, 1, 2, 3, 10, 11, 12, 4, 5]");
    /// ```
    pub fn insert_iter<I: IntoIterator<Item = T>>(&mut self, index: usize, iter: I) -> usize {
        let len = self.len();
        self.check_position(index);

        let iter = iter.into_iter();
        let front = index < len - index;
        let hint = iter.size_hint().0;
        if front {
            self.reserve_front(hint);
        } else {
            self.reserve_back(hint);
        }

        let mut guard = PushGuard {
            deque: self,
            pushed: 0,
            front,
        };
        for item in iter {
            if front {
                guard.deque.push_front(item);
            } else {
                guard.deque.push_back(item);
            }
            guard.pushed += 1;
        }
        let count = guard.pushed;
        mem::forget(guard);

        if front {
            // [x_k .. x_1, prefix] -> [prefix, x_1 .. x_k]
            self.reverse_range(0, index + count);
            self.reverse_range(0, index);
        } else {
            // [suffix, x_1 .. x_k] -> [x_1 .. x_k, suffix]
            self.reverse_range(index, len);
            self.reverse_range(len, len + count);
            self.reverse_range(index, len + count);
        }
        count
    }

    /// Removes and returns the element at `index`, shifting whichever side is shorter.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        self.try_remove(index).throw()
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    /// Returns [`IndexOutOfBounds`] if `index >= len`.
    pub fn try_remove(&mut self, index: usize) -> Result<T, IndexOutOfBounds> {
        let len = self.len();
        if index >= len {
            return Err(IndexOutOfBounds { index, len });
        }

        // SAFETY: All swapped indices are below len, and the Deque isn't empty when popping.
        unsafe {
            if index < len - 1 - index {
                for i in (0..index).rev() {
                    self.swap_unchecked(i, i + 1);
                }
                Ok(self.pop_front().unreachable())
            } else {
                for i in index..len - 1 {
                    self.swap_unchecked(i, i + 1);
                }
                Ok(self.pop_back().unreachable())
            }
        }
    }

    /// Removes every element in `range`, closing the gap from whichever side is shorter.
    ///
    /// # Panics
    /// Panics if the range is decreasing or extends past `len`.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let mut deque: Deque<u8> = (0..10).collect();
    /// deque.erase(2..5);
    /// assert_eq!(deque.to_string(), "![0, 1, 5, 6, 7, 8, 9]");
    /// deque.erase(4..);
    /// assert_eq!(deque.to_string(), "![0, 1, 5, 6]");
    /// ```
    pub fn erase<R: RangeBounds<usize>>(&mut self, range: R) {
        let (start, end) = self.check_range(range);
        let count = end - start;
        let len = self.len();
        if count == 0 {
            return;
        }

        if start < len - end {
            for i in (0..start).rev() {
                // SAFETY: i + count < end <= len.
                unsafe { self.swap_unchecked(i, i + count) }
            }
            for _ in 0..count {
                self.pop_front();
            }
        } else {
            for i in end..len {
                // SAFETY: i < len.
                unsafe { self.swap_unchecked(i - count, i) }
            }
            self.truncate(len - count);
        }
    }

    /// Shortens the Deque to `len` elements, dropping the rest from the back. Has no effect if the
    /// Deque is already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        let old_tail = self.tail;
        self.tail = self.head + len;
        // SAFETY: The slots between the new and old tail are initialized and no longer part of the
        // Deque.
        unsafe { self.destroy_between(self.tail, old_tail) }
        self.release_back();
    }

    /// Drops every element. The block holding the front is kept, with the position reset to its
    /// middle.
    pub fn clear(&mut self) {
        self.truncate(0);
        if self.dir_len != 0 {
            self.release_front();
            self.head = self.head / Self::BLOCK * Self::BLOCK + Self::BLOCK / 2;
            self.tail = self.head;
        }
    }

    /// Keeps only the elements for which `f` returns true, preserving their order.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut f: F) {
        let len = self.len();
        let mut kept = 0;
        for i in 0..len {
            // SAFETY: i < len.
            if f(unsafe { self.get_unchecked(i) }) {
                if kept != i {
                    // SAFETY: kept < i < len.
                    unsafe { self.swap_unchecked(kept, i) }
                }
                kept += 1;
            }
        }
        self.truncate(kept);
    }

    /// Resizes the Deque to `len` elements, cloning `value` into new slots at the back or dropping
    /// elements from the back.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn resize(&mut self, len: usize, value: T)
    where
        T: Clone,
    {
        self.resize_with(len, || value.clone());
    }

    /// Resizes the Deque to `len` elements, filling new slots with [`Default::default`].
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn resize_default(&mut self, len: usize)
    where
        T: Default,
    {
        self.resize_with(len, T::default);
    }

    /// Resizes the Deque to `len` elements, filling new slots at the back with values produced by
    /// `f`. If `f` panics, the values produced so far stay at the back of the Deque.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn resize_with<F: FnMut() -> T>(&mut self, len: usize, mut f: F) {
        let old_len = self.len();
        if len <= old_len {
            self.truncate(len);
            return;
        }

        self.reserve_back(len - old_len);
        let end = self.head + len;
        while self.tail < end {
            let value = f();
            // SAFETY: The blocks up to end have been reserved.
            unsafe { primitives::construct_at(self.slot(self.tail), value) }
            self.tail += 1;
        }
    }

    /// Replaces the contents of the Deque with the items of `iter`. The new contents are collected
    /// into a fresh Deque first, so if the iterator panics the Deque is unchanged.
    ///
    /// # Panics
    /// Panics if the Deque can't grow.
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut fresh = Deque::new_in(self.alloc.clone());
        fresh.extend(iter);
        self.swap_storage(&mut fresh);
    }

    /// Replaces the contents of the Deque with `len` clones of `value`.
    ///
    /// # Panics
    /// Panics if `len` exceeds [`max_len`](Deque::max_len) or the allocator fails.
    pub fn assign_n(&mut self, len: usize, value: T)
    where
        T: Clone,
    {
        self.assign_iter(iter::repeat_n(value, len));
    }

    /// Makes sure that `additional` elements can be pushed to the back without allocating.
    ///
    /// # Panics
    /// Panics if the new length would exceed [`max_len`](Deque::max_len) or the allocator fails.
    pub fn reserve_back(&mut self, additional: usize) {
        self.try_reserve_back(additional).throw()
    }

    /// Makes sure that `additional` elements can be pushed to the back without allocating. If this
    /// fails, every block allocated by the call is freed again.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the new length would exceed [`max_len`](Deque::max_len) or
    /// the allocator fails.
    pub fn try_reserve_back(&mut self, additional: usize) -> Result<(), ReserveError> {
        self.check_growth(additional)?;
        if additional == 0 {
            return Ok(());
        }
        if self.dir_len == 0 {
            self.try_initialize()?;
        }

        let blocks = (self.tail % Self::BLOCK + additional) / Self::BLOCK;
        self.try_reserve_dir(0, blocks)?;

        let last = self.tail / Self::BLOCK;
        // SAFETY: The directory has room for `blocks` entries after the last occupied block.
        let mut creator = unsafe { BlockCreator::new(self.dir, &self.alloc, false) };
        for index in last + 1..=last + blocks {
            // SAFETY: index < dir_len, visited in increasing order.
            unsafe { creator.create(index) }?;
        }
        creator.commit();
        Ok(())
    }

    /// Makes sure that `additional` elements can be pushed to the front without allocating.
    ///
    /// # Panics
    /// Panics if the new length would exceed [`max_len`](Deque::max_len) or the allocator fails.
    pub fn reserve_front(&mut self, additional: usize) {
        self.try_reserve_front(additional).throw()
    }

    /// Makes sure that `additional` elements can be pushed to the front without allocating. If this
    /// fails, every block allocated by the call is freed again.
    ///
    /// # Errors
    /// Returns a [`ReserveError`] if the new length would exceed [`max_len`](Deque::max_len) or
    /// the allocator fails.
    pub fn try_reserve_front(&mut self, additional: usize) -> Result<(), ReserveError> {
        self.check_growth(additional)?;
        if additional == 0 {
            return Ok(());
        }
        if self.dir_len == 0 {
            self.try_initialize()?;
        }

        let slack = self.head % Self::BLOCK;
        let blocks = additional.saturating_sub(slack).div_ceil(Self::BLOCK);
        self.try_reserve_dir(blocks, 0)?;

        let first = self.head / Self::BLOCK;
        // SAFETY: The directory has room for `blocks` entries before the first occupied block.
        let mut creator = unsafe { BlockCreator::new(self.dir, &self.alloc, true) };
        for index in (first - blocks..first).rev() {
            // SAFETY: index < dir_len, visited in decreasing order.
            unsafe { creator.create(index) }?;
        }
        creator.commit();
        Ok(())
    }

    /// Frees every reserved block and shrinks the directory to fit the occupied blocks. An empty
    /// Deque gives back all of its memory.
    pub fn shrink_to_fit(&mut self) {
        if self.dir_len == 0 {
            return;
        }
        if self.is_empty() {
            // SAFETY: There are no elements left to destroy.
            unsafe { self.deallocate_storage() }
            return;
        }

        self.release_front();
        self.release_back();
        let used = self.tail / Self::BLOCK - self.head / Self::BLOCK + 1;
        let target = cmp::max(used + 2, MIN_DIR_LEN);
        if target < self.dir_len {
            // Shrinking is best-effort, the old directory stays if the new one can't be allocated.
            // SAFETY: The occupied blocks fit in target with one free entry on each side.
            let _ = unsafe { self.try_relayout(target, (target - used) / 2) };
        }
    }

    /// Exchanges the contents of two Deques.
    ///
    /// If the allocator propagates on swap, the allocators are exchanged along with the storage. If
    /// it doesn't, but both allocators are equal, only the storage is exchanged. Otherwise, every
    /// element is moved into memory from the other Deque's allocator.
    ///
    /// # Panics
    /// Panics if elements have to be moved and an allocator fails.
    pub fn swap(&mut self, other: &mut Deque<T, A>) {
        if A::PROPAGATE_ON_SWAP {
            self.swap_storage(other);
            mem::swap(&mut self.alloc, &mut other.alloc);
        } else if self.alloc == other.alloc {
            self.swap_storage(other);
        } else {
            let mut mine = self.move_into(other.alloc.clone());
            let mut theirs = other.move_into(self.alloc.clone());
            self.swap_storage(&mut theirs);
            other.swap_storage(&mut mine);
        }
    }

    /// Replaces the contents of the Deque with those of `source`, the way a move assignment does.
    ///
    /// If the allocator propagates on move assignment, `source` takes the place of `self`
    /// entirely. If the allocators are equal, the storage is taken over. Otherwise, every element
    /// of `source` is moved into memory from `self`'s allocator.
    ///
    /// # Panics
    /// Panics if elements have to be moved and the allocator fails.
    pub fn assign_from(&mut self, mut source: Deque<T, A>) {
        if A::PROPAGATE_ON_MOVE_ASSIGN {
            *self = source;
        } else if self.alloc == source.alloc {
            // The old contents are dropped along with source.
            self.swap_storage(&mut source);
        } else {
            self.clear();
            self.extend(source);
        }
    }

    /// Returns a cursor at the first element, equal to [`cursor_end`](Deque::cursor_end) if the
    /// Deque is empty.
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        self.cursor_from_raw(self.raw_front())
    }

    /// Returns a cursor one past the last element.
    pub fn cursor_end(&self) -> Cursor<'_, T, A> {
        self.cursor_from_raw(self.raw_at(self.tail))
    }

    /// Returns a cursor at `index`, which may be `len` for the end position.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, A> {
        self.check_position(index);
        self.cursor_from_raw(self.raw_at(self.head + index))
    }

    /// Returns an iterator over references to the elements, front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            front: self.raw_front(),
            back: self.raw_at(self.tail),
            len: self.len(),
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over mutable references to the elements, front to back.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            front: self.raw_front(),
            back: self.raw_at(self.tail),
            len: self.len(),
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over the contiguous runs of elements, one per occupied block.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::collections::deque::Deque;
    /// let deque: Deque<u64> = (0..100).collect();
    /// assert!(deque.chunks().all(|chunk| chunk.len() <= Deque::<u64>::block_len()));
    /// assert_eq!(deque.chunks().map(<[u64]>::len).sum::<usize>(), 100);
    /// ```
    pub fn chunks(&self) -> Chunks<'_, T> {
        Chunks {
            front: self.raw_front(),
            remaining: self.len(),
            _phantom: PhantomData,
        }
    }

    /// Swaps the elements at indices `a` and `b`.
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    pub fn swap_elements(&mut self, a: usize, b: usize) {
        self.check_index(a);
        self.check_index(b);
        // SAFETY: Both indices have just been checked.
        unsafe { self.swap_unchecked(a, b) }
    }

    pub(crate) fn raw_front(&self) -> RawCursor<T> {
        self.raw_at(self.head)
    }

    /// Creates a raw cursor at the absolute `offset`, which must lie between head and tail.
    pub(crate) fn raw_at(&self, offset: usize) -> RawCursor<T> {
        if self.dir_len == 0 {
            RawCursor::dangling()
        } else {
            // SAFETY: Every block from head to tail is allocated.
            unsafe {
                RawCursor::new(self.dir.as_ptr().add(offset / Self::BLOCK), offset % Self::BLOCK)
            }
        }
    }

    fn cursor_from_raw(&self, raw: RawCursor<T>) -> Cursor<'_, T, A> {
        Cursor {
            raw,
            deque: self,
            _phantom: PhantomData,
        }
    }

    /// Returns a pointer to the slot at the absolute `offset`.
    ///
    /// # Safety
    /// The block holding `offset` must be allocated.
    unsafe fn slot(&self, offset: usize) -> NonNull<T> {
        // SAFETY: Guaranteed by the caller.
        unsafe {
            let block = self.dir.add(offset / Self::BLOCK).read().unreachable();
            block.add(offset % Self::BLOCK)
        }
    }

    /// # Safety
    /// `index` must be less than len.
    unsafe fn element(&self, index: usize) -> NonNull<T> {
        // SAFETY: Every element lives in an allocated block.
        unsafe { self.slot(self.head + index) }
    }

    /// # Safety
    /// Both indices must be less than len.
    unsafe fn swap_unchecked(&mut self, a: usize, b: usize) {
        // SAFETY: Both slots are initialized. ptr::swap allows a == b.
        unsafe { ptr::swap(self.element(a).as_ptr(), self.element(b).as_ptr()) }
    }

    fn reverse_range(&mut self, mut from: usize, mut to: usize) {
        while from + 1 < to {
            to -= 1;
            // SAFETY: from < to <= len.
            unsafe { self.swap_unchecked(from, to) }
            from += 1;
        }
    }

    /// Drops the elements in the absolute range `from..to`, one block segment at a time.
    ///
    /// # Safety
    /// Every slot in the range must be initialized and must be treated as uninitialized afterwards.
    unsafe fn destroy_between(&self, mut from: usize, to: usize) {
        while from < to {
            let run = cmp::min(Self::BLOCK - from % Self::BLOCK, to - from);
            // SAFETY: The run is initialized and doesn't cross a block boundary.
            unsafe { primitives::destroy_range(self.slot(from), run) }
            from += run;
        }
    }

    /// Allocates a directory with a single block, placing the (empty) range in the middle of it.
    fn try_initialize(&mut self) -> Result<(), ReserveError> {
        let dir = self.alloc.allocate_array::<Entry<T>>(MIN_DIR_LEN)?;
        let block = match self.alloc.allocate_array::<T>(Self::BLOCK) {
            Ok(block) => block,
            Err(error) => {
                // SAFETY: The directory has just been allocated with this length.
                unsafe { self.alloc.deallocate_array(dir, MIN_DIR_LEN) }
                return Err(error);
            },
        };

        let middle = MIN_DIR_LEN / 2;
        for index in 0..MIN_DIR_LEN {
            // SAFETY: index < MIN_DIR_LEN.
            unsafe { dir.add(index).write(None) }
        }
        // SAFETY: middle < MIN_DIR_LEN.
        unsafe { dir.add(middle).write(Some(block)) }

        self.dir = dir;
        self.dir_len = MIN_DIR_LEN;
        self.head = middle * Self::BLOCK + Self::BLOCK / 2;
        self.tail = self.head;
        Ok(())
    }

    fn check_growth(&self, additional: usize) -> Result<(), ReserveError> {
        if additional > Self::max_len() - self.len() {
            return Err(CapacityOverflow.into());
        }
        Ok(())
    }

    /// Makes sure that the directory has `front` entries before the first occupied block and
    /// `back` entries after the last one, reallocating it if needed.
    fn try_reserve_dir(&mut self, front: usize, back: usize) -> Result<(), ReserveError> {
        let first = self.head / Self::BLOCK;
        let last = self.tail / Self::BLOCK;
        if front <= first && back < self.dir_len - last {
            return Ok(());
        }

        let used = last - first + 1;
        let needed = used
            .checked_add(front)
            .and_then(|needed| needed.checked_add(back))
            .ok_or(CapacityOverflow)?;
        // Re-center in a directory of the same size while it is at most half full.
        let new_len = if needed <= self.dir_len / 2 {
            self.dir_len
        } else {
            self.dir_len
                .checked_add(cmp::max(self.dir_len, needed))
                .and_then(|new_len| new_len.checked_add(2))
                .ok_or(CapacityOverflow)?
        };

        // SAFETY: new_len >= needed, so the occupied blocks fit after front + half the slack.
        unsafe { self.try_relayout(new_len, front + (new_len - needed) / 2) }
    }

    /// Moves the block pointers into a new directory of `new_len` entries, with the first occupied
    /// block at `new_first`. Reserved blocks that don't fit are freed.
    ///
    /// # Safety
    /// `new_first + used <= new_len`, where `used` is the number of occupied blocks.
    unsafe fn try_relayout(
        &mut self,
        new_len: usize,
        new_first: usize,
    ) -> Result<(), ReserveError> {
        let dir = self.alloc.allocate_array::<Entry<T>>(new_len)?;
        let first = self.head / Self::BLOCK;

        // SAFETY: Both directories are valid for their lengths. Every block is either moved to the
        // new directory or freed, never both.
        unsafe {
            for index in 0..new_len {
                dir.add(index).write(None);
            }
            for index in 0..self.dir_len {
                if let Some(block) = self.dir.add(index).read() {
                    let target = (index + new_first).checked_sub(first).filter(|t| *t < new_len);
                    match target {
                        Some(target) => dir.add(target).write(Some(block)),
                        None => self.alloc.deallocate_array(block, Self::BLOCK),
                    }
                }
            }
            self.alloc.deallocate_array(self.dir, self.dir_len);
        }

        let shift = new_first * Self::BLOCK;
        self.head = self.head - first * Self::BLOCK + shift;
        self.tail = self.tail - first * Self::BLOCK + shift;
        self.dir = dir;
        self.dir_len = new_len;
        Ok(())
    }

    /// Frees the reserved blocks after the block holding the tail.
    fn release_back(&mut self) {
        if self.dir_len == 0 {
            return;
        }
        for index in self.tail / Self::BLOCK + 1..self.dir_len {
            // SAFETY: index < dir_len, and blocks after the tail hold no elements.
            unsafe {
                match self.dir.add(index).as_mut().take() {
                    Some(block) => self.alloc.deallocate_array(block, Self::BLOCK),
                    None => break,
                }
            }
        }
    }

    /// Frees the reserved blocks before the block holding the head.
    fn release_front(&mut self) {
        if self.dir_len == 0 {
            return;
        }
        for index in (0..self.head / Self::BLOCK).rev() {
            // SAFETY: index < dir_len, and blocks before the head hold no elements.
            unsafe {
                match self.dir.add(index).as_mut().take() {
                    Some(block) => self.alloc.deallocate_array(block, Self::BLOCK),
                    None => break,
                }
            }
        }
    }

    /// Frees every block and the directory, returning to the unallocated state.
    ///
    /// # Safety
    /// The Deque must not hold any live elements.
    unsafe fn deallocate_storage(&mut self) {
        // SAFETY: Every entry is either empty or a block allocated from self.alloc.
        unsafe {
            for index in 0..self.dir_len {
                if let Some(block) = self.dir.add(index).read() {
                    self.alloc.deallocate_array(block, Self::BLOCK);
                }
            }
            self.alloc.deallocate_array(self.dir, self.dir_len);
        }
        self.dir = NonNull::dangling();
        self.dir_len = 0;
        self.head = 0;
        self.tail = 0;
    }

    fn swap_storage(&mut self, other: &mut Deque<T, A>) {
        mem::swap(&mut self.dir, &mut other.dir);
        mem::swap(&mut self.dir_len, &mut other.dir_len);
        mem::swap(&mut self.head, &mut other.head);
        mem::swap(&mut self.tail, &mut other.tail);
    }

    /// Moves every element into a new Deque allocating from `alloc`.
    fn move_into(&mut self, alloc: A) -> Deque<T, A> {
        let mut moved = Deque::new_in(alloc);
        moved.reserve_back(self.len());
        while let Some(value) = self.pop_front() {
            moved.push_back(value);
        }
        moved
    }

    /// # Panics
    /// Panics if `index >= len`.
    #[track_caller]
    fn check_index(&self, index: usize) {
        if index >= self.len() {
            Err(IndexOutOfBounds {
                index,
                len: self.len(),
            }).throw()
        }
    }

    /// # Panics
    /// Panics if `index > len`.
    #[track_caller]
    fn check_position(&self, index: usize) {
        if index > self.len() {
            Err(IndexOutOfBounds {
                index,
                len: self.len(),
            }).throw()
        }
    }

    /// # Panics
    /// Panics if the range is decreasing or extends past len.
    #[track_caller]
    fn check_range<R: RangeBounds<usize>>(&self, range: R) -> (usize, usize) {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };
        if end > len {
            Err(IndexOutOfBounds { index: end, len }).throw()
        }
        if start > end {
            Err(IndexOutOfBounds { index: start, len: end }).throw()
        }
        (start, end)
    }
}

/// Pops the elements pushed by an interrupted range insertion.
struct PushGuard<'a, T, A: Allocator> {
    deque: &'a mut Deque<T, A>,
    pushed: usize,
    front: bool,
}

impl<T, A: Allocator> Drop for PushGuard<'_, T, A> {
    fn drop(&mut self) {
        for _ in 0..self.pushed {
            if self.front {
                self.deque.pop_front();
            } else {
                self.deque.pop_back();
            }
        }
    }
}

impl<T, A: Allocator> Drop for Deque<T, A> {
    fn drop(&mut self) {
        if self.dir_len == 0 {
            return;
        }
        // SAFETY: All elements between head and tail are initialized and dropped exactly once,
        // after which no live elements remain.
        unsafe {
            self.destroy_between(self.head, self.tail);
            self.deallocate_storage();
        }
    }
}

impl<T, A: Allocator> Extend<T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve_back(iter.size_hint().0);
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for Deque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Deque::new();
        deque.extend(iter);
        deque
    }
}

impl<T, const N: usize> From<[T; N]> for Deque<T> {
    fn from(value: [T; N]) -> Self {
        value.into_iter().collect()
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: Allocator> Clone for Deque<T, A> {
    fn clone(&self) -> Self {
        let mut deque = Deque::new_in(self.alloc.select_on_copy());
        deque.extend(self.iter().cloned());
        deque
    }

    fn clone_from(&mut self, source: &Self) {
        if A::PROPAGATE_ON_COPY_ASSIGN {
            if self.alloc != source.alloc {
                // The old storage has to go back to the old allocator first.
                *self = Deque::new_in(source.alloc.clone());
            } else {
                self.alloc = source.alloc.clone();
            }
        }

        self.truncate(source.len());
        for (mine, theirs) in self.iter_mut().zip(source.iter()) {
            mine.clone_from(theirs);
        }
        let len = self.len();
        self.extend(source.iter().skip(len).cloned());
    }
}

impl<T, A: Allocator> Index<usize> for Deque<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.try_get(index).throw()
    }
}

impl<T, A: Allocator> IndexMut<usize> for Deque<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.check_index(index);
        // SAFETY: The index has just been checked.
        unsafe { self.get_unchecked_mut(index) }
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<Deque<T, B>> for Deque<T, A> {
    fn eq(&self, other: &Deque<T, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: Allocator> Eq for Deque<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Deque<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: Allocator> Ord for Deque<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: Allocator> Hash for Deque<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for item in self {
            item.hash(state);
        }
    }
}

impl<T: Debug, A: Allocator> Debug for Deque<T, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deque")
            .field("contents", &DebugIter::new(self.iter()))
            .field("len", &self.len())
            .field("block_len", &Self::BLOCK)
            .field("dir_len", &self.dir_len)
            .finish()
    }
}

impl<T: Debug, A: Allocator> Display for Deque<T, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "!")?;
        f.debug_list().entries(self.iter()).finish()
    }
}

// SAFETY: Deques own their elements and blocks exclusively, so they can be sent whenever the
// elements and the allocator can.
unsafe impl<T: Send, A: Allocator + Send> Send for Deque<T, A> {}
// SAFETY: Deque's safe API obeys all rules of the borrow checker, so no interior mutability
// occurs. Shared access only hands out &T and &A.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Deque<T, A> {}
