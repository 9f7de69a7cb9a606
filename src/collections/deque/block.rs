use std::mem;
use std::ptr::NonNull;

use crate::memory::Allocator;
use crate::util::error::ReserveError;

/// The smallest number of elements a block holds.
pub const MIN_BLOCK_LEN: usize = 16;

/// The number of bytes a block aims to occupy at least.
pub const BLOCK_BYTES: usize = 200;

/// Returns the number of elements of `T` stored per block: `max(16, 200 / size_of::<T>())`.
/// Zero-sized types get the minimum.
///
/// # Examples
/// ```
/// # use core_containers::collections::deque::block_len;
/// assert_eq!(block_len::<u8>(), 200);
/// assert_eq!(block_len::<u64>(), 25);
/// assert_eq!(block_len::<[u8; 100]>(), 16);
/// ```
pub const fn block_len<T>() -> usize {
    let size = mem::size_of::<T>();
    if size == 0 || BLOCK_BYTES / size < MIN_BLOCK_LEN {
        MIN_BLOCK_LEN
    } else {
        BLOCK_BYTES / size
    }
}

/// An entry in the block directory, either empty or owning a block of `block_len::<T>()` slots.
pub(crate) type Entry<T> = Option<NonNull<T>>;

/// A proctor over blocks that are being added to a directory. Blocks are created at consecutive
/// directory indices moving away from the occupied range, and until the creator is
/// [`commit`](BlockCreator::commit)ted, dropping it frees every block it created and clears the
/// entries again.
pub(crate) struct BlockCreator<'a, T, A: Allocator> {
    dir: NonNull<Entry<T>>,
    alloc: &'a A,
    created: usize,
    // Index of the most recently created block and the direction of travel.
    last: usize,
    backwards: bool,
}

impl<'a, T, A: Allocator> BlockCreator<'a, T, A> {
    /// # Safety
    /// `dir` must stay valid and must not be reallocated while the creator lives, and every index
    /// passed to [`create`](BlockCreator::create) must be in bounds.
    pub(crate) const unsafe fn new(
        dir: NonNull<Entry<T>>,
        alloc: &'a A,
        backwards: bool,
    ) -> BlockCreator<'a, T, A> {
        BlockCreator {
            dir,
            alloc,
            created: 0,
            last: 0,
            backwards,
        }
    }

    /// Makes sure that the entry at `index` holds a block, allocating one if it is empty.
    ///
    /// # Safety
    /// `index` must be in bounds of the directory. Calls must visit indices in the creator's
    /// direction of travel, one step at a time.
    pub(crate) unsafe fn create(&mut self, index: usize) -> Result<(), ReserveError> {
        // SAFETY: The index is in bounds, as guaranteed by the caller.
        let entry = unsafe { self.dir.add(index).as_mut() };
        if entry.is_none() {
            *entry = Some(self.alloc.allocate_array::<T>(block_len::<T>())?);
            self.created += 1;
            self.last = index;
        }
        Ok(())
    }

    /// Keeps every block created so far.
    pub(crate) fn commit(self) {
        mem::forget(self);
    }
}

impl<T, A: Allocator> Drop for BlockCreator<'_, T, A> {
    fn drop(&mut self) {
        for step in 0..self.created {
            let index = if self.backwards { self.last + step } else { self.last - step };
            // SAFETY: Every index between the first and last created block has been visited by
            // create, and the ones that were created hold a block that no element lives in.
            unsafe {
                let entry = self.dir.add(index).as_mut();
                if let Some(block) = entry.take() {
                    self.alloc.deallocate_array(block, block_len::<T>());
                }
            }
        }
    }
}
