use std::alloc::{self, Layout};
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::ptr::NonNull;

use super::primitives;
use crate::util::error::{CapacityOverflow, ReserveError};

/// The error produced when an [`Allocator`] can't satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    /// The layout that was requested.
    pub layout: Layout,
}

impl Display for AllocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation of {} bytes with alignment {} failed!",
            self.layout.size(),
            self.layout.align(),
        )
    }
}

impl Error for AllocError {}

/// A source of memory, passed to containers as a value.
///
/// Allocators are compared with [`PartialEq`]: two allocators are equal if memory allocated by one
/// can be freed by the other. Containers rely on that to decide whether storage can change hands
/// or elements have to be moved one at a time.
///
/// Only [`allocate`](Allocator::allocate) and [`deallocate`](Allocator::deallocate) have to be
/// provided. The typed helpers deal with zero-sized requests themselves (returning a dangling
/// pointer and never freeing it), so implementors never see a zero-sized [`Layout`].
pub trait Allocator: Clone + PartialEq {
    /// Whether a container that is assigned a copy of another adopts the other's allocator.
    const PROPAGATE_ON_COPY_ASSIGN: bool = false;
    /// Whether a container that is assigned (moved) another adopts the other's allocator.
    const PROPAGATE_ON_MOVE_ASSIGN: bool = false;
    /// Whether two containers exchange allocators when their contents are swapped.
    const PROPAGATE_ON_SWAP: bool = false;

    /// Allocates memory for `layout`, which always has a non-zero size.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the request can't be satisfied.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Returns memory to the allocator.
    ///
    /// # Safety
    /// `ptr` must have been returned by [`allocate`](Allocator::allocate) on this allocator (or
    /// one equal to it) with the same `layout`, and must not have been freed already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// The allocator that a copy of a container using `self` is created with.
    fn select_on_copy(&self) -> Self {
        self.clone()
    }

    /// Allocates uninitialized storage for a single `T`.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the allocator fails.
    fn allocate_one<T>(&self) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        self.allocate(layout).map(NonNull::cast)
    }

    /// Frees storage returned by [`allocate_one`](Allocator::allocate_one).
    ///
    /// # Safety
    /// `ptr` must come from `allocate_one::<T>` on an equal allocator and must not be used again.
    unsafe fn deallocate_one<T>(&self, ptr: NonNull<T>) {
        let layout = Layout::new::<T>();
        if layout.size() != 0 {
            // SAFETY: The layout is the one used for the allocation, as guaranteed by the caller.
            unsafe { self.deallocate(ptr.cast(), layout) }
        }
    }

    /// Allocates uninitialized storage for `len` contiguous values of `T`.
    ///
    /// # Errors
    /// Returns [`CapacityOverflow`] if the total size exceeds [`isize::MAX`] and an
    /// [`AllocError`] if the allocator fails.
    fn allocate_array<T>(&self, len: usize) -> Result<NonNull<T>, ReserveError> {
        let layout = Layout::array::<T>(len).map_err(|_| CapacityOverflow)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        Ok(self.allocate(layout)?.cast())
    }

    /// Frees storage returned by [`allocate_array`](Allocator::allocate_array).
    ///
    /// # Safety
    /// `ptr` must come from `allocate_array::<T>(len)` on an equal allocator, with the same `len`.
    unsafe fn deallocate_array<T>(&self, ptr: NonNull<T>, len: usize) {
        // The layout was valid when allocating, so it is valid now.
        match Layout::array::<T>(len) {
            Ok(layout) if layout.size() != 0 => {
                // SAFETY: Same pointer and layout as the allocation, as guaranteed by the caller.
                unsafe { self.deallocate(ptr.cast(), layout) }
            },
            _ => {},
        }
    }

    /// Moves `value` into the uninitialized slot at `ptr`.
    ///
    /// # Safety
    /// See [`primitives::construct_at`].
    unsafe fn construct<T>(&self, ptr: NonNull<T>, value: T) {
        // SAFETY: Forwarded to the caller.
        unsafe { primitives::construct_at(ptr, value) }
    }

    /// Drops the value at `ptr` in place, leaving the slot uninitialized.
    ///
    /// # Safety
    /// See [`primitives::destroy_at`].
    unsafe fn destroy<T: ?Sized>(&self, ptr: NonNull<T>) {
        // SAFETY: Forwarded to the caller.
        unsafe { primitives::destroy_at(ptr) }
    }
}

/// The platform heap, as exposed by [`std::alloc`]. All instances are equal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Global;

impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0, "Zero-sized allocation requested from Global!");
        // SAFETY: Zero-sized layouts are filtered out by the typed helpers.
        NonNull::new(unsafe { alloc::alloc(layout) }).ok_or(AllocError { layout })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: The caller guarantees that ptr was allocated by Global with this layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Something that can destroy and free an object it created, the "delete this object" half of a
/// factory.
///
/// Every [`Allocator`] is an `ObjectFactory` for the objects it allocated with
/// [`allocate_one`](Allocator::allocate_one).
pub trait ObjectFactory<T> {
    /// Destroys the object at `ptr` and frees its memory.
    ///
    /// # Safety
    /// `ptr` must point to a live object created by this factory (or one equal to it), which must
    /// not be used again.
    unsafe fn delete_object(&self, ptr: NonNull<T>);
}

impl<T, A: Allocator> ObjectFactory<T> for A {
    unsafe fn delete_object(&self, ptr: NonNull<T>) {
        // SAFETY: The object is live and was allocated as a single T, as guaranteed by the caller.
        unsafe {
            self.destroy(ptr);
            self.deallocate_one(ptr);
        }
    }
}
