//! Control blocks: the reference counts shared by a group of handles, followed by whatever the
//! group needs to dispose of its object.
//!
//! Every variant is a `#[repr(C)]` struct starting with a [`ControlBlock`] header, so a pointer to
//! the header is also a pointer to the whole block. The header stores two monomorphized functions,
//! one to dispose of the object and one to free the block, which stand in for a vtable.

use std::mem::{ManuallyDrop, MaybeUninit};
use std::process;
use std::ptr::{self, NonNull};
use std::sync::atomic::{self, AtomicUsize, Ordering};

use derive_more::IsVariant;

use super::Disposer;
use crate::memory::{AllocError, Allocator};

/// Counts above this are treated as a leak of handles, and abort rather than risk an overflow.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// The kind of control block that backs a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum Representation {
    /// The object lives in its own allocation and is destroyed by a user-provided disposer.
    OutOfPlace,
    /// The object is stored inside the control block, which is a single allocation.
    InPlace,
    /// The object was adopted from a [`Box`], and is freed the way the box would have been.
    Adopted,
    /// The object isn't owned by the group, disposing of it does nothing.
    Unmanaged,
}

/// The header of every control block.
///
/// `weak` counts the weak handles plus one for the strong handles as a whole, so the block stays
/// alive while any handle does.
#[repr(C)]
pub(crate) struct ControlBlock {
    strong: AtomicUsize,
    weak: AtomicUsize,
    representation: Representation,
    dispose: unsafe fn(NonNull<ControlBlock>),
    release: unsafe fn(NonNull<ControlBlock>),
}

impl ControlBlock {
    const fn new(
        representation: Representation,
        dispose: unsafe fn(NonNull<ControlBlock>),
        release: unsafe fn(NonNull<ControlBlock>),
    ) -> ControlBlock {
        ControlBlock {
            strong: AtomicUsize::new(1),
            weak: AtomicUsize::new(1),
            representation,
            dispose,
            release,
        }
    }

    pub const fn representation(&self) -> Representation {
        self.representation
    }

    pub fn strong(&self) -> usize {
        self.strong.load(Ordering::Acquire)
    }

    /// The number of weak handles, without the one held on behalf of the strong handles.
    pub fn weak(&self) -> usize {
        let weak = self.weak.load(Ordering::Acquire);
        if self.strong() > 0 {
            weak.saturating_sub(1)
        } else {
            weak
        }
    }

    /// Adds a strong reference on behalf of a handle that already holds one.
    pub fn acquire_strong(&self) {
        // A new reference can only be created from an existing one, so no ordering is needed.
        if self.strong.fetch_add(1, Ordering::Relaxed) > MAX_REFCOUNT {
            process::abort();
        }
    }

    /// Adds a strong reference if the object is still alive.
    pub fn try_acquire_strong(&self) -> bool {
        let mut count = self.strong.load(Ordering::Relaxed);
        loop {
            if count == 0 {
                return false;
            }
            if count > MAX_REFCOUNT {
                process::abort();
            }
            match self.strong.compare_exchange_weak(
                count,
                count + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => count = current,
            }
        }
    }

    pub fn acquire_weak(&self) {
        if self.weak.fetch_add(1, Ordering::Relaxed) > MAX_REFCOUNT {
            process::abort();
        }
    }

    /// Drops a strong reference. The last one disposes of the object and gives up the weak
    /// reference held on behalf of the strong handles.
    ///
    /// # Safety
    /// The caller must own a strong reference to the live block at `this`, and gives it up.
    pub unsafe fn release_strong(this: NonNull<ControlBlock>) {
        // SAFETY: The block is alive while the caller's reference is.
        let block = unsafe { this.as_ref() };
        if block.strong.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        // Every other release happens-before the object is disposed of.
        atomic::fence(Ordering::Acquire);

        // SAFETY: The strong count just reached zero, which happens exactly once per block.
        unsafe {
            (block.dispose)(this);
            ControlBlock::release_weak(this);
        }
    }

    /// Drops a weak reference. The last one frees the block.
    ///
    /// # Safety
    /// The caller must own a weak reference to the live block at `this`, and gives it up.
    pub unsafe fn release_weak(this: NonNull<ControlBlock>) {
        // SAFETY: The block is alive while the caller's reference is.
        let block = unsafe { this.as_ref() };
        if block.weak.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        atomic::fence(Ordering::Acquire);

        let release = block.release;
        // SAFETY: The weak count just reached zero, nothing can reach the block anymore.
        unsafe { release(this) }
    }
}

/// The pointer a handle exposes, together with the control block that keeps it alive.
pub(crate) struct Parts<T: ?Sized> {
    pub ptr: NonNull<T>,
    pub ctrl: NonNull<ControlBlock>,
}

impl<T: ?Sized> Parts<T> {
    /// Returns the control block. The caller holds a reference, so it outlives the borrow.
    pub const fn control<'a>(self) -> &'a ControlBlock {
        // SAFETY: Parts are only stored by handles that own a count on the block.
        unsafe { self.ctrl.as_ref() }
    }
}

impl<T: ?Sized> Clone for Parts<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Parts<T> {}

#[repr(C)]
struct OutOfPlace<T: ?Sized, D, A> {
    header: ControlBlock,
    object: NonNull<T>,
    disposer: ManuallyDrop<D>,
    alloc: ManuallyDrop<A>,
}

/// Allocates a control block that disposes of `object` with `disposer`.
///
/// If the block can't be allocated, `disposer` is run on `object` before the error is returned, so
/// the object never leaks.
///
/// # Safety
/// Running `disposer` on `object` must be sound, once, at any later point.
pub(crate) unsafe fn out_of_place<T: ?Sized, D: Disposer<T>, A: Allocator>(
    object: NonNull<T>,
    disposer: D,
    alloc: A,
    representation: Representation,
) -> Result<NonNull<ControlBlock>, AllocError> {
    let ptr = match alloc.allocate_one::<OutOfPlace<T, D, A>>() {
        Ok(ptr) => ptr,
        Err(err) => {
            disposer.dispose(object);
            return Err(err);
        },
    };

    let block = OutOfPlace {
        header: ControlBlock::new(
            representation,
            dispose_out_of_place::<T, D, A>,
            release_out_of_place::<T, D, A>,
        ),
        object,
        disposer: ManuallyDrop::new(disposer),
        alloc: ManuallyDrop::new(alloc),
    };
    // SAFETY: The slot was just allocated for this block.
    unsafe { ptr.write(block) }
    Ok(ptr.cast())
}

unsafe fn dispose_out_of_place<T: ?Sized, D: Disposer<T>, A>(ctrl: NonNull<ControlBlock>) {
    let block = ctrl.cast::<OutOfPlace<T, D, A>>().as_ptr();
    // SAFETY: Called once, when the strong count reaches zero. The disposer isn't touched again.
    unsafe {
        let disposer = ManuallyDrop::take(&mut (*block).disposer);
        disposer.dispose((*block).object);
    }
}

unsafe fn release_out_of_place<T: ?Sized, D, A: Allocator>(ctrl: NonNull<ControlBlock>) {
    let block = ctrl.cast::<OutOfPlace<T, D, A>>();
    // SAFETY: Called once, when the weak count reaches zero. The disposer is already gone.
    unsafe {
        let alloc = ManuallyDrop::take(&mut (*block.as_ptr()).alloc);
        alloc.deallocate_one(block);
    }
}

#[repr(C)]
struct InPlace<T, A> {
    header: ControlBlock,
    alloc: ManuallyDrop<A>,
    value: MaybeUninit<T>,
}

/// Allocates a control block that stores `value` inline. Returns the block and a pointer to the
/// value.
pub(crate) fn in_place<T, A: Allocator>(
    value: T,
    alloc: A,
) -> Result<(NonNull<ControlBlock>, NonNull<T>), AllocError> {
    let ptr = alloc.allocate_one::<InPlace<T, A>>()?;
    let block = InPlace {
        header: ControlBlock::new(
            Representation::InPlace,
            dispose_in_place::<T, A>,
            release_in_place::<T, A>,
        ),
        alloc: ManuallyDrop::new(alloc),
        value: MaybeUninit::new(value),
    };

    // SAFETY: The slot was just allocated for this block, and the value field is within it.
    unsafe {
        ptr.write(block);
        let value = NonNull::new_unchecked(ptr::addr_of_mut!((*ptr.as_ptr()).value));
        Ok((ptr.cast(), value.cast()))
    }
}

unsafe fn dispose_in_place<T, A>(ctrl: NonNull<ControlBlock>) {
    let block = ctrl.cast::<InPlace<T, A>>().as_ptr();
    // SAFETY: Called once, when the strong count reaches zero. The value is initialized until then.
    unsafe { (*block).value.assume_init_drop() }
}

unsafe fn release_in_place<T, A: Allocator>(ctrl: NonNull<ControlBlock>) {
    let block = ctrl.cast::<InPlace<T, A>>();
    // SAFETY: Called once, when the weak count reaches zero. The value is already dropped.
    unsafe {
        let alloc = ManuallyDrop::take(&mut (*block.as_ptr()).alloc);
        alloc.deallocate_one(block);
    }
}
