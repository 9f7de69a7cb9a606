use std::ptr::NonNull;

use crate::memory::ObjectFactory;

/// Destroys the object owned by a group of [`SharedHandle`](super::SharedHandle)s once the last
/// strong handle is gone.
///
/// Any `FnOnce(NonNull<T>)` closure is a disposer. To destroy objects through an
/// [`ObjectFactory`] (such as an allocator), wrap it in a [`Factory`].
///
/// Disposers must not panic. A disposer that does leaves the control block in an unspecified
/// state.
pub trait Disposer<T: ?Sized> {
    /// Destroys the object at `ptr`.
    fn dispose(self, ptr: NonNull<T>);
}

impl<T: ?Sized, F: FnOnce(NonNull<T>)> Disposer<T> for F {
    fn dispose(self, ptr: NonNull<T>) {
        self(ptr)
    }
}

/// A [`Disposer`] that hands the object back to the factory that created it.
///
/// # Examples
/// ```
/// # use std::ptr::NonNull;
/// # use core_containers::memory::{Allocator, Global};
/// # use core_containers::shared::{Factory, SharedHandle};
/// let ptr: NonNull<u64> = Global.allocate_one().unwrap();
/// // SAFETY: The slot was just allocated.
/// unsafe { Global.construct(ptr, 42) };
///
/// // SAFETY: Global allocated the object and will free it.
/// let handle = unsafe { SharedHandle::from_raw(ptr, Factory(Global)) };
/// assert_eq!(*handle, 42);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Factory<F>(pub F);

impl<T, F: ObjectFactory<T>> Disposer<T> for Factory<F> {
    fn dispose(self, ptr: NonNull<T>) {
        // SAFETY: Constructing the handle required the object to come from this factory.
        unsafe { self.0.delete_object(ptr) }
    }
}
