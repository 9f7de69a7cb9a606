use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::mem;
use std::ptr;

use super::control::{ControlBlock, Parts};
use super::{Ownership, SharedHandle};

/// A non-owning handle to an object shared by [`SharedHandle`]s.
///
/// A WeakHandle keeps the control block alive, but not the object. Use [`lock`](WeakHandle::lock)
/// to get a strong handle to the object, if it still exists.
///
/// # Examples
/// ```
/// # use core_containers::shared::SharedHandle;
/// let strong = SharedHandle::new(String::from("shared"));
/// let weak = strong.downgrade();
/// assert_eq!(weak.lock().get().map(String::as_str), Some("shared"));
///
/// drop(strong);
/// assert!(weak.expired());
/// assert!(weak.lock().is_empty());
/// ```
pub struct WeakHandle<T: ?Sized> {
    pub(crate) parts: Option<Parts<T>>,
    pub(crate) _phantom: PhantomData<T>,
}

impl<T: ?Sized> WeakHandle<T> {
    /// Creates an empty weak handle, which never locks to anything.
    pub const fn new() -> WeakHandle<T> {
        WeakHandle {
            parts: None,
            _phantom: PhantomData,
        }
    }

    /// Creates a strong handle to the object if it is still alive, or an empty handle otherwise.
    /// The check and the increment are a single atomic step, so a handle returned here is never to
    /// a disposed object, even if the last strong handle is being dropped concurrently.
    pub fn lock(&self) -> SharedHandle<T> {
        match self.parts {
            Some(parts) if parts.control().try_acquire_strong() => {
                SharedHandle::from_parts(parts.ptr, parts.ctrl)
            },
            _ => SharedHandle::empty(),
        }
    }

    /// Returns true if the object has been disposed of, or the handle is empty.
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// Returns the number of strong handles to the object.
    pub fn use_count(&self) -> usize {
        self.parts.map_or(0, |parts| parts.control().strong())
    }

    /// Returns the number of weak handles to the object, including this one.
    pub fn weak_count(&self) -> usize {
        self.parts.map_or(0, |parts| parts.control().weak())
    }

    pub fn reset(&mut self) {
        *self = WeakHandle::new();
    }

    pub fn swap(&mut self, other: &mut WeakHandle<T>) {
        mem::swap(self, other);
    }
}

impl<T: ?Sized> Ownership for WeakHandle<T> {
    fn owner_ptr(&self) -> *const () {
        self.parts
            .map_or(ptr::null(), |parts| parts.ctrl.as_ptr().cast_const().cast())
    }
}

impl<T: ?Sized> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        if let Some(parts) = self.parts {
            parts.control().acquire_weak();
        }
        WeakHandle {
            parts: self.parts,
            _phantom: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for WeakHandle<T> {
    fn drop(&mut self) {
        if let Some(parts) = self.parts.take() {
            // SAFETY: The handle owned a weak reference, which is given up here.
            unsafe { ControlBlock::release_weak(parts.ctrl) }
        }
    }
}

impl<T: ?Sized> Default for WeakHandle<T> {
    fn default() -> Self {
        WeakHandle::new()
    }
}

impl<T: ?Sized> From<&SharedHandle<T>> for WeakHandle<T> {
    fn from(value: &SharedHandle<T>) -> Self {
        value.downgrade()
    }
}

impl<T: ?Sized> Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("use_count", &self.use_count())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}

// SAFETY: A weak handle can be locked into a SharedHandle on any thread.
unsafe impl<T: ?Sized + Send + Sync> Send for WeakHandle<T> {}
// SAFETY: As above.
unsafe impl<T: ?Sized + Send + Sync> Sync for WeakHandle<T> {}
