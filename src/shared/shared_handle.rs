use std::borrow::Borrow;
use std::fmt::{self, Debug, Display, Formatter, Pointer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use super::control::{self, ControlBlock, Parts, Representation};
use super::{Disposer, EmptyHandle, EnableSharedFromThis, Ownership, WeakHandle};
use crate::memory::{AllocError, Allocator, Global};
use crate::util::result::ResultExtension;

/// A reference-counted handle to a shared object.
///
/// Cloning a SharedHandle adds a strong reference, dropping one removes it. When the last strong
/// reference goes, the object is disposed of, and once the last [`WeakHandle`] goes as well, the
/// control block that holds the counts is freed. Counts are atomic, so handles to the same object
/// can be cloned and dropped from any thread.
///
/// How the object is stored depends on the constructor, see [`Representation`]:
/// - [`new`](SharedHandle::new) and [`new_in`](SharedHandle::new_in) store the object inside the
///   control block, in a single allocation. The memory is only freed with the last weak handle.
/// - [`from_box`](SharedHandle::from_box) adopts a boxed object.
/// - [`from_raw`](SharedHandle::from_raw) takes any pointer along with a [`Disposer`].
/// - [`from_static`](SharedHandle::from_static) shares an object that is never disposed of.
///
/// A handle may also be empty, in which case it owns nothing and [`use_count`] is 0. Dereferencing
/// an empty handle panics, [`get`](SharedHandle::get) is the checked alternative.
///
/// Equality and hashing look at the address of the exposed object, not at its value. An aliasing
/// handle (see [`map`](SharedHandle::map)) may expose a different address than the handles it
/// shares ownership with, use [`Ownership`] to compare owners.
///
/// [`use_count`]: SharedHandle::use_count
pub struct SharedHandle<T: ?Sized> {
    pub(crate) parts: Option<Parts<T>>,
    pub(crate) _phantom: PhantomData<T>,
}

impl<T> SharedHandle<T> {
    /// Creates a handle to `value`, stored together with the counts in a single allocation.
    ///
    /// # Panics
    /// Panics if the allocation fails.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::shared::SharedHandle;
    /// let handle = SharedHandle::new(5);
    /// let other = handle.clone();
    /// assert_eq!(*other, 5);
    /// assert_eq!(handle.use_count(), 2);
    /// ```
    pub fn new(value: T) -> SharedHandle<T> {
        SharedHandle::try_new(value).throw()
    }

    /// Creates a handle to `value`, stored together with the counts in a single allocation.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the allocation fails. The value is dropped.
    pub fn try_new(value: T) -> Result<SharedHandle<T>, AllocError> {
        let (ctrl, ptr) = control::in_place(value, Global)?;
        Ok(SharedHandle::from_parts(ptr, ctrl))
    }

    /// Creates a handle to `value`, stored together with the counts in memory from `alloc`.
    ///
    /// # Panics
    /// Panics if the allocation fails.
    pub fn new_in<A: Allocator + Send + 'static>(value: T, alloc: A) -> SharedHandle<T> {
        SharedHandle::try_new_in(value, alloc).throw()
    }

    /// Creates a handle to `value`, stored together with the counts in memory from `alloc`.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the allocation fails. The value is dropped.
    pub fn try_new_in<A: Allocator + Send + 'static>(
        value: T,
        alloc: A,
    ) -> Result<SharedHandle<T>, AllocError> {
        let (ctrl, ptr) = control::in_place(value, alloc)?;
        Ok(SharedHandle::from_parts(ptr, ctrl))
    }

    /// Creates a handle to `value` like [`new`](SharedHandle::new), and registers it with the
    /// value's [`SharedFromThis`](super::SharedFromThis) slot.
    ///
    /// # Panics
    /// Panics if the allocation fails.
    pub fn new_enabled(value: T) -> SharedHandle<T>
    where
        T: EnableSharedFromThis,
    {
        let handle = SharedHandle::new(value);
        handle.enable();
        handle
    }
}

impl<T: ?Sized> SharedHandle<T> {
    /// Creates an empty handle, which owns nothing.
    pub const fn empty() -> SharedHandle<T> {
        SharedHandle {
            parts: None,
            _phantom: PhantomData,
        }
    }

    /// Takes ownership of a boxed object.
    ///
    /// # Panics
    /// Panics if the control block can't be allocated. The object is dropped first.
    pub fn from_box(value: Box<T>) -> SharedHandle<T> {
        SharedHandle::try_from_box(value).throw()
    }

    /// Takes ownership of a boxed object.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the control block can't be allocated. The object is dropped.
    pub fn try_from_box(value: Box<T>) -> Result<SharedHandle<T>, AllocError> {
        let ptr = NonNull::from(Box::leak(value));
        let disposer = |ptr: NonNull<T>| {
            // SAFETY: The pointer came from Box::leak and is disposed of once.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) })
        };
        // SAFETY: Rebuilding the box is exactly how a leaked box is released.
        unsafe { SharedHandle::try_out_of_place(ptr, disposer, Global, Representation::Adopted) }
    }

    /// Takes ownership of a boxed object like [`from_box`](SharedHandle::from_box), and registers
    /// the handle with the object's [`SharedFromThis`](super::SharedFromThis) slot.
    ///
    /// # Panics
    /// Panics if the control block can't be allocated.
    pub fn from_box_enabled(value: Box<T>) -> SharedHandle<T>
    where
        T: EnableSharedFromThis,
    {
        let handle = SharedHandle::from_box(value);
        handle.enable();
        handle
    }

    /// Takes ownership of the object at `ptr`, which `disposer` destroys once the last strong
    /// handle is dropped.
    ///
    /// # Panics
    /// Panics if the control block can't be allocated, after running `disposer` on `ptr`.
    ///
    /// # Safety
    /// `ptr` must stay valid for reads until `disposer` is run on it, and running `disposer` on
    /// `ptr` once must be sound.
    pub unsafe fn from_raw<D>(ptr: NonNull<T>, disposer: D) -> SharedHandle<T>
    where
        D: Disposer<T> + Send + 'static,
    {
        // SAFETY: Forwarded to the caller.
        unsafe { SharedHandle::try_from_raw_in(ptr, disposer, Global).throw() }
    }

    /// Takes ownership of the object at `ptr`, which `disposer` destroys once the last strong
    /// handle is dropped.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the control block can't be allocated, after running `disposer`
    /// on `ptr`.
    ///
    /// # Safety
    /// See [`from_raw`](SharedHandle::from_raw).
    pub unsafe fn try_from_raw<D>(
        ptr: NonNull<T>,
        disposer: D,
    ) -> Result<SharedHandle<T>, AllocError>
    where
        D: Disposer<T> + Send + 'static,
    {
        // SAFETY: Forwarded to the caller.
        unsafe { SharedHandle::try_from_raw_in(ptr, disposer, Global) }
    }

    /// Takes ownership of the object at `ptr`, allocating the control block from `alloc`.
    ///
    /// # Panics
    /// Panics if the control block can't be allocated, after running `disposer` on `ptr`.
    ///
    /// # Safety
    /// See [`from_raw`](SharedHandle::from_raw).
    pub unsafe fn from_raw_in<D, A>(ptr: NonNull<T>, disposer: D, alloc: A) -> SharedHandle<T>
    where
        D: Disposer<T> + Send + 'static,
        A: Allocator + Send + 'static,
    {
        // SAFETY: Forwarded to the caller.
        unsafe { SharedHandle::try_from_raw_in(ptr, disposer, alloc).throw() }
    }

    /// Takes ownership of the object at `ptr`, allocating the control block from `alloc`.
    ///
    /// # Errors
    /// Returns an [`AllocError`] if the control block can't be allocated. In that case `disposer`
    /// has already been run on `ptr`, so the object doesn't leak.
    ///
    /// # Safety
    /// See [`from_raw`](SharedHandle::from_raw).
    pub unsafe fn try_from_raw_in<D, A>(
        ptr: NonNull<T>,
        disposer: D,
        alloc: A,
    ) -> Result<SharedHandle<T>, AllocError>
    where
        D: Disposer<T> + Send + 'static,
        A: Allocator + Send + 'static,
    {
        // SAFETY: Forwarded to the caller.
        unsafe { SharedHandle::try_out_of_place(ptr, disposer, alloc, Representation::OutOfPlace) }
    }

    /// Creates a handle to an object that outlives every handle, and is never disposed of.
    ///
    /// # Panics
    /// Panics if the control block can't be allocated.
    pub fn from_static(value: &'static T) -> SharedHandle<T> {
        let disposer = |_: NonNull<T>| {};
        // SAFETY: Doing nothing is always a sound way to dispose of a static object.
        unsafe {
            SharedHandle::try_out_of_place(
                NonNull::from(value),
                disposer,
                Global,
                Representation::Unmanaged,
            )
            .throw()
        }
    }

    /// Creates a handle that shares ownership with `self` but exposes `ptr`. The counts keep the
    /// object owned by `self` alive, not whatever `ptr` points to. Aliasing an empty handle gives
    /// an empty handle.
    ///
    /// See [`map`](SharedHandle::map) for a safe alternative when `ptr` points into the object.
    ///
    /// # Safety
    /// `ptr` must stay valid for reads for as long as the object owned by `self` is alive.
    pub unsafe fn alias<U: ?Sized>(&self, ptr: NonNull<U>) -> SharedHandle<U> {
        match self.parts {
            Some(parts) => {
                parts.control().acquire_strong();
                SharedHandle::from_parts(ptr, parts.ctrl)
            },
            None => SharedHandle::empty(),
        }
    }

    /// Turns the handle into one that exposes a part of the object, such as a field, while still
    /// owning the whole object.
    ///
    /// # Examples
    /// ```
    /// # use core_containers::shared::SharedHandle;
    /// let pair = SharedHandle::new((String::from("key"), 11));
    /// let value = pair.clone().map(|(_, value)| value);
    /// drop(pair);
    /// assert_eq!(*value, 11);
    /// ```
    pub fn map<U: ?Sized, F: FnOnce(&T) -> &U>(self, f: F) -> SharedHandle<U> {
        let Some(parts) = self.parts else {
            return SharedHandle::empty();
        };
        // SAFETY: The object is alive while self holds its count.
        let ptr = NonNull::from(f(unsafe { parts.ptr.as_ref() }));
        // The count moves into the new handle.
        mem::forget(self);
        SharedHandle::from_parts(ptr, parts.ctrl)
    }

    /// Returns a reference to the object, or [`None`] if the handle is empty.
    pub const fn get(&self) -> Option<&T> {
        match self.parts {
            // SAFETY: The object is alive while self holds its count.
            Some(parts) => Some(unsafe { parts.ptr.as_ref() }),
            None => None,
        }
    }

    /// Returns the exposed pointer, or [`None`] if the handle is empty.
    pub const fn as_ptr(&self) -> Option<NonNull<T>> {
        match self.parts {
            Some(parts) => Some(parts.ptr),
            None => None,
        }
    }

    /// Returns the number of strong handles sharing the object, 0 for an empty handle.
    pub fn use_count(&self) -> usize {
        self.parts.map_or(0, |parts| parts.control().strong())
    }

    /// Returns the number of weak handles to the object.
    pub fn weak_count(&self) -> usize {
        self.parts.map_or(0, |parts| parts.control().weak())
    }

    /// Returns true if this is the only strong handle to the object.
    pub fn is_unique(&self) -> bool {
        self.use_count() == 1
    }

    pub const fn is_empty(&self) -> bool {
        self.parts.is_none()
    }

    /// Returns the kind of control block backing the handle, or [`None`] if it is empty.
    pub fn representation(&self) -> Option<Representation> {
        self.parts.map(|parts| parts.control().representation())
    }

    /// Releases the handle's reference, leaving it empty.
    pub fn reset(&mut self) {
        *self = SharedHandle::empty();
    }

    pub fn swap(&mut self, other: &mut SharedHandle<T>) {
        mem::swap(self, other);
    }

    /// Creates a weak handle to the object, which doesn't keep it alive.
    pub fn downgrade(&self) -> WeakHandle<T> {
        if let Some(parts) = self.parts {
            parts.control().acquire_weak();
        }
        WeakHandle {
            parts: self.parts,
            _phantom: PhantomData,
        }
    }

    /// Returns true if both handles expose the same address. Two empty handles are equal.
    pub fn ptr_eq(this: &SharedHandle<T>, other: &SharedHandle<T>) -> bool {
        match (this.parts, other.parts) {
            (Some(a), Some(b)) => ptr::addr_eq(a.ptr.as_ptr(), b.ptr.as_ptr()),
            (None, None) => true,
            _ => false,
        }
    }

    pub(crate) const fn from_parts(
        ptr: NonNull<T>,
        ctrl: NonNull<ControlBlock>,
    ) -> SharedHandle<T> {
        SharedHandle {
            parts: Some(Parts {
                ptr,
                ctrl,
            }),
            _phantom: PhantomData,
        }
    }

    /// # Safety
    /// Running `disposer` on `ptr` once must be sound, and `ptr` must stay valid until then.
    unsafe fn try_out_of_place<D: Disposer<T>, A: Allocator>(
        ptr: NonNull<T>,
        disposer: D,
        alloc: A,
        representation: Representation,
    ) -> Result<SharedHandle<T>, AllocError> {
        // SAFETY: Forwarded to the caller.
        let ctrl = unsafe { control::out_of_place(ptr, disposer, alloc, representation)? };
        Ok(SharedHandle::from_parts(ptr, ctrl))
    }

    fn enable(&self)
    where
        T: EnableSharedFromThis,
    {
        if let Some(value) = self.get() {
            value.shared_from_this_slot().register(self);
        }
    }
}

impl<T: ?Sized> Ownership for SharedHandle<T> {
    fn owner_ptr(&self) -> *const () {
        self.parts
            .map_or(ptr::null(), |parts| parts.ctrl.as_ptr().cast_const().cast())
    }
}

impl<T: ?Sized> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        if let Some(parts) = self.parts {
            parts.control().acquire_strong();
        }
        SharedHandle {
            parts: self.parts,
            _phantom: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for SharedHandle<T> {
    fn drop(&mut self) {
        if let Some(parts) = self.parts.take() {
            // SAFETY: The handle owned a strong reference, which is given up here.
            unsafe { ControlBlock::release_strong(parts.ctrl) }
        }
    }
}

impl<T: ?Sized> Default for SharedHandle<T> {
    fn default() -> Self {
        SharedHandle::empty()
    }
}

impl<T: ?Sized> Deref for SharedHandle<T> {
    type Target = T;

    /// # Panics
    /// Panics with [`EmptyHandle`] if the handle is empty.
    fn deref(&self) -> &Self::Target {
        self.get().ok_or(EmptyHandle).throw()
    }
}

impl<T: ?Sized> AsRef<T> for SharedHandle<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized> Borrow<T> for SharedHandle<T> {
    fn borrow(&self) -> &T {
        self
    }
}

impl<T> From<T> for SharedHandle<T> {
    fn from(value: T) -> Self {
        SharedHandle::new(value)
    }
}

impl<T: ?Sized> From<Box<T>> for SharedHandle<T> {
    fn from(value: Box<T>) -> Self {
        SharedHandle::from_box(value)
    }
}

impl<T: ?Sized> PartialEq for SharedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        SharedHandle::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Eq for SharedHandle<T> {}

impl<T: ?Sized> Hash for SharedHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ptr().map(NonNull::cast::<()>).hash(state)
    }
}

impl<T: ?Sized + Debug> Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("value", &self.get())
            .field("use_count", &self.use_count())
            .field("representation", &self.representation())
            .finish()
    }
}

impl<T: ?Sized + Display> Display for SharedHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => Display::fmt(value, f),
            None => write!(f, "null"),
        }
    }
}

impl<T: ?Sized> Pointer for SharedHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.as_ptr() {
            Some(ptr) => Pointer::fmt(&ptr, f),
            None => Pointer::fmt(&ptr::null::<()>(), f),
        }
    }
}

// SAFETY: Handles on other threads share the object and may drop it, like an Arc.
unsafe impl<T: ?Sized + Send + Sync> Send for SharedHandle<T> {}
// SAFETY: As above.
unsafe impl<T: ?Sized + Send + Sync> Sync for SharedHandle<T> {}
