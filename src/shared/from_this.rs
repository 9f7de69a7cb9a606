use std::fmt::{self, Debug, Formatter};
use std::sync::OnceLock;

use super::{BadWeakHandle, SharedHandle, WeakHandle};

/// A slot, embedded in an object, that remembers the group of [`SharedHandle`]s owning the object.
///
/// The slot is filled when the object is handed to [`SharedHandle::new_enabled`] or
/// [`SharedHandle::from_box_enabled`]. Only the first registration counts, later ones are ignored.
/// Cloning the object gives the clone an empty slot, since the clone isn't owned by the same group.
pub struct SharedFromThis<T: ?Sized> {
    weak: OnceLock<WeakHandle<T>>,
}

impl<T: ?Sized> SharedFromThis<T> {
    pub const fn new() -> SharedFromThis<T> {
        SharedFromThis {
            weak: OnceLock::new(),
        }
    }

    /// Returns a new strong handle to the object.
    ///
    /// # Errors
    /// Returns [`BadWeakHandle`] if the object was never registered, or if its last strong handle
    /// has already been dropped.
    pub fn lock(&self) -> Result<SharedHandle<T>, BadWeakHandle> {
        let handle = self.weak.get().map(WeakHandle::lock).unwrap_or_default();
        if handle.is_empty() {
            Err(BadWeakHandle)
        } else {
            Ok(handle)
        }
    }

    /// Returns a weak handle to the object, which is empty if it was never registered.
    pub fn weak(&self) -> WeakHandle<T> {
        self.weak.get().cloned().unwrap_or_default()
    }

    pub(crate) fn register(&self, handle: &SharedHandle<T>) {
        let _ = self.weak.set(handle.downgrade());
    }
}

impl<T: ?Sized> Clone for SharedFromThis<T> {
    fn clone(&self) -> Self {
        SharedFromThis::new()
    }
}

impl<T: ?Sized> Default for SharedFromThis<T> {
    fn default() -> Self {
        SharedFromThis::new()
    }
}

impl<T: ?Sized> Debug for SharedFromThis<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFromThis")
            .field("registered", &self.weak.get().is_some())
            .finish()
    }
}

/// Objects that can produce [`SharedHandle`]s to themselves.
///
/// # Examples
/// ```
/// # use core_containers::shared::{EnableSharedFromThis, SharedFromThis, SharedHandle};
/// struct Session {
///     id: u32,
///     this: SharedFromThis<Session>,
/// }
///
/// impl EnableSharedFromThis for Session {
///     fn shared_from_this_slot(&self) -> &SharedFromThis<Self> {
///         &self.this
///     }
/// }
///
/// let session = SharedHandle::new_enabled(Session { id: 3, this: SharedFromThis::new() });
/// let again = session.shared_from_this().unwrap();
/// assert_eq!(again.id, 3);
/// assert_eq!(session.use_count(), 2);
/// ```
pub trait EnableSharedFromThis {
    fn shared_from_this_slot(&self) -> &SharedFromThis<Self>;

    /// Returns a new strong handle to `self`.
    ///
    /// # Errors
    /// Returns [`BadWeakHandle`] if `self` isn't owned by a group of [`SharedHandle`]s that it was
    /// registered with.
    fn shared_from_this(&self) -> Result<SharedHandle<Self>, BadWeakHandle> {
        self.shared_from_this_slot().lock()
    }

    /// Returns a weak handle to `self`, which is empty if `self` was never registered.
    fn weak_from_this(&self) -> WeakHandle<Self> {
        self.shared_from_this_slot().weak()
    }
}
