//! Raw operations on uninitialized memory.
//!
//! Every Rust value is trivially relocatable: moving it is a bitwise copy after which the source
//! is treated as uninitialized. The functions here lean on that. The only operations that can fail
//! part way are the ones that run user code (`Clone`, closures), and those roll back through a
//! [`DestructorProctor`], which destroys everything already constructed if a panic unwinds through
//! it.

use std::mem;
use std::ptr::{self, NonNull};

/// Moves `value` into the uninitialized slot at `ptr`.
///
/// # Safety
/// `ptr` must be valid for writes and properly aligned. Whatever was in the slot is overwritten
/// without being dropped.
pub const unsafe fn construct_at<T>(ptr: NonNull<T>, value: T) {
    // SAFETY: Upheld by the caller.
    unsafe { ptr.write(value) }
}

/// Drops the value at `ptr` in place.
///
/// # Safety
/// `ptr` must point to an initialized value, which must not be used afterwards.
pub unsafe fn destroy_at<T: ?Sized>(ptr: NonNull<T>) {
    // SAFETY: Upheld by the caller.
    unsafe { ptr::drop_in_place(ptr.as_ptr()) }
}

/// Drops `len` contiguous values starting at `ptr`.
///
/// # Safety
/// All `len` values must be initialized and must not be used afterwards.
pub unsafe fn destroy_range<T>(ptr: NonNull<T>, len: usize) {
    // SAFETY: Upheld by the caller.
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len)) }
}

/// Moves `len` values from `src` to `dst`. The ranges may overlap. Afterwards, the values live at
/// `dst` and the parts of `src` outside of `dst` are uninitialized.
///
/// # Safety
/// Both ranges must be valid for `len` values and `src` must be initialized.
pub const unsafe fn relocate<T>(src: NonNull<T>, dst: NonNull<T>, len: usize) {
    // SAFETY: Upheld by the caller.
    unsafe { ptr::copy(src.as_ptr(), dst.as_ptr(), len) }
}

/// Fills `len` uninitialized slots starting at `dst` with values produced by `f`.
///
/// If `f` panics, the values produced so far are dropped before the panic continues, so the range
/// is uninitialized again.
///
/// # Safety
/// `dst` must be valid for writes of `len` values.
pub unsafe fn uninitialized_fill_with<T, F: FnMut() -> T>(dst: NonNull<T>, len: usize, mut f: F) {
    // SAFETY: dst is valid for len writes, the proctor covers only what has been written.
    let mut proctor = unsafe { DestructorProctor::new(dst) };
    for i in 0..len {
        // SAFETY: i < len, which the caller guarantees to be in bounds.
        unsafe { dst.add(i).write(f()) }
        proctor.extend(1);
    }
    proctor.release();
}

/// Clones every value of `src` into the uninitialized range starting at `dst`.
///
/// If a clone panics, the clones made so far are dropped.
///
/// # Safety
/// `dst` must be valid for writes of `src.len()` values and must not overlap `src`.
pub unsafe fn uninitialized_clone_from<T: Clone>(src: &[T], dst: NonNull<T>) {
    // SAFETY: dst is valid for src.len() writes, the proctor covers only what has been written.
    let mut proctor = unsafe { DestructorProctor::new(dst) };
    for (i, value) in src.iter().enumerate() {
        // SAFETY: i < src.len(), which the caller guarantees to be in bounds.
        unsafe { dst.add(i).write(value.clone()) }
        proctor.extend(1);
    }
    proctor.release();
}

/// A guard over a growing run of constructed values. Unless it is
/// [`release`](DestructorProctor::release)d, dropping the proctor destroys the run.
#[must_use = "dropping a proctor destroys the values it guards"]
pub struct DestructorProctor<T> {
    begin: NonNull<T>,
    len: usize,
}

impl<T> DestructorProctor<T> {
    /// Creates a proctor guarding an empty run starting at `begin`.
    ///
    /// # Safety
    /// Whenever the proctor is dropped, the first [`len`](DestructorProctor::len) values starting
    /// at `begin` must be initialized and owned by nobody else.
    pub const unsafe fn new(begin: NonNull<T>) -> DestructorProctor<T> {
        DestructorProctor {
            begin,
            len: 0,
        }
    }

    /// The number of values currently guarded.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no values are guarded.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Takes the next `count` values, which have just been constructed, under guard.
    pub const fn extend(&mut self, count: usize) {
        self.len += count;
    }

    /// Gives up the guarded values without destroying them, returning how many there were.
    pub fn release(self) -> usize {
        let len = self.len;
        mem::forget(self);
        len
    }
}

impl<T> Drop for DestructorProctor<T> {
    fn drop(&mut self) {
        // SAFETY: Guaranteed by the contract of DestructorProctor::new.
        unsafe { destroy_range(self.begin, self.len) }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;

    use super::*;
    use crate::util::alloc::CountedDrop;
    use crate::util::panic::assert_panics;

    #[test]
    fn test_fill_rolls_back_on_panic() {
        let counter = CountedDrop::new(0);
        let mut slots: [MaybeUninit<CountedDrop>; 8] = [const { MaybeUninit::uninit() }; 8];
        let dst = NonNull::from(&mut slots).cast::<CountedDrop>();

        let mut made = 0;
        assert_panics!({
            // SAFETY: slots has room for 8 values.
            unsafe {
                uninitialized_fill_with(dst, 8, || {
                    if made == 5 {
                        panic!("constructor failure");
                    }
                    made += 1;
                    counter.clone()
                })
            }
        });

        assert_eq!(
            counter.take(),
            5,
            "The 5 values constructed before the panic should have been destroyed."
        );
    }

    #[test]
    fn test_clone_and_relocate() {
        let src = [String::from("a"), String::from("b"), String::from("c")];
        let mut slots: [MaybeUninit<String>; 4] = [const { MaybeUninit::uninit() }; 4];
        let dst = NonNull::from(&mut slots).cast::<String>();

        // SAFETY: slots has room for 4 values and doesn't overlap src.
        unsafe {
            uninitialized_clone_from(&src, dst);
            // Shift everything one slot to the right.
            relocate(dst, dst.add(1), 3);
            construct_at(dst, String::from("z"));
        }

        // SAFETY: All 4 slots are now initialized.
        let values: [String; 4] = unsafe { mem::transmute(slots) };
        assert_eq!(values, ["z", "a", "b", "c"]);
    }

    #[test]
    fn test_released_proctor_keeps_values() {
        let counter = CountedDrop::new(0);
        let mut slot = MaybeUninit::new(counter.clone());
        let ptr = NonNull::from(&mut slot).cast::<CountedDrop>();
        // SAFETY: slot is initialized.
        let mut proctor = unsafe { DestructorProctor::new(ptr) };
        proctor.extend(1);
        assert_eq!(proctor.release(), 1);
        assert_eq!(*counter.borrow(), 0, "A released proctor shouldn't destroy anything.");

        // SAFETY: Still initialized, as the proctor was released.
        unsafe { slot.assume_init_drop() };
        assert_eq!(*counter.borrow(), 1);
    }
}
