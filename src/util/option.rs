use std::hint;

pub(crate) trait OptionExtension<T> {
    /// Unwraps a value that the surrounding invariants guarantee to be present.
    ///
    /// # Safety
    /// The caller must ensure that `self` is [`Some`]. Debug builds check this with
    /// [`unreachable!`].
    unsafe fn unreachable(self) -> T;
}

impl<T> OptionExtension<T> for Option<T> {
    #[track_caller]
    unsafe fn unreachable(self) -> T {
        match self {
            Some(val) => val,
            None if cfg!(debug_assertions) => unreachable!(),
            // SAFETY: It is the responsibility of the caller to ensure that None is impossible when
            // invoking this method.
            None => unsafe { hint::unreachable_unchecked() },
        }
    }
}
