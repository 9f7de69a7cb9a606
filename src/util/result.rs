use std::error::Error;

pub(crate) trait ResultExtension<T, E: Error> {
    /// Unwraps the [`Ok`] value, panicking with the [`Display`](std::fmt::Display) message of the
    /// error otherwise. This is what the non-`try` form of every fallible container method boils
    /// down to.
    ///
    /// # Panics
    /// Panics if the [`Result`] is an [`Err`].
    fn throw(self) -> T;
}

impl<T, E: Error> ResultExtension<T, E> for Result<T, E> {
    #[track_caller]
    fn throw(self) -> T {
        match self {
            Ok(val) => val,
            Err(error) => panic!("{error}"),
        }
    }
}
