use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// The error produced when a handle is requested for an object that isn't owned by any
/// [`SharedHandle`](super::SharedHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadWeakHandle;

impl Display for BadWeakHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "The object isn't owned by a SharedHandle!")
    }
}

impl Error for BadWeakHandle {}

/// The error produced when an empty [`SharedHandle`](super::SharedHandle) is dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyHandle;

impl Display for EmptyHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Attempted to dereference an empty SharedHandle!")
    }
}

impl Error for EmptyHandle {}
