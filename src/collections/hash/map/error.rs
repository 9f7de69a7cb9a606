use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// The error produced when a lookup that requires the key to be present doesn't find it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotFound;

impl Display for KeyNotFound {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "No entry found for the requested key!")
    }
}

impl Error for KeyNotFound {}
