//! Allocator-aware collection types.
//!
//! # Purpose
//! The sequence and associative containers here are built directly on the [`memory`](crate::memory)
//! layer: every allocation goes through the container's [`Allocator`](crate::memory::Allocator) and
//! every element is constructed and destroyed through the primitives.
//!
//! # Errors
//! Growth operations come in pairs. The `try_` form returns a [`ReserveError`], the plain form
//! panics with the same message.

#[cfg(feature = "deque")]
pub mod deque;
#[cfg(feature = "hash")]
pub mod hash;

#[doc(inline)]
pub use crate::util::error::{CapacityOverflow, IndexOutOfBounds, ReserveError};
#[doc(inline)]
pub use crate::memory::AllocError;
