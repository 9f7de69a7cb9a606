//! This crate is my attempt at writing the core containers of a systems library on top of an
//! explicit memory layer, rather than on top of [`Vec`] and [`Box`].
//!
//! # Purpose
//! Every container here gets its memory from an [`Allocator`](memory::Allocator) that it owns, and
//! constructs and destroys its elements through the [`memory`] primitives. That makes it possible
//! to count, limit and fail allocations, which is how most of the tests check that containers don't
//! leak or corrupt themselves when an allocation fails halfway through an operation.
//!
//! # Contents
//! - [`memory`]: allocator policies and the primitives for constructing, destroying and moving
//!   values in raw memory.
//! - [`collections::deque`]: a double-ended queue stored in fixed-size blocks, so that elements
//!   never move once inserted at either end.
//! - [`collections::hash`]: a separately chained hash map and set with pluggable hashing, equality
//!   and load factor.
//! - [`shared`]: reference-counted handles with weak references, custom disposers and aliasing.
//!
//! # Error Handling
//! It is more ergonomic for most container methods to panic than to return a [`Result`] every time
//! they might allocate, so growth operations come in pairs. The plain form panics, the `try_` form
//! returns an error instead. Errors are strongly typed, using enums for static dispatch with
//! structs (often ZSTs) that implement [`Error`](std::error::Error).
//!
//! Containers give the strong guarantee wherever they can: if an insertion fails, the container is
//! left exactly as it was.
//!
//! # Logging
//! The crate doesn't log. Every failure is reported through the return value or a panic message.
//!
//! # Dependencies
//! This crate depends on `derive_more` for the derives on its error enums, since they remove the
//! need for some very repetitive programming.
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::missing_const_for_fn)]
#![warn(clippy::missing_panics_doc)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_inception)]

#[cfg(feature = "collections")]
pub mod collections;
pub mod memory;
#[cfg(feature = "shared")]
pub mod shared;

pub(crate) mod util;
