//! Reference-counted ownership of objects that outlive any single owner.
//!
//! A [`SharedHandle`] owns its object together with every clone of itself, and a [`WeakHandle`]
//! observes it without keeping it alive. The counts live in a control block allocated next to (or
//! around) the object, which also knows how to dispose of it. The counts are atomic, so handles can
//! be sent between threads whenever the object itself is [`Send`] and [`Sync`].
//!
//! Beyond what [`Arc`](std::sync::Arc) offers, handles can:
//! - take ownership of any pointer with a custom [`Disposer`],
//! - alias a part of the object they own (see [`SharedHandle::map`]),
//! - be compared by owner rather than by address (see [`Ownership`]),
//! - be recovered from inside the object through [`EnableSharedFromThis`].

pub(crate) mod control;
mod disposer;
mod error;
mod from_this;
mod ownership;
mod shared_handle;
mod tests;
mod weak_handle;

pub use control::Representation;
pub use disposer::*;
pub use error::*;
pub use from_this::*;
pub use ownership::*;
pub use shared_handle::*;
pub use weak_handle::*;
