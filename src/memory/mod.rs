//! The layers every container is built on: an [`Allocator`] policy deciding where memory comes
//! from, and the [`primitives`] that construct, destroy and move values inside that memory.
//!
//! # Propagation
//! Allocators are values, and containers keep the allocator they were created with. When two
//! containers exchange contents (`swap`, `assign_from`, `clone_from`), the three propagation
//! constants of the destination's allocator decide whether it adopts the source's allocator or
//! keeps its own. A container that keeps an allocator which compares unequal to the source's moves
//! the elements one by one into its own memory, since neither allocator can free what the other
//! allocated.

pub mod allocator;
pub mod primitives;

#[doc(inline)]
pub use allocator::{AllocError, Allocator, Global, ObjectFactory};
#[doc(inline)]
pub use primitives::DestructorProctor;
#[doc(inline)]
pub use crate::util::error::{CapacityOverflow, ReserveError};
