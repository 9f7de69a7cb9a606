//! [`HashSet`], a [`HashMap`](super::HashMap) of keys without values, and its iterators.
//!
//! The set shares the map's chain, buckets and load factor rules, so everything documented there
//! about rehashing and address stability holds for elements of a set too. Besides owned, draining
//! and borrowed iteration, the lazy set operations ([`Difference`], [`Intersection`],
//! [`SymmetricDifference`] and [`Union`]) are iterators that look elements up in the other set as
//! they go.
//!
//! Elements can't be mutated in place, since that could change their hash.

mod hash_set;
mod iter;
mod tests;

pub use hash_set::*;
pub use iter::*;
