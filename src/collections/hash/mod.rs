//! Hash-based collections with separate chaining and pluggable hashing and equality.

pub mod map;
pub mod policy;
pub mod set;

#[doc(inline)]
pub use map::HashMap;
#[doc(inline)]
pub use policy::{DefaultEqual, FnEqual, FnHasher, KeyEqual, KeyHasher};
#[doc(inline)]
pub use set::HashSet;
