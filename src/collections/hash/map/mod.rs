//! [`HashMap`], its iterators and cursor, and the [`KeyNotFound`] error returned by
//! [`HashMap::at`].
//!
//! Every entry lives in its own node, linked into a single chain that runs through all buckets.
//! Iteration follows the chain, so it visits the entries bucket by bucket.

mod cursor;
mod error;
mod hash_map;
mod iter;
mod node;

pub use cursor::*;
pub use error::*;
pub use hash_map::*;
pub use iter::*;
