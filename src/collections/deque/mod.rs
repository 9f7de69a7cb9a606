//! A module containing [`Deque`] and its associated types.
//!
//! A [`Deque`] stores its elements in fixed-size blocks, addressed through a directory of block
//! pointers. Besides the borrowed and owned iterators, the module provides [`Cursor`], a
//! random-access position that supports offset arithmetic and distances.

mod block;
mod cursor;
mod deque;
mod iter;
mod tests;

pub use block::block_len;
pub use cursor::Cursor;
pub use deque::*;
pub use iter::*;
