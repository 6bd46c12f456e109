//! Indexed balanced tree
//!
//! An AVL tree stored in an arena. Every entry carries the size of its
//! subtree, plus the number of *visible* entries in it, so that both
//! "entry at position i" and "position of entry" run in O(log n).
//!
//! Entries are addressed by [`NodeRef`] handles which stay valid across
//! rotations until the entry itself is removed.

mod cursor;
mod tree;

pub use cursor::{Cursor, Iter};
pub use tree::{IndexedTree, NodeRef};

use thiserror::Error;

/// Errors returned by [`IndexedTree`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexedTreeError {
    /// Position outside `0..len` (or `0..=len` for insertion).
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested position.
        index: usize,
        /// Length of the tree at the time of the request.
        len: usize,
    },

    /// Comparator-driven operation on a tree built without a comparator.
    #[error("operation requires a comparator but the tree is unordered")]
    Unordered,

    /// Positional insert into a tree that keeps comparator order.
    #[error("positional insert is not allowed on an ordered tree")]
    Ordered,

    /// Cursor removal without a preceding `next` or `previous`.
    #[error("cursor has no current element to remove")]
    NoCurrentElement,
}
