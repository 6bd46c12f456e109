//! Hierarchical grouping over a flat list
//!
//! A [`TreeList`] owns a source sequence and projects it into a tree:
//!
//! ```text
//!   source            rows (all expanded)
//!   "ABC"             A*
//!   "ABD"             AB*
//!   "AC"                ABC
//!                       ABD
//!                     AC
//! ```
//!
//! Each element's [`TreeFormat::path`] names its ancestors. Prefixes with no
//! element of their own become virtual nodes (`*`), which exist only while
//! they have children. Rows are the pre-order traversal of the tree, minus
//! the descendants of collapsed nodes.
//!
//! Every source edit is applied to the structure immediately; the resulting
//! row changes are collected and published as one [`crate::event::ListEvent`]
//! when the outermost transaction commits.

mod config;
mod expansion;
mod format;
mod list;
mod node;
mod structure;

pub use config::TreeListConfig;
pub use expansion::{ExpansionModel, ExpansionPolicy, PathExpansionModel};
pub use format::{CharacterFormat, DelimitedFormat, SiblingOrder, TreeFormat};
pub use list::TreeList;
pub use node::{NodeId, NodeKind, TreeRow};

use thiserror::Error;

use crate::event::EventError;
use crate::indexed::IndexedTreeError;

/// Errors returned by [`TreeList`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Row or source index outside the valid range.
    #[error("index {index} out of bounds for size {size}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of rows (or source elements) at the time.
        size: usize,
    },

    /// Row-level edit of a node that has no source element.
    #[error("row {index} is a virtual node; only real nodes can be edited by row")]
    VirtualNode {
        /// Row index of the virtual node.
        index: usize,
    },

    /// The format produced no segments for an element.
    #[error("format produced an empty path")]
    EmptyPath,

    /// The path is deeper than the configured maximum.
    #[error("path depth {depth} exceeds maximum {max}")]
    PathTooDeep {
        /// Number of segments in the rejected path.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Configuration rejected by [`TreeListConfig::validate`].
    #[error("invalid tree configuration: {0}")]
    InvalidConfiguration(String),

    /// Transaction bookkeeping failure.
    #[error(transparent)]
    Event(#[from] EventError),

    /// Failure in the underlying index.
    #[error(transparent)]
    Indexed(#[from] IndexedTreeError),
}
