//! # Observable tree projection of a flat list
//!
//! `treelist` groups a flat, ordered sequence of elements into a hierarchy
//! and keeps it current while the sequence is edited. Every element names
//! its ancestry through a [`TreeFormat`]; missing ancestors are synthesized
//! as virtual nodes, and the visible rows (pre-order, minus the descendants
//! of collapsed nodes) are published to listeners as batches of
//! [`ListChange`]s.
//!
//! ## Building blocks
//!
//! 1. [`indexed`]: an order-statistic AVL tree with stable handles and
//!    per-entry visibility, used for both the source and the row index
//! 2. [`event`]: nested transactions folding row edits into one ordered batch
//! 3. [`tree`]: the grouping engine itself
//!
//! ## Usage Example
//!
//! ```
//! use treelist::{CharacterFormat, ExpansionPolicy, TreeList};
//!
//! let mut tree = TreeList::from_source(
//!     ["ABC", "ABD", "AC"],
//!     CharacterFormat::new(),
//!     ExpansionPolicy::Expanded,
//! )?;
//! let rows: Vec<String> = tree.rows().map(|row| row.path().iter().collect()).collect();
//! assert_eq!(rows, ["A", "AB", "ABC", "ABD", "AC"]);
//!
//! tree.set_expanded(1, false)?;
//! assert_eq!(tree.len(), 3);
//! # Ok::<(), treelist::TreeError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod event;   // Change batches and transactions
pub mod indexed; // Order-statistic tree
pub mod tree;    // Grouping engine

// Re-exports for convenience
pub use event::{ChangeKind, EventError, ListChange, ListEvent, ListenerId};
pub use indexed::{IndexedTree, IndexedTreeError, NodeRef};
pub use tree::{
    CharacterFormat, DelimitedFormat, ExpansionModel, ExpansionPolicy, NodeKind,
    PathExpansionModel, SiblingOrder, TreeError, TreeFormat, TreeList, TreeListConfig, TreeRow,
};
