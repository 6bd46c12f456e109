//! Change events
//!
//! Every mutation of a [`crate::TreeList`] is described to listeners as a
//! [`ListEvent`]: a batch of row-level inserts, updates and deletes.
//!
//! Within a batch the indices are non-decreasing and every change is valid
//! against the row count reached by applying the previous changes in order.
//! A row inserted or updated at index `i` is the final row `i`, so a
//! listener can replay a batch while reading rows from the finished list.

mod deltas;
mod listener;

pub use deltas::EventAssembler;
pub use listener::{ListenerFn, ListenerId, ListenerRegistry};

use std::fmt;

use thiserror::Error;

/// Errors from transaction bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// `commit_event` without a matching `begin_event`.
    #[error("commit without a matching begin")]
    NoTransaction,
}

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    /// A row appeared at the index.
    Insert,
    /// The row at the index changed in place.
    Update,
    /// The row at the index went away.
    Delete,
}

/// One row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListChange {
    /// Kind of change.
    pub kind: ChangeKind,
    /// Row index, valid at the point the change is applied.
    pub index: usize,
}

impl ListChange {
    /// Insert at `index`.
    pub fn insert(index: usize) -> Self {
        Self {
            kind: ChangeKind::Insert,
            index,
        }
    }

    /// Update at `index`.
    pub fn update(index: usize) -> Self {
        Self {
            kind: ChangeKind::Update,
            index,
        }
    }

    /// Delete at `index`.
    pub fn delete(index: usize) -> Self {
        Self {
            kind: ChangeKind::Delete,
            index,
        }
    }
}

impl fmt::Display for ListChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            ChangeKind::Insert => '+',
            ChangeKind::Update => '~',
            ChangeKind::Delete => '-',
        };
        write!(f, "{tag}{}", self.index)
    }
}

/// An ordered batch of changes published at the end of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListEvent {
    changes: Vec<ListChange>,
}

impl ListEvent {
    /// Wrap an already ordered change list.
    pub fn new(changes: Vec<ListChange>) -> Self {
        Self { changes }
    }

    /// The changes, in application order.
    pub fn changes(&self) -> &[ListChange] {
        &self.changes
    }

    /// Iterator over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, ListChange> {
        self.changes.iter()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True when the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Count of changes of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|change| change.kind == kind).count()
    }

    /// Net change in row count.
    pub fn size_delta(&self) -> isize {
        self.count(ChangeKind::Insert) as isize - self.count(ChangeKind::Delete) as isize
    }
}

impl fmt::Display for ListEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (position, change) in self.changes.iter().enumerate() {
            if position > 0 {
                write!(f, " ")?;
            }
            write!(f, "{change}")?;
        }
        write!(f, "]")
    }
}

impl<'a> IntoIterator for &'a ListEvent {
    type Item = &'a ListChange;
    type IntoIter = std::slice::Iter<'a, ListChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
