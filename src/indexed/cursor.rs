//! Iteration over an [`IndexedTree`].

use std::iter::FusedIterator;

use super::{IndexedTree, IndexedTreeError};

/// Borrowing in-order iterator, walking successor links.
#[derive(Debug)]
pub struct Iter<'a, V> {
    tree: &'a IndexedTree<V>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(super) fn new(tree: &'a IndexedTree<V>) -> Self {
        Self {
            tree,
            front: tree.first_slot(),
            back: tree.last_slot(),
            remaining: tree.len(),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        self.remaining -= 1;
        self.front = self.tree.successor(slot);
        Some(self.tree.slot_value(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        self.remaining -= 1;
        self.back = self.tree.predecessor(slot);
        Some(self.tree.slot_value(slot))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a IndexedTree<V> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Bidirectional editing cursor.
///
/// The cursor sits *between* entries: `next_index()` is the position the
/// next call to [`Cursor::next`] returns. [`Cursor::remove`] deletes the
/// entry returned by the most recent `next` or `previous` call, so removal
/// during a walk never skips or repeats entries.
#[derive(Debug)]
pub struct Cursor<'a, V> {
    tree: &'a mut IndexedTree<V>,
    index: usize,
    last_returned: Option<usize>,
}

impl<'a, V> Cursor<'a, V> {
    pub(super) fn new(tree: &'a mut IndexedTree<V>, index: usize) -> Self {
        Self {
            tree,
            index,
            last_returned: None,
        }
    }

    /// Whether `next` would return a value.
    pub fn has_next(&self) -> bool {
        self.index < self.tree.len()
    }

    /// Whether `previous` would return a value.
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// Position returned by the next call to `next`.
    pub fn next_index(&self) -> usize {
        self.index
    }

    /// Position returned by the next call to `previous`, if any.
    pub fn previous_index(&self) -> Option<usize> {
        self.index.checked_sub(1)
    }

    /// Step forward and return the value passed over.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&V> {
        if !self.has_next() {
            return None;
        }
        let index = self.index;
        self.index += 1;
        self.last_returned = Some(index);
        self.tree.get(index)
    }

    /// Step backward and return the value passed over.
    pub fn previous(&mut self) -> Option<&V> {
        let index = self.previous_index()?;
        self.index = index;
        self.last_returned = Some(index);
        self.tree.get(index)
    }

    /// Remove the value most recently returned by `next` or `previous`.
    pub fn remove(&mut self) -> Result<V, IndexedTreeError> {
        let Some(index) = self.last_returned.take() else {
            return Err(IndexedTreeError::NoCurrentElement);
        };
        let value = self.tree.remove_at(index)?;
        if index < self.index {
            self.index -= 1;
        }
        Ok(value)
    }
}
