use std::cmp::Ordering;
use std::fmt;

use super::{Cursor, IndexedTreeError, Iter};

/// Ordering function used by ordered trees.
pub type Comparator<V> = Box<dyn Fn(&V, &V) -> Ordering>;

/// Stable handle to an entry of an [`IndexedTree`].
///
/// Handles survive rebalancing and the insertion or removal of other
/// entries. Using a handle after its own entry was removed is a logic error
/// and panics (or addresses a recycled slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

#[derive(Debug)]
struct Entry<V> {
    value: V,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    height: u32,
    /// Entries in this subtree, self included.
    size: usize,
    /// Visible entries in this subtree, self included.
    visible_size: usize,
    visible: bool,
}

/// Self-balancing sequence with O(log n) positional access.
///
/// Two modes:
/// - unordered: values are placed explicitly with [`IndexedTree::insert_at`]
/// - ordered: values are placed by the comparator with
///   [`IndexedTree::insert_sorted`]; equal values keep insertion order
///
/// Each entry also carries a visibility flag. Visible entries form a second,
/// sparser index space queried with [`IndexedTree::node_at_visible`] and
/// [`IndexedTree::visible_index_of_node`].
pub struct IndexedTree<V> {
    entries: Vec<Option<Entry<V>>>,
    free: Vec<usize>,
    root: Option<usize>,
    comparator: Option<Comparator<V>>,
}

impl<V> Default for IndexedTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for IndexedTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedTree")
            .field("len", &self.len())
            .field("visible_len", &self.visible_len())
            .field("ordered", &self.is_ordered())
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<V> IndexedTree<V> {
    /// Create an empty unordered tree.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty unordered tree with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            root: None,
            comparator: None,
        }
    }

    /// Create an empty ordered tree.
    pub fn with_comparator<F>(comparator: F) -> Self
    where
        F: Fn(&V, &V) -> Ordering + 'static,
    {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            root: None,
            comparator: Some(Box::new(comparator)),
        }
    }

    /// Whether values are placed by a comparator.
    pub fn is_ordered(&self) -> bool {
        self.comparator.is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.size(self.root)
    }

    /// Number of entries whose visibility flag is set.
    pub fn visible_len(&self) -> usize {
        self.visible_size(self.root)
    }

    /// True when the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Drop every entry. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.root = None;
    }

    /// Remove every entry, returning the values in order.
    pub fn drain(&mut self) -> Vec<V> {
        let mut order = Vec::with_capacity(self.len());
        let mut cursor = self.first_slot();
        while let Some(slot) = cursor {
            order.push(slot);
            cursor = self.successor(slot);
        }
        let values = order
            .into_iter()
            .filter_map(|slot| self.entries[slot].take())
            .map(|entry| entry.value)
            .collect();
        self.clear();
        values
    }

    /// Insert a visible value at `index` (`0..=len`).
    pub fn insert_at(&mut self, index: usize, value: V) -> Result<NodeRef, IndexedTreeError> {
        self.insert_at_with_visibility(index, value, true)
    }

    /// Insert a value at `index` with an explicit visibility flag.
    pub fn insert_at_with_visibility(
        &mut self,
        index: usize,
        value: V,
        visible: bool,
    ) -> Result<NodeRef, IndexedTreeError> {
        if self.comparator.is_some() {
            return Err(IndexedTreeError::Ordered);
        }
        let len = self.len();
        if index > len {
            return Err(IndexedTreeError::IndexOutOfBounds { index, len });
        }
        let slot = self.allocate(value, visible);
        self.attach_at(slot, index);
        Ok(NodeRef(slot))
    }

    /// Insert a visible value at the position chosen by the comparator.
    ///
    /// The value goes after every entry comparing equal to it.
    pub fn insert_sorted(&mut self, value: V) -> Result<NodeRef, IndexedTreeError> {
        let Some(comparator) = self.comparator.as_ref() else {
            return Err(IndexedTreeError::Unordered);
        };
        let index = self.upper_bound(comparator, &value);
        let slot = self.allocate(value, true);
        self.attach_at(slot, index);
        Ok(NodeRef(slot))
    }

    /// Remove and return the value at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<V, IndexedTreeError> {
        let len = self.len();
        let slot = self
            .locate(index)
            .ok_or(IndexedTreeError::IndexOutOfBounds { index, len })?;
        Ok(self.remove_node(NodeRef(slot)))
    }

    /// Remove the entry behind `node` and return its value.
    pub fn remove_node(&mut self, node: NodeRef) -> V {
        self.unlink(node.0);
        self.release(node.0)
    }

    /// First position holding a value equal to `value` under the comparator.
    pub fn index_of(&self, value: &V) -> Result<Option<usize>, IndexedTreeError> {
        let comparator = self.comparator.as_ref().ok_or(IndexedTreeError::Unordered)?;
        let lower = self.lower_bound(comparator, value);
        Ok(self
            .get(lower)
            .filter(|found| comparator(found, value) == Ordering::Equal)
            .map(|_| lower))
    }

    /// Last position holding a value equal to `value` under the comparator.
    pub fn last_index_of(&self, value: &V) -> Result<Option<usize>, IndexedTreeError> {
        let comparator = self.comparator.as_ref().ok_or(IndexedTreeError::Unordered)?;
        let upper = self.upper_bound(comparator, value);
        if upper == 0 {
            return Ok(None);
        }
        Ok(self
            .get(upper - 1)
            .filter(|found| comparator(found, value) == Ordering::Equal)
            .map(|_| upper - 1))
    }

    /// Position `value` would take if inserted ahead of its equals.
    pub fn index_of_simulated(&self, value: &V) -> Result<usize, IndexedTreeError> {
        let comparator = self.comparator.as_ref().ok_or(IndexedTreeError::Unordered)?;
        Ok(self.lower_bound(comparator, value))
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&V> {
        self.locate(index).map(|slot| &self.entry(slot).value)
    }

    /// Mutable value at `index`. Mutating the sort key of an ordered tree
    /// breaks its ordering.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut V> {
        let slot = self.locate(index)?;
        Some(&mut self.entry_mut(slot).value)
    }

    /// Handle of the entry at `index`.
    pub fn node_at(&self, index: usize) -> Option<NodeRef> {
        self.locate(index).map(NodeRef)
    }

    /// Handle of the `visible_index`-th visible entry.
    pub fn node_at_visible(&self, visible_index: usize) -> Option<NodeRef> {
        if visible_index >= self.visible_len() {
            return None;
        }
        let mut remaining = visible_index;
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let entry = self.entry(slot);
            let left_visible = self.visible_size(entry.left);
            if remaining < left_visible {
                cursor = entry.left;
            } else if entry.visible && remaining == left_visible {
                return Some(NodeRef(slot));
            } else {
                remaining -= left_visible + usize::from(entry.visible);
                cursor = entry.right;
            }
        }
        None
    }

    /// Value behind a handle.
    pub fn value(&self, node: NodeRef) -> &V {
        &self.entry(node.0).value
    }

    /// Mutable value behind a handle.
    pub fn value_mut(&mut self, node: NodeRef) -> &mut V {
        &mut self.entry_mut(node.0).value
    }

    /// Position of the entry behind `node`.
    pub fn index_of_node(&self, node: NodeRef) -> usize {
        let mut index = self.size(self.entry(node.0).left);
        let mut child = node.0;
        while let Some(parent) = self.entry(child).parent {
            let entry = self.entry(parent);
            if entry.right == Some(child) {
                index += self.size(entry.left) + 1;
            }
            child = parent;
        }
        index
    }

    /// Number of visible entries ahead of `node`.
    pub fn visible_index_of_node(&self, node: NodeRef) -> usize {
        let mut index = self.visible_size(self.entry(node.0).left);
        let mut child = node.0;
        while let Some(parent) = self.entry(child).parent {
            let entry = self.entry(parent);
            if entry.right == Some(child) {
                index += self.visible_size(entry.left) + usize::from(entry.visible);
            }
            child = parent;
        }
        index
    }

    /// Number of visible entries at positions `< index`.
    pub fn visible_rank(&self, index: usize) -> usize {
        if index >= self.len() {
            return self.visible_len();
        }
        let mut remaining = index;
        let mut rank = 0;
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let entry = self.entry(slot);
            let left_size = self.size(entry.left);
            if remaining < left_size {
                cursor = entry.left;
            } else if remaining == left_size {
                return rank + self.visible_size(entry.left);
            } else {
                rank += self.visible_size(entry.left) + usize::from(entry.visible);
                remaining -= left_size + 1;
                cursor = entry.right;
            }
        }
        rank
    }

    /// Visibility flag of an entry.
    pub fn is_visible(&self, node: NodeRef) -> bool {
        self.entry(node.0).visible
    }

    /// Change the visibility flag of an entry, keeping counters current.
    pub fn set_visible(&mut self, node: NodeRef, visible: bool) {
        if self.entry(node.0).visible == visible {
            return;
        }
        self.entry_mut(node.0).visible = visible;
        let mut cursor = Some(node.0);
        while let Some(slot) = cursor {
            self.update(slot);
            cursor = self.entry(slot).parent;
        }
    }

    /// Borrowing iterator over values in order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self)
    }

    /// Editing cursor positioned before `index`.
    pub fn cursor(&mut self, index: usize) -> Result<Cursor<'_, V>, IndexedTreeError> {
        let len = self.len();
        if index > len {
            return Err(IndexedTreeError::IndexOutOfBounds { index, len });
        }
        Ok(Cursor::new(self, index))
    }

    pub(super) fn first_slot(&self) -> Option<usize> {
        self.root.map(|root| self.leftmost(root))
    }

    pub(super) fn last_slot(&self) -> Option<usize> {
        self.root.map(|root| self.rightmost(root))
    }

    pub(super) fn slot_value(&self, slot: usize) -> &V {
        &self.entry(slot).value
    }

    pub(super) fn successor(&self, slot: usize) -> Option<usize> {
        if let Some(right) = self.entry(slot).right {
            return Some(self.leftmost(right));
        }
        let mut child = slot;
        while let Some(parent) = self.entry(child).parent {
            if self.entry(parent).left == Some(child) {
                return Some(parent);
            }
            child = parent;
        }
        None
    }

    pub(super) fn predecessor(&self, slot: usize) -> Option<usize> {
        if let Some(left) = self.entry(slot).left {
            return Some(self.rightmost(left));
        }
        let mut child = slot;
        while let Some(parent) = self.entry(child).parent {
            if self.entry(parent).right == Some(child) {
                return Some(parent);
            }
            child = parent;
        }
        None
    }

    fn entry(&self, slot: usize) -> &Entry<V> {
        match self.entries.get(slot) {
            Some(Some(entry)) => entry,
            _ => panic!("stale indexed tree handle {slot}"),
        }
    }

    fn entry_mut(&mut self, slot: usize) -> &mut Entry<V> {
        match self.entries.get_mut(slot) {
            Some(Some(entry)) => entry,
            _ => panic!("stale indexed tree handle {slot}"),
        }
    }

    fn size(&self, slot: Option<usize>) -> usize {
        slot.map_or(0, |slot| self.entry(slot).size)
    }

    fn visible_size(&self, slot: Option<usize>) -> usize {
        slot.map_or(0, |slot| self.entry(slot).visible_size)
    }

    fn height(&self, slot: Option<usize>) -> u32 {
        slot.map_or(0, |slot| self.entry(slot).height)
    }

    fn allocate(&mut self, value: V, visible: bool) -> usize {
        let entry = Entry {
            value,
            parent: None,
            left: None,
            right: None,
            height: 1,
            size: 1,
            visible_size: usize::from(visible),
            visible,
        };
        match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                slot
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) -> V {
        match self.entries.get_mut(slot).and_then(Option::take) {
            Some(entry) => {
                self.free.push(slot);
                entry.value
            }
            None => panic!("stale indexed tree handle {slot}"),
        }
    }

    fn locate(&self, index: usize) -> Option<usize> {
        if index >= self.len() {
            return None;
        }
        let mut remaining = index;
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let entry = self.entry(slot);
            let left_size = self.size(entry.left);
            match remaining.cmp(&left_size) {
                Ordering::Less => cursor = entry.left,
                Ordering::Equal => return Some(slot),
                Ordering::Greater => {
                    remaining -= left_size + 1;
                    cursor = entry.right;
                }
            }
        }
        None
    }

    /// Count of entries strictly less than `value`.
    fn lower_bound(&self, comparator: &Comparator<V>, value: &V) -> usize {
        let mut count = 0;
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let entry = self.entry(slot);
            if comparator(&entry.value, value) == Ordering::Less {
                count += self.size(entry.left) + 1;
                cursor = entry.right;
            } else {
                cursor = entry.left;
            }
        }
        count
    }

    /// Count of entries less than or equal to `value`.
    fn upper_bound(&self, comparator: &Comparator<V>, value: &V) -> usize {
        let mut count = 0;
        let mut cursor = self.root;
        while let Some(slot) = cursor {
            let entry = self.entry(slot);
            if comparator(value, &entry.value) == Ordering::Less {
                cursor = entry.left;
            } else {
                count += self.size(entry.left) + 1;
                cursor = entry.right;
            }
        }
        count
    }

    fn leftmost(&self, mut slot: usize) -> usize {
        while let Some(left) = self.entry(slot).left {
            slot = left;
        }
        slot
    }

    fn rightmost(&self, mut slot: usize) -> usize {
        while let Some(right) = self.entry(slot).right {
            slot = right;
        }
        slot
    }

    /// Hang the detached entry `slot` so that it lands at `index`.
    fn attach_at(&mut self, slot: usize, index: usize) {
        let Some(mut node) = self.root else {
            self.root = Some(slot);
            return;
        };
        let mut remaining = index;
        loop {
            let (left, right) = {
                let entry = self.entry(node);
                (entry.left, entry.right)
            };
            let left_size = self.size(left);
            if remaining <= left_size {
                match left {
                    Some(left) => node = left,
                    None => {
                        self.entry_mut(node).left = Some(slot);
                        break;
                    }
                }
            } else {
                remaining -= left_size + 1;
                match right {
                    Some(right) => node = right,
                    None => {
                        self.entry_mut(node).right = Some(slot);
                        break;
                    }
                }
            }
        }
        self.entry_mut(slot).parent = Some(node);
        self.retrace(Some(node));
    }

    /// Detach `slot` from the tree structure, leaving its arena slot alive.
    fn unlink(&mut self, slot: usize) {
        let (left, right, parent) = {
            let entry = self.entry(slot);
            (entry.left, entry.right, entry.parent)
        };
        match (left, right) {
            (Some(left), Some(right)) => {
                let heir = self.leftmost(right);
                let start = if heir == right {
                    heir
                } else {
                    let heir_parent = self.entry(heir).parent.unwrap_or(right);
                    let heir_right = self.entry(heir).right;
                    self.entry_mut(heir_parent).left = heir_right;
                    if let Some(heir_right) = heir_right {
                        self.entry_mut(heir_right).parent = Some(heir_parent);
                    }
                    self.entry_mut(heir).right = Some(right);
                    self.entry_mut(right).parent = Some(heir);
                    heir_parent
                };
                self.entry_mut(heir).left = Some(left);
                self.entry_mut(left).parent = Some(heir);
                self.entry_mut(heir).parent = parent;
                self.replace_child(parent, slot, Some(heir));
                self.retrace(Some(start));
            }
            (child, None) | (None, child) => {
                if let Some(child) = child {
                    self.entry_mut(child).parent = parent;
                }
                self.replace_child(parent, slot, child);
                self.retrace(parent);
            }
        }
        let entry = self.entry_mut(slot);
        entry.parent = None;
        entry.left = None;
        entry.right = None;
    }

    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: Option<usize>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let entry = self.entry_mut(parent);
                if entry.left == Some(old) {
                    entry.left = new;
                } else {
                    entry.right = new;
                }
            }
        }
    }

    fn update(&mut self, slot: usize) {
        let (left, right, visible) = {
            let entry = self.entry(slot);
            (entry.left, entry.right, entry.visible)
        };
        let height = 1 + self.height(left).max(self.height(right));
        let size = 1 + self.size(left) + self.size(right);
        let visible_size = usize::from(visible) + self.visible_size(left) + self.visible_size(right);
        let entry = self.entry_mut(slot);
        entry.height = height;
        entry.size = size;
        entry.visible_size = visible_size;
    }

    fn rotate_left(&mut self, slot: usize) -> usize {
        let Some(pivot) = self.entry(slot).right else {
            return slot;
        };
        let parent = self.entry(slot).parent;
        let inner = self.entry(pivot).left;

        self.entry_mut(slot).right = inner;
        if let Some(inner) = inner {
            self.entry_mut(inner).parent = Some(slot);
        }
        self.entry_mut(pivot).left = Some(slot);
        self.entry_mut(slot).parent = Some(pivot);
        self.entry_mut(pivot).parent = parent;
        self.replace_child(parent, slot, Some(pivot));

        self.update(slot);
        self.update(pivot);
        pivot
    }

    fn rotate_right(&mut self, slot: usize) -> usize {
        let Some(pivot) = self.entry(slot).left else {
            return slot;
        };
        let parent = self.entry(slot).parent;
        let inner = self.entry(pivot).right;

        self.entry_mut(slot).left = inner;
        if let Some(inner) = inner {
            self.entry_mut(inner).parent = Some(slot);
        }
        self.entry_mut(pivot).right = Some(slot);
        self.entry_mut(slot).parent = Some(pivot);
        self.entry_mut(pivot).parent = parent;
        self.replace_child(parent, slot, Some(pivot));

        self.update(slot);
        self.update(pivot);
        pivot
    }

    /// Restore the AVL invariant at `slot`; returns the subtree's new root.
    fn rebalance(&mut self, slot: usize) -> usize {
        self.update(slot);
        let (left, right) = {
            let entry = self.entry(slot);
            (entry.left, entry.right)
        };
        let balance = i64::from(self.height(left)) - i64::from(self.height(right));
        if balance > 1 {
            if let Some(left) = left {
                let entry = self.entry(left);
                if self.height(entry.left) < self.height(entry.right) {
                    self.rotate_left(left);
                }
            }
            return self.rotate_right(slot);
        }
        if balance < -1 {
            if let Some(right) = right {
                let entry = self.entry(right);
                if self.height(entry.right) < self.height(entry.left) {
                    self.rotate_right(right);
                }
            }
            return self.rotate_left(slot);
        }
        slot
    }

    fn retrace(&mut self, start: Option<usize>) {
        let mut cursor = start;
        while let Some(slot) = cursor {
            let top = self.rebalance(slot);
            cursor = self.entry(top).parent;
        }
    }

    /// Verify parent links, counters and balance. Returns the height.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> u32 {
        fn walk<V>(tree: &IndexedTree<V>, slot: Option<usize>, parent: Option<usize>) -> u32 {
            let Some(slot) = slot else {
                return 0;
            };
            let entry = tree.entry(slot);
            assert_eq!(entry.parent, parent, "parent link of {slot}");
            let left = walk(tree, entry.left, Some(slot));
            let right = walk(tree, entry.right, Some(slot));
            assert!(left.abs_diff(right) <= 1, "unbalanced at {slot}");
            assert_eq!(entry.height, 1 + left.max(right));
            assert_eq!(entry.size, 1 + tree.size(entry.left) + tree.size(entry.right));
            assert_eq!(
                entry.visible_size,
                usize::from(entry.visible)
                    + tree.visible_size(entry.left)
                    + tree.visible_size(entry.right)
            );
            entry.height
        }
        walk(self, self.root, None)
    }
}
