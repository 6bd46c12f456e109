use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use super::node::{NodeArena, NodeId, NodeKind, TreeRow};
use super::{ExpansionModel, ExpansionPolicy, TreeError, TreeFormat, TreeListConfig};
use crate::event::{EventAssembler, ListEvent, ListenerId, ListenerRegistry};
use crate::indexed::IndexedTree;

/// A source element and the node that represents it.
pub(super) struct SourceSlot<E> {
    pub(super) element: E,
    pub(super) node: NodeId,
}

/// Observable tree projection of a flat, mutable list.
///
/// The list owns its source elements. Edits go through
/// [`TreeList::insert_source`], [`TreeList::set_source`],
/// [`TreeList::remove_source`] and friends; each one updates the tree
/// structure at once and publishes the visible row changes to listeners,
/// immediately or at the end of the enclosing transaction.
///
/// Row indices always refer to the *visible* rows: the pre-order traversal
/// with the descendants of collapsed nodes left out.
pub struct TreeList<E, F: TreeFormat<E>> {
    pub(super) format: F,
    pub(super) expansion: Box<dyn ExpansionModel<E, F::Segment>>,
    pub(super) config: TreeListConfig,
    pub(super) source: IndexedTree<SourceSlot<E>>,
    pub(super) nodes: NodeArena<F::Segment>,
    pub(super) roots: Vec<NodeId>,
    /// Every node in pre-order; the visibility flag marks shown rows.
    pub(super) rows: IndexedTree<NodeId>,
    pub(super) assembler: EventAssembler,
    pub(super) listeners: ListenerRegistry,
    /// Previous hierarchy, consulted for expand state while re-deriving.
    pub(super) carried: Option<(NodeArena<F::Segment>, Vec<NodeId>)>,
}

impl<E, F: TreeFormat<E>> fmt::Debug for TreeList<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeList")
            .field("rows", &self.len())
            .field("nodes", &self.total_len())
            .field("source", &self.source_len())
            .field("listeners", &self.listeners.len())
            .field("transaction_depth", &self.assembler.depth())
            .finish()
    }
}

impl<E, F: TreeFormat<E>> TreeList<E, F> {
    /// Empty tree with a fixed expansion policy.
    pub fn new(format: F, expansion: ExpansionPolicy) -> Self {
        let config = TreeListConfig::default()
            .with_default_expanded(expansion == ExpansionPolicy::Expanded);
        Self::assemble(format, Box::new(expansion), config)
    }

    /// Empty tree configured by `config`.
    pub fn with_config(format: F, config: TreeListConfig) -> Result<Self, TreeError> {
        config.validate()?;
        let policy = config.expansion_policy();
        Ok(Self::assemble(format, Box::new(policy), config))
    }

    /// Empty tree driven by a custom expansion model.
    pub fn with_expansion_model<M>(
        format: F,
        model: M,
        config: TreeListConfig,
    ) -> Result<Self, TreeError>
    where
        M: ExpansionModel<E, F::Segment> + 'static,
    {
        config.validate()?;
        Ok(Self::assemble(format, Box::new(model), config))
    }

    /// Tree over the elements of `source`, in iteration order.
    pub fn from_source<I>(source: I, format: F, expansion: ExpansionPolicy) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = E>,
    {
        let mut tree = Self::new(format, expansion);
        tree.extend_source(source)?;
        Ok(tree)
    }

    fn assemble(
        format: F,
        expansion: Box<dyn ExpansionModel<E, F::Segment>>,
        config: TreeListConfig,
    ) -> Self {
        let capacity = config.initial_capacity;
        Self {
            format,
            expansion,
            source: IndexedTree::with_capacity(capacity),
            nodes: NodeArena::with_capacity(capacity),
            roots: Vec::new(),
            rows: IndexedTree::with_capacity(capacity),
            assembler: EventAssembler::new(),
            listeners: ListenerRegistry::new(),
            carried: None,
            config,
        }
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.rows.visible_len()
    }

    /// True when there are no rows at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of nodes, hidden ones included.
    pub fn total_len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of source elements.
    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    /// Source element at `index`.
    pub fn source_get(&self, index: usize) -> Option<&E> {
        self.source.get(index).map(|slot| &slot.element)
    }

    /// Source elements in source order.
    pub fn source_iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.source.iter().map(|slot| &slot.element)
    }

    /// Active format.
    pub fn format(&self) -> &F {
        &self.format
    }

    /// Active configuration.
    pub fn config(&self) -> &TreeListConfig {
        &self.config
    }

    /// Visible row at `index`.
    pub fn get(&self, index: usize) -> Result<TreeRow<'_, E, F::Segment>, TreeError> {
        self.row_id(index).map(|id| self.row(id))
    }

    /// Visible rows in order.
    pub fn rows(&self) -> impl Iterator<Item = TreeRow<'_, E, F::Segment>> + '_ {
        self.rows
            .iter()
            .filter(move |id| self.rows.is_visible(self.nodes.get(**id).entry))
            .map(move |id| self.row(*id))
    }

    /// Every node in pre-order, including those hidden under collapsed parents.
    pub fn nodes(&self) -> impl Iterator<Item = TreeRow<'_, E, F::Segment>> + '_ {
        self.rows.iter().map(move |id| self.row(*id))
    }

    /// Expand/collapse state of the row.
    pub fn is_expanded(&self, index: usize) -> Result<bool, TreeError> {
        self.row_id(index).map(|id| self.nodes.get(id).expanded)
    }

    /// Whether the row has children, shown or not.
    pub fn has_children(&self, index: usize) -> Result<bool, TreeError> {
        self.row_id(index)
            .map(|id| !self.nodes.get(id).children.is_empty())
    }

    /// Depth of the row; roots are depth 0.
    pub fn depth(&self, index: usize) -> Result<usize, TreeError> {
        self.row_id(index).map(|id| self.nodes.get(id).depth())
    }

    /// Whether the row is a virtual node.
    pub fn is_virtual(&self, index: usize) -> Result<bool, TreeError> {
        self.row_id(index).map(|id| self.nodes.get(id).is_virtual())
    }

    /// Row index of the parent, `None` for roots.
    pub fn parent_index(&self, index: usize) -> Result<Option<usize>, TreeError> {
        let id = self.row_id(index)?;
        Ok(self
            .nodes
            .get(id)
            .parent
            .map(|parent| self.rows.visible_index_of_node(self.nodes.get(parent).entry)))
    }

    /// Size of the subtree under the row.
    ///
    /// With `include_collapsed` every descendant counts, otherwise only the
    /// rows currently shown. `include_self` adds the row itself.
    pub fn subtree_size(
        &self,
        index: usize,
        include_collapsed: bool,
        include_self: bool,
    ) -> Result<usize, TreeError> {
        let id = self.row_id(index)?;
        let node = self.nodes.get(id);
        let below = if include_collapsed {
            node.descendants
        } else {
            let start = self.rows.index_of_node(node.entry);
            let end = start + 1 + node.descendants;
            self.rows.visible_rank(end) - index - 1
        };
        Ok(below + usize::from(include_self))
    }

    /// Source index behind the row, `None` for virtual nodes.
    pub fn source_index(&self, index: usize) -> Result<Option<usize>, TreeError> {
        let id = self.row_id(index)?;
        Ok(match self.nodes.get(id).kind {
            NodeKind::Real(handle) => Some(self.source.index_of_node(handle)),
            NodeKind::Virtual => None,
        })
    }

    /// Row showing the source element at `source_index`, `None` if hidden.
    pub fn visible_index_of_source(&self, source_index: usize) -> Result<Option<usize>, TreeError> {
        let handle = self
            .source
            .node_at(source_index)
            .ok_or(TreeError::IndexOutOfBounds {
                index: source_index,
                size: self.source.len(),
            })?;
        let entry = self.nodes.get(self.source.value(handle).node).entry;
        Ok(self
            .rows
            .is_visible(entry)
            .then(|| self.rows.visible_index_of_node(entry)))
    }

    /// Expand or collapse the row at `index`.
    pub fn set_expanded(&mut self, index: usize, expanded: bool) -> Result<(), TreeError> {
        let id = self.row_id(index)?;
        if self.nodes.get(id).expanded == expanded {
            return Ok(());
        }
        self.assembler.begin();
        let node = self.nodes.get_mut(id);
        node.expanded = expanded;
        let node = self.nodes.get(id);
        let element = match node.kind {
            NodeKind::Real(handle) => Some(&self.source.value(handle).element),
            NodeKind::Virtual => None,
        };
        self.expansion.set_expanded(element, &node.path, expanded);
        if expanded {
            let mut next = index + 1;
            self.reveal_children(id, &mut next);
        } else {
            self.hide_descendants(id, index + 1);
        }
        self.commit_event()
    }

    /// Flip the expand state of the row; returns the new state.
    pub fn toggle_expanded(&mut self, index: usize) -> Result<bool, TreeError> {
        let expanded = !self.is_expanded(index)?;
        self.set_expanded(index, expanded)?;
        Ok(expanded)
    }

    /// Append an element to the source.
    pub fn push_source(&mut self, element: E) -> Result<(), TreeError> {
        self.insert_source(self.source.len(), element)
    }

    /// Append every element, publishing one batch.
    pub fn extend_source<I>(&mut self, elements: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = E>,
    {
        self.transaction(|tree| {
            elements
                .into_iter()
                .try_for_each(|element| tree.push_source(element))
        })?
    }

    /// Insert an element at `index` of the source.
    pub fn insert_source(&mut self, index: usize, element: E) -> Result<(), TreeError> {
        let size = self.source.len();
        if index > size {
            return Err(TreeError::IndexOutOfBounds { index, size });
        }
        let path = self.checked_path(&element)?;
        self.assembler.begin();
        let outcome = self.insert_element(index, element, path);
        self.commit_event()?;
        outcome
    }

    /// Replace the element at `index` of the source, returning the old one.
    pub fn set_source(&mut self, index: usize, element: E) -> Result<E, TreeError> {
        let size = self.source.len();
        if index >= size {
            return Err(TreeError::IndexOutOfBounds { index, size });
        }
        let path = self.checked_path(&element)?;
        self.assembler.begin();
        let outcome = self.replace_element(index, element, path);
        self.commit_event()?;
        outcome
    }

    /// Remove the element at `index` of the source.
    pub fn remove_source(&mut self, index: usize) -> Result<E, TreeError> {
        let size = self.source.len();
        if index >= size {
            return Err(TreeError::IndexOutOfBounds { index, size });
        }
        self.assembler.begin();
        let outcome = self.remove_element(index);
        self.commit_event()?;
        outcome
    }

    /// Remove every source element.
    pub fn clear_source(&mut self) -> Result<(), TreeError> {
        self.transaction(|tree| {
            while !tree.source.is_empty() {
                tree.remove_element(tree.source.len() - 1)?;
            }
            Ok(())
        })?
    }

    /// Stable-sort the source. Sibling order follows where it depends on
    /// source positions; nodes and their expand state survive.
    pub fn sort_source_by<C>(&mut self, compare: C) -> Result<(), TreeError>
    where
        C: FnMut(&E, &E) -> Ordering,
    {
        self.assembler.begin();
        let outcome = self.resort_source(compare);
        self.commit_event()?;
        outcome
    }

    /// Remove the source element behind a row. Virtual rows are rejected.
    pub fn remove(&mut self, index: usize) -> Result<E, TreeError> {
        let source_index = self
            .source_index(index)?
            .ok_or(TreeError::VirtualNode { index })?;
        self.remove_source(source_index)
    }

    /// Replace the source element behind a row. Virtual rows are rejected.
    pub fn set(&mut self, index: usize, element: E) -> Result<E, TreeError> {
        let source_index = self
            .source_index(index)?
            .ok_or(TreeError::VirtualNode { index })?;
        self.set_source(source_index, element)
    }

    /// Swap the format and re-derive the hierarchy. Nodes whose path
    /// survives keep their expand state.
    pub fn set_format(&mut self, format: F) -> Result<(), TreeError> {
        let mut paths = Vec::with_capacity(self.source.len());
        for slot in self.source.iter() {
            paths.push(self.validated(format.path(&slot.element))?);
        }
        self.assembler.begin();
        let outcome = self.rederive(format, paths);
        self.commit_event()?;
        outcome
    }

    /// Open a transaction: changes are held back until the matching commit.
    pub fn begin_event(&mut self) {
        self.assembler.begin();
    }

    /// Close a transaction, publishing if it was the outermost one.
    pub fn commit_event(&mut self) -> Result<(), TreeError> {
        if let Some(event) = self.assembler.commit()? {
            self.publish(&event);
        }
        Ok(())
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.assembler.in_transaction()
    }

    /// Run `edit` inside a transaction.
    pub fn transaction<R>(&mut self, edit: impl FnOnce(&mut Self) -> R) -> Result<R, TreeError> {
        self.begin_event();
        let result = edit(self);
        self.commit_event()?;
        Ok(result)
    }

    /// Register a listener for published batches.
    pub fn add_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: FnMut(&ListEvent) + 'static,
    {
        self.listeners.add(listener)
    }

    /// Unregister a listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn publish(&mut self, event: &ListEvent) {
        debug!(changes = event.len(), rows = self.len(), "tree list changed");
        self.listeners.notify(event);
    }

    pub(super) fn row_id(&self, index: usize) -> Result<NodeId, TreeError> {
        self.rows
            .node_at_visible(index)
            .map(|entry| *self.rows.value(entry))
            .ok_or(TreeError::IndexOutOfBounds {
                index,
                size: self.len(),
            })
    }

    pub(super) fn row(&self, id: NodeId) -> TreeRow<'_, E, F::Segment> {
        let node = self.nodes.get(id);
        TreeRow {
            path: &node.path,
            element: match node.kind {
                NodeKind::Real(handle) => Some(&self.source.value(handle).element),
                NodeKind::Virtual => None,
            },
            expanded: node.expanded,
            has_children: !node.children.is_empty(),
            allows_children: node.allows_children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::CharacterFormat;

    fn paths(tree: &TreeList<&'static str, CharacterFormat>) -> Vec<String> {
        tree.rows().map(|row| row.path().iter().collect()).collect()
    }

    #[test]
    fn builds_virtual_ancestors() {
        let tree = TreeList::from_source(["ABC"], CharacterFormat::new(), ExpansionPolicy::Expanded)
            .unwrap();
        assert_eq!(paths(&tree), vec!["A", "AB", "ABC"]);
        assert!(tree.is_virtual(0).unwrap());
        assert!(tree.is_virtual(1).unwrap());
        assert!(!tree.is_virtual(2).unwrap());
        assert_eq!(tree.source_index(2).unwrap(), Some(0));
        assert_eq!(tree.parent_index(2).unwrap(), Some(1));
        assert_eq!(tree.parent_index(0).unwrap(), None);
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut tree =
            TreeList::from_source(["A"], CharacterFormat::new(), ExpansionPolicy::Expanded).unwrap();
        assert_eq!(
            tree.set_expanded(1, false),
            Err(TreeError::IndexOutOfBounds { index: 1, size: 1 })
        );
        assert_eq!(
            tree.insert_source(3, "B"),
            Err(TreeError::IndexOutOfBounds { index: 3, size: 1 })
        );
        assert!(tree.get(1).is_err());
    }

    #[test]
    fn commit_without_begin_fails() {
        let mut tree: TreeList<&str, CharacterFormat> =
            TreeList::new(CharacterFormat::new(), ExpansionPolicy::Expanded);
        assert!(matches!(tree.commit_event(), Err(TreeError::Event(_))));
    }

    #[test]
    fn empty_paths_are_rejected() {
        let mut tree = TreeList::new(CharacterFormat::new(), ExpansionPolicy::Expanded);
        assert_eq!(tree.push_source(""), Err(TreeError::EmptyPath));
        assert_eq!(tree.total_len(), 0);
        assert_eq!(tree.source_len(), 0);
    }

    #[test]
    fn max_depth_is_enforced() {
        let config = TreeListConfig::default().with_max_depth(2);
        let mut tree = TreeList::with_config(CharacterFormat::new(), config).unwrap();
        tree.push_source("AB").unwrap();
        assert_eq!(
            tree.push_source("ABC"),
            Err(TreeError::PathTooDeep { depth: 3, max: 2 })
        );
    }
}
