//! Node storage
//!
//! Nodes live in an arena addressed by [`NodeId`]. Parent and child links
//! are ids, never references, so restructuring never fights the borrow
//! checker and a stale id is detected instead of dangling.

use std::fmt;

use crate::indexed::NodeRef;

/// Arena address of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Placeholder stored in an index entry before its node exists.
    pub(crate) const DETACHED: NodeId = NodeId(usize::MAX);
}

/// Whether a node stands for a source element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthesized ancestor of a path prefix no element occupies.
    Virtual,
    /// Backed by the source element behind the handle.
    Real(NodeRef),
}

#[derive(Debug)]
pub(crate) struct TreeNode<S> {
    pub(crate) path: Vec<S>,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) expanded: bool,
    pub(crate) allows_children: bool,
    /// Entry in the pre-order row index.
    pub(crate) entry: NodeRef,
    /// Nodes below this one, at any depth.
    pub(crate) descendants: usize,
}

impl<S> TreeNode<S> {
    pub(crate) fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub(crate) fn segment(&self) -> Option<&S> {
        self.path.last()
    }

    pub(crate) fn is_virtual(&self) -> bool {
        matches!(self.kind, NodeKind::Virtual)
    }

    /// Whether an element path may continue below this node.
    pub(crate) fn can_host(&self) -> bool {
        self.is_virtual() || self.allows_children
    }
}

#[derive(Debug)]
pub(crate) struct NodeArena<S> {
    slots: Vec<Option<TreeNode<S>>>,
    free: Vec<usize>,
    live: usize,
}

impl<S> NodeArena<S> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, node: TreeNode<S>) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> TreeNode<S> {
        match self.slots.get_mut(id.0).and_then(Option::take) {
            Some(node) => {
                self.live -= 1;
                self.free.push(id.0);
                node
            }
            None => panic!("stale node id {id:?}"),
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> &TreeNode<S> {
        match self.slots.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale node id {id:?}"),
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut TreeNode<S> {
        match self.slots.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale node id {id:?}"),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

/// Read-only view of one node.
pub struct TreeRow<'a, E, S> {
    pub(crate) path: &'a [S],
    pub(crate) element: Option<&'a E>,
    pub(crate) expanded: bool,
    pub(crate) has_children: bool,
    pub(crate) allows_children: bool,
}

impl<E, S> Clone for TreeRow<'_, E, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, S> Copy for TreeRow<'_, E, S> {}

impl<E: fmt::Debug, S: fmt::Debug> fmt::Debug for TreeRow<'_, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeRow")
            .field("path", &self.path)
            .field("element", &self.element)
            .field("expanded", &self.expanded)
            .field("has_children", &self.has_children)
            .finish()
    }
}

impl<'a, E, S> TreeRow<'a, E, S> {
    /// Full path, root segment first.
    pub fn path(&self) -> &'a [S] {
        self.path
    }

    /// The node's own segment.
    pub fn segment(&self) -> &'a S {
        &self.path[self.path.len() - 1]
    }

    /// Zero for roots.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Backing element; `None` for virtual nodes.
    pub fn element(&self) -> Option<&'a E> {
        self.element
    }

    /// Synthesized ancestor without an element.
    pub fn is_virtual(&self) -> bool {
        self.element.is_none()
    }

    /// Expand/collapse state. Leaves keep a state too.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Whether the node currently has children (shown or not).
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Whether the format lets this node host children.
    pub fn allows_children(&self) -> bool {
        self.allows_children
    }
}
