//! Incremental maintenance of the node hierarchy.
//!
//! Invariants kept after every edit:
//! - `rows` lists every node in pre-order; an entry is visible iff every
//!   ancestor is expanded
//! - siblings are ordered by [`TreeList::compare_siblings`]
//! - virtual nodes have at least one child
//! - `descendants` of each node counts its whole subtree minus itself
//!
//! Every visibility change is reported to the assembler at the row index it
//! has at that moment.

use std::cmp::Ordering;
use std::mem;

use tracing::{debug, trace};

use super::list::{SourceSlot, TreeList};
use super::node::{NodeArena, NodeId, NodeKind, TreeNode};
use super::{SiblingOrder, TreeError, TreeFormat};
use crate::indexed::NodeRef;

impl<E, F: TreeFormat<E>> TreeList<E, F> {
    pub(super) fn checked_path(&self, element: &E) -> Result<Vec<F::Segment>, TreeError> {
        self.validated(self.format.path(element))
    }

    pub(super) fn validated(&self, path: Vec<F::Segment>) -> Result<Vec<F::Segment>, TreeError> {
        if path.is_empty() {
            return Err(TreeError::EmptyPath);
        }
        if let Some(max) = self.config.max_depth {
            if path.len() > max {
                return Err(TreeError::PathTooDeep {
                    depth: path.len(),
                    max,
                });
            }
        }
        Ok(path)
    }

    /// Place a new element at `source_index` and give it a node.
    pub(super) fn insert_element(
        &mut self,
        source_index: usize,
        element: E,
        path: Vec<F::Segment>,
    ) -> Result<(), TreeError> {
        let allows_children = self.format.allows_children(&element);
        let handle = self.source.insert_at(
            source_index,
            SourceSlot {
                element,
                node: NodeId::DETACHED,
            },
        )?;

        let last = path.len() - 1;
        let mut parent = None;
        for depth in 0..last {
            let host = match self.find_host(parent, &path[depth]) {
                Some(host) => host,
                None => {
                    let prefix = path[..=depth].to_vec();
                    let expanded = self.initial_expansion(None, &prefix);
                    self.create_node(parent, prefix, NodeKind::Virtual, true, expanded, source_index)?
                }
            };
            parent = Some(host);
        }

        let id = match self.find_virtual(parent, &path[last]) {
            Some(existing) => {
                self.promote(existing, handle, allows_children);
                existing
            }
            None => {
                let expanded = self.initial_expansion(Some(handle), &path);
                self.create_node(
                    parent,
                    path,
                    NodeKind::Real(handle),
                    allows_children,
                    expanded,
                    source_index,
                )?
            }
        };
        self.source.value_mut(handle).node = id;
        self.restore_order_upwards(Some(id))
    }

    /// Drop the element at `source_index`, demoting or deleting its node.
    pub(super) fn remove_element(&mut self, source_index: usize) -> Result<E, TreeError> {
        let handle = self
            .source
            .node_at(source_index)
            .ok_or(TreeError::IndexOutOfBounds {
                index: source_index,
                size: self.source.len(),
            })?;
        let SourceSlot { element, node: id } = self.source.remove_node(handle);

        if self.nodes.get(id).children.is_empty() {
            let parent = self.nodes.get(id).parent;
            self.destroy_node(id);
            let survivor = self.prune_virtual(parent);
            self.restore_order_upwards(survivor)?;
        } else {
            self.demote(id);
            self.restore_order_upwards(Some(id))?;
        }
        Ok(element)
    }

    /// Swap the element at `source_index`. Same path: in-place update.
    /// New path: remove and re-insert at the same source position.
    pub(super) fn replace_element(
        &mut self,
        source_index: usize,
        element: E,
        path: Vec<F::Segment>,
    ) -> Result<E, TreeError> {
        let handle = self
            .source
            .node_at(source_index)
            .ok_or(TreeError::IndexOutOfBounds {
                index: source_index,
                size: self.source.len(),
            })?;
        let id = self.source.value(handle).node;
        if self.nodes.get(id).path != path {
            let previous = self.remove_element(source_index)?;
            self.insert_element(source_index, element, path)?;
            return Ok(previous);
        }

        let allows_children = self.format.allows_children(&element);
        let previous = mem::replace(&mut self.source.value_mut(handle).element, element);
        let node = self.nodes.get_mut(id);
        node.allows_children = allows_children;
        let entry = node.entry;
        if self.rows.is_visible(entry) {
            self.assembler.update(self.rows.visible_index_of_node(entry));
        }
        Ok(previous)
    }

    /// Stable-sort the source, then re-derive sibling order and rows.
    pub(super) fn resort_source<C>(&mut self, mut compare: C) -> Result<(), TreeError>
    where
        C: FnMut(&E, &E) -> Ordering,
    {
        let mut slots = self.source.drain();
        slots.sort_by(|a, b| compare(&a.element, &b.element));
        for slot in slots {
            let id = slot.node;
            let handle = self.source.insert_at(self.source.len(), slot)?;
            self.nodes.get_mut(id).kind = NodeKind::Real(handle);
        }
        self.resort_children(None);
        self.rebuild_rows()?;
        debug!(elements = self.source.len(), "source re-sorted");
        Ok(())
    }

    /// Rebuild the whole hierarchy under `format`, carrying expand state
    /// over to nodes whose path already existed.
    pub(super) fn rederive(&mut self, format: F, paths: Vec<Vec<F::Segment>>) -> Result<(), TreeError> {
        for _ in 0..self.rows.visible_len() {
            self.assembler.delete(0);
        }
        let elements: Vec<E> = self
            .source
            .drain()
            .into_iter()
            .map(|slot| slot.element)
            .collect();
        let previous = mem::replace(&mut self.nodes, NodeArena::with_capacity(elements.len()));
        let previous_roots = mem::take(&mut self.roots);
        self.rows.clear();
        self.carried = Some((previous, previous_roots));
        self.format = format;

        let mut outcome = Ok(());
        for (index, (element, path)) in elements.into_iter().zip(paths).enumerate() {
            if let Err(error) = self.insert_element(index, element, path) {
                outcome = Err(error);
                break;
            }
        }
        self.carried = None;
        debug!(nodes = self.nodes.len(), rows = self.len(), "hierarchy re-derived");
        outcome
    }

    /// Show the children of `id` (and theirs, where expanded) starting at row `next`.
    pub(super) fn reveal_children(&mut self, id: NodeId, next: &mut usize) {
        let children = self.nodes.get(id).children.clone();
        for child in children {
            let (entry, expanded) = {
                let node = self.nodes.get(child);
                (node.entry, node.expanded)
            };
            self.rows.set_visible(entry, true);
            self.assembler.insert(*next);
            *next += 1;
            if expanded {
                self.reveal_children(child, next);
            }
        }
    }

    /// Hide every shown descendant of `id`; they all sit at row `first`.
    pub(super) fn hide_descendants(&mut self, id: NodeId, first: usize) {
        for member in self.subtree_members(id).into_iter().skip(1) {
            let entry = self.nodes.get(member).entry;
            if self.rows.is_visible(entry) {
                self.rows.set_visible(entry, false);
                self.assembler.delete(first);
            }
        }
    }

    fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(parent) => &self.nodes.get(parent).children,
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(parent) => &mut self.nodes.get_mut(parent).children,
            None => &mut self.roots,
        }
    }

    /// Whether children of `parent` are shown.
    fn children_shown(&self, parent: Option<NodeId>) -> bool {
        parent.map_or(true, |parent| {
            let node = self.nodes.get(parent);
            node.expanded && self.rows.is_visible(node.entry)
        })
    }

    fn find_host(&self, parent: Option<NodeId>, segment: &F::Segment) -> Option<NodeId> {
        self.siblings(parent).iter().copied().find(|&child| {
            let node = self.nodes.get(child);
            node.segment() == Some(segment) && node.can_host()
        })
    }

    fn find_virtual(&self, parent: Option<NodeId>, segment: &F::Segment) -> Option<NodeId> {
        self.siblings(parent).iter().copied().find(|&child| {
            let node = self.nodes.get(child);
            node.segment() == Some(segment) && node.is_virtual()
        })
    }

    fn initial_expansion(&self, element: Option<NodeRef>, path: &[F::Segment]) -> bool {
        if let Some(expanded) = self.carried_expansion(path) {
            return expanded;
        }
        let element = element.map(|handle| &self.source.value(handle).element);
        self.expansion.is_expanded(element, path)
    }

    fn carried_expansion(&self, path: &[F::Segment]) -> Option<bool> {
        let (arena, roots) = self.carried.as_ref()?;
        let mut level: &[NodeId] = roots;
        let mut found = None;
        for segment in path {
            let id = level
                .iter()
                .copied()
                .find(|&id| arena.get(id).segment() == Some(segment))?;
            found = Some(id);
            level = &arena.get(id).children;
        }
        found.map(|id| arena.get(id).expanded)
    }

    /// Smallest source index anywhere in the subtree of `id`.
    fn first_appearance(&self, id: NodeId) -> usize {
        let node = self.nodes.get(id);
        let own = match node.kind {
            NodeKind::Real(handle) => self.source.index_of_node(handle),
            NodeKind::Virtual => usize::MAX,
        };
        let below = match node.children.first() {
            None => usize::MAX,
            Some(&first) => match self.format.sibling_order(node.path.len()) {
                SiblingOrder::Source => self.first_appearance(first),
                SiblingOrder::Sorted => node
                    .children
                    .iter()
                    .map(|&child| self.first_appearance(child))
                    .min()
                    .unwrap_or(usize::MAX),
            },
        };
        own.min(below)
    }

    fn compare_siblings(&self, a: NodeId, b: NodeId) -> Ordering {
        let (left, right) = (self.nodes.get(a), self.nodes.get(b));
        let depth = left.depth();
        let by_segment = match (self.format.sibling_order(depth), left.segment(), right.segment()) {
            (SiblingOrder::Sorted, Some(x), Some(y)) => self.format.compare_segments(depth, x, y),
            _ => Ordering::Equal,
        };
        by_segment.then_with(|| self.first_appearance(a).cmp(&self.first_appearance(b)))
    }

    /// Order of a node not yet created against an existing sibling.
    fn compare_candidate(
        &self,
        depth: usize,
        segment: &F::Segment,
        first: usize,
        other: NodeId,
    ) -> Ordering {
        let by_segment = match (self.format.sibling_order(depth), self.nodes.get(other).segment()) {
            (SiblingOrder::Sorted, Some(theirs)) => self.format.compare_segments(depth, segment, theirs),
            _ => Ordering::Equal,
        };
        by_segment.then_with(|| first.cmp(&self.first_appearance(other)))
    }

    /// Row-index position for a node that becomes child `k` of `parent`.
    /// `excluded` nodes of the parent's subtree are currently out of `rows`.
    fn flat_position(&self, parent: Option<NodeId>, k: usize, excluded: usize) -> usize {
        if let Some(&next) = self.siblings(parent).get(k) {
            return self.rows.index_of_node(self.nodes.get(next).entry);
        }
        match parent {
            None => self.rows.len(),
            Some(parent) => {
                let node = self.nodes.get(parent);
                self.rows.index_of_node(node.entry) + 1 + node.descendants - excluded
            }
        }
    }

    fn adjust_descendants(&mut self, mut ancestor: Option<NodeId>, delta: isize) {
        while let Some(id) = ancestor {
            let node = self.nodes.get_mut(id);
            node.descendants = node.descendants.saturating_add_signed(delta);
            ancestor = node.parent;
        }
    }

    fn create_node(
        &mut self,
        parent: Option<NodeId>,
        path: Vec<F::Segment>,
        kind: NodeKind,
        allows_children: bool,
        expanded: bool,
        first: usize,
    ) -> Result<NodeId, TreeError> {
        let depth = path.len() - 1;
        let k = self.siblings(parent).partition_point(|&sibling| {
            self.compare_candidate(depth, &path[depth], first, sibling) != Ordering::Less
        });
        let position = self.flat_position(parent, k, 0);
        let visible = self.children_shown(parent);
        let entry = self
            .rows
            .insert_at_with_visibility(position, NodeId::DETACHED, visible)?;
        let id = self.nodes.insert(TreeNode {
            path,
            kind,
            parent,
            children: Vec::new(),
            expanded,
            allows_children,
            entry,
            descendants: 0,
        });
        *self.rows.value_mut(entry) = id;
        self.siblings_mut(parent).insert(k, id);
        self.adjust_descendants(parent, 1);
        if visible {
            self.assembler.insert(self.rows.visible_index_of_node(entry));
        }
        trace!(?kind, depth, visible, "node created");
        Ok(id)
    }

    fn promote(&mut self, id: NodeId, handle: NodeRef, allows_children: bool) {
        let node = self.nodes.get_mut(id);
        node.kind = NodeKind::Real(handle);
        node.allows_children = allows_children;
        let entry = node.entry;
        if self.rows.is_visible(entry) {
            self.assembler.update(self.rows.visible_index_of_node(entry));
        }
        trace!(depth = self.nodes.get(id).depth(), "virtual node promoted");
    }

    fn demote(&mut self, id: NodeId) {
        let node = self.nodes.get_mut(id);
        node.kind = NodeKind::Virtual;
        let entry = node.entry;
        if self.rows.is_visible(entry) {
            self.assembler.update(self.rows.visible_index_of_node(entry));
        }
        trace!(depth = self.nodes.get(id).depth(), "real node demoted");
    }

    /// Remove a childless node.
    fn destroy_node(&mut self, id: NodeId) {
        let (entry, parent) = {
            let node = self.nodes.get(id);
            debug_assert!(node.children.is_empty(), "destroying a node with children");
            (node.entry, node.parent)
        };
        if self.rows.is_visible(entry) {
            self.assembler.delete(self.rows.visible_index_of_node(entry));
        }
        self.rows.remove_node(entry);
        self.siblings_mut(parent).retain(|&sibling| sibling != id);
        self.adjust_descendants(parent, -1);
        let node = self.nodes.remove(id);
        trace!(depth = node.depth(), "node destroyed");
    }

    /// Remove childless virtual nodes from `start` upwards; returns the
    /// first ancestor that stays.
    fn prune_virtual(&mut self, start: Option<NodeId>) -> Option<NodeId> {
        let mut current = start;
        while let Some(id) = current {
            let node = self.nodes.get(id);
            if !(node.is_virtual() && node.children.is_empty()) {
                return Some(id);
            }
            current = node.parent;
            self.destroy_node(id);
        }
        None
    }

    fn restore_order_upwards(&mut self, start: Option<NodeId>) -> Result<(), TreeError> {
        let mut current = start;
        while let Some(id) = current {
            self.restore_order(id)?;
            current = self.nodes.get(id).parent;
        }
        Ok(())
    }

    fn restore_order(&mut self, id: NodeId) -> Result<(), TreeError> {
        let siblings = self.siblings(self.nodes.get(id).parent);
        let Some(k) = siblings.iter().position(|&sibling| sibling == id) else {
            return Ok(());
        };
        let after_previous = k == 0 || self.compare_siblings(siblings[k - 1], id) != Ordering::Greater;
        let before_next = siblings
            .get(k + 1)
            .map_or(true, |&next| self.compare_siblings(id, next) != Ordering::Greater);
        if after_previous && before_next {
            return Ok(());
        }
        self.relocate(id)
    }

    /// Move the subtree of `id` to where its sibling key now belongs.
    fn relocate(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.nodes.get(id).parent;
        let members = self.subtree_members(id);
        let mut shown = Vec::with_capacity(members.len());
        for &member in &members {
            let entry = self.nodes.get(member).entry;
            let visible = self.rows.is_visible(entry);
            if visible {
                self.assembler.delete(self.rows.visible_index_of_node(entry));
            }
            self.rows.remove_node(entry);
            shown.push(visible);
        }

        self.siblings_mut(parent).retain(|&sibling| sibling != id);
        let k = self
            .siblings(parent)
            .partition_point(|&sibling| self.compare_siblings(sibling, id) != Ordering::Greater);
        let position = self.flat_position(parent, k, members.len());
        self.siblings_mut(parent).insert(k, id);

        for (offset, (&member, &visible)) in members.iter().zip(&shown).enumerate() {
            let entry = self
                .rows
                .insert_at_with_visibility(position + offset, member, visible)?;
            self.nodes.get_mut(member).entry = entry;
            if visible {
                self.assembler.insert(self.rows.visible_index_of_node(entry));
            }
        }
        trace!(moved = members.len(), "subtree relocated");
        Ok(())
    }

    /// `id` and everything below it, in pre-order.
    fn subtree_members(&self, id: NodeId) -> Vec<NodeId> {
        let mut members = Vec::with_capacity(self.nodes.get(id).descendants + 1);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            members.push(current);
            stack.extend(self.nodes.get(current).children.iter().rev().copied());
        }
        members
    }

    /// Sort every sibling list, deepest first.
    fn resort_children(&mut self, parent: Option<NodeId>) {
        let children = self.siblings(parent).to_vec();
        for &child in &children {
            self.resort_children(Some(child));
        }
        let mut sorted = children;
        sorted.sort_by(|&a, &b| self.compare_siblings(a, b));
        *self.siblings_mut(parent) = sorted;
    }

    /// Lay `rows` out again from the sibling lists. Row count is unchanged,
    /// so rows that now show a different node are reported as updates.
    fn rebuild_rows(&mut self) -> Result<(), TreeError> {
        let before: Vec<NodeId> = self.visible_ids();
        self.rows.clear();
        let roots = self.roots.clone();
        for root in roots {
            for member in self.subtree_members(root) {
                let visible = self.children_shown(self.nodes.get(member).parent);
                let entry = self
                    .rows
                    .insert_at_with_visibility(self.rows.len(), member, visible)?;
                self.nodes.get_mut(member).entry = entry;
            }
        }
        let after = self.visible_ids();
        if before.len() == after.len() {
            for (index, _) in before.iter().zip(&after).enumerate().filter(|(_, (b, a))| b != a) {
                self.assembler.update(index);
            }
        } else {
            for _ in 0..before.len() {
                self.assembler.delete(0);
            }
            for index in 0..after.len() {
                self.assembler.insert(index);
            }
        }
        Ok(())
    }

    fn visible_ids(&self) -> Vec<NodeId> {
        self.rows
            .iter()
            .copied()
            .filter(|&id| self.rows.is_visible(self.nodes.get(id).entry))
            .collect()
    }
}
