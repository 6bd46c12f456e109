//! Expand/collapse policies for newly created nodes.

/// Decides the initial expanded state of nodes and observes user toggles.
///
/// `element` is `None` for virtual nodes.
pub trait ExpansionModel<E, S> {
    /// Initial state of a node being created at `path`.
    fn is_expanded(&self, element: Option<&E>, path: &[S]) -> bool;

    /// Called after the node at `path` was expanded or collapsed.
    fn set_expanded(&mut self, _element: Option<&E>, _path: &[S], _expanded: bool) {}
}

/// Fixed policy: every new node starts expanded, or every one collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpansionPolicy {
    /// New nodes show their children.
    #[default]
    Expanded,
    /// New nodes hide their children.
    Collapsed,
}

impl ExpansionPolicy {
    /// Policy from a boolean flag.
    pub fn from_expanded(expanded: bool) -> Self {
        if expanded {
            ExpansionPolicy::Expanded
        } else {
            ExpansionPolicy::Collapsed
        }
    }
}

impl<E, S> ExpansionModel<E, S> for ExpansionPolicy {
    fn is_expanded(&self, _element: Option<&E>, _path: &[S]) -> bool {
        matches!(self, ExpansionPolicy::Expanded)
    }
}

/// Remembers toggles by path, so a node recreated at a known path comes
/// back in the state it was left in.
#[derive(Debug, Clone)]
pub struct PathExpansionModel<S> {
    default: ExpansionPolicy,
    remembered: Vec<(Vec<S>, bool)>,
}

impl<S> PathExpansionModel<S> {
    /// Unknown paths fall back to `default`.
    pub fn new(default: ExpansionPolicy) -> Self {
        Self {
            default,
            remembered: Vec::new(),
        }
    }

    /// Number of remembered paths.
    pub fn remembered(&self) -> usize {
        self.remembered.len()
    }
}

impl<E, S: Clone + PartialEq> ExpansionModel<E, S> for PathExpansionModel<S> {
    fn is_expanded(&self, element: Option<&E>, path: &[S]) -> bool {
        self.remembered
            .iter()
            .find(|(known, _)| known.as_slice() == path)
            .map_or_else(
                || ExpansionModel::<E, S>::is_expanded(&self.default, element, path),
                |(_, expanded)| *expanded,
            )
    }

    fn set_expanded(&mut self, _element: Option<&E>, path: &[S], expanded: bool) {
        match self
            .remembered
            .iter_mut()
            .find(|(known, _)| known.as_slice() == path)
        {
            Some((_, state)) => *state = expanded,
            None => self.remembered.push((path.to_vec(), expanded)),
        }
    }
}
