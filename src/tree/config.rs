use super::{ExpansionPolicy, TreeError};

/// Construction parameters for a [`super::TreeList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeListConfig {
    /// Initial state of new nodes under the built-in expansion policy.
    pub default_expanded: bool,

    /// Reject elements whose path is deeper than this.
    pub max_depth: Option<usize>,

    /// Pre-allocated node and source capacity.
    pub initial_capacity: usize,
}

impl Default for TreeListConfig {
    fn default() -> Self {
        Self {
            default_expanded: true,
            max_depth: None,
            initial_capacity: 0,
        }
    }
}

impl TreeListConfig {
    /// Nodes start expanded.
    pub fn expanded() -> Self {
        Self::default()
    }

    /// Nodes start collapsed.
    pub fn collapsed() -> Self {
        Self {
            default_expanded: false,
            ..Self::default()
        }
    }

    /// Set the initial expansion state.
    pub fn with_default_expanded(mut self, expanded: bool) -> Self {
        self.default_expanded = expanded;
        self
    }

    /// Limit path depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Pre-allocate room for `capacity` nodes.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Expansion policy implied by `default_expanded`.
    pub fn expansion_policy(&self) -> ExpansionPolicy {
        ExpansionPolicy::from_expanded(self.default_expanded)
    }

    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.max_depth == Some(0) {
            return Err(TreeError::InvalidConfiguration(
                "max depth must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
