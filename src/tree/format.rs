//! Path extraction strategies.

use std::cmp::Ordering;
use std::fmt;

/// How siblings at one depth are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiblingOrder {
    /// By the position of each sibling's earliest source element.
    #[default]
    Source,
    /// By [`TreeFormat::compare_segments`], earliest source element breaking ties.
    Sorted,
}

/// Decomposes source elements into tree paths.
///
/// `path` returns the full path of an element: every ancestor segment
/// followed by the element's own segment. Segment equality decides which
/// nodes are shared; the comparator only decides order.
pub trait TreeFormat<E> {
    /// One step of a path.
    type Segment: Clone + PartialEq + fmt::Debug;

    /// Full path of `element`, root segment first.
    fn path(&self, element: &E) -> Vec<Self::Segment>;

    /// Whether the node of `element` may host descendants. When false,
    /// descendants sharing its path are grouped under a virtual sibling.
    fn allows_children(&self, _element: &E) -> bool {
        true
    }

    /// Ordering policy for siblings at `depth` (roots are depth 0).
    fn sibling_order(&self, _depth: usize) -> SiblingOrder {
        SiblingOrder::Source
    }

    /// Comparator used at depths whose order is [`SiblingOrder::Sorted`].
    fn compare_segments(&self, _depth: usize, _a: &Self::Segment, _b: &Self::Segment) -> Ordering {
        Ordering::Equal
    }
}

/// One segment per character: `"ABC"` becomes `A > B > C`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterFormat {
    sorted: bool,
}

impl CharacterFormat {
    /// Siblings in source order.
    pub fn new() -> Self {
        Self { sorted: false }
    }

    /// Siblings in character order.
    pub fn sorted() -> Self {
        Self { sorted: true }
    }
}

impl<E: AsRef<str>> TreeFormat<E> for CharacterFormat {
    type Segment = char;

    fn path(&self, element: &E) -> Vec<char> {
        element.as_ref().chars().collect()
    }

    fn sibling_order(&self, _depth: usize) -> SiblingOrder {
        if self.sorted {
            SiblingOrder::Sorted
        } else {
            SiblingOrder::Source
        }
    }

    fn compare_segments(&self, _depth: usize, a: &char, b: &char) -> Ordering {
        a.cmp(b)
    }
}

/// Splits on a delimiter: `"src/tree/mod.rs"` becomes `src > tree > mod.rs`.
///
/// Empty pieces (leading, trailing or doubled delimiters) are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedFormat {
    delimiter: char,
    sorted: bool,
    case_insensitive: bool,
}

impl Default for DelimitedFormat {
    fn default() -> Self {
        Self::new('/')
    }
}

impl DelimitedFormat {
    /// Split on `delimiter`, siblings in source order.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            sorted: false,
            case_insensitive: false,
        }
    }

    /// Order siblings lexicographically.
    pub fn with_sorting(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Compare segments ignoring ASCII case. Grouping still uses exact equality.
    pub fn with_case_insensitive_order(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// Configured delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }
}

impl<E: AsRef<str>> TreeFormat<E> for DelimitedFormat {
    type Segment = String;

    fn path(&self, element: &E) -> Vec<String> {
        element
            .as_ref()
            .split(self.delimiter)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn sibling_order(&self, _depth: usize) -> SiblingOrder {
        if self.sorted {
            SiblingOrder::Sorted
        } else {
            SiblingOrder::Source
        }
    }

    fn compare_segments(&self, _depth: usize, a: &String, b: &String) -> Ordering {
        if self.case_insensitive {
            a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase())
        } else {
            a.cmp(b)
        }
    }
}
