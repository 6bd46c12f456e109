#![allow(dead_code)]

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use treelist::{ChangeKind, ListEvent, TreeFormat, TreeList};

/// Concatenated segments, with `*` appended for virtual rows.
pub fn label<E, S: Display>(row: treelist::TreeRow<'_, E, S>) -> String {
    let mut label: String = row.path().iter().map(ToString::to_string).collect();
    if row.is_virtual() {
        label.push('*');
    }
    label
}

/// Labels of the visible rows.
pub fn labels<E, F>(tree: &TreeList<E, F>) -> Vec<String>
where
    F: TreeFormat<E>,
    F::Segment: Display,
{
    tree.rows().map(label).collect()
}

/// Labels of every node, hidden ones included.
pub fn node_labels<E, F>(tree: &TreeList<E, F>) -> Vec<String>
where
    F: TreeFormat<E>,
    F::Segment: Display,
{
    tree.nodes().map(label).collect()
}

/// Captures published batches.
pub fn record<E, F: TreeFormat<E>>(tree: &mut TreeList<E, F>) -> Rc<RefCell<Vec<ListEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    tree.add_listener(move |event| sink.borrow_mut().push(event.clone()));
    events
}

/// Replays published batches onto a copy of the rows and checks the copy
/// against the tree after every [`Mirror::sync`].
pub struct Mirror {
    rows: Vec<String>,
    events: Rc<RefCell<Vec<ListEvent>>>,
}

impl Mirror {
    pub fn attach<E, F>(tree: &mut TreeList<E, F>) -> Self
    where
        F: TreeFormat<E>,
        F::Segment: Display,
    {
        Self {
            rows: labels(tree),
            events: record(tree),
        }
    }

    /// Number of batches received since the last sync.
    pub fn pending(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn sync<E, F>(&mut self, tree: &TreeList<E, F>)
    where
        F: TreeFormat<E>,
        F::Segment: Display,
    {
        let mut replay: Vec<Option<String>> = self.rows.drain(..).map(Some).collect();
        for event in self.events.borrow_mut().drain(..) {
            let mut previous = 0;
            for change in event.iter() {
                assert!(
                    change.index >= previous,
                    "indices decrease within batch {event}"
                );
                previous = change.index;
                match change.kind {
                    ChangeKind::Insert => {
                        assert!(change.index <= replay.len(), "insert past end in {event}");
                        replay.insert(change.index, None);
                    }
                    ChangeKind::Update => {
                        assert!(change.index < replay.len(), "update past end in {event}");
                        replay[change.index] = None;
                    }
                    ChangeKind::Delete => {
                        assert!(change.index < replay.len(), "delete past end in {event}");
                        replay.remove(change.index);
                    }
                }
            }
        }

        let actual = labels(tree);
        assert_eq!(replay.len(), actual.len(), "row count diverged");
        for (index, (kept, now)) in replay.iter().zip(&actual).enumerate() {
            if let Some(kept) = kept {
                assert_eq!(kept, now, "row {index} changed without an event");
            }
        }
        self.rows = actual;
    }
}

/// Tree over `elements`, one segment per character, all expanded.
pub fn char_tree(elements: &[&'static str]) -> TreeList<&'static str, treelist::CharacterFormat> {
    TreeList::from_source(
        elements.iter().copied(),
        treelist::CharacterFormat::new(),
        treelist::ExpansionPolicy::Expanded,
    )
    .expect("tree builds")
}

pub const GROUPED: [&str; 6] = ["ABC", "ABD", "ABEFG", "ABEFH", "ACD", "ACE"];
