use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use blake3::Hasher;
use treelist::{DelimitedFormat, ExpansionPolicy, TreeList};

const PATHS: [&str; 8] = [
    "src/tree/list.rs",
    "src/tree/node.rs",
    "src/event/deltas.rs",
    "src/lib.rs",
    "tests/tree_list.rs",
    "benches/tree_bench.rs",
    "src/tree/format.rs",
    "Cargo.toml",
];

/// Runs a fixed edit script and returns a fingerprint of every published
/// batch followed by the final rows.
fn run_script() -> blake3::Hash {
    let log = Rc::new(RefCell::new(String::new()));
    let mut tree = TreeList::new(
        DelimitedFormat::new('/').with_sorting(true),
        ExpansionPolicy::Expanded,
    );
    {
        let log = Rc::clone(&log);
        tree.add_listener(move |event| {
            log.borrow_mut().push_str(&event.to_string());
            log.borrow_mut().push('\n');
        });
    }

    tree.extend_source(PATHS.iter().map(|path| path.to_string()))
        .expect("paths are valid");
    tree.set_expanded(0, false).expect("row exists");
    tree.remove_source(3).expect("element exists");
    tree.set_source(0, "src/tree/mod.rs".to_string())
        .expect("element exists");
    tree.sort_source_by(|a, b| a.cmp(b)).expect("sort succeeds");
    tree.toggle_expanded(0).expect("row exists");

    let mut hasher = Hasher::new();
    hasher.update(log.borrow().as_bytes());
    for row in tree.rows() {
        hasher.update(row.path().join("/").as_bytes());
        hasher.update(&[u8::from(row.is_virtual()), u8::from(row.is_expanded())]);
    }
    hasher.finalize()
}

#[test]
fn edit_script_is_deterministic() {
    let fingerprints: HashSet<_> = (0..5).map(|_| run_script()).collect();
    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}
