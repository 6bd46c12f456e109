mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{char_tree, labels, node_labels, record, Mirror, GROUPED};
use treelist::{
    CharacterFormat, DelimitedFormat, ExpansionPolicy, ListChange, PathExpansionModel, TreeError,
    TreeFormat, TreeList, TreeListConfig,
};

#[test]
fn grouped_paths_flatten_in_pre_order() {
    let tree = char_tree(&GROUPED);
    assert_eq!(
        labels(&tree),
        vec![
            "A*", "AB*", "ABC", "ABD", "ABE*", "ABEF*", "ABEFG", "ABEFH", "AC*", "ACD", "ACE"
        ]
    );
    assert_eq!(tree.len(), 11);
    assert_eq!(tree.total_len(), 11);
}

#[test]
fn removing_a_leaf_touches_nothing_else() {
    let mut tree = char_tree(&GROUPED);
    let mut mirror = Mirror::attach(&mut tree);

    assert_eq!(tree.remove_source(1), Ok("ABD"));
    mirror.sync(&tree);
    assert_eq!(
        labels(&tree),
        vec!["A*", "AB*", "ABC", "ABE*", "ABEF*", "ABEFG", "ABEFH", "AC*", "ACD", "ACE"]
    );
}

#[test]
fn virtual_ancestors_vanish_with_their_last_child() {
    let mut tree = char_tree(&["ABC"]);
    assert_eq!(labels(&tree), vec!["A*", "AB*", "ABC"]);
    let events = record(&mut tree);

    assert_eq!(tree.remove(2), Ok("ABC"));
    assert!(tree.is_empty());
    assert_eq!(tree.total_len(), 0);
    assert_eq!(
        events.borrow()[0].changes(),
        &[ListChange::delete(0), ListChange::delete(0), ListChange::delete(0)]
    );
}

#[test]
fn element_at_a_virtual_path_promotes_the_node() {
    let mut tree = char_tree(&["ABC"]);
    let events = record(&mut tree);

    tree.push_source("A").unwrap();
    assert_eq!(labels(&tree), vec!["A", "AB*", "ABC"]);
    assert_eq!(tree.total_len(), 3);
    assert_eq!(events.borrow()[0].changes(), &[ListChange::update(0)]);
    assert_eq!(tree.source_index(0), Ok(Some(1)));
}

#[test]
fn removing_a_parent_demotes_it() {
    let mut tree = char_tree(&["A", "ABC"]);
    assert_eq!(labels(&tree), vec!["A", "AB*", "ABC"]);
    let mut mirror = Mirror::attach(&mut tree);

    assert_eq!(tree.remove(0), Ok("A"));
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["A*", "AB*", "ABC"]);
    assert_eq!(tree.source_index(0), Ok(None));
}

#[test]
fn subtree_sizes() {
    let mut tree = char_tree(&["ABCD", "ABEFG", "ACDC", "ACE"]);
    assert_eq!(tree.subtree_size(0, true, true), Ok(11));
    assert_eq!(tree.subtree_size(0, true, false), Ok(10));
    assert_eq!(tree.subtree_size(1, false, false), Ok(5));

    tree.set_expanded(1, false).unwrap();
    assert_eq!(tree.subtree_size(0, true, true), Ok(11));
    assert_eq!(tree.subtree_size(0, false, true), Ok(6));
    assert_eq!(tree.subtree_size(1, false, true), Ok(1));
    assert_eq!(tree.subtree_size(1, true, true), Ok(6));
}

#[test]
fn collapse_hides_and_expand_restores() {
    let mut tree = char_tree(&GROUPED);
    let mut mirror = Mirror::attach(&mut tree);
    let before = labels(&tree);

    tree.set_expanded(4, false).unwrap();
    mirror.sync(&tree);
    tree.set_expanded(1, false).unwrap();
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["A*", "AB*", "AC*", "ACD", "ACE"]);

    tree.set_expanded(1, true).unwrap();
    mirror.sync(&tree);
    assert_eq!(
        labels(&tree),
        vec!["A*", "AB*", "ABC", "ABD", "ABE*", "AC*", "ACD", "ACE"]
    );
    assert!(!tree.is_expanded(4).unwrap());

    tree.set_expanded(4, true).unwrap();
    mirror.sync(&tree);
    assert_eq!(labels(&tree), before);
}

#[test]
fn collapsing_an_already_collapsed_row_is_silent() {
    let mut tree = char_tree(&GROUPED);
    tree.set_expanded(8, false).unwrap();
    let events = record(&mut tree);
    tree.set_expanded(8, false).unwrap();
    assert!(events.borrow().is_empty());
    assert_eq!(tree.toggle_expanded(8), Ok(true));
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn collapsed_policy_shows_only_roots() {
    let tree = TreeList::from_source(GROUPED, CharacterFormat::new(), ExpansionPolicy::Collapsed)
        .unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.total_len(), 11);
    assert_eq!(node_labels(&tree).len(), 11);
    assert!(tree.has_children(0).unwrap());
}

#[test]
fn setting_the_same_value_keeps_collapse_state() {
    let mut tree = char_tree(&["A", "AB", "ABC"]);
    tree.set_expanded(0, false).unwrap();
    let events = record(&mut tree);

    assert_eq!(tree.set(0, "A"), Ok("A"));
    assert!(!tree.is_expanded(0).unwrap());
    assert_eq!(tree.len(), 1);
    assert_eq!(events.borrow()[0].changes(), &[ListChange::update(0)]);
}

#[test]
fn hidden_same_path_update_is_not_published() {
    let mut tree = char_tree(&GROUPED);
    tree.set_expanded(8, false).unwrap();
    let events = record(&mut tree);

    assert_eq!(tree.set_source(4, "ACD"), Ok("ACD"));
    assert!(events.borrow().is_empty());
    assert!(!tree.is_expanded(8).unwrap());
}

#[test]
fn changing_the_path_moves_the_node() {
    let mut tree = char_tree(&GROUPED);
    let mut mirror = Mirror::attach(&mut tree);

    assert_eq!(tree.set_source(1, "ACF"), Ok("ABD"));
    mirror.sync(&tree);
    // ACF sits at source index 1, ahead of ACD and ACE
    assert_eq!(
        labels(&tree),
        vec!["A*", "AB*", "ABC", "ABE*", "ABEF*", "ABEFG", "ABEFH", "AC*", "ACF", "ACD", "ACE"]
    );

    assert_eq!(tree.set_source(0, "B"), Ok("ABC"));
    mirror.sync(&tree);
    assert_eq!(labels(&tree)[0], "B");
    assert_eq!(tree.parent_index(1), Ok(None));
}

#[test]
fn virtual_rows_cannot_be_edited_by_row() {
    let mut tree = char_tree(&GROUPED);
    assert_eq!(tree.remove(0), Err(TreeError::VirtualNode { index: 0 }));
    assert_eq!(tree.set(1, "X"), Err(TreeError::VirtualNode { index: 1 }));
    assert_eq!(tree.len(), 11);
}

#[test]
fn bad_indices_are_errors() {
    let mut tree = char_tree(&GROUPED);
    let size = tree.len();
    assert_eq!(
        tree.set_expanded(size, true),
        Err(TreeError::IndexOutOfBounds { index: size, size })
    );
    assert!(tree.subtree_size(99, true, true).is_err());
    assert!(tree.is_expanded(11).is_err());
    assert_eq!(
        tree.remove_source(6),
        Err(TreeError::IndexOutOfBounds { index: 6, size: 6 })
    );
    assert!(tree.visible_index_of_source(6).is_err());
}

#[test]
fn navigation_queries() {
    let mut tree = char_tree(&GROUPED);
    assert_eq!(tree.depth(6), Ok(4));
    assert_eq!(tree.parent_index(6), Ok(Some(5)));
    assert_eq!(tree.parent_index(8), Ok(Some(0)));
    assert_eq!(tree.source_index(6), Ok(Some(2)));
    assert_eq!(tree.get(6).unwrap().element(), Some(&"ABEFG"));
    assert_eq!(*tree.get(6).unwrap().segment(), 'G');
    assert!(!tree.has_children(6).unwrap());

    tree.set_expanded(1, false).unwrap();
    assert_eq!(tree.visible_index_of_source(0), Ok(None));
    assert_eq!(tree.visible_index_of_source(4), Ok(Some(3)));
}

#[test]
fn transactions_publish_once_at_the_outermost_commit() {
    let mut tree = char_tree(&[]);
    let mut mirror = Mirror::attach(&mut tree);

    tree.begin_event();
    tree.push_source("ABC").unwrap();
    tree.begin_event();
    tree.push_source("ABD").unwrap();
    tree.remove_source(0).unwrap();
    tree.commit_event().unwrap();
    assert_eq!(mirror.pending(), 0);
    assert_eq!(tree.len(), 3);
    tree.push_source("B").unwrap();
    tree.commit_event().unwrap();

    assert_eq!(mirror.pending(), 1);
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["A*", "AB*", "ABD", "B"]);
    assert!(!tree.in_transaction());
    assert!(matches!(tree.commit_event(), Err(TreeError::Event(_))));
}

#[test]
fn transaction_closure_returns_its_result() {
    let mut tree = char_tree(&["A"]);
    let events = record(&mut tree);
    let removed = tree
        .transaction(|tree| {
            tree.push_source("AB")?;
            tree.remove_source(0)
        })
        .unwrap();
    assert_eq!(removed, Ok("A"));
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(labels(&tree), vec!["A*", "AB"]);
}

#[test]
fn listeners_run_in_registration_order_until_removed() {
    let mut tree = char_tree(&[]);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let first = {
        let calls = Rc::clone(&calls);
        tree.add_listener(move |_| calls.borrow_mut().push("first"))
    };
    {
        let calls = Rc::clone(&calls);
        tree.add_listener(move |_| calls.borrow_mut().push("second"));
    }

    tree.push_source("A").unwrap();
    assert_eq!(*calls.borrow(), vec!["first", "second"]);

    assert!(tree.remove_listener(first));
    assert!(!tree.remove_listener(first));
    tree.push_source("B").unwrap();
    assert_eq!(*calls.borrow(), vec!["first", "second", "second"]);
}

#[test]
fn clear_source_empties_the_tree() {
    let mut tree = char_tree(&GROUPED);
    let mut mirror = Mirror::attach(&mut tree);
    tree.clear_source().unwrap();
    mirror.sync(&tree);
    assert!(tree.is_empty());
    assert_eq!(tree.source_len(), 0);
    assert_eq!(tree.total_len(), 0);
}

#[test]
fn sorting_the_source_reorders_siblings() {
    let mut tree = char_tree(&["B1", "A1", "B2"]);
    assert_eq!(labels(&tree), vec!["B*", "B1", "B2", "A*", "A1"]);
    tree.set_expanded(0, false).unwrap();
    let mut mirror = Mirror::attach(&mut tree);

    tree.sort_source_by(|a, b| a.cmp(b)).unwrap();
    mirror.sync(&tree);
    assert_eq!(tree.source_iter().copied().collect::<Vec<_>>(), vec!["A1", "B1", "B2"]);
    assert_eq!(labels(&tree), vec!["A*", "A1", "B*"]);
    assert!(!tree.is_expanded(2).unwrap());
}

#[test]
fn degenerate_sort_changes_nothing() {
    let mut tree = char_tree(&GROUPED);
    let before = labels(&tree);
    let events = record(&mut tree);
    tree.sort_source_by(|_, _| std::cmp::Ordering::Equal).unwrap();
    assert_eq!(labels(&tree), before);
    assert!(events.borrow().is_empty());
}

#[test]
fn sorted_format_orders_by_segment() {
    let mut tree =
        TreeList::from_source(["C", "B", "A", "BA"], CharacterFormat::sorted(), ExpansionPolicy::Expanded)
            .unwrap();
    assert_eq!(labels(&tree), vec!["A", "B", "BA", "C"]);

    let mut mirror = Mirror::attach(&mut tree);
    tree.push_source("AB").unwrap();
    tree.insert_source(0, "BB").unwrap();
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["A", "AB", "B", "BA", "BB", "C"]);
}

#[test]
fn format_swap_keeps_expand_state_by_path() {
    let source = ["b/1", "a/2", "b/3"].map(String::from);
    let mut tree =
        TreeList::from_source(source, DelimitedFormat::new('/'), ExpansionPolicy::Expanded).unwrap();
    assert_eq!(labels(&tree), vec!["b*", "b1", "b3", "a*", "a2"]);
    tree.set_expanded(0, false).unwrap();
    let mut mirror = Mirror::attach(&mut tree);

    tree.set_format(DelimitedFormat::new('/').with_sorting(true)).unwrap();
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["a*", "a2", "b*"]);
    assert!(!tree.is_expanded(2).unwrap());
    assert_eq!(tree.total_len(), 5);
}

#[test]
fn rejected_format_leaves_the_tree_alone() {
    let source = ["x.y"].map(String::from);
    let config = TreeListConfig::default().with_max_depth(1);
    let mut tree = TreeList::with_config(DelimitedFormat::new('/'), config).unwrap();
    tree.extend_source(source).unwrap();

    assert_eq!(
        tree.set_format(DelimitedFormat::new('.')),
        Err(TreeError::PathTooDeep { depth: 2, max: 1 })
    );
    assert_eq!(labels(&tree), vec!["x.y"]);
    assert_eq!(tree.format().delimiter(), '/');
}

/// Nodes never host children.
#[derive(Debug)]
struct Leaves;

impl TreeFormat<&'static str> for Leaves {
    type Segment = char;

    fn path(&self, element: &&'static str) -> Vec<char> {
        element.chars().collect()
    }

    fn allows_children(&self, _element: &&'static str) -> bool {
        false
    }
}

#[test]
fn childless_nodes_get_a_virtual_sibling() {
    let mut tree = TreeList::from_source(["A", "AB"], Leaves, ExpansionPolicy::Expanded).unwrap();
    assert_eq!(labels(&tree), vec!["A", "A*", "AB"]);
    assert!(!tree.get(0).unwrap().allows_children());
    let mut mirror = Mirror::attach(&mut tree);

    tree.remove_source(0).unwrap();
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["A*", "AB"]);

    // Promotion keeps the children already there.
    tree.push_source("A").unwrap();
    mirror.sync(&tree);
    assert_eq!(labels(&tree), vec!["A", "AB"]);
    assert!(!tree.get(0).unwrap().allows_children());
}

#[test]
fn virtual_state_resets_across_delete_and_reinsert() {
    let mut tree = char_tree(&["AB"]);
    tree.set_expanded(0, false).unwrap();
    tree.transaction(|tree| {
        tree.remove_source(0)?;
        tree.push_source("AB")
    })
    .unwrap()
    .unwrap();
    assert!(tree.is_expanded(0).unwrap());
    assert_eq!(tree.len(), 2);
}

#[test]
fn path_model_restores_virtual_state() {
    let model = PathExpansionModel::new(ExpansionPolicy::Expanded);
    let mut tree =
        TreeList::with_expansion_model(CharacterFormat::new(), model, TreeListConfig::default())
            .unwrap();
    tree.push_source("AB").unwrap();
    tree.set_expanded(0, false).unwrap();

    let mut mirror = Mirror::attach(&mut tree);
    tree.transaction(|tree| {
        tree.remove_source(0)?;
        tree.push_source("AB")
    })
    .unwrap()
    .unwrap();
    mirror.sync(&tree);
    assert!(!tree.is_expanded(0).unwrap());
    assert_eq!(tree.len(), 1);
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = TreeListConfig::default().with_max_depth(0);
    assert!(matches!(
        TreeList::<&str, _>::with_config(CharacterFormat::new(), config),
        Err(TreeError::InvalidConfiguration(_))
    ));
}
