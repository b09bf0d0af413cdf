use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use toc_core::strategy::DeleteStrategy;
use toc_core::{RawSectionItem, normalize_items};
use toc_storage::{DeleteSectionRequest, SectionNode, SqliteStore, StoreError};

fn temp_storage_dir(label: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic enough for tests")
        .as_nanos();
    path.push(format!(
        "toc-storage-delete-{label}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&path).expect("temp storage dir must be creatable");
    path
}

fn raw(key: &str, name: &str, parent: Option<&str>) -> RawSectionItem {
    RawSectionItem {
        section_key: Some(key.to_string()),
        name: Some(name.to_string()),
        parent_key: parent.map(str::to_string),
        order: None,
    }
}

/// Roots r, x; x holds c1, c2; c1 holds g1, g2.
fn seed(label: &str) -> SqliteStore {
    let dir = temp_storage_dir(label);
    let mut store = SqliteStore::open(&dir).expect("fresh storage should open");
    let items = normalize_items(&[
        raw("r", "Before", None),
        raw("x", "Doomed", None),
        raw("c1", "Child One", Some("x")),
        raw("c2", "Child Two", Some("x")),
        raw("g1", "Grandchild One", Some("c1")),
        raw("g2", "Grandchild Two", Some("c1")),
    ])
    .expect("items should normalize");
    store.import_items(&items).expect("seed import should succeed");
    store
}

fn find<'a>(forest: &'a [SectionNode], key: &str) -> &'a SectionNode {
    let mut stack: Vec<&SectionNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        if node.section_key == key {
            return node;
        }
        stack.extend(node.children.iter());
    }
    panic!("section {key} not found in tree");
}

fn contains(forest: &[SectionNode], key: &str) -> bool {
    let mut stack: Vec<&SectionNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        if node.section_key == key {
            return true;
        }
        stack.extend(node.children.iter());
    }
    false
}

fn id_of(store: &SqliteStore, key: &str) -> i64 {
    find(&store.tree().expect("tree should project"), key).id
}

fn assert_contiguous(group: &[SectionNode]) {
    let mut orders: Vec<i64> = group.iter().map(|node| node.order).collect();
    orders.sort_unstable();
    let expected: Vec<i64> = (1..=group.len() as i64).collect();
    assert_eq!(orders, expected, "sibling orders must be exactly 1..=N");
    for node in group {
        assert_contiguous(&node.children);
    }
}

#[test]
fn lift_children_appends_them_after_existing_siblings() {
    let mut store = seed("lift-root");
    let x = id_of(&store, "x");

    store
        .delete_section(DeleteSectionRequest {
            id: x,
            strategy: DeleteStrategy::LiftChildren,
        })
        .expect("lift delete should succeed");

    let forest = store.tree().expect("tree should project");
    assert!(!contains(&forest, "x"));
    assert_eq!(store.counts().expect("counts").total, 5, "exactly one node gone");

    // Former children become roots after the surviving root, keeping
    // their relative order.
    assert_eq!(find(&forest, "r").order, 1);
    assert_eq!(find(&forest, "c1").order, 2);
    assert_eq!(find(&forest, "c2").order, 3);
    assert_eq!(find(&forest, "c1").parent_id, None);
    assert_contiguous(&forest);
}

#[test]
fn lift_children_of_a_nested_node_reattaches_to_grandparent() {
    let mut store = seed("lift-nested");
    let c1 = id_of(&store, "c1");
    let x = id_of(&store, "x");

    store
        .delete_section(DeleteSectionRequest {
            id: c1,
            strategy: DeleteStrategy::LiftChildren,
        })
        .expect("lift delete should succeed");

    let forest = store.tree().expect("tree should project");
    let x_node = find(&forest, "x");
    assert_eq!(x_node.id, x);
    let keys: Vec<&str> = x_node
        .children
        .iter()
        .map(|child| child.section_key.as_str())
        .collect();
    assert_eq!(keys, ["c2", "g1", "g2"], "gap closed, grandchildren appended");
    assert!(!x_node.is_leaf);
    assert_contiguous(&forest);
}

#[test]
fn cascade_removes_exactly_the_subtree() {
    let mut store = seed("cascade");
    let c1 = id_of(&store, "c1");

    store
        .delete_section(DeleteSectionRequest {
            id: c1,
            strategy: DeleteStrategy::Cascade,
        })
        .expect("cascade delete should succeed");

    let forest = store.tree().expect("tree should project");
    for gone in ["c1", "g1", "g2"] {
        assert!(!contains(&forest, gone), "{gone} must be removed");
    }
    assert_eq!(store.counts().expect("counts").total, 3);

    let x_node = find(&forest, "x");
    assert_eq!(x_node.children.len(), 1);
    assert_eq!(x_node.children[0].order, 1, "gap closed behind the subtree");
    assert!(!x_node.is_leaf);
    assert_contiguous(&forest);
}

#[test]
fn cascade_of_last_child_turns_parent_into_a_leaf() {
    let mut store = seed("leaf-flip");
    for key in ["c1", "c2"] {
        let id = id_of(&store, key);
        store
            .delete_section(DeleteSectionRequest {
                id,
                strategy: DeleteStrategy::Cascade,
            })
            .expect("cascade delete should succeed");
    }

    let forest = store.tree().expect("tree should project");
    assert!(find(&forest, "x").is_leaf, "childless parent is a leaf again");
    assert_contiguous(&forest);
}

#[test]
fn root_group_gap_is_closed_on_delete() {
    let dir = temp_storage_dir("root-gap");
    let mut store = SqliteStore::open(&dir).expect("fresh storage should open");
    let items = normalize_items(&[
        raw("r1", "One", None),
        raw("r2", "Two", None),
        raw("r3", "Three", None),
    ])
    .expect("items should normalize");
    store.import_items(&items).expect("seed import should succeed");

    let r2 = id_of(&store, "r2");
    store
        .delete_section(DeleteSectionRequest {
            id: r2,
            strategy: DeleteStrategy::Cascade,
        })
        .expect("cascade delete should succeed");

    let forest = store.tree().expect("tree should project");
    assert_eq!(find(&forest, "r1").order, 1);
    assert_eq!(find(&forest, "r3").order, 2);
    assert_contiguous(&forest);
}

#[test]
fn deleting_an_unknown_section_fails() {
    let mut store = seed("missing");
    let err = store
        .delete_section(DeleteSectionRequest {
            id: 9_999,
            strategy: DeleteStrategy::Cascade,
        })
        .expect_err("unknown section must fail");
    assert!(matches!(err, StoreError::NotFound(_)));
}
