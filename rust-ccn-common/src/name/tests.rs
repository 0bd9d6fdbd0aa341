//! Unit tests for content names

use super::*;
use std::collections::HashSet;

#[test]
fn test_name_creation() {
    let name = Name::from_string("/test/data/1");

    assert_eq!(name.len(), 3);
    assert_eq!(name.components(), ["test", "data", "1"]);
    assert_eq!(name.to_string(), "/test/data/1");
}

#[test]
fn test_root_name() {
    let root = Name::new();
    assert!(root.is_empty());
    assert_eq!(root.to_string(), "/");
    assert_eq!(Name::from_string("/"), root);
    assert_eq!(root.parent(), root);
}

#[test]
fn test_name_compare() {
    let name1 = Name::from_string("/a/b/c");
    let name2 = Name::from_string("a/b/c/");
    let name3 = Name::from_string("/a/b/d");
    let name4 = Name::from_string("/a/b");

    assert_eq!(name1, name2);
    assert_ne!(name1, name3);
    assert_ne!(name1, name4);

    let set: HashSet<Name> = [name1.clone(), name2, name3].into_iter().collect();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&name1));
}

#[test]
fn test_prefix_matching() {
    let abc = Name::from_string("/a/b/c");
    let ab = Name::from_string("/a/b");
    let abd = Name::from_string("/a/b/d");
    let root = Name::new();

    assert!(ab.is_prefix_of(&abc));
    assert!(abc.is_prefix_of(&abc));
    assert!(!abc.is_prefix_of(&ab));
    assert!(!abd.is_prefix_of(&abc));
    assert!(root.is_prefix_of(&abc));
    assert!(root.is_prefix_of(&root));
    assert!(!ab.is_prefix_of(&root));
}

#[test]
fn test_prefix_is_componentwise() {
    // "/ab" must not be a prefix of "/abc" even though the strings are.
    let ab = Name::from_string("/ab");
    let abc = Name::from_string("/abc");
    assert!(!ab.is_prefix_of(&abc));
}

#[test]
fn test_parent_and_child() {
    let name = Name::from_string("/a/b/c");
    let parent = name.parent();
    assert_eq!(parent, Name::from_string("/a/b"));
    assert_eq!(parent.parent().parent(), Name::new());

    // memoised: the same value comes back
    assert_eq!(name.parent(), parent);

    let child = parent.child(["c"]);
    assert_eq!(child, name);
    assert_eq!(parent.child(["x", "y"]).to_string(), "/a/b/x/y");
    // the original is untouched
    assert_eq!(parent.len(), 2);
}

#[test]
fn test_suffix() {
    let name = Name::from_string("/a/b/c/d");
    let prefix = Name::from_string("/a/b");

    assert_eq!(name.suffix(&prefix), Some(&["c".to_string(), "d".to_string()][..]));
    assert_eq!(name.suffix(&name), Some(&[][..]));
    assert_eq!(name.suffix(&Name::from_string("/x")), None);
    assert_eq!(prefix.suffix(&name), None);
}

#[test]
fn test_serde_as_string() {
    let name = Name::from_string("/video/cam1");
    let value: String = name.clone().into();
    assert_eq!(value, "/video/cam1");
    assert_eq!(Name::from(value), name);
}
