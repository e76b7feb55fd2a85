use serde_json::json;
use tree_state_path::{
    lookup, lookup_strict, navigate, write_child, NavigateError, NavigateOptions, Traversed,
};

fn fixture() -> serde_json::Value {
    json!({"posts": {"new": [{"id": 1}, {"id": 2}]}, "users": {"old": [{"id": 3}, {"id": 4}]}})
}

#[test]
fn navigate_reports_every_traversed_ancestor() {
    let mut doc = fixture();
    let (nav, parent) = navigate(&mut doc, "posts/new/0/id", NavigateOptions::check());
    assert!(nav.is_ok());
    assert_eq!(parent, Some(&mut json!({"id": 1})));
    assert_eq!(nav.path, "posts/new/0/id");
    assert_eq!(nav.target_key, "id");
    assert!(!nav.target_is_root);
    let paths: Vec<&str> = nav.traverse.iter().map(|t| t.path.as_str()).collect();
    assert_eq!(paths, vec!["posts", "posts/new", "posts/new/0"]);
    assert!(!nav.created_any());
}

#[test]
fn navigate_root_path() {
    let mut doc = fixture();
    let (nav, parent) = navigate(&mut doc, "/", NavigateOptions::build());
    assert!(nav.target_is_root);
    assert!(nav.traverse.is_empty());
    assert_eq!(nav.target_key, "");
    assert_eq!(parent.map(|p| p.clone()), Some(fixture()));
}

#[test]
fn navigate_builds_missing_intermediates() {
    let mut doc = json!({});
    let (nav, parent) = navigate(&mut doc, "x/y/z", NavigateOptions::build());
    assert!(nav.is_ok());
    assert!(parent.is_some());
    assert_eq!(
        nav.traverse,
        vec![
            Traversed {
                path: "x".to_string(),
                created: true
            },
            Traversed {
                path: "x/y".to_string(),
                created: true
            },
        ]
    );
    assert_eq!(doc, json!({"x": {"y": {}}}));
}

#[test]
fn navigate_through_includes_the_target() {
    let mut doc = fixture();
    let (nav, target) = navigate(&mut doc, "posts/meta", NavigateOptions::build_through());
    assert!(nav.is_ok());
    assert_eq!(target, Some(&mut json!({})));
    assert_eq!(nav.traverse.last().map(|t| t.created), Some(true));
    assert_eq!(doc["posts"]["meta"], json!({}));
}

#[test]
fn navigate_without_building_stops_at_missing_node() {
    let mut doc = fixture();
    let (nav, parent) = navigate(&mut doc, "posts/old/0/id", NavigateOptions::check());
    assert!(parent.is_none());
    assert_eq!(
        nav.error,
        Some(NavigateError::Absent {
            at: "posts/old".to_string()
        })
    );
    assert_eq!(nav.traverse.len(), 1);
    assert_eq!(doc, fixture());
}

#[test]
fn navigate_never_passes_through_scalars() {
    let mut doc = fixture();
    let (nav, parent) = navigate(
        &mut doc,
        "/posts/new/0/id/1/more/deep",
        NavigateOptions::build(),
    );
    assert!(parent.is_none());
    assert_eq!(
        nav.error,
        Some(NavigateError::NotContainer {
            at: "posts/new/0/id".to_string()
        })
    );
    assert_eq!(doc, fixture());
}

#[test]
fn failed_navigation_creates_nothing() {
    let mut doc = json!({"a": {"b": 1}});
    let (nav, _) = navigate(&mut doc, "a/b/c/d", NavigateOptions::build());
    assert!(!nav.is_ok());
    assert_eq!(doc, json!({"a": {"b": 1}}));
}

#[test]
fn navigate_rejects_words_as_sequence_indices() {
    let mut doc = fixture();
    let (nav, _) = navigate(&mut doc, "posts/new/first/id", NavigateOptions::build());
    assert_eq!(
        nav.error,
        Some(NavigateError::BadIndex {
            at: "posts/new/first".to_string()
        })
    );
}

#[test]
fn navigate_appends_one_past_the_end() {
    let mut doc = fixture();
    let (nav, parent) = navigate(&mut doc, "posts/new/2/id", NavigateOptions::build());
    assert!(nav.is_ok());
    let parent = parent.unwrap();
    write_child(parent, &nav.target_key, json!(9)).unwrap();
    assert_eq!(doc["posts"]["new"], json!([{"id": 1}, {"id": 2}, {"id": 9}]));
}

#[test]
fn lookup_reads_values() {
    let doc = fixture();
    assert_eq!(lookup(&doc, ""), Some(&doc));
    assert_eq!(lookup(&doc, "/posts//new/1/id"), Some(&json!(2)));
    assert_eq!(lookup(&doc, "/users/old"), Some(&json!([{"id": 3}, {"id": 4}])));
    assert_eq!(lookup(&doc, "/not/a/path/to/something"), None);
    assert_eq!(lookup(&doc, "posts/new/0/id/deeper"), None);
}

#[test]
fn lookup_strict_rejects_broken_paths() {
    let doc = fixture();
    assert_eq!(
        lookup_strict(&doc, "/users//cat/1/name"),
        Err(NavigateError::Absent {
            at: "users/cat".to_string()
        })
    );
    assert_eq!(lookup_strict(&doc, "users/missing"), Ok(None));
    assert_eq!(lookup_strict(&doc, "users/old/1/id"), Ok(Some(&json!(4))));
}
