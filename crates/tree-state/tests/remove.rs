mod common;

use common::{fixture_state, Recorder};
use serde_json::json;
use tree_state::{State, StateError, Toolset};

#[test]
fn test_remove_deep_key() {
    let state = fixture_state();
    state.remove("/posts/new/0/id").wait().unwrap();
    assert_eq!(state.get("posts"), Some(json!({"new": [{}, {"id": 2}]})));
}

#[test]
fn test_remove_notifies_removed_path_and_ancestors() {
    let state = fixture_state();
    let recorder = Recorder::new();
    recorder.listen_all(
        &state,
        &["@", "posts", "posts/new", "posts/new/0", "posts/new/0/id"],
    );

    state
        .mutate(|tools| tools.remove("/posts/new/0/id"))
        .wait()
        .unwrap();
    assert_eq!(recorder.count("@"), 1);
    assert_eq!(
        recorder.payloads("posts"),
        vec![Some(json!({"new": [{}, {"id": 2}]}))]
    );
    assert_eq!(recorder.count("posts/new"), 1);
    assert_eq!(recorder.payloads("posts/new/0"), vec![Some(json!({}))]);
    assert_eq!(recorder.payloads("posts/new/0/id"), vec![None]);
    recorder.clear();

    state
        .mutate(|tools| tools.remove("/posts/old/0/id"))
        .wait()
        .unwrap();
    assert_eq!(state.get("posts"), Some(json!({"new": [{}, {"id": 2}]})));
    assert_eq!(recorder.total(), 0);
}

#[test]
fn test_remove_missing_key_is_silent() {
    let state = fixture_state();
    let recorder = Recorder::new();
    recorder.listen_all(&state, &["@", "posts"]);

    state.remove("posts/missing").wait().unwrap();
    state.remove("posts/new/0/id/deeper").wait().unwrap();
    state.remove("posts/new/7").wait().unwrap();

    assert_eq!(recorder.total(), 0);
}

#[test]
fn test_remove_container_clears_descendants() {
    let state = fixture_state();
    let recorder = Recorder::new();
    recorder.listen_all(&state, &["posts", "posts/new", "posts/new/0/id", "users"]);

    state.remove("posts").wait().unwrap();

    assert_eq!(state.get("posts"), None);
    assert_eq!(recorder.payloads("posts"), vec![None]);
    assert_eq!(recorder.payloads("posts/new"), vec![None]);
    assert_eq!(recorder.payloads("posts/new/0/id"), vec![None]);
    assert_eq!(recorder.count("users"), 0);
}

#[test]
fn test_remove_sequence_elements() {
    let state = State::with_initial(json!({"list": [1, 2, 3]})).unwrap();

    state.remove("list/0").wait().unwrap();
    assert_eq!(state.get("list"), Some(json!([null, 2, 3])));

    state.remove("list/2").wait().unwrap();
    assert_eq!(state.get("list"), Some(json!([null, 2])));
}

#[test]
fn test_removed_sequence_hole_notifies_what_get_returns() {
    let state = State::with_initial(json!({"list": [1, 2, 3]})).unwrap();
    let recorder = Recorder::new();
    recorder.listen_all(&state, &["list/0", "list/2"]);

    state.remove("list/0").wait().unwrap();
    assert_eq!(recorder.payloads("list/0"), vec![state.get("list/0")]);
    assert_eq!(state.get("list/0"), Some(json!(null)));

    state.remove("list/2").wait().unwrap();
    assert_eq!(recorder.payloads("list/2"), vec![state.get("list/2")]);
    assert_eq!(state.get("list/2"), None);
}

#[test]
fn test_remove_after_set() {
    let state = State::new().unwrap();
    state.set("a/b", json!("value"));
    state.remove("a/b");
    state.wait_for_mutations();
    assert_eq!(state.get("a/b"), None);
    assert_eq!(state.get("a"), Some(json!({})));
}

#[test]
fn test_remove_root_fails() {
    let state = fixture_state();
    let err = state.mutate(|tools| tools.remove("")).wait().unwrap_err();
    assert_eq!(err, StateError::InvalidPath);
    assert_eq!(err.to_string(), "Invalid path to value");
    assert_eq!(state.snapshot(), common::fixture());
}
