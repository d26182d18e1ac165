//! Delete Policy Tests
//!
//! - Deleting an instance removes every edge it takes part in
//! - A user who authored something cannot be deleted
//! - Deleting a pull request deletes its comments
//! - The last comment of a pull request cannot be deleted on its own
//! - A rejected delete changes nothing

use reviewdb::model::{InstanceId, ModelStore};
use reviewdb::schema::builtin::{
    ASSIGNEES, AUTHOR, COMMENT, COMMENTS, FOLLOWEES, PULL_REQUEST, TODO, USER,
};
use reviewdb::schema::SchemaErrorCode;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn store() -> ModelStore {
    ModelStore::with_review_schema().unwrap()
}

fn create_user(store: &mut ModelStore, login: &str) -> InstanceId {
    store
        .create(USER, json!({"login": login, "firstname": "F", "lastname": "L"}))
        .unwrap()
}

fn open_pull_request(store: &mut ModelStore, author: InstanceId) -> (InstanceId, InstanceId) {
    store
        .transaction(|tx| {
            let pr = tx.create(PULL_REQUEST, json!({"title": "t", "body": "b"}))?;
            let comment = tx.create(COMMENT, json!({"body": "c"}))?;
            tx.link(pr, AUTHOR, author)?;
            tx.link(comment, AUTHOR, author)?;
            tx.link(pr, COMMENTS, comment)?;
            Ok((pr, comment))
        })
        .unwrap()
}

// =============================================================================
// Nullify Tests
// =============================================================================

/// Deleting a user drops follow edges in both directions.
#[test]
fn test_delete_user_detaches_follow_edges() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let bob = create_user(&mut store, "bob");
    store.link(amy, FOLLOWEES, bob).unwrap();
    store.link(bob, FOLLOWEES, amy).unwrap();

    assert_eq!(store.delete(bob).unwrap(), vec![bob]);

    assert!(store.get(bob).is_none());
    assert!(store.neighbors(amy, FOLLOWEES).unwrap().is_empty());
    assert_eq!(store.edge_count(), 0);
    assert_eq!(store.find_unique(USER, "login", &json!("bob")), None);
}

/// Deleting an assignee only removes the assignment.
#[test]
fn test_delete_assignee() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let bob = create_user(&mut store, "bob");
    let (pr, _) = open_pull_request(&mut store, amy);
    store.link(pr, ASSIGNEES, bob).unwrap();
    store.link_with(bob, TODO, pr, json!({"weight": 2})).unwrap();

    store.delete(bob).unwrap();

    assert!(store.neighbors(pr, ASSIGNEES).unwrap().is_empty());
    assert!(store.get(pr).is_some());
    assert!(store.validate(pr).is_ok());
}

/// A login freed by deletion can be reused.
#[test]
fn test_deleted_login_reusable() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    store.delete(amy).unwrap();

    let again = create_user(&mut store, "amy");
    assert_ne!(again, amy);
}

// =============================================================================
// Restrict Tests
// =============================================================================

/// An author cannot be deleted while their work exists.
#[test]
fn test_delete_author_restricted() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let (pr, comment) = open_pull_request(&mut store, amy);

    let err = store.delete(amy).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::CardinalityViolation);

    assert!(store.get(amy).is_some());
    assert_eq!(store.neighbors(pr, AUTHOR).unwrap(), vec![amy]);
    assert_eq!(store.neighbors(comment, AUTHOR).unwrap(), vec![amy]);
}

/// The last comment of a pull request cannot be deleted alone.
#[test]
fn test_delete_last_comment_restricted() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let (pr, comment) = open_pull_request(&mut store, amy);

    let err = store.delete(comment).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::CardinalityViolation);
    assert_eq!(store.neighbors(pr, COMMENTS).unwrap(), vec![comment]);
}

/// One of several comments may be deleted.
#[test]
fn test_delete_one_of_two_comments() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let (pr, first) = open_pull_request(&mut store, amy);
    let second = store
        .transaction(|tx| {
            let c = tx.create(COMMENT, json!({"body": "second"}))?;
            tx.link(c, AUTHOR, amy)?;
            tx.link(pr, COMMENTS, c)?;
            Ok(c)
        })
        .unwrap();

    store.delete(first).unwrap();
    assert_eq!(store.neighbors(pr, COMMENTS).unwrap(), vec![second]);
}

// =============================================================================
// Cascade Tests
// =============================================================================

/// Deleting a pull request deletes its comments.
#[test]
fn test_delete_pull_request_cascades() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let (pr, comment) = open_pull_request(&mut store, amy);

    let deleted = store.delete(pr).unwrap();
    assert_eq!(deleted, vec![pr, comment]);

    assert!(store.get(pr).is_none());
    assert!(store.get(comment).is_none());
    assert_eq!(store.edge_count(), 0);

    // With nothing authored, amy can now go
    store.delete(amy).unwrap();
    assert!(store.is_empty());
}

/// Deleting the pull request and then its author in one transaction works.
#[test]
fn test_delete_pull_request_and_author_together() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    open_pull_request(&mut store, amy);
    let (pr, _) = open_pull_request(&mut store, amy);

    let err = store
        .transaction(|tx| {
            tx.delete(pr)?;
            tx.delete(amy)
        })
        .unwrap_err();
    // amy still authors the first pull request
    assert_eq!(err.code(), SchemaErrorCode::CardinalityViolation);
    assert_eq!(store.instances_of(PULL_REQUEST).count(), 2);
}

/// Deleting an unknown id fails cleanly.
#[test]
fn test_delete_unknown_instance() {
    let mut store = store();
    let err = store.delete(InstanceId::new()).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::InstanceNotFound);
}

/// Metrics count cascaded deletes and detached edges.
#[test]
fn test_delete_metrics() {
    let mut store = store();
    let amy = create_user(&mut store, "amy");
    let (pr, _) = open_pull_request(&mut store, amy);

    store.delete(pr).unwrap();

    let metrics = store.metrics();
    assert_eq!(metrics.deletes, 2);
    assert_eq!(metrics.unlinks, 3);
    assert_eq!(metrics.instances, 1);
    assert_eq!(metrics.edges, 0);
}
