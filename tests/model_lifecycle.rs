//! Model Lifecycle Tests
//!
//! - Only committed instances are visible
//! - Transactions are all-or-nothing
//! - A shared store serializes concurrent writers

use std::sync::{Arc, Mutex};
use std::thread;

use reviewdb::model::{InstanceState, ModelStore};
use reviewdb::schema::builtin::{AUTHOR, COMMENT, COMMENTS, FOLLOWEES, PULL_REQUEST, USER};
use reviewdb::schema::SchemaErrorCode;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn store() -> ModelStore {
    ModelStore::with_review_schema().unwrap()
}

// =============================================================================
// Visibility Tests
// =============================================================================

/// Committed instances are in the Committed state.
#[test]
fn test_committed_state_after_create_and_update() {
    let mut store = store();
    let amy = store
        .create(USER, json!({"login": "amy", "firstname": "Amy", "lastname": "Li"}))
        .unwrap();
    assert_eq!(store.get(amy).unwrap().state(), InstanceState::Committed);
    assert!(store.get(amy).unwrap().is_visible());

    store.update(amy, json!({"firstname": "Amelia"})).unwrap();
    assert_eq!(store.get(amy).unwrap().state(), InstanceState::Committed);
}

/// Staged instances are invisible to the store until commit.
#[test]
fn test_staged_instances_not_visible() {
    let mut store = store();
    let staged = store
        .transaction(|tx| {
            let id = tx.create(USER, json!({"login": "amy", "firstname": "A", "lastname": "L"}))?;
            assert_eq!(tx.get(id).unwrap().state(), InstanceState::Validating);
            Ok(id)
        })
        .unwrap();
    assert!(store.get(staged).is_some());

    let mut inner = None;
    let _ = store.transaction(|tx| {
        let id = tx.create(USER, json!({"login": "bob", "firstname": "B", "lastname": "L"}))?;
        inner = Some(id);
        tx.create(USER, json!({"login": "amy", "firstname": "A", "lastname": "L"}))
    });
    let bob = inner.unwrap();
    assert!(store.get(bob).is_none());
    assert_eq!(store.len(), 1);
}

/// A pending update inside a transaction is Mutating.
#[test]
fn test_update_in_transaction_is_mutating() {
    let mut store = store();
    let amy = store
        .create(USER, json!({"login": "amy", "firstname": "A", "lastname": "L"}))
        .unwrap();

    store
        .transaction(|tx| {
            tx.update(amy, json!({"lastname": "Li"}))?;
            assert_eq!(tx.get(amy).unwrap().state(), InstanceState::Mutating);
            Ok(())
        })
        .unwrap();
    assert_eq!(store.get(amy).unwrap().state(), InstanceState::Committed);
}

// =============================================================================
// Atomicity Tests
// =============================================================================

/// A failing step rolls back every earlier step.
#[test]
fn test_transaction_rolls_back_everything() {
    let mut store = store();
    let amy = store
        .create(USER, json!({"login": "amy", "firstname": "A", "lastname": "L"}))
        .unwrap();
    let bob = store
        .create(USER, json!({"login": "bob", "firstname": "B", "lastname": "L"}))
        .unwrap();
    let before = store.metrics();

    let err = store
        .transaction(|tx| {
            tx.update(amy, json!({"firstname": "Changed"}))?;
            tx.link(amy, FOLLOWEES, bob)?;
            tx.delete(bob)?;
            let pr = tx.create(PULL_REQUEST, json!({"title": "t", "body": "b"}))?;
            tx.link(pr, AUTHOR, amy)?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::CardinalityViolation);

    assert_eq!(store.get(amy).unwrap().get("firstname"), Some(&json!("A")));
    assert!(store.get(bob).is_some());
    assert_eq!(store.edge_count(), 0);
    assert_eq!(store.len(), 2);

    let after = store.metrics();
    assert_eq!(after.commits, before.commits);
    assert_eq!(after.rejections, before.rejections + 1);
}

/// A rejected update inside a transaction leaves the login index intact,
/// even when the transaction goes on to commit.
#[test]
fn test_rejected_update_keeps_unique_claim() {
    let mut store = store();
    let amy = store
        .create(USER, json!({"login": "amy", "firstname": "A", "lastname": "L"}))
        .unwrap();
    store
        .create(USER, json!({"login": "bob", "firstname": "B", "lastname": "L"}))
        .unwrap();

    store
        .transaction(|tx| {
            let err = tx.update(amy, json!({"login": "bob"})).unwrap_err();
            assert_eq!(err.code(), SchemaErrorCode::UniquenessViolation);
            tx.update(amy, json!({"firstname": "Amelia"}))
        })
        .unwrap();

    assert_eq!(store.find_unique(USER, "login", &json!("amy")), Some(amy));
    assert_eq!(store.get(amy).unwrap().get("login"), Some(&json!("amy")));

    let err = store
        .create(USER, json!({"login": "amy", "firstname": "X", "lastname": "Y"}))
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::UniquenessViolation);
    assert_eq!(
        store
            .instances_of(USER)
            .filter(|u| u.get("login") == Some(&json!("amy")))
            .count(),
        1
    );
}

/// A full pull request commits in one transaction.
#[test]
fn test_pull_request_transaction() {
    let mut store = store();
    let (amy, pr, comment) = store
        .transaction(|tx| {
            let amy = tx.create(USER, json!({"login": "amy", "firstname": "A", "lastname": "L"}))?;
            let pr = tx.create(PULL_REQUEST, json!({"title": "t", "body": "b"}))?;
            let comment = tx.create(COMMENT, json!({"body": "lgtm"}))?;
            tx.link(pr, AUTHOR, amy)?;
            tx.link(comment, AUTHOR, amy)?;
            tx.link(pr, COMMENTS, comment)?;
            Ok((amy, pr, comment))
        })
        .unwrap();

    for id in [amy, pr, comment] {
        assert!(store.validate(id).is_ok());
    }
    assert_eq!(store.metrics().commits, 1);
    assert_eq!(store.metrics().links, 3);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Racing creations of the same login: exactly one wins.
#[test]
fn test_concurrent_duplicate_login() {
    let store = Arc::new(Mutex::new(store()));
    let mut handles = Vec::new();

    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            let mut store = store.lock().unwrap();
            store.create(
                USER,
                json!({"login": "amy", "firstname": format!("Amy{}", i), "lastname": "Li"}),
            )
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), SchemaErrorCode::UniquenessViolation);
    }

    let store = store.lock().unwrap();
    assert_eq!(store.instances_of(USER).count(), 1);
}

/// Distinct logins from many threads all commit.
#[test]
fn test_concurrent_distinct_logins() {
    let store = Arc::new(Mutex::new(store()));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let attrs = json!({"login": format!("user{}", i), "firstname": "F", "lastname": "L"});
                let id = store.lock().unwrap().create(USER, attrs).unwrap();
                id
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.lock().unwrap().len(), 8);
}
