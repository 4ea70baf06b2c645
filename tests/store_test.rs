//! Tests for the message store: append semantics, canonical conversation
//! keys, and newest-first paginated history reads.

use std::time::Duration;

use courier_server::db;
use courier_server::store::{conversation_key, MessageStore};

fn setup() -> (MessageStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = db::init_db(dir.path().to_str().unwrap()).expect("Failed to init DB");
    (MessageStore::new(db), dir)
}

#[tokio::test]
async fn append_assigns_server_fields() {
    let (store, _dir) = setup();

    let first = store.append("alice", "bob", "hello").await.unwrap();
    assert!(!first.id.is_empty());
    assert_eq!(first.conversation_key, "alice:bob");
    assert_eq!(first.sender_id, "alice");
    assert_eq!(first.recipient_id, "bob");
    assert_eq!(first.body, "hello");
    assert!(first.created_at > 0);
    assert_eq!(first.seq, 1);

    let second = store.append("alice", "bob", "again").await.unwrap();
    assert_eq!(second.seq, 2);
    assert_ne!(second.id, first.id);
}

#[tokio::test]
async fn both_directions_share_one_conversation() {
    let (store, _dir) = setup();

    let from_alice = store.append("alice", "bob", "hi bob").await.unwrap();
    let from_bob = store.append("bob", "alice", "hi alice").await.unwrap();
    assert_eq!(from_alice.conversation_key, from_bob.conversation_key);
    assert_eq!(from_bob.seq, 2, "reply continues the same sequence");

    // Either participant reads the same history
    let as_alice = store.read_conversation("alice", "bob", None, 50).await.unwrap();
    let as_bob = store.read_conversation("bob", "alice", None, 50).await.unwrap();
    assert_eq!(as_alice.messages.len(), 2);
    assert_eq!(as_alice.messages, as_bob.messages);
}

#[tokio::test]
async fn history_is_newest_first_and_paginates() {
    let (store, _dir) = setup();

    for i in 1..=5 {
        store
            .append("alice", "bob", &format!("message {}", i))
            .await
            .unwrap();
        // Distinct created_at timestamps so the cursor walks cleanly
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let page1 = store.read_conversation("alice", "bob", None, 2).await.unwrap();
    assert_eq!(page1.messages.len(), 2);
    assert!(page1.has_more);
    assert_eq!(page1.messages[0].body, "message 5");
    assert_eq!(page1.messages[1].body, "message 4");

    let cursor = page1.messages[1].created_at;
    let page2 = store
        .read_conversation("alice", "bob", Some(cursor), 2)
        .await
        .unwrap();
    assert_eq!(page2.messages.len(), 2);
    assert!(page2.has_more);
    assert_eq!(page2.messages[0].body, "message 3");
    assert_eq!(page2.messages[1].body, "message 2");

    let cursor = page2.messages[1].created_at;
    let page3 = store
        .read_conversation("alice", "bob", Some(cursor), 2)
        .await
        .unwrap();
    assert_eq!(page3.messages.len(), 1);
    assert!(!page3.has_more);
    assert_eq!(page3.messages[0].body, "message 1");
}

#[tokio::test]
async fn empty_conversation_reads_empty() {
    let (store, _dir) = setup();

    let page = store.read_conversation("alice", "nobody", None, 50).await.unwrap();
    assert!(page.messages.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn conversations_are_isolated() {
    let (store, _dir) = setup();

    store.append("alice", "bob", "for bob").await.unwrap();
    store.append("alice", "carol", "for carol").await.unwrap();

    let with_bob = store.read_conversation("alice", "bob", None, 50).await.unwrap();
    assert_eq!(with_bob.messages.len(), 1);
    assert_eq!(with_bob.messages[0].body, "for bob");

    let with_carol = store.read_conversation("carol", "alice", None, 50).await.unwrap();
    assert_eq!(with_carol.messages.len(), 1);
    assert_eq!(with_carol.messages[0].body, "for carol");
}

#[tokio::test]
async fn limit_is_clamped() {
    let (store, _dir) = setup();
    store.append("alice", "bob", "one").await.unwrap();

    // limit 0 is treated as 1, not as "nothing"
    let page = store.read_conversation("alice", "bob", None, 0).await.unwrap();
    assert_eq!(page.messages.len(), 1);
}

#[test]
fn conversation_key_is_canonical() {
    assert_eq!(conversation_key("alice", "bob"), "alice:bob");
    assert_eq!(conversation_key("bob", "alice"), "alice:bob");
}
