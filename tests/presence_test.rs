//! Tests for the presence registry: idempotency, multi-device entries, and
//! the entry-exists-iff-nonempty invariant under concurrent churn.

use axum::extract::ws::Message;
use courier_server::presence::{Connection, PresenceRegistry};
use tokio::sync::mpsc;

fn connection() -> (Connection, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Connection::new(tx), rx)
}

#[test]
fn register_then_unregister_goes_offline() {
    let registry = PresenceRegistry::new();
    let (conn, _rx) = connection();
    let conn_id = conn.id;

    assert!(!registry.is_online("alice"));

    registry.register("alice", conn);
    assert!(registry.is_online("alice"));
    assert_eq!(registry.connection_count("alice"), 1);
    assert_eq!(registry.online_user_ids(), vec!["alice".to_string()]);

    registry.unregister("alice", conn_id);
    assert!(!registry.is_online("alice"));
    assert_eq!(registry.connection_count("alice"), 0);
    assert!(registry.online_user_ids().is_empty());
    assert!(registry.connections_for("alice").is_empty());
}

#[test]
fn duplicate_register_is_idempotent() {
    let registry = PresenceRegistry::new();
    let (conn, _rx) = connection();
    let conn_id = conn.id;

    registry.register("alice", conn.clone());
    registry.register("alice", conn);
    assert_eq!(registry.connection_count("alice"), 1);

    // One unregister fully removes the handle
    registry.unregister("alice", conn_id);
    assert!(!registry.is_online("alice"));
}

#[test]
fn duplicate_unregister_is_noop() {
    let registry = PresenceRegistry::new();
    let (conn, _rx) = connection();
    let conn_id = conn.id;

    registry.register("alice", conn);
    registry.unregister("alice", conn_id);
    registry.unregister("alice", conn_id);
    registry.unregister("bob", conn_id); // never registered

    assert!(!registry.is_online("alice"));
    assert!(!registry.is_online("bob"));
}

#[test]
fn user_stays_online_until_last_connection_closes() {
    let registry = PresenceRegistry::new();
    let (desktop, _rx1) = connection();
    let (phone, _rx2) = connection();
    let desktop_id = desktop.id;
    let phone_id = phone.id;

    registry.register("alice", desktop);
    registry.register("alice", phone);
    assert_eq!(registry.connection_count("alice"), 2);
    assert_eq!(registry.connections_for("alice").len(), 2);

    registry.unregister("alice", desktop_id);
    assert!(registry.is_online("alice"), "one device still connected");
    assert_eq!(registry.connection_count("alice"), 1);

    registry.unregister("alice", phone_id);
    assert!(!registry.is_online("alice"));
}

#[test]
fn online_user_ids_reflects_all_users() {
    let registry = PresenceRegistry::new();
    let (a, _rx1) = connection();
    let (b, _rx2) = connection();

    registry.register("alice", a);
    registry.register("bob", b);

    let mut ids = registry.online_user_ids();
    ids.sort();
    assert_eq!(ids, vec!["alice".to_string(), "bob".to_string()]);
}

/// Interleaved register/unregister from many threads must never leave a user
/// listed as online with no connections, and a full churn cycle ends empty.
#[test]
fn concurrent_churn_never_leaves_empty_entries() {
    let registry = PresenceRegistry::new();

    std::thread::scope(|scope| {
        for user_index in 0..8 {
            for _ in 0..4 {
                let registry = registry.clone();
                scope.spawn(move || {
                    let user_id = format!("user-{}", user_index);
                    for _ in 0..50 {
                        let (conn, _rx) = connection();
                        let conn_id = conn.id;
                        registry.register(&user_id, conn);

                        // Our own handle is registered, so the user must be
                        // listed with at least one connection right now
                        assert!(registry.is_online(&user_id));
                        assert!(registry.connection_count(&user_id) >= 1);
                        assert!(registry.online_user_ids().contains(&user_id));

                        registry.unregister(&user_id, conn_id);
                    }
                });
            }
        }
    });

    assert!(
        registry.online_user_ids().is_empty(),
        "registry should be empty after all connections closed"
    );
}

/// A connection that survives churn keeps its user online throughout.
#[test]
fn concurrent_churn_with_persistent_connection() {
    let registry = PresenceRegistry::new();
    let (persistent, _rx) = connection();
    registry.register("alice", persistent);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let registry = registry.clone();
            scope.spawn(move || {
                for _ in 0..100 {
                    let (conn, _rx) = connection();
                    let conn_id = conn.id;
                    registry.register("alice", conn);
                    registry.unregister("alice", conn_id);
                    assert!(registry.is_online("alice"));
                }
            });
        }
    });

    assert!(registry.is_online("alice"));
    assert_eq!(registry.connection_count("alice"), 1);
}
