//! Gateway WebSocket tests
//!
//! Drives a real gateway over a live socket: hello handshake, typing
//! updates, expiry, unsubscribe, and error replies.
//!
//! Run with: cargo test -p integration-tests --test gateway_ws

use integration_tests::{wait_until, TestServer};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");

    let health = server.health().await.expect("Request failed");

    assert_eq!(health["status"], "ok");
    assert_eq!(health["sessions"], 0);
}

#[tokio::test]
async fn test_hello_and_initial_snapshot() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.expect("Failed to connect");

    let hello = client.recv_json().await.unwrap();
    assert_eq!(hello["op"], "hello");
    assert!(hello["session_id"].is_string());

    client
        .send_json(&json!({"op": "subscribe", "channel_id": "landing"}))
        .await
        .unwrap();

    let snapshot = client.recv_json().await.unwrap();
    assert_eq!(snapshot["op"], "typing_update");
    assert_eq!(snapshot["channel_id"], "landing");
    assert_eq!(snapshot["user_ids"], json!([]));
}

#[tokio::test]
async fn test_typing_updates_and_expiry() {
    let server = TestServer::start().await.expect("Failed to start server");

    let mut watcher = server.connect().await.expect("Failed to connect");
    watcher.recv_json().await.unwrap(); // hello
    watcher
        .send_json(&json!({"op": "subscribe", "channel_id": "landing"}))
        .await
        .unwrap();
    let snapshot = watcher.recv_json().await.unwrap();
    assert_eq!(snapshot["user_ids"], json!([]));

    let mut typist = server.connect().await.expect("Failed to connect");
    typist.recv_json().await.unwrap(); // hello
    typist
        .send_json(&json!({
            "op": "typing",
            "channel_id": "landing",
            "user_id": "alice",
            "typing": true
        }))
        .await
        .unwrap();

    let update = watcher.recv_json().await.unwrap();
    assert_eq!(update["user_ids"], json!(["alice"]));

    typist
        .send_json(&json!({
            "op": "typing",
            "channel_id": "landing",
            "user_id": "bob",
            "typing": true
        }))
        .await
        .unwrap();

    let update = watcher.recv_json().await.unwrap();
    assert_eq!(update["user_ids"], json!(["alice", "bob"]));

    // Test config expires typists after 300ms of silence. Depending on
    // how the sweep ticks align, alice and bob may drop out in one pass
    // or two, so read until the list is empty.
    let mut update = watcher.recv_json().await.unwrap();
    if update["user_ids"] != json!([]) {
        assert_eq!(update["user_ids"], json!(["bob"]));
        update = watcher.recv_json().await.unwrap();
    }
    assert_eq!(update["user_ids"], json!([]));
}

#[tokio::test]
async fn test_cross_channel_isolation() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.expect("Failed to connect");
    client.recv_json().await.unwrap(); // hello

    client
        .send_json(&json!({"op": "subscribe", "channel_id": "c2"}))
        .await
        .unwrap();
    let snapshot = client.recv_json().await.unwrap();
    assert_eq!(snapshot["channel_id"], "c2");

    client
        .send_json(&json!({
            "op": "typing",
            "channel_id": "c1",
            "user_id": "alice",
            "typing": true
        }))
        .await
        .unwrap();

    client
        .expect_silence(Duration::from_millis(200))
        .await
        .expect("c2 subscription saw a c1 mutation");

    client
        .send_json(&json!({
            "op": "typing",
            "channel_id": "c2",
            "user_id": "bob",
            "typing": true
        }))
        .await
        .unwrap();

    let update = client.recv_json().await.unwrap();
    assert_eq!(update["channel_id"], "c2");
    assert_eq!(update["user_ids"], json!(["bob"]));
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.expect("Failed to connect");
    client.recv_json().await.unwrap(); // hello

    client
        .send_json(&json!({"op": "subscribe", "channel_id": "landing"}))
        .await
        .unwrap();
    client.recv_json().await.unwrap(); // initial snapshot

    client
        .send_json(&json!({"op": "unsubscribe", "channel_id": "landing"}))
        .await
        .unwrap();

    // The forwarder is aborted; give the tracker a moment to drop it.
    assert!(
        wait_until(Duration::from_secs(2), || {
            server.state.tracker().subscriber_count("landing") == 0
        })
        .await,
        "listener was not released on unsubscribe"
    );

    client
        .send_json(&json!({
            "op": "typing",
            "channel_id": "landing",
            "user_id": "alice",
            "typing": true
        }))
        .await
        .unwrap();

    client
        .expect_silence(Duration::from_millis(200))
        .await
        .expect("canceled subscription still received updates");
}

#[tokio::test]
async fn test_unsubscribe_without_subscription_is_an_error() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.expect("Failed to connect");
    client.recv_json().await.unwrap(); // hello

    client
        .send_json(&json!({"op": "unsubscribe", "channel_id": "nowhere"}))
        .await
        .unwrap();

    let error = client.recv_json().await.unwrap();
    assert_eq!(error["op"], "error");
    assert_eq!(error["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_and_invalid_messages() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.expect("Failed to connect");
    client.recv_json().await.unwrap(); // hello

    client.send_text("not json at all").await.unwrap();
    let error = client.recv_json().await.unwrap();
    assert_eq!(error["op"], "error");
    assert_eq!(error["code"], "DECODE_ERROR");

    client
        .send_json(&json!({"op": "subscribe", "channel_id": ""}))
        .await
        .unwrap();
    let error = client.recv_json().await.unwrap();
    assert_eq!(error["op"], "error");
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_disconnect_releases_listeners() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.expect("Failed to connect");
    client.recv_json().await.unwrap(); // hello

    client
        .send_json(&json!({"op": "subscribe", "channel_id": "landing"}))
        .await
        .unwrap();
    client.recv_json().await.unwrap(); // initial snapshot

    assert!(
        wait_until(Duration::from_secs(2), || {
            server.state.tracker().subscriber_count("landing") == 1
        })
        .await
    );

    client.close().await.unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            server.state.tracker().subscriber_count("landing") == 0
                && server.state.sessions().session_count() == 0
        })
        .await,
        "disconnect did not release the session's listeners"
    );
}
