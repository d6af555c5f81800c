mod common;

use common::{anonymous_storage, client_with, logged_in_storage, MockTransport, TRACKS_BODY};
use soundtube_client::transport::{Method, RequestBody};
use soundtube_client::{ClientError, FeedState, SoundClient, ViewEvent};
use soundtube_proto::storage::{
    FileSessionStorage, MemorySessionStorage, SessionStorage, TOKEN_KEY, USER_NAME_KEY,
};
use std::sync::Arc;

#[tokio::test]
async fn register_valid_input_sends_one_request() {
    let transport = MockTransport::new();
    transport.respond(Method::Post, "/api/auth/register", 201, r#"{"id":7}"#);
    let (client, _) = client_with(&transport, anonymous_storage());

    client
        .register("alice", "alice@example.com", "secret1")
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].path, "/api/auth/register");
    assert_eq!(
        calls[0].body,
        RequestBody::Json(serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret1"
        }))
    );
    assert!(client.session().current().await.is_none());
}

#[tokio::test]
async fn register_invalid_input_never_reaches_the_network() {
    let transport = MockTransport::new();
    let (client, _) = client_with(&transport, anonymous_storage());

    for (username, password) in [("al", "secret1"), ("alice", "12345")] {
        let err = client
            .register(username, "a@example.com", password)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)), "{err:?}");
        assert!(err.is_local());
    }
    let long_name = "x".repeat(51);
    assert!(client
        .register(&long_name, "a@example.com", "secret1")
        .await
        .is_err());

    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn register_rejection_surfaces_the_server_message() {
    let transport = MockTransport::new();
    transport.respond(
        Method::Post,
        "/api/auth/register",
        409,
        r#"{"error":"username already taken"}"#,
    );
    let (client, _) = client_with(&transport, anonymous_storage());

    let err = client
        .register("alice", "a@example.com", "secret1")
        .await
        .unwrap_err();
    match err {
        ClientError::Remote { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "username already taken");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn login_installs_session_and_loads_feed_with_bearer() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/auth/login", 200, r#"{"token":"tok-1"}"#)
        .respond(Method::Get, "/api/sounds/", 200, TRACKS_BODY);
    let storage = Arc::new(MemorySessionStorage::new());
    let (mut client, notifier) = client_with(&transport, Arc::clone(&storage));

    let session = client.login("alice", "secret1").await.unwrap();
    assert_eq!(session.token, "tok-1");
    assert_eq!(session.user_name, "alice");
    assert_eq!(client.session().current().await, Some(session));

    assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("tok-1"));
    assert_eq!(storage.get(USER_NAME_KEY).as_deref(), Some("alice"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].bearer, None);
    assert_eq!(calls[1].method, Method::Get);
    assert_eq!(calls[1].path, "/api/sounds/");
    assert_eq!(calls[1].bearer.as_deref(), Some("tok-1"));

    assert_eq!(client.feed().tracks().len(), 2);
    let events = notifier.events();
    assert_eq!(
        events[0],
        ViewEvent::SessionChanged {
            user_name: Some("alice".to_string())
        }
    );
    assert!(matches!(events.last(), Some(ViewEvent::FeedChanged(FeedState::Populated(_)))));
}

#[tokio::test]
async fn login_accepts_a_bare_string_token() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/auth/login", 200, r#""tok-raw""#)
        .respond(Method::Get, "/api/sounds/", 200, "[]");
    let (mut client, _) = client_with(&transport, anonymous_storage());

    let session = client.login("alice", "secret1").await.unwrap();
    assert_eq!(session.token, "tok-raw");
    assert_eq!(client.feed().state(), &FeedState::Empty);
}

#[tokio::test]
async fn failed_login_keeps_previous_session() {
    let transport = MockTransport::new();
    transport.respond(
        Method::Post,
        "/api/auth/login",
        401,
        r#"{"error":"invalid credentials"}"#,
    );
    let storage = logged_in_storage();
    let (mut client, _) = client_with(&transport, storage.clone());

    let err = client.login("mallory", "wrong-pass").await.unwrap_err();
    assert!(matches!(err, ClientError::Remote { status: 401, .. }));

    let session = client.session().current().await.unwrap();
    assert_eq!(session.user_name, "alice");
    assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("tok-1"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn login_feed_failure_does_not_undo_login() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/auth/login", 200, r#"{"token":"tok-1"}"#)
        .respond(Method::Get, "/api/sounds/", 500, r#"{"error":"db down"}"#);
    let (mut client, _) = client_with(&transport, anonymous_storage());

    client.login("alice", "secret1").await.unwrap();
    assert!(client.session().has_session().await);
    assert_eq!(client.feed().state(), &FeedState::Unauthenticated);
}

#[tokio::test]
async fn logout_clears_locally_even_when_remote_fails() {
    let transport = MockTransport::new();
    transport
        .fail(Method::Post, "/api/auth/logout", "connection refused")
        .respond(Method::Get, "/api/sounds/", 200, TRACKS_BODY);
    let storage = logged_in_storage();
    let (mut client, notifier) = client_with(&transport, storage.clone());
    client.refresh_feed().await.unwrap();

    client.logout().await;

    assert!(client.session().current().await.is_none());
    assert_eq!(storage.get(TOKEN_KEY), None);
    assert_eq!(storage.get(USER_NAME_KEY), None);
    assert_eq!(client.feed().state(), &FeedState::Unauthenticated);

    let calls = transport.calls();
    let logout_call = &calls[1];
    assert_eq!(logout_call.path, "/api/auth/logout");
    assert_eq!(logout_call.bearer.as_deref(), Some("tok-1"));
    assert_eq!(logout_call.body, RequestBody::Empty);
    // No feed request is made once the session is gone.
    assert_eq!(transport.count(Method::Get, "/api/sounds/"), 1);

    assert!(notifier
        .events()
        .contains(&ViewEvent::SessionChanged { user_name: None }));
}

#[tokio::test]
async fn persisted_session_is_restored_on_start() {
    let transport = MockTransport::new();
    let (client, _) = client_with(&transport, logged_in_storage());

    let session = client.session().current().await.unwrap();
    assert_eq!(session.token, "tok-1");
    assert_eq!(session.user_name, "alice");
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn half_written_session_is_discarded() {
    let transport = MockTransport::new();
    let storage = Arc::new(MemorySessionStorage::with_entries([(TOKEN_KEY, "tok-1")]));
    let (client, _) = client_with(&transport, storage.clone());

    assert!(client.session().current().await.is_none());
    assert_eq!(storage.get(TOKEN_KEY), None);
}

#[tokio::test]
async fn session_survives_restart_through_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/auth/login", 200, r#"{"token":"tok-1"}"#)
        .respond(Method::Get, "/api/sounds/", 200, "[]");
    let storage = Arc::new(FileSessionStorage::open(path.clone()));
    let notifier = common::RecordingNotifier::new();
    let mut client = SoundClient::new(transport.clone(), storage, notifier);
    client.login("alice", "secret1").await.unwrap();
    drop(client);

    let restarted = SoundClient::new(
        MockTransport::new(),
        Arc::new(FileSessionStorage::open(path)),
        common::RecordingNotifier::new(),
    );
    let session = restarted.session().current().await.unwrap();
    assert_eq!(session.token, "tok-1");
    assert_eq!(session.user_name, "alice");
}
