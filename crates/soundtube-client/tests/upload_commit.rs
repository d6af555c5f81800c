mod common;

use common::{anonymous_storage, client_with, logged_in_storage, MockTransport, TRACKS_BODY};
use soundtube_client::transport::{Method, RequestBody};
use soundtube_client::{AudioFile, ClientError, PendingUpload, UploadPhase, ViewEvent};

fn staged() -> PendingUpload {
    let mut pending = PendingUpload::new(" Night Drive ", "Roads", "Synthwave");
    pending
        .select_file(AudioFile {
            file_name: "night-drive.mp3".to_string(),
            media_type: "audio/mpeg".to_string(),
            bytes: vec![0xff, 0xfb, 0x90, 0x00],
        })
        .unwrap();
    pending
}

#[tokio::test]
async fn full_commit_runs_both_phases_then_refreshes() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/sounds/", 201, r#"{"id":42}"#)
        .respond(Method::Post, "/api/sounds/upload", 200, r#"{"status":"ok"}"#)
        .respond(Method::Get, "/api/sounds/", 200, TRACKS_BODY);
    let (mut client, notifier) = client_with(&transport, logged_in_storage());
    client.stage_upload(staged());

    client.upload().await.unwrap();

    assert_eq!(
        transport.call_log(),
        vec!["POST /api/sounds/", "POST /api/sounds/upload", "GET /api/sounds/"]
    );
    let calls = transport.calls();
    assert_eq!(
        calls[0].body,
        RequestBody::Json(serde_json::json!({
            "name": "Night Drive",
            "album": "Roads",
            "genre": "Synthwave"
        }))
    );
    match &calls[1].body {
        RequestBody::Multipart(form) => {
            assert_eq!(form.file.field, "file");
            assert_eq!(form.file.file_name, "night-drive.mp3");
            assert_eq!(form.file.media_type, "audio/mpeg");
            assert_eq!(form.fields, vec![("name".to_string(), "Night Drive".to_string())]);
        }
        other => panic!("expected multipart body, got {other:?}"),
    }

    assert_eq!(client.upload_phase(), UploadPhase::Committed);
    assert!(client.pending_upload().is_none());
    assert_eq!(client.feed().tracks().len(), 2);

    let phases: Vec<UploadPhase> = notifier
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ViewEvent::UploadChanged(phase) => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![UploadPhase::MetadataSubmitted, UploadPhase::Committed]
    );
}

#[tokio::test]
async fn metadata_failure_never_uploads_the_file() {
    let transport = MockTransport::new();
    transport.respond(
        Method::Post,
        "/api/sounds/",
        400,
        r#"{"error":"name is required"}"#,
    );
    let (mut client, _) = client_with(&transport, logged_in_storage());
    client.stage_upload(staged());

    let err = client.upload().await.unwrap_err();
    assert!(matches!(err, ClientError::Remote { status: 400, .. }));
    assert_eq!(transport.count(Method::Post, "/api/sounds/upload"), 0);
    assert_eq!(client.upload_phase(), UploadPhase::Idle);
    assert!(client.pending_upload().is_some());
}

#[tokio::test]
async fn file_failure_is_a_partial_commit_without_refresh() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/sounds/", 201, r#"{"id":42}"#)
        .respond(
            Method::Post,
            "/api/sounds/upload",
            413,
            r#"{"error":"file too large"}"#,
        );
    let (mut client, _) = client_with(&transport, logged_in_storage());
    client.stage_upload(staged());

    let err = client.upload().await.unwrap_err();
    match err {
        ClientError::PartialCommit { name, message } => {
            assert_eq!(name, "Night Drive");
            assert_eq!(message, "file too large");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.upload_phase(), UploadPhase::PartialFailure);
    assert_eq!(transport.count(Method::Get, "/api/sounds/"), 0);
    // Nothing is rolled back: the metadata record was not deleted.
    assert!(transport.calls().iter().all(|c| c.method != Method::Delete));
}

#[tokio::test]
async fn file_network_failure_is_also_partial() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/sounds/", 201, "{}")
        .fail(Method::Post, "/api/sounds/upload", "broken pipe");
    let (mut client, _) = client_with(&transport, logged_in_storage());
    client.stage_upload(staged());

    let err = client.upload().await.unwrap_err();
    assert!(matches!(err, ClientError::PartialCommit { .. }));
    assert_eq!(client.upload_phase(), UploadPhase::PartialFailure);
}

#[tokio::test]
async fn refresh_failure_after_commit_is_not_an_error() {
    let transport = MockTransport::new();
    transport
        .respond(Method::Post, "/api/sounds/", 201, "{}")
        .respond(Method::Post, "/api/sounds/upload", 200, "{}")
        .respond(Method::Get, "/api/sounds/", 500, "");
    let (mut client, _) = client_with(&transport, logged_in_storage());
    client.stage_upload(staged());

    client.upload().await.unwrap();
    assert_eq!(client.upload_phase(), UploadPhase::Committed);
}

#[tokio::test]
async fn incomplete_upload_is_rejected_locally() {
    let transport = MockTransport::new();
    let (mut client, _) = client_with(&transport, logged_in_storage());

    let err = client.upload().await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    client.stage_upload(PendingUpload::new("Name", "Album", "Genre"));
    assert!(matches!(
        client.upload().await.unwrap_err(),
        ClientError::Validation(_)
    ));

    let mut blank_genre = staged();
    blank_genre.genre = "   ".to_string();
    client.stage_upload(blank_genre);
    assert!(matches!(
        client.upload().await.unwrap_err(),
        ClientError::Validation(_)
    ));

    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn upload_without_session_is_auth_required() {
    let transport = MockTransport::new();
    let (mut client, _) = client_with(&transport, anonymous_storage());
    client.stage_upload(staged());

    assert!(matches!(
        client.upload().await.unwrap_err(),
        ClientError::AuthRequired
    ));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn logout_discards_staged_upload() {
    let transport = MockTransport::new();
    transport.respond(Method::Post, "/api/auth/logout", 200, "{}");
    let (mut client, _) = client_with(&transport, logged_in_storage());
    client.stage_upload(staged());

    client.logout().await;
    assert!(client.pending_upload().is_none());
    assert_eq!(client.upload_phase(), UploadPhase::Idle);
}
