use super::*;
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

const DOCUMENTS: &str = "/v1/projects/demo-project/databases/(default)/documents";

fn app_for(server: &MockServer) -> FirebaseApp {
    let options = FirebaseOptions::new("test-key", "demo-project")
        .with_identity_url(server.url("/identitytoolkit/v1"))
        .with_firestore_url(server.url(DOCUMENTS));
    FirebaseApp::new(options)
}

async fn wait_for_hits(mock: &httpmock::Mock<'_>, expected: usize) {
    for _ in 0..100 {
        if mock.hits() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("mock was hit {} times, expected {}", mock.hits(), expected);
}

#[tokio::test]
async fn test_sign_in_writes_profile_and_token() {
    let server = MockServer::start();
    let app = app_for(&server);
    let bus = NotificationBus::new();
    let session = app.start_session(&bus);

    server.mock(|when, then| {
        when.method(POST)
            .path("/identitytoolkit/v1/accounts:signInWithPassword")
            .query_param("key", "test-key");
        then.status(200).json_body(json!({
            "localId": "u1",
            "email": "a@x.com",
            "displayName": "Ada",
            "idToken": "id-token-1",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        }));
    });

    let login_write = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/users/u1", DOCUMENTS))
            .header("authorization", "Bearer id-token-1")
            .json_body(json!({
                "fields": {
                    "email": { "stringValue": "a@x.com" },
                    "name": { "stringValue": "Ada" }
                }
            }));
        then.status(200).json_body(json!({
            "name": "projects/demo-project/databases/(default)/documents/users/u1"
        }));
    });

    let token_write = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/users/u1", DOCUMENTS))
            .json_body(json!({
                "fields": {
                    "email": { "stringValue": "a@x.com" },
                    "name": { "stringValue": "Ada" },
                    "fcm": { "stringValue": "tok1" }
                }
            }));
        then.status(200).json_body(json!({
            "name": "projects/demo-project/databases/(default)/documents/users/u1"
        }));
    });

    assert_eq!(session.session().await.unwrap().state, SessionState::LoggedOut);

    app.auth()
        .sign_in_with_email_and_password("a@x.com", "secret")
        .await
        .unwrap();

    let current = session.session().await.unwrap();
    assert_eq!(current.state, SessionState::LoggedIn);
    assert_eq!(current.email(), Some("a@x.com"));
    wait_for_hits(&login_write, 1).await;

    bus.publish(Notification::push_token(Some("tok1")));
    wait_for_hits(&token_write, 1).await;
    assert_eq!(session.session().await.unwrap().push_token, "tok1");

    app.auth().sign_out();
    assert_eq!(session.session().await.unwrap().state, SessionState::LoggedOut);

    session.shutdown().await;
}

#[tokio::test]
async fn test_session_reports_directory_failure_without_state_change() {
    let server = MockServer::start();
    let app = app_for(&server);
    let bus = NotificationBus::new();
    let session = app.start_session(&bus);

    server.mock(|when, then| {
        when.method(POST).path("/identitytoolkit/v1/accounts:signUp");
        then.status(200).json_body(json!({
            "localId": "anon-1",
            "idToken": "id-token-anon",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        }));
    });

    let write = server.mock(|when, then| {
        when.method(PATCH).path(format!("{}/users/anon-1", DOCUMENTS));
        then.status(403).json_body(json!({
            "error": { "code": 403, "message": "Missing or insufficient permissions." }
        }));
    });

    app.auth().sign_in_anonymously().await.unwrap();
    wait_for_hits(&write, 1).await;

    let current = session.session().await.unwrap();
    assert_eq!(current.state, SessionState::LoggedIn);
    let identity = current.identity.unwrap();
    assert!(identity.is_anonymous);
    assert_eq!(identity.email, "");

    session.shutdown().await;
}

#[test]
fn test_app_shares_identity() {
    let app = FirebaseApp::new(FirebaseOptions::new("key", "demo-project"));
    let first = app.auth();
    let second = app.auth();

    first.sign_out();
    assert!(second.user().is_none());
    assert_eq!(app.options().users_collection, "users");
    assert_eq!(app.directory().collection_id(), "users");
}
