use super::*;
use crate::core::options::FirebaseOptions;
use reqwest::StatusCode;

#[test]
fn test_error_message_from_envelope() {
    let body = r#"{"error":{"code":400,"message":"EMAIL_NOT_FOUND","errors":[{"message":"EMAIL_NOT_FOUND","domain":"global","reason":"invalid"}]}}"#;
    let msg = error_message_from_body(body, StatusCode::BAD_REQUEST, "Sign in failed");
    assert_eq!(msg, "Sign in failed: EMAIL_NOT_FOUND (code: 400)");
}

#[test]
fn test_error_message_falls_back_to_status() {
    let msg = error_message_from_body(
        "<html>oops</html>",
        StatusCode::BAD_GATEWAY,
        "Set document failed",
    );
    assert_eq!(msg, "Set document failed: 502 Bad Gateway");
}

#[test]
fn test_options_from_json_defaults() {
    let options = FirebaseOptions::from_json(
        r#"{ "apiKey": "abc", "projectId": "demo-project" }"#,
    )
    .unwrap();

    assert_eq!(options.api_key, "abc");
    assert_eq!(options.project_id, "demo-project");
    assert_eq!(options.users_collection, "users");
    assert_eq!(options.identity_url(), "https://identitytoolkit.googleapis.com/v1");
    assert_eq!(options.token_url(), "https://securetoken.googleapis.com/v1");
    assert_eq!(
        options.firestore_url(),
        "https://firestore.googleapis.com/v1/projects/demo-project/databases/(default)/documents"
    );
}

#[test]
fn test_options_endpoint_overrides() {
    let options = FirebaseOptions::new("abc", "demo-project")
        .with_identity_url("http://localhost:9099/identitytoolkit.googleapis.com/v1")
        .with_firestore_url("http://localhost:8080/v1/projects/demo-project/databases/(default)/documents")
        .with_token_url("http://localhost:9099/securetoken.googleapis.com/v1")
        .with_users_collection("profiles");

    assert_eq!(options.identity_url(), "http://localhost:9099/identitytoolkit.googleapis.com/v1");
    assert_eq!(
        options.firestore_url(),
        "http://localhost:8080/v1/projects/demo-project/databases/(default)/documents"
    );
    assert_eq!(options.token_url(), "http://localhost:9099/securetoken.googleapis.com/v1");
    assert_eq!(options.users_collection, "profiles");
}

#[test]
fn test_options_rejects_missing_api_key() {
    assert!(FirebaseOptions::from_json(r#"{ "projectId": "demo-project" }"#).is_err());
}
