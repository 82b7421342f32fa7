use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{Value, json};
use uuid::Uuid;

use test24_auth::domain::types::OtpPolicy;
use test24_auth::infra::db::DbOtpSessionRepository;
use test24_auth::infra::sms::{LogSmsSender, SmsChannel};
use test24_auth::router::build_router;
use test24_auth::state::AppState;
use test24_auth::usecase::otp::OtpEngine;
use test24_auth_schema::otp_sessions;

use crate::helpers::{ADDRESS, test_token_issuer};

fn server(db: MockDatabase) -> TestServer {
    server_with_policy(db, OtpPolicy::default())
}

fn server_with_policy(db: MockDatabase, policy: OtpPolicy) -> TestServer {
    let engine = OtpEngine::new(
        DbOtpSessionRepository {
            db: db.into_connection(),
        },
        SmsChannel::Log(LogSmsSender),
        policy,
    );
    let state = AppState {
        engine: Arc::new(engine),
        tokens: test_token_issuer(),
    };
    TestServer::new(build_router(state)).unwrap()
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn session_model(last_sent_ago: Duration) -> otp_sessions::Model {
    let now = Utc::now();
    let sent = now - last_sent_ago;
    otp_sessions::Model {
        id: Uuid::new_v4(),
        address: ADDRESS.to_owned(),
        client_secret: String::new(),
        otp_code: "1234".to_owned(),
        expires_at: sent + Duration::minutes(5),
        last_sent_at: sent,
        attempts: 0,
        max_attempts: 5,
        is_verified: false,
        verified_at: None,
        consumed_at: None,
        session_data: json!({}),
        created_at: sent,
        updated_at: sent,
    }
}

#[tokio::test]
async fn should_reject_invalid_address() {
    let server = server(empty_db());

    let response = server
        .post("/api/v1/auth/request-otp")
        .json(&json!({ "address": "+12025550123" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INVALID_REQUEST");
    assert_eq!(
        body["fields"]["address"],
        "Address must be a valid Uzbekistan phone number (e.g. +998901234567)."
    );
}

#[tokio::test]
async fn should_issue_code_over_http() {
    let created = session_model(Duration::zero());
    let server = server(
        empty_db()
            .append_query_results([Vec::<otp_sessions::Model>::new()])
            .append_query_results([vec![created]]),
    );

    let response = server
        .post("/api/v1/auth/request-otp")
        .json(&json!({ "address": ADDRESS }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(Uuid::parse_str(body["session"].as_str().unwrap()).is_ok());
    assert_eq!(body["retry_after"], 0);
    assert!(body.get("otp_code").is_none());
}

#[tokio::test]
async fn should_report_retry_after_when_throttled() {
    let active = session_model(Duration::seconds(20));
    let id = active.id;
    let server = server(empty_db().append_query_results([vec![active]]));

    let response = server
        .post("/api/v1/auth/request-otp")
        .json(&json!({ "address": ADDRESS }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["session"], id.to_string());
    let retry_after = body["retry_after"].as_i64().unwrap();
    assert!((39..=40).contains(&retry_after), "got {retry_after}");
}

#[tokio::test]
async fn should_reject_malformed_submission() {
    let server = server(empty_db());

    let response = server
        .post("/api/v1/auth/submit-otp")
        .json(&json!({ "session": "not-a-uuid", "otp": "12ab" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["fields"]["session"], "Must be a valid UUID.");
    assert_eq!(body["fields"]["otp"], "OTP must contain digits only.");
}

#[tokio::test]
async fn should_size_submitted_code_by_policy() {
    let default_width = server(empty_db());
    let response = default_width
        .post("/api/v1/auth/submit-otp")
        .json(&json!({ "session": Uuid::new_v4().to_string(), "otp": "123456" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["fields"]["otp"],
        "Ensure this field has no more than 4 characters."
    );

    let six_digits = server_with_policy(
        empty_db().append_query_results([Vec::<otp_sessions::Model>::new()]),
        OtpPolicy {
            code_digits: 6,
            ..OtpPolicy::default()
        },
    );
    let response = six_digits
        .post("/api/v1/auth/submit-otp")
        .json(&json!({ "session": Uuid::new_v4().to_string(), "otp": "123456" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_session() {
    let server = server(empty_db().append_query_results([Vec::<otp_sessions::Model>::new()]));

    let response = server
        .post("/api/v1/auth/submit-otp")
        .json(&json!({ "session": Uuid::new_v4().to_string(), "otp": "1234" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn should_reject_login_of_unverified_session() {
    let pending = session_model(Duration::seconds(5));
    let id = pending.id;
    let server = server(empty_db().append_query_results([vec![pending]]));

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "verification_data": { "session": id.to_string() } }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "SESSION_NOT_VERIFIED");
    assert_eq!(body["fields"]["session"], "OTP not verified yet.");
}

#[tokio::test]
async fn should_reject_login_without_verification_data() {
    let server = server(empty_db());

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "session_data": { "platform": "WEB" } }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["fields"]["verification_data"], "This field is required.");
}

#[tokio::test]
async fn should_echo_request_id_header() {
    let server = server(empty_db());

    let response = server
        .post("/api/v1/auth/request-otp")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .json(&json!({}))
        .await;

    assert_eq!(
        response.header(HeaderName::from_static("x-request-id")),
        "req-123"
    );
}
