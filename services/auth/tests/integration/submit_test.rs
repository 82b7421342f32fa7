use chrono::{DateTime, Utc};
use uuid::Uuid;

use test24_auth::domain::repository::OtpSessionRepository;
use test24_auth::domain::types::{LoginMetadata, OtpPolicy, OtpSession, Reissue, User};
use test24_auth::error::AuthServiceError;
use test24_auth::usecase::otp::OtpEngine;

use crate::helpers::{
    ADDRESS, MockOtpSessionRepo, RecordingSms, expire, issued, stored, test_engine,
};

fn wrong_code(code: &str) -> String {
    if code == "0000" { "1111" } else { "0000" }.to_owned()
}

#[tokio::test]
async fn should_verify_correct_code() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;

    let session = engine.validate_code(id, &code, None).await.unwrap();

    assert_eq!(session.id, id);
    let stored = stored(&engine, id);
    assert!(stored.is_verified);
    assert!(stored.verified_at.is_some());
    assert!(stored.consumed_at.is_none(), "verification is not consumption");
}

#[tokio::test]
async fn should_return_not_found_for_unknown_session() {
    let engine = test_engine();
    let result = engine.validate_code(Uuid::new_v4(), "1234", None).await;
    assert!(
        matches!(result, Err(AuthServiceError::SessionNotFound)),
        "expected SessionNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_increment_attempts_once_per_wrong_code() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    let wrong = wrong_code(&code);

    for expected in 1..=3 {
        let result = engine.validate_code(id, &wrong, None).await;
        assert!(matches!(result, Err(AuthServiceError::InvalidOtp)));
        assert_eq!(stored(&engine, id).attempts, expected);
    }
    assert!(!stored(&engine, id).is_verified);
}

#[tokio::test]
async fn should_lock_out_after_max_attempts_even_with_correct_code() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    let wrong = wrong_code(&code);

    for _ in 0..5 {
        let _ = engine.validate_code(id, &wrong, None).await;
    }
    assert_eq!(stored(&engine, id).attempts, 5);

    let result = engine.validate_code(id, &code, None).await;
    assert!(
        matches!(result, Err(AuthServiceError::MaxAttemptsExceeded)),
        "expected MaxAttemptsExceeded, got {result:?}"
    );
    assert_eq!(stored(&engine, id).attempts, 5, "exhausted checks cost nothing");
    assert!(!stored(&engine, id).is_verified);
}

#[tokio::test]
async fn should_reject_correct_code_after_expiry() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    expire(&engine, id);

    let result = engine.validate_code(id, &code, None).await;
    assert!(
        matches!(result, Err(AuthServiceError::SessionExpired)),
        "expected SessionExpired, got {result:?}"
    );
    assert!(!stored(&engine, id).is_verified);
}

#[tokio::test]
async fn should_require_matching_client_secret() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "s3cret").await;

    for secret in [None, Some(""), Some("other")] {
        let result = engine.validate_code(id, &code, secret).await;
        assert!(
            matches!(result, Err(AuthServiceError::ClientSecretMismatch)),
            "secret {secret:?} should be rejected, got {result:?}"
        );
    }
    assert_eq!(stored(&engine, id).attempts, 0, "secret checks cost nothing");

    engine.validate_code(id, &code, Some("s3cret")).await.unwrap();
}

#[tokio::test]
async fn should_ignore_supplied_secret_when_none_recorded() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    engine.validate_code(id, &code, Some("anything")).await.unwrap();
}

#[tokio::test]
async fn should_accept_correct_code_again_on_verified_session() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    engine.validate_code(id, &code, None).await.unwrap();
    let verified_at = stored(&engine, id).verified_at;

    engine.validate_code(id, &code, None).await.unwrap();

    let session = stored(&engine, id);
    assert!(session.is_verified);
    assert_eq!(session.verified_at, verified_at, "verification is not rewritten");
}

#[tokio::test]
async fn should_count_wrong_code_on_verified_session_without_unverifying() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    engine.validate_code(id, &code, None).await.unwrap();

    let result = engine.validate_code(id, &wrong_code(&code), None).await;

    assert!(matches!(result, Err(AuthServiceError::InvalidOtp)));
    let session = stored(&engine, id);
    assert_eq!(session.attempts, 1);
    assert!(session.is_verified, "a later wrong guess keeps verification");
}

#[tokio::test]
async fn should_reject_submit_after_consume() {
    let engine = test_engine();
    let (id, code) = issued(&engine, ADDRESS, "").await;
    engine.validate_code(id, &code, None).await.unwrap();
    engine.consume(id, None, &Default::default()).await.unwrap();

    let result = engine.validate_code(id, &code, None).await;
    assert!(
        matches!(result, Err(AuthServiceError::SessionConsumed)),
        "expected SessionConsumed, got {result:?}"
    );
}

/// Yields after every read and before the verify write, so concurrent
/// submissions all observe the same snapshot before any of them writes.
struct YieldingRepo(MockOtpSessionRepo);

impl OtpSessionRepository for YieldingRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpSession>, AuthServiceError> {
        let session = self.0.find_by_id(id).await?;
        tokio::task::yield_now().await;
        Ok(session)
    }

    async fn find_active_by_address(
        &self,
        address: &str,
    ) -> Result<Option<OtpSession>, AuthServiceError> {
        self.0.find_active_by_address(address).await
    }

    async fn create(&self, session: &OtpSession) -> Result<(), AuthServiceError> {
        self.0.create(session).await
    }

    async fn reissue(&self, id: Uuid, reissue: &Reissue) -> Result<bool, AuthServiceError> {
        self.0.reissue(id, reissue).await
    }

    async fn increment_attempts(&self, id: Uuid) -> Result<Option<i16>, AuthServiceError> {
        self.0.increment_attempts(id).await
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.0.mark_verified(id, code, at).await
    }

    async fn consume(
        &self,
        id: Uuid,
        address: &str,
        metadata: &LoginMetadata,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AuthServiceError> {
        self.0.consume(id, address, metadata, at).await
    }
}

#[tokio::test]
async fn should_hold_attempt_ceiling_under_concurrent_guesses() {
    let engine = OtpEngine::new(
        YieldingRepo(MockOtpSessionRepo::empty()),
        RecordingSms::default(),
        OtpPolicy::default(),
    );
    let outcome = engine.issue_code(ADDRESS, "").await.unwrap();
    let id = outcome.session.id;
    let code = outcome.session.otp_code;
    let wrong = wrong_code(&code);
    let engine = &engine;
    let wrong = wrong.as_str();
    let guess = move || engine.validate_code(id, wrong, None);

    let (w1, w2, w3, w4, w5, w6, w7, w8, correct) = tokio::join!(
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        engine.validate_code(id, &code, None),
    );

    let wrong_results = [w1, w2, w3, w4, w5, w6, w7, w8];
    let counted = wrong_results
        .iter()
        .filter(|r| matches!(r, Err(AuthServiceError::InvalidOtp)))
        .count();
    let refused = wrong_results
        .iter()
        .filter(|r| matches!(r, Err(AuthServiceError::MaxAttemptsExceeded)))
        .count();
    assert_eq!(counted, 5);
    assert_eq!(refused, 3);
    assert!(
        matches!(correct, Err(AuthServiceError::MaxAttemptsExceeded)),
        "expected MaxAttemptsExceeded, got {correct:?}"
    );

    let sessions = engine.sessions.0.sessions_handle();
    let session = sessions.lock().unwrap()[0].clone();
    assert_eq!(session.attempts, session.max_attempts);
    assert!(!session.is_verified);
}
