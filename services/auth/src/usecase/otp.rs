use chrono::Utc;
use rand::RngExt;
use uuid::Uuid;

use crate::domain::repository::{OtpSessionRepository, SmsSender};
use crate::domain::types::{LoginMetadata, OtpPolicy, OtpSession, Reissue, User};
use crate::error::AuthServiceError;

/// Result of [`OtpEngine::issue_code`].
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub session: OtpSession,
    /// `true` when the resend interval had not elapsed and nothing was sent.
    pub throttled: bool,
    pub retry_after: i64,
}

/// Phone-verification state machine: issue, validate, consume.
///
/// Built once at startup and shared behind an `Arc`; it holds no mutable state.
pub struct OtpEngine<R, S>
where
    R: OtpSessionRepository,
    S: SmsSender,
{
    pub sessions: R,
    pub sms: S,
    pub policy: OtpPolicy,
}

impl<R, S> OtpEngine<R, S>
where
    R: OtpSessionRepository,
    S: SmsSender,
{
    pub fn new(sessions: R, sms: S, policy: OtpPolicy) -> Self {
        Self {
            sessions,
            sms,
            policy,
        }
    }

    fn generate_code(&self, address: &str) -> String {
        if self.policy.test_address.as_deref() == Some(address) {
            return self.policy.test_code.clone();
        }
        let width = self.policy.code_digits as usize;
        let value = rand::rng().random_range(0..10u32.pow(self.policy.code_digits));
        format!("{value:0width$}")
    }

    /// Send a code to `address`, reusing its active session when possible.
    pub async fn issue_code(
        &self,
        address: &str,
        client_secret: &str,
    ) -> Result<IssueOutcome, AuthServiceError> {
        let now = Utc::now();
        let existing = self.sessions.find_active_by_address(address).await?;

        if let Some(session) = existing
            .as_ref()
            .filter(|s| s.is_throttled(now, self.policy.resend_interval))
        {
            let retry_after = session.seconds_until_retry(now, self.policy.resend_interval);
            tracing::debug!(session_id = %session.id, retry_after, "otp resend throttled");
            return Ok(IssueOutcome {
                session: session.clone(),
                throttled: true,
                retry_after,
            });
        }

        let code = self.generate_code(address);

        let session = match existing {
            Some(mut session) if !session.is_verified => {
                let reissue = Reissue {
                    otp_code: code.clone(),
                    // The code goes to whoever asked last, so their secret guards it.
                    client_secret: client_secret.to_owned(),
                    last_sent_at: now,
                    expires_at: now + self.policy.ttl,
                };
                if self.sessions.reissue(session.id, &reissue).await? {
                    reissue.apply_to(&mut session);
                    session
                } else {
                    self.create_session(address, client_secret, code.clone(), now)
                        .await?
                }
            }
            _ => {
                self.create_session(address, client_secret, code.clone(), now)
                    .await?
            }
        };

        if let Err(e) = self.sms.send_otp(address, &code).await {
            tracing::warn!(error = ?e, session_id = %session.id, "otp delivery failed");
        }

        tracing::info!(session_id = %session.id, "otp issued");
        Ok(IssueOutcome {
            session,
            throttled: false,
            retry_after: 0,
        })
    }

    async fn create_session(
        &self,
        address: &str,
        client_secret: &str,
        code: String,
        now: chrono::DateTime<Utc>,
    ) -> Result<OtpSession, AuthServiceError> {
        let session = OtpSession::issue(address, client_secret, code, &self.policy, now);
        self.sessions.create(&session).await?;
        Ok(session)
    }

    /// Check `code` against the session and mark it verified on a match.
    ///
    /// Every mismatch costs one attempt. Re-submitting the right code to an
    /// already verified session succeeds without rewriting it.
    pub async fn validate_code(
        &self,
        session_id: Uuid,
        code: &str,
        client_secret: Option<&str>,
    ) -> Result<OtpSession, AuthServiceError> {
        let now = Utc::now();
        let mut session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or(AuthServiceError::SessionNotFound)?;

        Self::check_submittable(&session, client_secret, now)?;

        if !session.matches_code(code) {
            let attempts = self
                .sessions
                .increment_attempts(session_id)
                .await?
                .ok_or(AuthServiceError::MaxAttemptsExceeded)?;
            tracing::debug!(%session_id, attempts, "otp mismatch");
            return Err(AuthServiceError::InvalidOtp);
        }

        if session.is_verified {
            return Ok(session);
        }

        if !self.sessions.mark_verified(session_id, code, now).await? {
            // Lost a race with a guess, a reissue or a consume: report the current state.
            let current = self
                .sessions
                .find_by_id(session_id)
                .await?
                .ok_or(AuthServiceError::SessionNotFound)?;
            Self::check_submittable(&current, client_secret, now)?;
            return Err(AuthServiceError::InvalidOtp);
        }
        session.is_verified = true;
        session.verified_at = Some(now);
        session.updated_at = now;
        tracing::info!(%session_id, "otp verified");
        Ok(session)
    }

    fn check_submittable(
        session: &OtpSession,
        client_secret: Option<&str>,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        if session.is_expired(now) {
            return Err(AuthServiceError::SessionExpired);
        }
        if !session.is_active() {
            return Err(AuthServiceError::SessionConsumed);
        }
        if !session.accepts_secret(client_secret) {
            return Err(AuthServiceError::ClientSecretMismatch);
        }
        if session.attempts_exhausted() {
            return Err(AuthServiceError::MaxAttemptsExceeded);
        }
        Ok(())
    }

    /// Exchange a verified session for the user owning its address, exactly once.
    pub async fn consume(
        &self,
        session_id: Uuid,
        client_secret: Option<&str>,
        metadata: &LoginMetadata,
    ) -> Result<User, AuthServiceError> {
        let now = Utc::now();
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or(AuthServiceError::SessionNotFound)?;

        if !session.accepts_secret(client_secret) {
            return Err(AuthServiceError::ClientSecretMismatch);
        }
        if !session.is_verified {
            return Err(AuthServiceError::SessionNotVerified);
        }
        if session.is_expired(now) {
            return Err(AuthServiceError::SessionExpired);
        }
        if !session.is_active() {
            return Err(AuthServiceError::SessionConsumed);
        }

        let user = self
            .sessions
            .consume(session_id, &session.address, metadata, now)
            .await?
            .ok_or(AuthServiceError::SessionConsumed)?;

        tracing::info!(%session_id, user_id = %user.id, "otp session consumed");
        Ok(user)
    }
}
