#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{LoginMetadata, OtpSession, Reissue, TokenPair, User};
use crate::error::AuthServiceError;

/// Durable store for OTP sessions.
///
/// Every mutation is a single-row write keyed by session id and guarded by the
/// state it expects, so concurrent requests never clobber each other.
pub trait OtpSessionRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpSession>, AuthServiceError>;

    /// Most recently created session for `address` with `consumed_at` unset.
    async fn find_active_by_address(
        &self,
        address: &str,
    ) -> Result<Option<OtpSession>, AuthServiceError>;

    async fn create(&self, session: &OtpSession) -> Result<(), AuthServiceError>;

    /// Overwrite the code of a session that is still active and unverified.
    /// Resets attempts and verification. Returns `false` if the guard did not match.
    async fn reissue(&self, id: Uuid, reissue: &Reissue) -> Result<bool, AuthServiceError>;

    /// Atomically add one to `attempts` while it is below `max_attempts`,
    /// returning the new count. `None` when the ceiling was already reached.
    async fn increment_attempts(&self, id: Uuid) -> Result<Option<i16>, AuthServiceError>;

    /// Set `is_verified` and `verified_at` if, at write time, the session is
    /// active, unexpired, under its attempt ceiling and still holds `code`.
    async fn mark_verified(
        &self,
        id: Uuid,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError>;

    /// In one transaction: mark a verified, unexpired, active session consumed
    /// (storing `metadata`) and get-or-create the user for `address`.
    ///
    /// Returns `None` when the session no longer qualifies (for example a
    /// concurrent consume won); nothing is written in that case.
    async fn consume(
        &self,
        id: Uuid,
        address: &str,
        metadata: &LoginMetadata,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AuthServiceError>;
}

/// Out-of-band code delivery.
pub trait SmsSender: Send + Sync {
    async fn send_otp(&self, address: &str, code: &str) -> Result<(), AuthServiceError>;
}

/// Mints signed tokens for a user.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<TokenPair, AuthServiceError>;
}
