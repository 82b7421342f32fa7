use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use test24_domain::platform::Platform;

/// OTP code lifetime in seconds (5 minutes).
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;

/// Minimum spacing between two code deliveries for one session, in seconds.
pub const DEFAULT_RESEND_INTERVAL_SECS: i64 = 60;

/// Wrong-code submissions allowed before the code is dead until reissue.
pub const DEFAULT_MAX_ATTEMPTS: i16 = 5;

/// OTP code width in digits.
pub const DEFAULT_OTP_DIGITS: u32 = 4;

/// Widest code the `otp_code` column holds.
pub const MAX_OTP_DIGITS: u32 = 8;

/// Address that always receives [`DEFAULT_TEST_CODE`], for automated testing without SMS.
pub const DEFAULT_TEST_ADDRESS: &str = "+998999990000";

pub const DEFAULT_TEST_CODE: &str = "0571";

/// Tunables of the OTP workflow.
#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub code_digits: u32,
    pub ttl: Duration,
    pub resend_interval: Duration,
    pub max_attempts: i16,
    /// Address that gets `test_code` instead of a random code. `None` disables it.
    pub test_address: Option<String>,
    pub test_code: String,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            code_digits: DEFAULT_OTP_DIGITS,
            ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS),
            resend_interval: Duration::seconds(DEFAULT_RESEND_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            test_address: Some(DEFAULT_TEST_ADDRESS.to_owned()),
            test_code: DEFAULT_TEST_CODE.to_owned(),
        }
    }
}

/// One phone-verification attempt, from code issue to login.
#[derive(Clone, PartialEq)]
pub struct OtpSession {
    pub id: Uuid,
    pub address: String,
    /// Empty string means no secret is required.
    pub client_secret: String,
    pub otp_code: String,
    pub expires_at: DateTime<Utc>,
    pub last_sent_at: DateTime<Utc>,
    pub attempts: i16,
    pub max_attempts: i16,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub session_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Code and secret stay out of logs.
impl fmt::Debug for OtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpSession")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("expires_at", &self.expires_at)
            .field("last_sent_at", &self.last_sent_at)
            .field("attempts", &self.attempts)
            .field("max_attempts", &self.max_attempts)
            .field("is_verified", &self.is_verified)
            .field("consumed_at", &self.consumed_at)
            .finish_non_exhaustive()
    }
}

impl OtpSession {
    /// A freshly issued session for `address`.
    pub fn issue(
        address: &str,
        client_secret: &str,
        otp_code: String,
        policy: &OtpPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.to_owned(),
            client_secret: client_secret.to_owned(),
            otp_code,
            expires_at: now + policy.ttl,
            last_sent_at: now,
            attempts: 0,
            max_attempts: policy.max_attempts,
            is_verified: false,
            verified_at: None,
            consumed_at: None,
            session_data: serde_json::Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Not yet exchanged for a login.
    pub fn is_active(&self) -> bool {
        self.consumed_at.is_none()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether a resend is still blocked at `now`.
    pub fn is_throttled(&self, now: DateTime<Utc>, resend_interval: Duration) -> bool {
        now - self.last_sent_at < resend_interval
    }

    /// Whole seconds until a resend is allowed, rounded up, never negative.
    pub fn seconds_until_retry(&self, now: DateTime<Utc>, resend_interval: Duration) -> i64 {
        let remaining_ms = (resend_interval - (now - self.last_sent_at)).num_milliseconds();
        if remaining_ms <= 0 {
            0
        } else {
            (remaining_ms + 999) / 1000
        }
    }

    /// A recorded non-empty secret must be matched exactly; a missing one counts as empty.
    pub fn accepts_secret(&self, provided: Option<&str>) -> bool {
        self.client_secret.is_empty() || self.client_secret == provided.unwrap_or("")
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Exact comparison, no normalization.
    pub fn matches_code(&self, submitted: &str) -> bool {
        self.otp_code == submitted
    }
}

/// Field-level rewrite applied to an active, unverified session on resend.
#[derive(Clone, PartialEq)]
pub struct Reissue {
    pub otp_code: String,
    pub client_secret: String,
    pub last_sent_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reissue {
    /// Apply to an in-memory copy, mirroring what the store writes.
    pub fn apply_to(&self, session: &mut OtpSession) {
        session.otp_code = self.otp_code.clone();
        session.client_secret = self.client_secret.clone();
        session.last_sent_at = self.last_sent_at;
        session.expires_at = self.expires_at;
        session.attempts = 0;
        session.is_verified = false;
        session.verified_at = None;
        session.updated_at = self.last_sent_at;
    }
}

/// Minimal user identity owned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn new(phone_number: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone_number: phone_number.to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            date_joined: now,
        }
    }
}

/// Client device details reported at login. Stored verbatim for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

/// Everything recorded on the session when it is consumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoginMetadata {
    pub session_data: SessionData,
    pub referral_code: Option<String>,
}

/// Signed access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_exp: u64,
    pub refresh_token: String,
}
