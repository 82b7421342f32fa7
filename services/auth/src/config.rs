use chrono::Duration;
use serde::Deserialize;
use test24_core::config::Config;

use crate::domain::types::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_OTP_DIGITS, DEFAULT_OTP_TTL_SECS, DEFAULT_RESEND_INTERVAL_SECS,
    DEFAULT_TEST_ADDRESS, DEFAULT_TEST_CODE, MAX_OTP_DIGITS, OtpPolicy,
};
use crate::infra::sms::{LogSmsSender, SmsChannel, TwilioOptions, TwilioSmsSender};

/// Auth service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for signing JWT access and refresh tokens.
    pub jwt_secret: String,
    /// TCP port to listen on. Env var: `AUTH_PORT`.
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_secs: u64,
    #[serde(default = "default_otp_ttl")]
    pub otp_ttl_secs: i64,
    #[serde(default = "default_resend_interval")]
    pub otp_resend_interval_secs: i64,
    #[serde(default = "default_max_attempts")]
    pub otp_max_attempts: i16,
    #[serde(default = "default_code_digits")]
    pub otp_code_digits: u32,
    /// Address that always receives `otp_test_code`. Empty disables it.
    #[serde(default = "default_test_address")]
    pub otp_test_address: String,
    #[serde(default = "default_test_code")]
    pub otp_test_code: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
}

impl Config for AuthConfig {}

fn default_auth_port() -> u16 {
    8000
}

fn default_access_token_ttl() -> u64 {
    30 * 60
}

fn default_refresh_token_ttl() -> u64 {
    30 * 24 * 60 * 60
}

fn default_otp_ttl() -> i64 {
    DEFAULT_OTP_TTL_SECS
}

fn default_resend_interval() -> i64 {
    DEFAULT_RESEND_INTERVAL_SECS
}

fn default_max_attempts() -> i16 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_code_digits() -> u32 {
    DEFAULT_OTP_DIGITS
}

fn default_test_address() -> String {
    DEFAULT_TEST_ADDRESS.to_owned()
}

fn default_test_code() -> String {
    DEFAULT_TEST_CODE.to_owned()
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("OTP_CODE_DIGITS must be between 1 and 8, got {0}")]
    CodeDigits(u32),
    #[error("OTP_TEST_CODE must be exactly {0} digits")]
    TestCode(u32),
}

impl AuthConfig {
    /// OTP tunables, rejecting code widths the store or the generator cannot hold.
    pub fn otp_policy(&self) -> Result<OtpPolicy, PolicyError> {
        let digits = self.otp_code_digits;
        if !(1..=MAX_OTP_DIGITS).contains(&digits) {
            return Err(PolicyError::CodeDigits(digits));
        }
        let test_address = Some(self.otp_test_address.clone()).filter(|a| !a.is_empty());
        let test_code_fits = self.otp_test_code.len() == digits as usize
            && self.otp_test_code.bytes().all(|b| b.is_ascii_digit());
        if test_address.is_some() && !test_code_fits {
            return Err(PolicyError::TestCode(digits));
        }
        Ok(OtpPolicy {
            code_digits: digits,
            ttl: Duration::seconds(self.otp_ttl_secs),
            resend_interval: Duration::seconds(self.otp_resend_interval_secs),
            max_attempts: self.otp_max_attempts,
            test_address,
            test_code: self.otp_test_code.clone(),
        })
    }

    /// Twilio when all three credentials are set, otherwise the log channel.
    pub fn sms_channel(&self) -> SmsChannel {
        match (
            &self.twilio_account_sid,
            &self.twilio_auth_token,
            &self.twilio_from_number,
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => {
                SmsChannel::Twilio(TwilioSmsSender::new(TwilioOptions {
                    account_sid: account_sid.clone(),
                    auth_token: auth_token.clone(),
                    from_number: from_number.clone(),
                }))
            }
            _ => SmsChannel::Log(LogSmsSender),
        }
    }
}
