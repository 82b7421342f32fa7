use anyhow::Context as _;
use reqwest::header::CONTENT_TYPE;

use crate::domain::repository::SmsSender;
use crate::error::AuthServiceError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Development channel: writes the code to the log instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogSmsSender;

impl SmsSender for LogSmsSender {
    async fn send_otp(&self, address: &str, code: &str) -> Result<(), AuthServiceError> {
        tracing::info!(%address, %code, "otp sms (log channel)");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Delivers codes through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioSmsSender {
    client: reqwest::Client,
    options: TwilioOptions,
}

impl TwilioSmsSender {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            options,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{TWILIO_API_BASE}/Accounts/{sid}/Messages.json",
            sid = self.options.account_sid
        )
    }
}

fn message_form(to: &str, from: &str, code: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("To", to)
        .append_pair("From", from)
        .append_pair("Body", &message_body(code))
        .finish()
}

fn message_body(code: &str) -> String {
    format!("Your verification code: {code}")
}

impl SmsSender for TwilioSmsSender {
    async fn send_otp(&self, address: &str, code: &str) -> Result<(), AuthServiceError> {
        self.client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(message_form(address, &self.options.from_number, code))
            .send()
            .await
            .context("send twilio message")?
            .error_for_status()
            .context("twilio rejected message")?;
        Ok(())
    }
}

/// The configured delivery channel.
#[derive(Debug, Clone)]
pub enum SmsChannel {
    Log(LogSmsSender),
    Twilio(TwilioSmsSender),
}

impl SmsSender for SmsChannel {
    async fn send_otp(&self, address: &str, code: &str) -> Result<(), AuthServiceError> {
        match self {
            Self::Log(sender) => sender.send_otp(address, code).await,
            Self::Twilio(sender) => sender.send_otp(address, code).await,
        }
    }
}
