use std::sync::Arc;

use crate::infra::db::DbOtpSessionRepository;
use crate::infra::jwt::JwtTokenIssuer;
use crate::infra::sms::SmsChannel;
use crate::usecase::otp::OtpEngine;

pub type Engine = OtpEngine<DbOtpSessionRepository, SmsChannel>;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub tokens: JwtTokenIssuer,
}
