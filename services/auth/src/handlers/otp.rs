use std::sync::LazyLock;

use axum::{Json, extract::State};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use test24_core::validation::{FieldErrors, ValidJson};
use test24_domain::phone::{PHONE_RE, PhoneNumber};

use crate::error::AuthServiceError;
use crate::handlers::{required, session_id, uuid_format};
use crate::state::AppState;

static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9]+$").expect("digits pattern compiles"));

#[derive(Deserialize, Validate)]
pub struct RequestOtpRequest {
    #[validate(
        required,
        length(max = 16),
        regex(
            path = *PHONE_RE,
            message = "Address must be a valid Uzbekistan phone number (e.g. +998901234567)."
        )
    )]
    pub address: Option<String>,
    #[serde(default, alias = "clientSecret")]
    #[validate(length(max = 255))]
    pub client_secret: Option<String>,
}

pub struct RequestOtpInput {
    pub address: PhoneNumber,
    pub client_secret: String,
}

impl TryFrom<RequestOtpRequest> for RequestOtpInput {
    type Error = FieldErrors;

    fn try_from(request: RequestOtpRequest) -> Result<Self, FieldErrors> {
        let address = PhoneNumber::parse(required(request.address, "address")?)
            .map_err(|e| FieldErrors::single("address", e.to_string()))?;
        Ok(Self {
            address,
            client_secret: request.client_secret.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RequestOtpResponse {
    pub session: Uuid,
    pub retry_after: i64,
}

/// Issue a code, or report the throttled active session with its retry delay.
pub async fn request_otp(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>, AuthServiceError> {
    let input = RequestOtpInput::try_from(request)?;
    let outcome = state
        .engine
        .issue_code(input.address.as_str(), &input.client_secret)
        .await?;
    Ok(Json(RequestOtpResponse {
        session: outcome.session.id,
        retry_after: outcome.retry_after,
    }))
}

#[derive(Deserialize, Validate)]
pub struct SubmitOtpRequest {
    #[validate(required, custom(function = "uuid_format"))]
    pub session: Option<String>,
    #[validate(
        required,
        length(max = 8),
        regex(path = *DIGITS_RE, message = "OTP must contain digits only.")
    )]
    pub otp: Option<String>,
    #[serde(default, alias = "clientSecret")]
    #[validate(length(max = 255))]
    pub client_secret: Option<String>,
}

pub struct SubmitOtpInput {
    pub session: Uuid,
    pub otp: String,
    pub client_secret: Option<String>,
}

impl SubmitOtpInput {
    /// Convert a rule-checked request, holding the code to the issued width.
    pub fn parse(request: SubmitOtpRequest, code_digits: u32) -> Result<Self, FieldErrors> {
        let session = session_id(request.session, "session")?;
        let otp = required(request.otp, "otp")?;
        check_code_width(&otp, code_digits)?;
        Ok(Self {
            session,
            otp,
            client_secret: request.client_secret,
        })
    }
}

fn check_code_width(otp: &str, code_digits: u32) -> Result<(), FieldErrors> {
    let width = code_digits as usize;
    let len = otp.chars().count();
    if len < width {
        return Err(FieldErrors::single(
            "otp",
            format!("Ensure this field has at least {width} characters."),
        ));
    }
    if len > width {
        return Err(FieldErrors::single(
            "otp",
            format!("Ensure this field has no more than {width} characters."),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SubmitOtpResponse {
    pub session: Uuid,
}

pub async fn submit_otp(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<SubmitOtpRequest>,
) -> Result<Json<SubmitOtpResponse>, AuthServiceError> {
    let input = SubmitOtpInput::parse(request, state.engine.policy.code_digits)?;
    let session = state
        .engine
        .validate_code(input.session, &input.otp, input.client_secret.as_deref())
        .await?;
    Ok(Json(SubmitOtpResponse {
        session: session.id,
    }))
}
