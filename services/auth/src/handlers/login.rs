use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use test24_core::validation::{FieldErrors, ValidJson};
use test24_domain::platform::Platform;

use crate::domain::types::{LoginMetadata, SessionData};
use crate::error::AuthServiceError;
use crate::handlers::{required, session_id, uuid_format};
use crate::state::AppState;
use crate::usecase::login::{LoginInput, LoginUseCase};

fn platform_choice(value: &str) -> Result<(), ValidationError> {
    value.parse::<Platform>().map(|_| ()).map_err(|e| {
        ValidationError::new("choice").with_message(e.to_string().into())
    })
}

#[derive(Deserialize, Serialize, Validate)]
pub struct VerificationDataRequest {
    #[validate(required, custom(function = "uuid_format"))]
    pub session: Option<String>,
    #[serde(default, alias = "clientSecret")]
    #[validate(length(max = 255))]
    pub client_secret: Option<String>,
}

#[derive(Deserialize, Validate, Default)]
pub struct SessionDataRequest {
    #[validate(custom(function = "platform_choice"))]
    pub platform: Option<String>,
    #[serde(default, alias = "deviceOs")]
    pub device_os: Option<String>,
    #[serde(default, alias = "deviceModel")]
    pub device_model: Option<String>,
    #[serde(default, alias = "macAddress")]
    pub mac_address: Option<String>,
    pub lang: Option<String>,
    #[serde(default, alias = "appVersion")]
    pub app_version: Option<String>,
    pub theme: Option<String>,
}

impl TryFrom<SessionDataRequest> for SessionData {
    type Error = FieldErrors;

    fn try_from(request: SessionDataRequest) -> Result<Self, FieldErrors> {
        let platform = request
            .platform
            .map(|raw| raw.parse::<Platform>())
            .transpose()
            .map_err(|e| FieldErrors::single("session_data.platform", e.to_string()))?;
        Ok(Self {
            platform,
            device_os: request.device_os,
            device_model: request.device_model,
            mac_address: request.mac_address,
            lang: request.lang,
            app_version: request.app_version,
            theme: request.theme,
        })
    }
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, alias = "verificationData")]
    #[validate(required, nested)]
    pub verification_data: Option<VerificationDataRequest>,
    #[serde(default, alias = "sessionData")]
    #[validate(nested)]
    pub session_data: Option<SessionDataRequest>,
    #[serde(default, alias = "referralCode")]
    pub referral_code: Option<String>,
}

impl TryFrom<LoginRequest> for LoginInput {
    type Error = FieldErrors;

    fn try_from(request: LoginRequest) -> Result<Self, FieldErrors> {
        let verification = required(request.verification_data, "verification_data")?;
        let session = session_id(verification.session, "verification_data.session")?;
        let session_data = SessionData::try_from(request.session_data.unwrap_or_default())?;
        Ok(Self {
            session,
            client_secret: verification.client_secret,
            metadata: LoginMetadata {
                session_data,
                referral_code: request.referral_code,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub access: String,
    pub refresh: String,
}

/// Consume a verified session and return a token pair for its user.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthServiceError> {
    let input = LoginInput::try_from(request)?;
    let usecase = LoginUseCase {
        engine: state.engine.as_ref(),
        tokens: &state.tokens,
    };
    let output = usecase.execute(input).await?;
    Ok(Json(LoginResponse {
        user_id: output.user.id,
        access: output.access_token,
        refresh: output.refresh_token,
    }))
}
