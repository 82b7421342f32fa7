use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use test24_core::validation::FieldErrors;

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Session not found.")]
    SessionNotFound,
    #[error("Session expired. Please request a new OTP.")]
    SessionExpired,
    #[error("Session already used for login.")]
    SessionConsumed,
    #[error("OTP not verified yet.")]
    SessionNotVerified,
    #[error("Client secret mismatch.")]
    ClientSecretMismatch,
    #[error("Maximum attempts exceeded. Please request a new OTP.")]
    MaxAttemptsExceeded,
    #[error("OTP is incorrect.")]
    InvalidOtp,
    #[error("invalid request")]
    InvalidRequest(FieldErrors),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::SessionConsumed => "SESSION_CONSUMED",
            Self::SessionNotVerified => "SESSION_NOT_VERIFIED",
            Self::ClientSecretMismatch => "CLIENT_SECRET_MISMATCH",
            Self::MaxAttemptsExceeded => "MAX_ATTEMPTS_EXCEEDED",
            Self::InvalidOtp => "INVALID_OTP",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Request field the error is reported against, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::SessionExpired | Self::SessionConsumed | Self::SessionNotVerified => {
                Some("session")
            }
            Self::ClientSecretMismatch => Some("client_secret"),
            Self::MaxAttemptsExceeded | Self::InvalidOtp => Some("otp"),
            Self::SessionNotFound | Self::InvalidRequest(_) | Self::Internal(_) => None,
        }
    }

    fn fields(&self) -> FieldErrors {
        match self {
            Self::InvalidRequest(errors) => errors.clone(),
            other => match other.field() {
                Some(field) => FieldErrors::single(field, other.to_string()),
                None => FieldErrors::new(),
            },
        }
    }
}

impl From<FieldErrors> for AuthServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::InvalidRequest(errors)
    }
}

/// Every context layer of `e`, outermost first.
fn error_chain(e: &anyhow::Error) -> String {
    format!("{e:#}")
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::SessionExpired
            | Self::SessionConsumed
            | Self::SessionNotVerified
            | Self::ClientSecretMismatch
            | Self::MaxAttemptsExceeded
            | Self::InvalidOtp
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // 4xx are expected client errors; TraceLayer already records their status.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %error_chain(e), kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
            "fields": self.fields(),
        });
        (status, axum::Json(body)).into_response()
    }
}
