use uuid::Uuid;

use crate::domain::repository::{OtpSessionRepository, SmsSender, TokenIssuer};
use crate::domain::types::{LoginMetadata, User};
use crate::error::AuthServiceError;
use crate::usecase::otp::OtpEngine;

pub struct LoginInput {
    pub session: Uuid,
    pub client_secret: Option<String>,
    pub metadata: LoginMetadata,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct LoginUseCase<'a, R, S, T>
where
    R: OtpSessionRepository,
    S: SmsSender,
    T: TokenIssuer,
{
    pub engine: &'a OtpEngine<R, S>,
    pub tokens: &'a T,
}

impl<R, S, T> LoginUseCase<'_, R, S, T>
where
    R: OtpSessionRepository,
    S: SmsSender,
    T: TokenIssuer,
{
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutput, AuthServiceError> {
        let user = self
            .engine
            .consume(
                input.session,
                input.client_secret.as_deref(),
                &input.metadata,
            )
            .await?;

        // The session is already consumed; a minting failure surfaces as 500.
        let pair = self.tokens.issue(&user)?;

        Ok(LoginOutput {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }
}
