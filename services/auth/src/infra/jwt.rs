use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use uuid::Uuid;

use test24_auth_types::token::{JwtClaims, TokenType, encode_token};

use crate::domain::repository::TokenIssuer;
use crate::domain::types::{TokenPair, User};
use crate::error::AuthServiceError;

/// HS256 issuer for access/refresh pairs.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    pub secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl JwtTokenIssuer {
    fn sign(
        &self,
        user: &User,
        token_type: TokenType,
        iat: u64,
        exp: u64,
    ) -> Result<String, AuthServiceError> {
        let claims = JwtClaims {
            sub: user.id.to_string(),
            token_type,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_token(&claims, &self.secret).context("sign jwt")?;
        Ok(token)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, user: &User) -> Result<TokenPair, AuthServiceError> {
        let iat = now_secs();
        let access_token_exp = iat + self.access_ttl_secs;
        let access_token = self.sign(user, TokenType::Access, iat, access_token_exp)?;
        let refresh_token = self.sign(
            user,
            TokenType::Refresh,
            iat,
            iat + self.refresh_ttl_secs,
        )?;
        Ok(TokenPair {
            access_token,
            access_token_exp,
            refresh_token,
        })
    }
}
