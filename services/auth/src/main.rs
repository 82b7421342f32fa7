use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use test24_auth::config::AuthConfig;
use test24_auth::infra::db::DbOtpSessionRepository;
use test24_auth::infra::jwt::JwtTokenIssuer;
use test24_auth::router::build_router;
use test24_auth::state::AppState;
use test24_auth::usecase::otp::OtpEngine;
use test24_core::config::Config;
use test24_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AuthConfig::from_env();
    let policy = config.otp_policy().expect("invalid OTP configuration");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let engine = OtpEngine::new(
        DbOtpSessionRepository { db },
        config.sms_channel(),
        policy,
    );

    let state = AppState {
        engine: Arc::new(engine),
        tokens: JwtTokenIssuer {
            secret: config.jwt_secret.clone(),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        },
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
