use axum::{Router, routing::post};

use test24_core::middleware::with_observability;

use crate::handlers::{
    login::login,
    otp::{request_otp, submit_otp},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/api/v1/auth/request-otp", post(request_otp))
        .route("/api/v1/auth/submit-otp", post(submit_otp))
        .route("/api/v1/auth/login", post(login));
    with_observability(routes).with_state(state)
}
