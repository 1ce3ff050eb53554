use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    models::user::{LoginRequest, LoginResponse},
    services::auth::AuthService,
    AppState,
};

/// POST /auth/login: logs in, registering the phone number on first use.
/// 201 when an account was created, 200 otherwise.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let Json(body) = body?;

    let outcome = AuthService::login(&state.db, &body, &state.config.jwt_secret).await?;
    let status = if outcome.created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into_body())))
}
