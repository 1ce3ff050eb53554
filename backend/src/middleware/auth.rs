use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use sqlx::PgPool;

use crate::{
    error::{AppError, AuthFailure},
    models::auth::{AuthenticatedUser, Claims},
    AppState,
};

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        authenticate(&state.db, auth_header, &state.config.jwt_secret).await
    }
}

/// Resolves an `Authorization: Bearer <token>` header to a live user.
///
/// A valid signature is not enough: the user id in the token must still
/// exist in the `users` table.
pub async fn authenticate(
    pool: &PgPool,
    auth_header: Option<&str>,
    secret: &str,
) -> Result<AuthenticatedUser, AppError> {
    let token = auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthFailure::MissingToken)?;

    let claims = decode_token(token, secret).inspect_err(|e| {
        if let AppError::Unauthenticated(reason) = e {
            tracing::debug!("rejected bearer token: {reason}");
        }
    })?;

    let user = sqlx::query_as::<_, AuthenticatedUser>(
        "SELECT id, phone_number FROM users WHERE id = $1 LIMIT 1",
    )
    .bind(claims.id)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthFailure::UserNotFound)?;

    Ok(user)
}

/// Verifies signature and expiry. Expired and otherwise invalid tokens are
/// reported with different reasons; key or crypto faults are internal.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            let failure = match e.kind() {
                ErrorKind::ExpiredSignature => Some(AuthFailure::TokenExpired),
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => Some(AuthFailure::InvalidToken),
                _ => None,
            };
            match failure {
                Some(reason) => AppError::Unauthenticated(reason),
                None => AppError::Internal(anyhow::Error::from(e)),
            }
        })
}
