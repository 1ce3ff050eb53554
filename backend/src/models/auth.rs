use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Claims embedded in the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub iat: usize,
    pub exp: usize,
}

/// Resolved from a verified token and re-checked against the users table.
/// Available to handlers via the Axum extractor in `middleware::auth`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub phone_number: String,
}
