use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub phone_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /auth/login`. Fields are optional so that a missing
/// credential is reported as a validation error instead of a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub created: bool,
}
