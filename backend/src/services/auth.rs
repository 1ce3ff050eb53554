use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use tracing::info;

use crate::{
    error::AppError,
    models::{
        auth::Claims,
        user::{LoginRequest, LoginResponse, User},
    },
    services::metrics,
};

/// Session tokens are valid for a fixed 7 days.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub const BCRYPT_COST: u32 = 10;

/// Longest phone number the `users.phone_number` column holds.
pub const MAX_PHONE_LEN: usize = 32;

/// Result of a login attempt. An unknown phone number registers a new
/// account instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Registered { user_id: i64, token: String },
    Authenticated { user_id: i64, token: String },
}

impl LoginOutcome {
    pub fn created(&self) -> bool {
        matches!(self, LoginOutcome::Registered { .. })
    }

    pub fn user_id(&self) -> i64 {
        match self {
            LoginOutcome::Registered { user_id, .. } | LoginOutcome::Authenticated { user_id, .. } => *user_id,
        }
    }

    pub fn into_body(self) -> LoginResponse {
        let created = self.created();
        let token = match self {
            LoginOutcome::Registered { token, .. } | LoginOutcome::Authenticated { token, .. } => token,
        };
        LoginResponse { token, created }
    }
}

pub struct AuthService;

impl AuthService {
    /// Login-or-register by phone number.
    ///
    /// Writes exactly one `users` row when the phone number is new and
    /// nothing otherwise.
    pub async fn login(
        pool: &PgPool,
        req: &LoginRequest,
        jwt_secret: &str,
    ) -> Result<LoginOutcome, AppError> {
        let (phone_number, password) = match (req.phone_number.as_deref(), req.password.as_deref()) {
            (Some(phone), Some(password)) if !phone.is_empty() && !password.is_empty() => (phone, password),
            _ => return Err(AppError::validation("phoneNumber and password are required")),
        };
        if phone_number.chars().count() > MAX_PHONE_LEN {
            return Err(AppError::validation("phoneNumber is too long"));
        }

        let existing = sqlx::query_as::<_, User>(
            "SELECT id, phone_number, password_hash, name, created_at
             FROM users WHERE phone_number = $1 LIMIT 1",
        )
        .bind(phone_number)
        .fetch_optional(pool)
        .await?;

        let Some(user) = existing else {
            let password_hash = hash_password(password).await?;
            let name = req.name.as_deref().filter(|n| !n.is_empty());

            let user_id: i64 = sqlx::query_scalar(
                "INSERT INTO users (phone_number, password_hash, name)
                 VALUES ($1, $2, $3)
                 RETURNING id",
            )
            .bind(phone_number)
            .bind(&password_hash)
            .bind(name)
            .fetch_one(pool)
            .await?;

            metrics::record_login("registered");
            let token = Self::generate_token(user_id, phone_number, jwt_secret)?;
            let outcome = LoginOutcome::Registered { user_id, token };
            info!(user_id = outcome.user_id(), "registered new user on first login");
            return Ok(outcome);
        };

        if !verify_password(password, &user.password_hash).await? {
            metrics::record_login("rejected");
            return Err(AppError::InvalidCredentials);
        }

        metrics::record_login("authenticated");
        let token = Self::generate_token(user.id, &user.phone_number, jwt_secret)?;
        let outcome = LoginOutcome::Authenticated { user_id: user.id, token };
        info!(user_id = outcome.user_id(), "user logged in");
        Ok(outcome)
    }

    pub fn generate_token(user_id: i64, phone_number: &str, secret: &str) -> Result<String, AppError> {
        Self::generate_token_at(user_id, phone_number, secret, Utc::now())
    }

    /// Signs a token as if issued at `issued_at`; expiry is `issued_at` + 7 days.
    pub fn generate_token_at(
        user_id: i64,
        phone_number: &str,
        secret: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let iat = issued_at.timestamp().max(0) as usize;
        let exp = (issued_at + Duration::days(TOKEN_TTL_DAYS)).timestamp().max(0) as usize;
        let claims = Claims {
            id: user_id,
            phone_number: phone_number.to_string(),
            iat,
            exp,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(anyhow::Error::from)?;
        Ok(token)
    }
}

/// bcrypt is CPU bound; keep it off the async workers.
async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;
    Ok(hash)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;
    Ok(valid)
}
