use std::env;

/// Signing secret used when `JWT_SECRET` is unset outside production.
pub const DEV_JWT_SECRET: &str = "dev_secret";

const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://localhost:5174",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_env: AppEnv,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub public_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_env = AppEnv::parse(env::var("APP_ENV").ok().as_deref());
        let jwt_secret = resolve_jwt_secret(app_env, env::var("JWT_SECRET").ok())?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            app_env,
            jwt_secret,
            cors_origins: parse_origins(env::var("CORS_ORIGIN").ok().as_deref()),
            public_dir: env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".into()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    /// True when tokens are being signed with the well-known development secret.
    pub fn uses_insecure_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Picks the token signing secret. Production refuses to start without an
/// explicit override; development falls back to [`DEV_JWT_SECRET`] loudly.
pub fn resolve_jwt_secret(app_env: AppEnv, supplied: Option<String>) -> anyhow::Result<String> {
    match supplied.filter(|s| !s.trim().is_empty()) {
        Some(secret) => {
            if app_env == AppEnv::Production && secret == DEV_JWT_SECRET {
                anyhow::bail!("JWT_SECRET must not be the development default in production");
            }
            Ok(secret)
        }
        None if app_env == AppEnv::Production => {
            anyhow::bail!("Missing required env var: JWT_SECRET (APP_ENV=production)")
        }
        None => {
            tracing::warn!("JWT_SECRET not set, signing tokens with the development secret");
            Ok(DEV_JWT_SECRET.to_string())
        }
    }
}

fn parse_origins(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(list) if !list.trim().is_empty() => list
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect(),
        _ => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
