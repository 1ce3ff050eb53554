pub mod auth;
pub mod children;
pub mod health;

use axum::{
    handler::HandlerWithoutStateExt,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{config::Config, error::AppError, AppState};

pub fn router(state: AppState) -> Router {
    let static_files =
        ServeDir::new(&state.config.public_dir).not_found_service(not_found.into_service());
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics_handler))
        // Auth
        .route("/auth/login", post(auth::login))
        // Children
        .route("/children", get(children::list_children).post(children::create_child))
        .route(
            "/children/{id}",
            get(children::get_child)
                .put(children::update_child)
                .delete(children::delete_child),
        )
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Route")
}

/// Configured origins are always allowed. Outside production any local
/// development origin is allowed too. Requests without an Origin pass.
fn cors_layer(config: &Config) -> CorsLayer {
    let allowed = config.cors_origins.clone();
    let allow_local = !config.is_production();

    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        if allow_local && is_local_origin(o) {
            return true;
        }
        let allowed_origin = allowed.iter().any(|a| a == o);
        if !allowed_origin {
            tracing::warn!("CORS: blocked origin {o}");
        }
        allowed_origin
    });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn is_local_origin(origin: &str) -> bool {
    ["http://localhost:", "http://127.0.0.1:", "http://0.0.0.0:"]
        .iter()
        .any(|prefix| origin.starts_with(prefix))
}
