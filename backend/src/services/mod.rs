pub mod auth;
pub mod children;
pub mod metrics;
pub mod normalize;
