pub mod auth;
pub mod child;
pub mod user;
