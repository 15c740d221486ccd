//! User-account backend: registration, login, profile and admin listing
//! over an injected user store, with Argon2 hashing and JWT sessions.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
