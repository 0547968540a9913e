//! HTTP handlers, grouped by route prefix.
//!
//! Each module exposes a `router()` that the main router nests under its
//! prefix. Handlers stay thin: validate the payload, consult the stores,
//! map outcomes onto [`crate::error::AppError`].

pub mod auth;
pub mod comments;
pub mod health;
pub mod polls;
