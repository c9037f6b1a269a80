//! Business logic behind the handlers.

pub mod auth;
pub mod sponsor;
pub mod validation;
