//! Domain models shared by the auth flows and their storage backends.

pub mod auth;
pub mod sponsor;
