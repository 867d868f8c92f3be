//! Helpers shared across routers

pub mod auth;
