//! Buildline HTTP service: configuration, middleware, engine services and
//! the axum router.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
