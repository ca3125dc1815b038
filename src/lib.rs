//! Cake Haven order intake service
//!
//! Accepts cake orders over HTTP and stores at most one order per customer
//! email and delivery date.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware_helpers::{function_key_middleware, request_id_middleware, FunctionKey};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            services,
        }
    }
}

/// Order intake routes, guarded by the function key when one is configured
pub fn order_routes(function_key: Option<FunctionKey>) -> Router<AppState> {
    Router::new()
        .route("/api/PostOrder", post(handlers::orders::post_order))
        .route("/api/v1/orders", post(handlers::orders::post_order))
        .route_layer(axum::middleware::from_fn_with_state(
            function_key,
            function_key_middleware,
        ))
}

/// CORS restricted to the configured origins, permissive otherwise
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        ::tracing::info!("Using permissive CORS because no origins were configured");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Builds the full application router
pub fn app_router(state: AppState) -> Router {
    let function_key = state.config.function_key().map(FunctionKey::new);
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .merge(order_routes(function_key))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
