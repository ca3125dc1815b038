#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use cakehaven_api::{
    app_router,
    config::AppConfig,
    db,
    entities::order::{self, Entity as OrderEntity},
    AppState,
};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};
use serde_json::Value;
use tower::ServiceExt;

/// Test harness that wires the full router against an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Build a new test application with migrations applied.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build a test application after adjusting the default test configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:");
        // A single connection keeps every request on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect to in-memory sqlite");
        db::run_migrations(&pool)
            .await
            .expect("apply migrations to in-memory sqlite");

        Self::from_parts(pool, cfg)
    }

    /// Build a test application whose database is unreachable.
    pub fn disconnected() -> Self {
        Self::from_parts(
            DatabaseConnection::Disconnected,
            AppConfig::new("sqlite::memory:"),
        )
    }

    fn from_parts(pool: DatabaseConnection, cfg: AppConfig) -> Self {
        let state = AppState::new(Arc::new(pool), cfg);
        let router = app_router(state.clone());
        Self { router, state }
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Body,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// POST a raw body and decode the JSON response.
    pub async fn post_raw(
        &self,
        uri: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let response = self
            .request(Method::POST, uri, Body::from(body.to_string()), headers)
            .await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// POST a JSON order to the intake route.
    pub async fn post_order(&self, order: &Value) -> (StatusCode, Value) {
        self.post_raw(
            "/api/PostOrder",
            &order.to_string(),
            &[("content-type", "application/json")],
        )
        .await
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> u64 {
        OrderEntity::find()
            .count(&*self.state.db)
            .await
            .expect("count orders")
    }

    /// Stored orders in insertion order.
    pub async fn orders(&self) -> Vec<order::Model> {
        OrderEntity::find()
            .order_by_asc(order::Column::Id)
            .all(&*self.state.db)
            .await
            .expect("load orders")
    }
}

/// Decode a response body as JSON, yielding `Value::Null` for non-JSON bodies.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
