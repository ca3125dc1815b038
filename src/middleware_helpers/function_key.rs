use crate::errors::ServiceError;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Header carrying the function key
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Query parameter alternative to [`FUNCTION_KEY_HEADER`]
pub const FUNCTION_KEY_QUERY_PARAM: &str = "code";

/// Shared secret guarding the order routes
#[derive(Clone, Debug)]
pub struct FunctionKey(Arc<str>);

impl FunctionKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    fn matches(&self, presented: &str) -> bool {
        constant_time_eq(&self.0, presented)
    }
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn presented_key(request: &Request) -> Option<String> {
    if let Some(value) = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_string());
    }

    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(FUNCTION_KEY_QUERY_PARAM))
}

/// Rejects requests without the configured function key. With no key
/// configured every request passes.
pub async fn function_key_middleware(
    State(key): State<Option<FunctionKey>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = key else {
        return next.run(request).await;
    };

    match presented_key(&request) {
        Some(presented) if expected.matches(&presented) => next.run(request).await,
        Some(_) => {
            warn!(uri = %request.uri().path(), "Rejected request with a wrong function key");
            ServiceError::Unauthorized.into_response()
        }
        None => {
            warn!(uri = %request.uri().path(), "Rejected request without a function key");
            ServiceError::Unauthorized.into_response()
        }
    }
}
