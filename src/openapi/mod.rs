use axum::Json;
use utoipa::OpenApi;

use crate::handlers::health::{ComponentHealth, ComponentStatus, HealthResponse};
use crate::models::order::{FailureResponse, IntakeResponse, OrderRequest, ResponseStatus};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cake Haven Order API",
        version = "0.1.0",
        description = r#"
# Cake Haven Order Intake

Accepts cake orders and stores at most one order per customer email and
delivery date.

## Authentication

When the service is configured with a function key, order routes require it
in the `x-functions-key` header or the `code` query parameter.

## Error Handling

Client errors answer `{"message": ..., "status": "error"}`. Storage failures
answer 500 with `{"message": ..., "error": ...}`.
"#
    ),
    paths(
        crate::handlers::orders::post_order,
        crate::handlers::health::health,
    ),
    components(schemas(
        OrderRequest,
        IntakeResponse,
        ResponseStatus,
        FailureResponse,
        HealthResponse,
        ComponentHealth,
        ComponentStatus,
    )),
    tags(
        (name = "orders", description = "Cake order intake"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI document as JSON
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
