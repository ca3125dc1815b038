use axum::{
    body::{to_bytes, Body},
    extract::State,
    response::Json,
};
use metrics::counter;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::models::order::{FailureResponse, IntakeResponse, OrderRequest};
use crate::AppState;

/// Accepts one cake order.
///
/// Any body that does not deserialize into an order is answered 400 before
/// the database is touched.
#[utoipa::path(
    post,
    path = "/api/PostOrder",
    tag = "orders",
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Order placed", body = IntakeResponse),
        (status = 400, description = "Body is not a valid order", body = IntakeResponse),
        (status = 401, description = "Function key missing or wrong", body = IntakeResponse),
        (status = 409, description = "An order for this email and delivery date exists", body = IntakeResponse),
        (status = 500, description = "Storage failure", body = FailureResponse)
    ),
    params(
        ("x-functions-key" = Option<String>, Header, description = "Function key, when one is configured"),
        ("code" = Option<String>, Query, description = "Function key as a query parameter")
    )
)]
pub async fn post_order(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<IntakeResponse>, ServiceError> {
    info!("Order intake processed a request.");

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ServiceError::InternalError(format!("Failed to read request body: {e}")))?;

    let order = match OrderRequest::from_body(&bytes) {
        Ok(Some(order)) => order,
        Ok(None) => {
            warn!("Rejecting empty order body");
            counter!("cakehaven.orders.invalid", 1);
            return Err(ServiceError::InvalidOrder("empty body".to_string()));
        }
        Err(e) => {
            warn!(error = %e, "Rejecting malformed order body");
            counter!("cakehaven.orders.invalid", 1);
            return Err(ServiceError::InvalidOrder(e.to_string()));
        }
    };

    let placed = state
        .services
        .orders
        .place_order(order)
        .await
        .map_err(|e| {
            if e.status_code().is_server_error() {
                counter!("cakehaven.orders.failed", 1);
            }
            e
        })?;

    Ok(Json(IntakeResponse::placed(&placed.customer_name)))
}
