use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Status stored when the caller does not supply one
pub const DEFAULT_ORDER_STATUS: &str = "Pending";

/// Cake order as submitted by a customer.
///
/// Keys are PascalCase on the wire; camelCase spellings are accepted too.
/// Unknown keys, including any client-supplied order date, are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
#[schema(example = json!({
    "CustomerName": "Ana",
    "CustomerEmail": "ana@example.com",
    "CustomerPhone": "555",
    "CakeType": "Chocolate",
    "CakeSize": "Large",
    "DeliveryDate": "2024-12-25T00:00:00Z",
    "SpecialInstructions": "",
    "OrderStatus": null
}))]
pub struct OrderRequest {
    #[serde(alias = "customerName")]
    pub customer_name: String,
    #[serde(alias = "customerEmail")]
    pub customer_email: String,
    #[serde(alias = "customerPhone")]
    pub customer_phone: String,
    #[serde(alias = "cakeType")]
    pub cake_type: String,
    #[serde(alias = "cakeSize")]
    pub cake_size: String,
    #[serde(alias = "deliveryDate", deserialize_with = "deserialize_delivery_date")]
    pub delivery_date: DateTime<Utc>,
    #[serde(default, alias = "specialInstructions")]
    pub special_instructions: Option<String>,
    #[serde(default, alias = "orderStatus")]
    pub order_status: Option<String>,
}

impl OrderRequest {
    /// Parses a request body. Returns `None` for an empty body or JSON `null`.
    pub fn from_body(body: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice::<Option<Self>>(body)
    }

    /// Status to persist: the supplied value verbatim, or "Pending"
    pub fn effective_status(&self) -> String {
        self.order_status
            .clone()
            .unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string())
    }
}

fn deserialize_delivery_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_delivery_date(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid delivery date: {raw}")))
}

/// Accepts RFC 3339, a naive date-time (taken as UTC) or a bare date.
pub fn parse_delivery_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Body of the 200, 400, 401 and 409 responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "message": "Order for Ana has been successfully placed.",
    "status": "success"
}))]
pub struct IntakeResponse {
    pub message: String,
    pub status: ResponseStatus,
}

impl IntakeResponse {
    pub fn placed(customer_name: &str) -> Self {
        Self {
            message: format!("Order for {customer_name} has been successfully placed."),
            status: ResponseStatus::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ResponseStatus::Error,
        }
    }
}

/// Body of the 500 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "message": "An error occurred while processing your order.",
    "error": "Connection Error: pool timed out"
}))]
pub struct FailureResponse {
    pub message: String,
    pub error: String,
}
