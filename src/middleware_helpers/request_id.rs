use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is reused as is
const MAX_REQUEST_ID_LEN: usize = 128;

/// Caller's request id, if it is short, non-blank, visible ASCII
fn incoming_request_id(headers: &HeaderMap) -> Option<RequestId> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| RequestId::new(raw))
}

fn set_request_id_header(headers: &mut HeaderMap, value: &HeaderValue) {
    headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value.clone());
}

/// Tags every request with an id, reusing one the caller sent.
///
/// The id is visible to handlers as an extension and through
/// [`crate::tracing::current_request_id`], and is echoed on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = incoming_request_id(request.headers()).unwrap_or_default();
    let header_value = HeaderValue::from_str(request_id.as_str()).ok();

    if let Some(value) = &header_value {
        set_request_id_header(request.headers_mut(), value);
    }
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.as_str(),
        method = %request.method(),
        uri = %request.uri(),
    );
    let mut response = crate::tracing::scope_request_id(request_id, next.run(request))
        .instrument(span)
        .await;

    if let Some(value) = &header_value {
        set_request_id_header(response.headers_mut(), value);
    }
    response
}
