use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Header name for trace ID.
pub const TRACE_ID_HEADER: &str = "x-trace-id";
/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request tracing state.
#[derive(Debug, Clone)]
pub struct TracingState {
    /// Trace ID, propagated from the caller when present.
    pub trace_id: String,
    /// Unique request ID.
    pub request_id: String,
}

impl TracingState {
    /// Create a new tracing state.
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    /// Create with an existing trace ID (for propagation).
    pub fn with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for TracingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach trace and request IDs to the request extensions and response headers.
pub async fn tracing_middleware(mut req: Request, next: Next) -> Response {
    let state = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| TracingState::with_trace_id(v.to_string()))
        .unwrap_or_default();

    req.extensions_mut().insert(state.clone());

    let mut response = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&state.trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, val);
    }
    if let Ok(val) = HeaderValue::from_str(&state.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    response
}
