//! Request middleware: CORS, JSON body parsing and panic recovery.

use std::any::Any;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, Any as AnyOrigin, CorsLayer};

use crate::error::ApiError;

/// Largest JSON body accepted, in bytes.
pub const JSON_BODY_LIMIT: usize = 100 * 1024;

/// Parsed JSON request body, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub serde_json::Value);

/// Permissive CORS: any origin, the standard methods, mirrored headers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Parse JSON request bodies into a [`JsonBody`] extension.
///
/// Only `application/json` bodies are touched; vendor `+json` types pass
/// through unparsed. The raw bytes are put back so downstream extractors
/// can still read them.
pub async fn parse_json_body(request: Request, next: Next) -> Result<Response, ApiError> {
    if !is_json(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, JSON_BODY_LIMIT)
        .await
        .map_err(|e| ApiError::Body(e.to_string()))?;

    if !bytes.is_empty() {
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        parts.extensions.insert(JsonBody(value));
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json"
}

/// Turn a handler panic into the standard 500 body.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };

    ApiError::Panic(message).into_response()
}
