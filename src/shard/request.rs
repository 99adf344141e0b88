//! Request/response boundary between the router and a shard.
//!
//! These mirror an HTTP exchange closely enough that the router can forward
//! headers and body verbatim and return the shard's answer untouched.

use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header;
use bytes::Bytes;
use serde::Serialize;

/// A request forwarded to one shard.
#[derive(Debug, Clone)]
pub struct ShardRequest {
    pub method: Method,
    /// Shard-local path, always starting with `/` (e.g. `/query`).
    pub path: String,
    /// Raw value of the `ix` query parameter, when the caller sent one.
    pub ix: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ShardRequest {
    /// A POST to `path` with an empty body and no headers.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            ix: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_ix(mut self, ix: impl Into<String>) -> Self {
        self.ix = Some(ix.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    /// Body as JSON with a JSON content type.
    pub fn with_json(self, body: &serde_json::Value) -> Self {
        self.with_content_type("application/json").with_body(body.to_string())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// A shard's answer, returned to the caller byte-for-byte.
#[derive(Debug, Clone)]
pub struct ShardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ShardResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Empty 200.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Empty 204.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// Plain-text body with the given status.
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status)
            .with_header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .with_body(message.into())
    }

    /// Raw bytes with an octet-stream content type.
    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self::ok().with_header(header::CONTENT_TYPE, "application/octet-stream").with_body(body)
    }

    /// Serialized JSON result with status 200.
    pub fn json(body: String) -> Self {
        Self::ok().with_header(header::CONTENT_TYPE, "application/json; charset=utf-8").with_body(body)
    }

    /// `{"error": message}` with status 500.
    pub fn json_error(message: &str) -> Self {
        // Serializing a struct of one string cannot fail.
        let body = serde_json::to_string(&ErrorBody { error: message }).unwrap_or_default();
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_header(header::CONTENT_TYPE, "application/json")
            .with_body(body)
    }

    fn with_header(mut self, name: header::HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, lossy. Handy in logs and tests.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
