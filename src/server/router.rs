//! HTTP routing in front of the shards.
//!
//! ```text
//! GET  <any>                    - bootstrap document, no shard access
//! POST /<name>/<operation>?ix=  - forwarded to shard <name> as /<operation>
//! *    <any>                    - 405
//! ```
//!
//! Every request lands in one fallback handler so that arbitrary methods and
//! paths reach the same dispatch logic. The shard's response is returned
//! unmodified.

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use tracing::debug;
use tracing::instrument;

use super::AppState;
use crate::constants::PAGE_INDEX_PARAM;
use crate::shard::ShardRequest;

/// Build the router for `state`, limiting request bodies to `max_body_bytes`.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new().fallback(route_request).layer(DefaultBodyLimit::max(max_body_bytes)).with_state(state)
}

/// Target of a routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<'a> {
    pub name: &'a str,
    /// Shard-local path, `/<operation>`.
    pub path: String,
}

/// Split `/<name>/<operation>/...` into its first two segments. Returns `None`
/// when the name segment is empty. A missing operation maps to `/`.
pub fn parse_route(path: &str) -> Option<Route<'_>> {
    let mut segments = path.strip_prefix('/').unwrap_or(path).split('/');
    let name = segments.next().filter(|name| !name.is_empty())?;
    let operation = segments.next().unwrap_or("");
    Some(Route {
        name,
        path: format!("/{operation}"),
    })
}

/// Value of the page index query parameter, if present.
pub fn page_index_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == PAGE_INDEX_PARAM)
        .map(|(_, value)| value.into_owned())
}

#[instrument(skip_all, fields(method = %method, path = %uri.path(), status))]
async fn route_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let response = dispatch(&state, method, &uri, headers, body).await;
    tracing::Span::current().record("status", response.status().as_u16());
    response
}

async fn dispatch(state: &AppState, method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Response {
    if method == Method::GET {
        return Html(state.bootstrap.as_str().to_owned()).into_response();
    }
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(route) = parse_route(uri.path()) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let shard = state.registry.get_or_create(route.name);
    debug!(shard = %shard.id(), name = route.name, operation = %route.path, "forwarding");

    let request = ShardRequest {
        method,
        path: route.path,
        ix: page_index_param(uri),
        headers,
        body,
    };
    let response = shard.fetch(request).await;
    into_http_response(response.status, response.headers, response.body)
}

/// Rebuild a shard response without adding any header of our own.
fn into_http_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
