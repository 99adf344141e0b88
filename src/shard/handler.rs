//! Per-shard request handling.
//!
//! A [`ShardHandler`] owns one shard's [`PageStore`] and dispatches each
//! request by its classification: raw page reads and writes go straight to the
//! page store, SQL requests are validated and handed to the engine with the
//! page store as its file system.

use std::sync::Arc;

use axum::http::Method;
use axum::http::StatusCode;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use super::request::ShardRequest;
use super::request::ShardResponse;
use super::validation::Classification;
use super::validation::SqlRequest;
use super::validation::ValidationError;
use super::validation::check_page_body;
use super::validation::classify;
use super::validation::parse_page_index;
use super::validation::parse_sql_request;
use super::validation::split_statements;
use crate::page::Page;
use crate::page::PageStore;
use crate::sharding::ShardId;
use crate::sql::Diagnostics;
use crate::sql::SqlEngine;
use crate::sql::compose_error_message;

const ONLY_POST: &str = "only POST requests are allowed";

/// Serves requests for exactly one shard.
pub struct ShardHandler {
    shard_id: ShardId,
    pages: PageStore,
    engine: Arc<dyn SqlEngine>,
}

impl ShardHandler {
    pub fn new(shard_id: ShardId, pages: PageStore, engine: Arc<dyn SqlEngine>) -> Self {
        Self {
            shard_id,
            pages,
            engine,
        }
    }

    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    /// Handle one forwarded request. Never fails: every error becomes a response.
    #[instrument(
        skip(self, request),
        fields(shard = %self.shard_id, method = %request.method, path = %request.path)
    )]
    pub async fn handle(&self, request: ShardRequest) -> ShardResponse {
        if request.method != Method::POST {
            return ShardResponse::text(StatusCode::METHOD_NOT_ALLOWED, ONLY_POST);
        }

        let result = match classify(&request.path) {
            Classification::GetPage => self.get_page(&request).await,
            Classification::SetPage => self.set_page(&request).await,
            Classification::Sql { is_query } => {
                match parse_sql_request(request.content_type(), &request.body, is_query) {
                    Ok(sql) if sql.is_query => Ok(self.query(sql).await),
                    Ok(sql) => Ok(self.execute(sql).await),
                    Err(err) => Err(err),
                }
            }
        };

        result.unwrap_or_else(|err| {
            debug!(error = %err, "rejected request");
            ShardResponse::text(StatusCode::BAD_REQUEST, err.to_string())
        })
    }

    async fn get_page(&self, request: &ShardRequest) -> Result<ShardResponse, ValidationError> {
        let ix = parse_page_index(request.ix.as_deref())?;
        Ok(match self.pages.get_page(ix).await {
            Ok(page) => ShardResponse::bytes(page.into_vec()),
            Err(err) => {
                warn!(ix, error = %err, "page read failed");
                ShardResponse::json_error(&err.to_string())
            }
        })
    }

    async fn set_page(&self, request: &ShardRequest) -> Result<ShardResponse, ValidationError> {
        let ix = parse_page_index(request.ix.as_deref())?;
        check_page_body(&request.body)?;

        let stored = match Page::from_bytes(&request.body) {
            Ok(page) => self.pages.put_page(ix, &page).await,
            Err(err) => Err(err),
        };
        Ok(match stored {
            Ok(()) => ShardResponse::ok(),
            Err(err) => {
                warn!(ix, error = %err, "page write failed");
                ShardResponse::json_error(&err.to_string())
            }
        })
    }

    /// Run each statement in order on one engine session, stopping at the
    /// first failure. Statements that already ran stay applied.
    async fn execute(&self, request: SqlRequest) -> ShardResponse {
        let statements = split_statements(&request.sql);
        debug!(statements = statements.len(), "executing");

        let mut diagnostics = Diagnostics::new();
        match self.engine.execute_batch(&self.pages, &statements, &request.params, &mut diagnostics).await {
            Ok(()) => ShardResponse::no_content(),
            Err(err) => {
                warn!(error = %err, "statement failed");
                ShardResponse::json_error(&compose_error_message(&err, &mut diagnostics))
            }
        }
    }

    async fn query(&self, request: SqlRequest) -> ShardResponse {
        let mut diagnostics = Diagnostics::new();
        match self.engine.query_raw(&self.pages, &request.sql, &request.params, &mut diagnostics).await {
            Ok(json) => ShardResponse::json(json),
            Err(err) => {
                warn!(error = %err, "query failed");
                ShardResponse::json_error(&compose_error_message(&err, &mut diagnostics))
            }
        }
    }
}

impl std::fmt::Debug for ShardHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardHandler").field("shard_id", &self.shard_id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;
    use crate::constants::PAGE_SIZE;
    use crate::kv::InMemoryStore;
    use crate::sql::UnavailableEngine;

    fn handler() -> ShardHandler {
        let pages = PageStore::new(InMemoryStore::new());
        ShardHandler::new(ShardId::from_name("test"), pages, Arc::new(UnavailableEngine))
    }

    #[tokio::test]
    async fn test_non_post_rejected() {
        let handler = handler();
        let mut request = ShardRequest::post("/query");
        request.method = Method::GET;

        let response = handler.handle(request).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body_text(), "only POST requests are allowed");
    }

    #[tokio::test]
    async fn test_get_unwritten_page() {
        let handler = handler();
        let response = handler.handle(ShardRequest::post("/get-page").with_ix("7")).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(response.body.len(), PAGE_SIZE);
        assert!(response.body.iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_set_then_get_page() {
        let handler = handler();
        let request = ShardRequest::post("/set-page").with_ix("2").with_body(vec![5u8; 10]);
        let response = handler.handle(request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());

        let response = handler.handle(ShardRequest::post("/get-page").with_ix("2")).await;
        assert_eq!(&response.body[..10], &[5u8; 10]);
        assert!(response.body[10..].iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_page_index_required() {
        let handler = handler();
        for request in [ShardRequest::post("/get-page"), ShardRequest::post("/set-page").with_ix("-3")] {
            let response = handler.handle(request).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
            assert_eq!(response.body_text(), "expected `ix` to be a non-negative integer");
        }
    }

    #[tokio::test]
    async fn test_oversized_page_rejected() {
        let handler = handler();
        let request = ShardRequest::post("/set-page").with_ix("0").with_body(vec![1u8; PAGE_SIZE + 1]);
        let response = handler.handle(request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let page = handler.pages().get_page(0).await.unwrap();
        assert!(page.is_zeroed());
    }

    #[tokio::test]
    async fn test_engine_error_is_json_500() {
        let handler = handler();
        let request = ShardRequest::post("/query").with_json(&serde_json::json!({ "sql": "SELECT 1" }));

        let response = handler.handle(request).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "no SQL engine is configured\n");
    }

    #[tokio::test]
    async fn test_empty_execute_is_no_content() {
        let handler = handler();
        let request = ShardRequest::post("/execute").with_json(&serde_json::json!({ "sql": " ; ;" }));

        let response = handler.handle(request).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }
}
