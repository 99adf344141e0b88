//! Request classification and validation.
//!
//! Everything here is pure: given a path, a content type and a body it either
//! produces a typed operation or a [`ValidationError`] whose display string is
//! the exact 400 message returned to the caller. Nothing in this module touches
//! storage or the SQL engine.

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::constants::GET_PAGE_MARKER;
use crate::constants::PAGE_SIZE;
use crate::constants::QUERY_MARKER;
use crate::constants::SET_PAGE_MARKER;
use crate::constants::STATEMENT_SEPARATOR;
use crate::page::PageIndex;
use crate::sql::SqlParam;

/// Client input rejected before any side effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected body to be an object")]
    NotAnObject,

    #[error("expected `body.sql` to be a string")]
    SqlNotString,

    #[error("expected `body.params` to be an array of `string | number | boolean | null`")]
    InvalidParams,

    #[error("expected `ix` to be a non-negative integer")]
    InvalidPageIndex,

    #[error("expected page body of at most {max} bytes")]
    OversizedPage { size: usize, max: usize },
}

/// What a shard-local path asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    GetPage,
    SetPage,
    /// SQL operation; `is_query` is true only for the exact query path.
    Sql { is_query: bool },
}

/// Classify a shard-local path. Page markers match by prefix, the query
/// marker only exactly; everything else is execute mode.
pub fn classify(path: &str) -> Classification {
    if path.starts_with(GET_PAGE_MARKER) {
        Classification::GetPage
    } else if path.starts_with(SET_PAGE_MARKER) {
        Classification::SetPage
    } else {
        Classification::Sql {
            is_query: path == QUERY_MARKER,
        }
    }
}

/// A validated SQL request ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRequest {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub is_query: bool,
}

/// Parse the `ix` query value as a page index.
pub fn parse_page_index(raw: Option<&str>) -> Result<PageIndex, ValidationError> {
    raw.and_then(|s| s.trim().parse::<PageIndex>().ok()).ok_or(ValidationError::InvalidPageIndex)
}

/// Check a `set-page` body fits in one page.
pub fn check_page_body(body: &[u8]) -> Result<(), ValidationError> {
    if body.len() > PAGE_SIZE {
        return Err(ValidationError::OversizedPage {
            size: body.len(),
            max: PAGE_SIZE,
        });
    }
    Ok(())
}

fn is_form(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("form"))
}

/// Parse and validate the body of a SQL request.
///
/// Form-encoded bodies carry `sql` and an optional `method`; `method=query`
/// switches to query mode and params are always empty. Any other body must be
/// a JSON object. Checks run in order and the first failure wins.
pub fn parse_sql_request(
    content_type: Option<&str>,
    body: &[u8],
    is_query: bool,
) -> Result<SqlRequest, ValidationError> {
    if is_form(content_type) {
        return parse_form(body, is_query);
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::NotAnObject)?;
    let Value::Object(object) = value else {
        return Err(ValidationError::NotAnObject);
    };
    parse_object(&object, is_query)
}

fn parse_form(body: &[u8], mut is_query: bool) -> Result<SqlRequest, ValidationError> {
    let mut sql = None;
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "sql" if sql.is_none() => sql = Some(value.into_owned()),
            "method" if value == "query" => is_query = true,
            _ => {}
        }
    }

    Ok(SqlRequest {
        sql: sql.ok_or(ValidationError::SqlNotString)?,
        params: Vec::new(),
        is_query,
    })
}

fn parse_object(object: &Map<String, Value>, is_query: bool) -> Result<SqlRequest, ValidationError> {
    let sql = match object.get("sql") {
        Some(Value::String(sql)) => sql.clone(),
        _ => return Err(ValidationError::SqlNotString),
    };

    let params = match object.get("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            items.iter().map(to_param).collect::<Option<Vec<_>>>().ok_or(ValidationError::InvalidParams)?
        }
        Some(_) => return Err(ValidationError::InvalidParams),
    };

    Ok(SqlRequest { sql, params, is_query })
}

/// Convert one JSON scalar to a bound parameter. Non-scalars yield `None`.
fn to_param(value: &Value) -> Option<SqlParam> {
    match value {
        Value::Null => Some(SqlParam::Null),
        Value::Bool(b) => Some(SqlParam::Bool(*b)),
        Value::String(s) => Some(SqlParam::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlParam::Integer(i)),
            None => n.as_f64().map(SqlParam::Real),
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Split execute-mode SQL into trimmed, non-empty statements.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(STATEMENT_SEPARATOR).map(str::trim).filter(|s| !s.is_empty()).collect()
}
