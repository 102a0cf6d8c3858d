//! JSON and JSONP occupancy endpoints.

use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use meter_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Longest accepted JSONP callback name.
const MAX_CALLBACK_LEN: usize = 128;

/// Optional JSONP wrapping. `callback` wins over `jsonp`.
#[derive(Debug, Default, Deserialize)]
pub struct JsonpQuery {
    /// Callback name.
    pub callback: Option<String>,
    /// Alternate callback parameter.
    pub jsonp: Option<String>,
}

impl JsonpQuery {
    /// The callback to wrap the body in, if any. Empty values count as absent.
    pub fn callback(&self) -> Result<Option<&str>, AppError> {
        let name = [&self.callback, &self.jsonp]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|name| !name.is_empty());

        match name {
            Some(name) if !is_valid_callback(name) => {
                Err(AppError::malformed("Invalid callback name"))
            }
            other => Ok(other),
        }
    }
}

/// GET /stats.json
pub async fn stats_json(
    State(state): State<AppState>,
    Query(query): Query<JsonpQuery>,
) -> Result<Response, ApiError> {
    let stats = state.engine.registry.snapshot_all();
    json_response(&stats, &query)
}

/// GET /<namespace>.json, answered as `"members:connections"`.
///
/// Never creates the namespace.
pub fn namespace_info(
    state: &AppState,
    name: &str,
    query: &JsonpQuery,
) -> Result<Response, ApiError> {
    let info = state.engine.registry.info(name).to_string();
    json_response(&info, query)
}

fn json_response<T: Serialize>(value: &T, query: &JsonpQuery) -> Result<Response, ApiError> {
    let body = serde_json::to_string(value).map_err(AppError::from)?;

    let response = match query.callback()? {
        Some(callback) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/javascript"),
            )],
            format!("{callback}({body})"),
        )
            .into_response(),
        None => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body,
        )
            .into_response(),
    };
    Ok(response)
}

/// Identifier characters and dots, not starting with a digit or dot.
fn is_valid_callback(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_CALLBACK_LEN
        && (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}
