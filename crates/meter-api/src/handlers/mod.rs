//! Route handlers.

pub mod demo;
pub mod health;
pub mod stats;
pub mod ws;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::state::AppState;

use self::stats::JsonpQuery;

/// Catch-all: `/<namespace>.json` point queries, the demo page otherwise.
///
/// The namespace segment is percent-decoded before lookup.
pub async fn fallback(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<JsonpQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let path = uri.path();
    match path.strip_suffix(".json") {
        Some(name) => {
            let name = percent_decode_str(name.trim_start_matches('/')).decode_utf8_lossy();
            stats::namespace_info(&state, &name, &query).into_response()
        }
        None => demo::render(&state, &headers, path).into_response(),
    }
}
