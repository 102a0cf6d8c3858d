//! Demo page.

use axum::http::{HeaderMap, header};
use axum::response::Html;

use crate::state::AppState;

/// Renders the demo template for a request.
///
/// `{hostname}` becomes the request's `Host` header and `{pathname}` its
/// path, both HTML-escaped.
pub fn render(state: &AppState, headers: &HeaderMap, path: &str) -> Html<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    Html(
        state
            .demo_template
            .replace("{hostname}", &escape_html(host))
            .replace("{pathname}", &escape_html(path)),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
