//! Log setup for the binaries and a middleware for logging requests and responses.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};
use unicode_segmentation::UnicodeSegmentation;

/// Log to stdout at the `info` level and to the file at `log_path` at the `debug` level.
///
/// `RUST_LOG` narrows or widens both outputs, e.g. `RUST_LOG=budget_bot=trace`.
///
/// # Errors
/// Returns an error if the log file cannot be opened for appending.
pub fn setup_logging(log_path: &Path) -> Result<(), io::Error> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let env_filter = EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::DEBUG.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(env_filter),
        )
        .init();

    Ok(())
}

/// The largest request body the logging middleware will read.
pub(crate) const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] graphemes, it is
/// truncated and the full body is logged at the `debug` level.
///
/// Requests with a body over [MAX_BODY_BYTES] are answered with a 413.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("Could not read request body: {error}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };
    log_request(&headers, &String::from_utf8_lossy(&bytes));

    let request = Request::from_parts(headers, Body::from(bytes));
    let response = next.run(request).await;

    let (headers, body) = response.into_parts();
    let body_text = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            String::new()
        }
    };
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The first [LOG_BODY_LENGTH_LIMIT] graphemes of `body`, or `None` if it is short enough.
fn truncate_body(body: &str) -> Option<String> {
    let mut graphemes = body.graphemes(true);
    let truncated: String = graphemes.by_ref().take(LOG_BODY_LENGTH_LIMIT).collect();

    graphemes.next().map(|_| truncated)
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    let (method, uri) = (&headers.method, &headers.uri);

    match truncate_body(body) {
        Some(truncated) => {
            tracing::info!("Received request: {method} {uri}\nbody: {truncated}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {method} {uri}\nbody: {body:?}"),
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    let status = headers.status;

    match truncate_body(body) {
        Some(truncated) => {
            tracing::info!("Sending response: {status}\nbody: {truncated}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {status}\nbody: {body:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{LOG_BODY_LENGTH_LIMIT, truncate_body};

    #[test]
    fn short_body_is_not_truncated() {
        assert_eq!(truncate_body("groceries, 1200"), None);
        assert_eq!(truncate_body(&"a".repeat(LOG_BODY_LENGTH_LIMIT)), None);
    }

    #[test]
    fn long_body_is_truncated() {
        let body = "a".repeat(LOG_BODY_LENGTH_LIMIT + 1);

        assert_eq!(truncate_body(&body), Some("a".repeat(LOG_BODY_LENGTH_LIMIT)));
    }

    #[test]
    fn truncates_on_grapheme_boundaries() {
        // Each flag is two code points and eight bytes.
        let body = "🇳🇿".repeat(LOG_BODY_LENGTH_LIMIT + 1);

        let truncated = truncate_body(&body).unwrap();

        assert_eq!(truncated, "🇳🇿".repeat(LOG_BODY_LENGTH_LIMIT));
    }
}
