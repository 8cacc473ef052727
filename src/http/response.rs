//! HTTP response building module
//!
//! Provides the shared response body type and builders for the status-code
//! responses, decoupled from specific business logic.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::time::SystemTime;

use crate::http::cache;

/// Response body used across the server.
///
/// Fixed bodies (status lines, empty bodies) and streamed file bodies are
/// erased to the same type so a single service signature covers both.
pub type ResponseBody = BoxBody<Bytes, std::io::Error>;

/// Wrap a fully-buffered payload as a response body.
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| -> std::io::Error { match never {} })
        .boxed()
}

/// An empty response body (HEAD responses, 304).
pub fn empty_body() -> ResponseBody {
    Empty::new()
        .map_err(|never| -> std::io::Error { match never {} })
        .boxed()
}

/// Build the plain-text response for a rejection status code.
///
/// The body is a single line, `"<code> <reason phrase>\n"`.
pub fn build_status_response(status: StatusCode) -> Response<ResponseBody> {
    let line = format!(
        "{} {}\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Content-Length", line.len())
        .body(full_body(line))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(empty_body())
        })
}

/// Build 405 Method Not Allowed response
///
/// The only response carrying an `Allow` header.
pub fn build_405_response() -> Response<ResponseBody> {
    let line = "405 Method Not Allowed\n";
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD")
        .header("Content-Length", line.len())
        .body(full_body(line))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(empty_body())
        })
}

/// Build 304 Not Modified response
///
/// Carries validation headers only; no body regardless of method.
pub fn build_304_response(modified: SystemTime) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("Last-Modified", httpdate::fmt_http_date(modified))
        .header("Cache-Control", cache::CACHE_CONTROL)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(empty_body())
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
