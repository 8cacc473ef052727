//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, target
//! resolution, response dispatch, and access logging.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::handler::resolve::{self, ResolveError};
use crate::handler::static_files;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};

/// Request context extracted once from the inbound request.
struct RequestContext {
    raw_target: String,
    is_head: bool,
    host: Option<String>,
    if_modified_since: Option<String>,
    referer: Option<String>,
    user_agent: Option<String>,
}

impl RequestContext {
    fn from_request(req: &Request<Incoming>) -> Self {
        Self {
            raw_target: req.uri().to_string(),
            is_head: *req.method() == Method::HEAD,
            host: header_value(req, "host"),
            if_modified_since: header_value(req, "if-modified-since"),
            referer: header_value(req, "referer"),
            user_agent: header_value(req, "user-agent"),
        }
    }
}

fn header_value(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let version = http_version_label(req.version());
    let ctx = RequestContext::from_request(&req);

    let response = if method_allowed(&method) {
        match resolve::resolve_target(&state.root, &ctx.raw_target, ctx.host.as_deref()).await {
            Ok(file) => {
                static_files::serve_file(&file, ctx.is_head, ctx.if_modified_since.as_deref())
                    .await
            }
            Err(err) => rejection_response(&err, &ctx, remote_addr),
        }
    } else {
        logger::log_warning(&format!("Method not allowed: {method}"));
        http::build_405_response()
    };

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            remote_addr.to_string(),
            method.to_string(),
            ctx.raw_target,
        );
        entry.http_version = version.to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = transferred_bytes(&response, ctx.is_head);
        entry.referer = ctx.referer;
        entry.user_agent = ctx.user_agent;
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Only GET and HEAD reach path processing.
fn method_allowed(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn http_version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

fn rejection_response(
    err: &ResolveError,
    ctx: &RequestContext,
    remote_addr: SocketAddr,
) -> Response<ResponseBody> {
    match err {
        ResolveError::Forbidden => {
            logger::log_warning(&format!(
                "Access denied for {remote_addr}: {}",
                ctx.raw_target
            ));
        }
        ResolveError::Internal(e) => {
            logger::log_error(&format!(
                "Filesystem error for '{}': {e}",
                ctx.raw_target
            ));
        }
        ResolveError::BadRequest | ResolveError::NotFound => {}
    }

    let response = http::build_status_response(err.status());
    if ctx.is_head {
        // Headers stay identical to the GET form; only the body is dropped
        let (parts, _) = response.into_parts();
        return Response::from_parts(parts, http::response::empty_body());
    }
    response
}

/// Body bytes the response will put on the wire; header-only responses
/// count as zero.
fn transferred_bytes(response: &Response<ResponseBody>, is_head: bool) -> u64 {
    if is_head || response.status() == StatusCode::NOT_MODIFIED {
        return 0;
    }
    response
        .headers()
        .get("Content-Length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_gate() {
        assert!(method_allowed(&Method::GET));
        assert!(method_allowed(&Method::HEAD));
        assert!(!method_allowed(&Method::POST));
        assert!(!method_allowed(&Method::DELETE));
        assert!(!method_allowed(&Method::OPTIONS));
    }

    #[test]
    fn test_transferred_bytes_reads_content_length() {
        let resp = http::build_status_response(StatusCode::NOT_FOUND);
        assert_eq!(transferred_bytes(&resp, false), 14);
        assert_eq!(transferred_bytes(&resp, true), 0);
    }
}
