//! Static file serving module
//!
//! The response side of the pipeline: evaluates conditional headers, emits
//! framing headers, and streams file content without buffering whole files.

use futures_util::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::{Response, StatusCode};
use std::io::ErrorKind;
use std::time::SystemTime;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::handler::resolve::ResolvedFile;
use crate::http::{self, cache, mime, response::ResponseBody};
use crate::logger;

/// Read size for streamed file bodies. Each chunk is pulled on demand as
/// the connection drains, so memory stays bounded per request.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Serve a resolved regular file.
///
/// For `HEAD` the headers are emitted with no body. A 304 short-circuits
/// before any file handle is opened.
pub async fn serve_file(
    file: &ResolvedFile,
    is_head: bool,
    if_modified_since: Option<&str>,
) -> Response<ResponseBody> {
    let modified = file
        .metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH);

    if cache::not_modified(if_modified_since, modified) {
        return http::build_304_response(modified);
    }

    let extension = file.path.extension().and_then(|e| e.to_str());
    let content_type = mime::content_type_for(extension);
    let size = file.metadata.len();

    let body = if is_head {
        http::response::empty_body()
    } else {
        match File::open(&file.path).await {
            Ok(f) => {
                let reader = ReaderStream::with_capacity(f, STREAM_CHUNK_SIZE);
                StreamBody::new(reader.map_ok(Frame::data)).boxed()
            }
            // The file vanished or broke between stat and open; headers are
            // not committed yet, so a proper status can still go out.
            Err(e) => return open_error_response(file, &e),
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", size)
        .header("Last-Modified", httpdate::fmt_http_date(modified))
        .header("Cache-Control", cache::CACHE_CONTROL)
        .body(body)
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build 200 response: {e}"));
            Response::new(http::response::empty_body())
        })
}

fn open_error_response(file: &ResolvedFile, error: &std::io::Error) -> Response<ResponseBody> {
    if error.kind() == ErrorKind::NotFound {
        return http::build_status_response(StatusCode::NOT_FOUND);
    }
    logger::log_error(&format!(
        "Failed to open '{}': {}",
        file.path.display(),
        error
    ));
    http::build_status_response(StatusCode::INTERNAL_SERVER_ERROR)
}
