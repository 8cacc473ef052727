//! End-to-end tests for the resolve/serve pipeline against a real
//! directory tree.

use http_body_util::BodyExt;
use hyper::StatusCode;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use fileserv::handler::resolve::{self, ResolveError};
use fileserv::handler::static_files;

/// Root layout shared by most tests:
/// - index.html
/// - docs/guide.txt
/// - docs/data.bin (unknown extension)
/// - empty/ (directory without an index file)
fn setup_root() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.html"), b"<h1>hello</h1>\n").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/guide.txt"), b"guide contents\n").unwrap();
    fs::write(dir.path().join("docs/data.bin"), b"\x00\x01\x02\x03").unwrap();
    fs::create_dir(dir.path().join("empty")).unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

async fn body_bytes(response: hyper::Response<fileserv::http::ResponseBody>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

#[tokio::test]
async fn serves_existing_file_byte_for_byte() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/docs/guide.txt", None)
        .await
        .unwrap();
    let expected_len = file.metadata.len();

    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.headers().get("Content-Length").unwrap(),
        &expected_len.to_string()
    );
    assert_eq!(
        response.headers().get("Cache-Control").unwrap(),
        "public, max-age=60"
    );
    assert!(response.headers().contains_key("Last-Modified"));

    assert_eq!(body_bytes(response).await, b"guide contents\n");
}

#[tokio::test]
async fn streams_file_larger_than_one_chunk() {
    let (dir, root) = setup_root();
    let content: Vec<u8> = (0..200_000u32).map(|i| u8::try_from(i % 251).unwrap()).collect();
    fs::write(dir.path().join("big.bin"), &content).unwrap();

    let file = resolve::resolve_target(&root, "/big.bin", None).await.unwrap();
    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, content);
}

#[tokio::test]
async fn root_request_falls_back_to_index() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/", None).await.unwrap();
    assert!(file.path.ends_with("index.html"));

    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(body_bytes(response).await, b"<h1>hello</h1>\n");
}

#[tokio::test]
async fn directory_without_index_is_forbidden_not_missing() {
    let (_dir, root) = setup_root();
    let err = resolve::resolve_target(&root, "/empty/", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Forbidden));

    let err = resolve::resolve_target(&root, "/empty", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Forbidden));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let (_dir, root) = setup_root();
    let err = resolve::resolve_target(&root, "/missing.txt", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotFound));
}

#[tokio::test]
async fn traversal_is_forbidden_even_when_target_exists() {
    let (_dir, root) = setup_root();
    for target in [
        "/../etc/passwd",
        "/docs/../../etc/passwd",
        "/%2e%2e/etc/passwd",
        "/%2E%2E/%2e%2e/etc/passwd",
        "/.%2e/x",
        "/%2e./x",
        // Traversal inside the root is rejected too, resolvable or not
        "/docs/../index.html",
    ] {
        let err = resolve::resolve_target(&root, target, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ResolveError::Forbidden),
            "expected Forbidden for {target}"
        );
    }
}

#[tokio::test]
async fn percent_encoded_names_are_decoded() {
    let (dir, root) = setup_root();
    fs::write(dir.path().join("my file.txt"), b"spaced\n").unwrap();

    let file = resolve::resolve_target(&root, "/my%20file.txt", None)
        .await
        .unwrap();
    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"spaced\n");
}

#[tokio::test]
async fn query_string_is_ignored_for_resolution() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/docs/guide.txt?download=1", Some("example.com"))
        .await
        .unwrap();
    assert!(file.path.ends_with("docs/guide.txt"));
}

#[tokio::test]
async fn unknown_extension_gets_binary_fallback() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/docs/data.bin", None)
        .await
        .unwrap();
    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn head_matches_get_headers_with_empty_body() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/docs/guide.txt", None)
        .await
        .unwrap();

    let get = static_files::serve_file(&file, false, None).await;
    let head = static_files::serve_file(&file, true, None).await;

    assert_eq!(get.status(), head.status());
    for name in ["Content-Type", "Content-Length", "Last-Modified", "Cache-Control"] {
        assert_eq!(
            get.headers().get(name),
            head.headers().get(name),
            "header {name} differs between GET and HEAD"
        );
    }
    assert!(body_bytes(head).await.is_empty());
}

#[tokio::test]
async fn if_modified_since_controls_304() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/docs/guide.txt", None)
        .await
        .unwrap();
    let modified = file.metadata.modified().unwrap();

    // Exact timestamp: not modified
    let header = httpdate::fmt_http_date(modified);
    let response = static_files::serve_file(&file, false, Some(&header)).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(response.headers().contains_key("Last-Modified"));
    assert_eq!(
        response.headers().get("Cache-Control").unwrap(),
        "public, max-age=60"
    );
    assert!(body_bytes(response).await.is_empty());

    // Later timestamp: not modified
    let later = httpdate::fmt_http_date(modified + std::time::Duration::from_secs(100));
    let response = static_files::serve_file(&file, false, Some(&later)).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    // Earlier timestamp: full response
    let earlier = httpdate::fmt_http_date(modified - std::time::Duration::from_secs(100));
    let response = static_files::serve_file(&file, false, Some(&earlier)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"guide contents\n");
}

#[tokio::test]
async fn head_honors_not_modified_too() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/index.html", None)
        .await
        .unwrap();
    let header = httpdate::fmt_http_date(file.metadata.modified().unwrap());
    let response = static_files::serve_file(&file, true, Some(&header)).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn garbage_conditional_header_is_ignored() {
    let (_dir, root) = setup_root();
    let file = resolve::resolve_target(&root, "/index.html", None)
        .await
        .unwrap();
    let response = static_files::serve_file(&file, false, Some("not a date")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escaping_the_root_is_forbidden() {
    let (dir, root) = setup_root();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), b"secret\n").unwrap();
    std::os::unix::fs::symlink(
        outside.path().join("secret.txt"),
        dir.path().join("leak.txt"),
    )
    .unwrap();

    let err = resolve::resolve_target(&root, "/leak.txt", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Forbidden));
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_inside_the_root_is_served() {
    let (dir, root) = setup_root();
    std::os::unix::fs::symlink(
        dir.path().join("docs/guide.txt"),
        dir.path().join("alias.txt"),
    )
    .unwrap();

    let file = resolve::resolve_target(&root, "/alias.txt", None)
        .await
        .unwrap();
    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"guide contents\n");
}

#[tokio::test]
async fn dangling_target_after_stat_is_reported_not_fatal() {
    // Deleting the file between resolve and serve exercises the
    // stat-to-open race; headers are not committed so a status goes out.
    let (dir, root) = setup_root();
    fs::write(dir.path().join("gone.txt"), b"fleeting\n").unwrap();
    let file = resolve::resolve_target(&root, "/gone.txt", None)
        .await
        .unwrap();
    fs::remove_file(dir.path().join("gone.txt")).unwrap();

    let response = static_files::serve_file(&file, false, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
