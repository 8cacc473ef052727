//! Request target resolution module
//!
//! Turns a raw HTTP request target into a filesystem path that is safe to
//! open, or a rejection. The pipeline is: pre-screen the undecoded target,
//! decode, normalize, join onto the root, stat (with directory-to-index
//! fallback), then re-verify containment on the canonical path.

use hyper::StatusCode;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use url::Url;

/// Filename served automatically when a directory is requested.
pub const INDEX_FILE: &str = "index.html";

/// Authority used to anchor relative request targets when the request has
/// no usable Host header.
const FALLBACK_HOST: &str = "localhost";

/// A request target resolved to a regular file, freshly stat'd.
#[derive(Debug)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub metadata: std::fs::Metadata,
}

/// Per-request rejection outcomes.
///
/// Every variant is terminal; none are retried. A filesystem "not found"
/// is never escalated to `Internal`.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed request target (undecodable, invalid authority)
    #[error("malformed request target")]
    BadRequest,
    /// Traversal attempt, escape from the root, or directory without index
    #[error("access denied")]
    Forbidden,
    /// No such file
    #[error("no such file")]
    NotFound,
    /// Unexpected filesystem failure unrelated to existence
    #[error("filesystem error: {0}")]
    Internal(std::io::Error),
}

impl ResolveError {
    /// Status code this rejection maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Run the full resolution pipeline against a canonicalized root.
pub async fn resolve_target(
    root: &Path,
    raw_target: &str,
    host: Option<&str>,
) -> Result<ResolvedFile, ResolveError> {
    prescreen(raw_target)?;
    let decoded = decode(raw_target, host)?;
    let normalized = normalize(&decoded);
    resolve(root, &normalized).await
}

/// Reject any raw target carrying a parent-directory sequence, literal or
/// percent-encoded, before decoding happens.
///
/// This runs on the undecoded string: the decoder normalizes `..` segments
/// away, so it cannot be trusted as the sole defense against encoding
/// tricks. The containment checks in [`resolve`] remain the authoritative
/// boundary.
pub fn prescreen(raw_target: &str) -> Result<(), ResolveError> {
    const ENCODED_FORMS: [&str; 3] = ["%2e%2e", "%2e.", ".%2e"];

    let lowered = raw_target.to_ascii_lowercase();
    if lowered.contains("..") || ENCODED_FORMS.iter().any(|form| lowered.contains(form)) {
        return Err(ResolveError::Forbidden);
    }
    Ok(())
}

/// Parse the raw target against a synthetic base built from the Host
/// header and percent-decode the resulting pathname.
pub fn decode(raw_target: &str, host: Option<&str>) -> Result<String, ResolveError> {
    let authority = host.unwrap_or(FALLBACK_HOST);
    let base =
        Url::parse(&format!("http://{authority}/")).map_err(|_| ResolveError::BadRequest)?;
    let url = base.join(raw_target).map_err(|_| ResolveError::BadRequest)?;

    let decoded = urlencoding::decode(url.path()).map_err(|_| ResolveError::BadRequest)?;
    Ok(decoded.into_owned())
}

/// Collapse `.`/`..` segments and redundant separators.
///
/// Cosmetic cleanup only; `..` never survives [`prescreen`], and the result
/// is always absolute, so normalization cannot itself escape the root.
pub fn normalize(pathname: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in pathname.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Join the normalized pathname onto the root and resolve it on disk.
///
/// `root` must already be canonical. The candidate is checked for descent
/// from the root both lexically (before any filesystem access) and again on
/// the canonical path once the target exists, so a symlink under the root
/// can never lead outside it.
pub async fn resolve(root: &Path, pathname: &str) -> Result<ResolvedFile, ResolveError> {
    let relative = pathname.trim_start_matches('/');
    let candidate = root.join(relative);

    if !candidate.starts_with(root) {
        return Err(ResolveError::Forbidden);
    }

    let metadata = match fs::metadata(&candidate).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(ResolveError::NotFound),
        Err(e) => return Err(ResolveError::Internal(e)),
    };

    let (path, metadata) = if metadata.is_dir() {
        // Directory existence must not be disclosed through a distinct
        // status: any failure on the index file is Forbidden, not NotFound.
        let index = candidate.join(INDEX_FILE);
        match fs::metadata(&index).await {
            Ok(m) => (index, m),
            Err(_) => return Err(ResolveError::Forbidden),
        }
    } else {
        (candidate, metadata)
    };

    let canonical = fs::canonicalize(&path)
        .await
        .map_err(|_| ResolveError::Forbidden)?;
    // Component-wise prefix check: /srv/app does not admit /srv/app-evil.
    if !canonical.starts_with(root) {
        return Err(ResolveError::Forbidden);
    }

    Ok(ResolvedFile {
        path: canonical,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescreen_blocks_literal_traversal() {
        assert!(prescreen("/../etc/passwd").is_err());
        assert!(prescreen("/a/../b").is_err());
        assert!(prescreen("/a?q=..").is_err());
    }

    #[test]
    fn test_prescreen_blocks_encoded_traversal() {
        assert!(prescreen("/%2e%2e/etc/passwd").is_err());
        assert!(prescreen("/%2E%2E/etc/passwd").is_err());
        assert!(prescreen("/.%2e/x").is_err());
        assert!(prescreen("/%2e./x").is_err());
    }

    #[test]
    fn test_prescreen_allows_plain_paths() {
        assert!(prescreen("/index.html").is_ok());
        assert!(prescreen("/a.b/c.d").is_ok());
        assert!(prescreen("/").is_ok());
    }

    #[test]
    fn test_decode_percent_sequences() {
        assert_eq!(decode("/my%20file.txt", None).unwrap(), "/my file.txt");
        assert_eq!(decode("/plain", Some("example.com")).unwrap(), "/plain");
    }

    #[test]
    fn test_decode_strips_query() {
        assert_eq!(decode("/a/b?x=1&y=2", None).unwrap(), "/a/b");
    }

    #[test]
    fn test_decode_with_port_in_host() {
        assert_eq!(decode("/x", Some("example.com:8080")).unwrap(), "/x");
    }

    #[test]
    fn test_decode_rejects_invalid_authority() {
        assert!(decode("/x", Some("ex ample")).is_err());
    }

    #[test]
    fn test_normalize_collapses_segments() {
        assert_eq!(normalize("/a/./b//c"), "/a/b/c");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn test_normalize_never_escapes_its_root() {
        assert_eq!(normalize("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(normalize("/a/../../b"), "/b");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ResolveError::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ResolveError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ResolveError::NotFound.status(), StatusCode::NOT_FOUND);
        let io = std::io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ResolveError::Internal(io).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
