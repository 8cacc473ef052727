//! HTTP cache control module
//!
//! Provides conditional request handling based on modification time.

use std::time::{SystemTime, UNIX_EPOCH};

/// Freshness lifetime sent with every cacheable response.
pub const CACHE_CONTROL: &str = "public, max-age=60";

/// Check whether a request's `If-Modified-Since` header makes the resource
/// Not Modified.
///
/// HTTP-dates carry whole-second precision, so the file's modification time
/// is truncated to seconds before comparison. An absent or unparseable
/// header never produces a 304; it falls through to a full response.
///
/// # Arguments
/// * `if_modified_since` - Client-sent If-Modified-Since header, verbatim
/// * `modified` - The file's last-modification time
///
/// # Returns
/// Returns true if the client's copy is still fresh (should return 304)
pub fn not_modified(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(raw) = if_modified_since else {
        return false;
    };
    let Ok(since) = httpdate::parse_http_date(raw) else {
        return false;
    };
    unix_seconds(modified) <= unix_seconds(since)
}

/// Whole seconds since the Unix epoch; pre-epoch times collapse to zero.
fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
