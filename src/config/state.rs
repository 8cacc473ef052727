// Application state module
// Immutable process-wide state shared by every connection

use std::path::PathBuf;

use super::types::Config;

/// Application state
///
/// Constructed once at startup and never mutated afterwards; the request
/// path reads it behind an `Arc` without locking.
pub struct AppState {
    pub config: Config,
    /// Canonicalized root directory; every resolved path must descend
    /// from it.
    pub root: PathBuf,
}

impl AppState {
    pub const fn new(config: Config, root: PathBuf) -> Self {
        Self { config, root }
    }
}
