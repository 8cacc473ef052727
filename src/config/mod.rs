// Configuration module entry point
// Loads process configuration from the environment and resolves the root

mod state;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig, PerformanceConfig, ServerConfig};

impl Config {
    /// Load configuration from `FILESERV_`-prefixed environment variables.
    ///
    /// Nested keys use `__`, e.g. `FILESERV_SERVER__PORT=8080`,
    /// `FILESERV_SERVER__ROOT=/srv/www`. There is no configuration file;
    /// everything not set in the environment takes the defaults below.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("FILESERV").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.root", "public")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Canonicalize the configured root directory.
    ///
    /// Fails if the directory does not exist or is not a directory; the
    /// request path only ever sees the canonical form.
    pub fn canonical_root(&self) -> std::io::Result<PathBuf> {
        let root = std::fs::canonicalize(&self.server.root)?;
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("root '{}' is not a directory", self.server.root),
            ));
        }
        Ok(root)
    }
}
