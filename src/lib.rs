//! Static file HTTP server
//!
//! Serves files from a fixed root directory with path containment,
//! content-type inference, and conditional-caching semantics. The request
//! pipeline lives in [`handler`]; [`http`] carries the protocol helpers,
//! [`server`] the connection plumbing.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
