//! clientprops - per-client properties for named HTTP clients
//!
//! This crate models the configuration a named-client HTTP framework reads:
//! timeouts, log verbosity, retry and codec references, default headers and
//! query parameters, keyed by client name with a shared fallback entry.

pub mod config;
pub mod types;

pub use config::{
    ClientConfig, ClientConfigRegistry, ClientResolver, ConfigLoader, ExtensionRegistry, TypeRef,
};
pub use types::ConfigError;
