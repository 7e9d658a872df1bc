//! Named client configuration
//!
//! The records ([`ClientConfigRegistry`], [`ClientConfig`]) are plain data.
//! Loading, binding and resolution sit around them:
//! 1. [`ConfigLoader`] builds a registry from files and the environment
//! 2. [`PropertyBinder`] maps flat `<prefix>.…` keys onto it
//! 3. [`ClientResolver`] computes the effective settings for one client

mod binder;
mod client;
mod defaults;
mod extension;
mod loader;
mod properties;
mod resolve;

pub use binder::{env_var_to_key, parse_properties, PropertyBinder};
pub use client::{ClientConfig, ExceptionPropagationPolicy, LogLevel, MultiValueMap};
pub use defaults::{env_prefix_for, DEFAULT_CONFIG_NAME, DEFAULT_ENV_PREFIX, DEFAULT_PREFIX};
pub use extension::{ExtensionRegistry, TypeRef};
pub use loader::{ConfigLoader, Format};
pub use properties::ClientConfigRegistry;
pub use resolve::ClientResolver;
