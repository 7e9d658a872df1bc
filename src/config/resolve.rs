//! Effective per-client configuration
//!
//! Applies the lookup and precedence rules a consuming HTTP framework uses:
//!
//! - a client without its own entry falls back to the entry named by
//!   `fallback_config_name`
//! - when `use_external_configuration_first` is set, programmatic settings
//!   are applied first and the registry's entries override them; otherwise
//!   programmatic settings are applied last and win
//!
//! Within each ordering the fallback entry is applied before the client's
//! own entry.

use crate::config::client::{ClientConfig, MultiValueMap};
use crate::config::properties::ClientConfigRegistry;
use tracing::debug;

pub struct ClientResolver<'a> {
    registry: &'a ClientConfigRegistry,
}

impl<'a> ClientResolver<'a> {
    pub fn new(registry: &'a ClientConfigRegistry) -> Self {
        Self { registry }
    }

    /// The client's own entry, else the fallback entry
    pub fn lookup(&self, client: &str) -> Option<&'a ClientConfig> {
        if let Some(config) = self.registry.entry(client) {
            debug!("Using dedicated configuration for client '{}'", client);
            return Some(config);
        }

        let fallback = self.registry.fallback_config_name();
        let config = self.registry.entry(fallback);
        if config.is_some() {
            debug!("Client '{}' falls back to '{}'", client, fallback);
        } else {
            debug!("No configuration for client '{}'", client);
        }
        config
    }

    /// Layer the fallback entry, the client's entry and `programmatic` in
    /// precedence order
    pub fn resolve(&self, client: &str, programmatic: &ClientConfig) -> ClientConfig {
        let fallback_name = self.registry.fallback_config_name();
        let fallback = if client == fallback_name {
            None
        } else {
            self.registry.entry(fallback_name)
        };
        let dedicated = self.registry.entry(client);

        let mut layers: Vec<&ClientConfig> = Vec::with_capacity(3);
        if self.registry.use_external_configuration_first() {
            layers.push(programmatic);
            layers.extend(fallback);
            layers.extend(dedicated);
        } else {
            layers.extend(fallback);
            layers.extend(dedicated);
            layers.push(programmatic);
        }

        debug!(
            "Resolving client '{}' from {} layer(s), properties first: {}",
            client,
            layers.len(),
            self.registry.use_external_configuration_first()
        );

        let mut effective = ClientConfig::default();
        for layer in layers {
            overlay(&mut effective, layer);
        }
        effective
    }
}

/// Apply every field `layer` sets on top of `target`
fn overlay(target: &mut ClientConfig, layer: &ClientConfig) {
    if let Some(level) = layer.log_level() {
        target.set_log_level(Some(level));
    }
    if let Some(millis) = layer.connect_timeout_millis() {
        target.set_connect_timeout_millis(Some(millis));
    }
    if let Some(millis) = layer.read_timeout_millis() {
        target.set_read_timeout_millis(Some(millis));
    }
    if let Some(r) = layer.retry_policy_ref() {
        target.set_retry_policy_ref(Some(r.clone()));
    }
    if let Some(r) = layer.error_decoder_ref() {
        target.set_error_decoder_ref(Some(r.clone()));
    }
    if let Some(refs) = layer.request_interceptor_refs() {
        let mut merged = target.request_interceptor_refs().unwrap_or_default().to_vec();
        for r in refs {
            if !merged.contains(r) {
                merged.push(r.clone());
            }
        }
        target.set_request_interceptor_refs(Some(merged));
    }
    if let Some(headers) = layer.default_request_headers() {
        let merged = merge_values(target.default_request_headers(), headers);
        target.set_default_request_headers(Some(merged));
    }
    if let Some(params) = layer.default_query_parameters() {
        let merged = merge_values(target.default_query_parameters(), params);
        target.set_default_query_parameters(Some(merged));
    }
    if let Some(decode) = layer.decode_not_found_as_empty() {
        target.set_decode_not_found_as_empty(Some(decode));
    }
    if let Some(r) = layer.decoder_ref() {
        target.set_decoder_ref(Some(r.clone()));
    }
    if let Some(r) = layer.encoder_ref() {
        target.set_encoder_ref(Some(r.clone()));
    }
    if let Some(r) = layer.contract_ref() {
        target.set_contract_ref(Some(r.clone()));
    }
    if let Some(policy) = layer.exception_propagation_policy() {
        target.set_exception_propagation_policy(Some(policy));
    }
}

// Later values replace earlier ones per name
fn merge_values(base: Option<&MultiValueMap>, layer: &MultiValueMap) -> MultiValueMap {
    let mut merged = base.cloned().unwrap_or_default();
    for (name, values) in layer {
        merged.insert(name.clone(), values.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::client::LogLevel;
    use crate::config::extension::TypeRef;

    fn registry() -> ClientConfigRegistry {
        ClientConfigRegistry::new()
            .with_fallback_config_name("shared")
            .with_entries([
                (
                    "shared",
                    ClientConfig::new()
                        .with_connect_timeout_millis(5000)
                        .with_log_level(LogLevel::Basic)
                        .with_request_interceptor_ref("acme.Auth")
                        .with_default_request_header("Accept", ["application/json"]),
                ),
                (
                    "billing",
                    ClientConfig::new()
                        .with_read_timeout_millis(30_000)
                        .with_request_interceptor_ref("acme.Audit")
                        .with_default_request_header("Accept", ["application/xml"])
                        .with_default_request_header("X-Tenant", ["acme"]),
                ),
            ])
    }

    #[test]
    fn test_unconfigured_client_uses_fallback_entry() {
        let registry = registry();
        let resolver = ClientResolver::new(&registry);

        let orders = resolver.lookup("orders").unwrap();
        assert_eq!(orders.connect_timeout_millis(), Some(5000));
        assert_eq!(orders, registry.entry("shared").unwrap());

        let effective = resolver.resolve("orders", &ClientConfig::default());
        assert_eq!(effective.connect_timeout_millis(), Some(5000));
    }

    #[test]
    fn test_dedicated_entry_wins_lookup() {
        let registry = registry();
        let resolver = ClientResolver::new(&registry);
        assert_eq!(
            resolver.lookup("billing").unwrap().read_timeout_millis(),
            Some(30_000)
        );
    }

    #[test]
    fn test_lookup_without_fallback_entry() {
        let registry = ClientConfigRegistry::new();
        assert!(ClientResolver::new(&registry).lookup("orders").is_none());
    }

    #[test]
    fn test_properties_override_programmatic_by_default() {
        let registry = registry();
        let programmatic = ClientConfig::new()
            .with_connect_timeout_millis(100)
            .with_decoder_ref("acme.Decoder");

        let effective = ClientResolver::new(&registry).resolve("billing", &programmatic);

        assert_eq!(effective.connect_timeout_millis(), Some(5000));
        assert_eq!(effective.read_timeout_millis(), Some(30_000));
        assert_eq!(effective.log_level(), Some(LogLevel::Basic));
        assert_eq!(effective.decoder_ref(), Some(&TypeRef::from("acme.Decoder")));
    }

    #[test]
    fn test_programmatic_wins_when_properties_not_first() {
        let registry = registry().with_use_external_configuration_first(false);
        let programmatic = ClientConfig::new()
            .with_connect_timeout_millis(100)
            .with_log_level(LogLevel::Full);

        let effective = ClientResolver::new(&registry).resolve("billing", &programmatic);

        assert_eq!(effective.connect_timeout_millis(), Some(100));
        assert_eq!(effective.log_level(), Some(LogLevel::Full));
        assert_eq!(effective.read_timeout_millis(), Some(30_000));
    }

    #[test]
    fn test_interceptors_append_in_layer_order() {
        let registry = registry();
        let programmatic = ClientConfig::new()
            .with_request_interceptor_ref("acme.Metrics")
            .with_request_interceptor_ref("acme.Auth");

        let effective = ClientResolver::new(&registry).resolve("billing", &programmatic);

        assert_eq!(
            effective.request_interceptor_refs().unwrap(),
            &[
                TypeRef::from("acme.Metrics"),
                TypeRef::from("acme.Auth"),
                TypeRef::from("acme.Audit"),
            ]
        );
    }

    #[test]
    fn test_headers_merge_per_name() {
        let registry = registry();
        let effective = ClientResolver::new(&registry).resolve("billing", &ClientConfig::new());

        let headers = effective.default_request_headers().unwrap();
        assert_eq!(headers["Accept"], vec!["application/xml".to_string()]);
        assert_eq!(headers["X-Tenant"], vec!["acme".to_string()]);
    }

    #[test]
    fn test_fallback_client_is_not_layered_twice() {
        let registry = registry();
        let effective = ClientResolver::new(&registry).resolve("shared", &ClientConfig::new());
        assert_eq!(&effective, registry.entry("shared").unwrap());
    }

    #[test]
    fn test_nothing_configured_yields_programmatic() {
        let registry = ClientConfigRegistry::new();
        let programmatic = ClientConfig::new().with_encoder_ref("acme.Encoder");
        let effective = ClientResolver::new(&registry).resolve("orders", &programmatic);
        assert_eq!(effective, programmatic);
    }
}
