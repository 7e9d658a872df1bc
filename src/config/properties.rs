//! Client configuration registry
//!
//! Holds the per-client entries keyed by client name along with the global
//! settings. The registry only stores what it is given: fallback lookup and
//! precedence rules live in [`crate::config::ClientResolver`].
//!
//! The registry does no synchronization of its own. Load it once, share it
//! behind an `Arc`, and swap in a new instance instead of mutating a shared
//! one.

use crate::config::client::ClientConfig;
use crate::config::defaults::DEFAULT_CONFIG_NAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigRegistry {
    /// Prefer externally supplied properties over programmatic configuration
    #[serde(rename = "default-to-properties")]
    use_external_configuration_first: bool,

    /// Entry used by clients without one of their own
    #[serde(rename = "default-config")]
    fallback_config_name: String,

    /// Decode `%2F` in path segments before sending
    #[serde(rename = "decode-slash")]
    decode_slash_in_path: bool,

    #[serde(rename = "config")]
    entries: BTreeMap<String, ClientConfig>,
}

impl Default for ClientConfigRegistry {
    fn default() -> Self {
        Self {
            use_external_configuration_first: true,
            fallback_config_name: DEFAULT_CONFIG_NAME.to_string(),
            decode_slash_in_path: true,
            entries: BTreeMap::new(),
        }
    }
}

impl ClientConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_external_configuration_first(&self) -> bool {
        self.use_external_configuration_first
    }

    pub fn set_use_external_configuration_first(&mut self, value: bool) {
        self.use_external_configuration_first = value;
    }

    pub fn fallback_config_name(&self) -> &str {
        &self.fallback_config_name
    }

    pub fn set_fallback_config_name(&mut self, name: impl Into<String>) {
        self.fallback_config_name = name.into();
    }

    pub fn decode_slash_in_path(&self) -> bool {
        self.decode_slash_in_path
    }

    pub fn set_decode_slash_in_path(&mut self, value: bool) {
        self.decode_slash_in_path = value;
    }

    pub fn entries(&self) -> &BTreeMap<String, ClientConfig> {
        &self.entries
    }

    /// Replace every entry; nothing from the previous mapping is kept
    pub fn set_entries(&mut self, entries: BTreeMap<String, ClientConfig>) {
        self.entries = entries;
    }

    /// The entry stored under exactly this name
    pub fn entry(&self, name: &str) -> Option<&ClientConfig> {
        self.entries.get(name)
    }

    pub fn with_use_external_configuration_first(mut self, value: bool) -> Self {
        self.use_external_configuration_first = value;
        self
    }

    pub fn with_fallback_config_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_config_name = name.into();
        self
    }

    pub fn with_decode_slash_in_path(mut self, value: bool) -> Self {
        self.decode_slash_in_path = value;
        self
    }

    pub fn with_entries<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ClientConfig)>,
        K: Into<String>,
    {
        self.entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    // Binders fill entries one field at a time
    pub(crate) fn entry_mut(&mut self, name: &str) -> &mut ClientConfig {
        self.entries.entry(name.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::client::LogLevel;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_defaults() {
        let registry = ClientConfigRegistry::new();
        assert!(registry.use_external_configuration_first());
        assert_eq!(registry.fallback_config_name(), "default");
        assert!(registry.decode_slash_in_path());
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn test_accessors_return_assigned_values() {
        let mut registry = ClientConfigRegistry::new();
        registry.set_use_external_configuration_first(false);
        registry.set_fallback_config_name("");
        registry.set_decode_slash_in_path(false);

        let mut entries = BTreeMap::new();
        entries.insert(
            "orders".to_string(),
            ClientConfig::new().with_log_level(LogLevel::Basic),
        );
        registry.set_entries(entries.clone());

        assert!(!registry.use_external_configuration_first());
        assert_eq!(registry.fallback_config_name(), "");
        assert!(!registry.decode_slash_in_path());
        assert_eq!(registry.entries(), &entries);
        assert_eq!(
            registry.entry("orders").unwrap().log_level(),
            Some(LogLevel::Basic)
        );
        assert!(registry.entry("billing").is_none());
    }

    #[test]
    fn test_set_entries_discards_previous() {
        let mut registry = ClientConfigRegistry::new().with_entries([
            ("orders", ClientConfig::new().with_read_timeout_millis(1)),
            ("billing", ClientConfig::new().with_read_timeout_millis(2)),
        ]);

        let mut replacement = BTreeMap::new();
        replacement.insert(
            "users".to_string(),
            ClientConfig::new().with_read_timeout_millis(3),
        );
        registry.set_entries(replacement);

        assert_eq!(registry.entries().len(), 1);
        assert!(registry.entry("orders").is_none());
        assert!(registry.entry("billing").is_none());
        assert!(registry.entry("users").is_some());
    }

    #[test]
    fn test_equal_regardless_of_assignment_order() {
        let mut a = ClientConfigRegistry::new();
        a.set_fallback_config_name("shared");
        a.set_decode_slash_in_path(false);
        a.set_entries(
            [
                ("x".to_string(), ClientConfig::new().with_connect_timeout_millis(1)),
                ("y".to_string(), ClientConfig::new()),
            ]
            .into_iter()
            .collect(),
        );

        let mut b = ClientConfigRegistry::new();
        b.set_entries(
            [
                ("y".to_string(), ClientConfig::new()),
                ("x".to_string(), ClientConfig::new().with_connect_timeout_millis(1)),
            ]
            .into_iter()
            .collect(),
        );
        b.set_decode_slash_in_path(false);
        b.set_fallback_config_name("shared");

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_inequality_per_field() {
        let base = ClientConfigRegistry::new();
        assert_ne!(base, base.clone().with_use_external_configuration_first(false));
        assert_ne!(base, base.clone().with_fallback_config_name("other"));
        assert_ne!(base, base.clone().with_decode_slash_in_path(false));
        assert_ne!(
            base,
            base.clone()
                .with_entries([("orders", ClientConfig::new())])
        );
    }

    #[test]
    fn test_deserialize_partial_document_keeps_defaults() {
        let registry: ClientConfigRegistry = toml::from_str(
            r#"
            decode-slash = false

            [config.orders]
            connect-timeout = 5000
            "#,
        )
        .unwrap();

        assert!(registry.use_external_configuration_first());
        assert_eq!(registry.fallback_config_name(), "default");
        assert!(!registry.decode_slash_in_path());
        assert_eq!(
            registry.entry("orders").unwrap().connect_timeout_millis(),
            Some(5000)
        );
    }

    #[test]
    fn test_serialize_round_trips_through_toml() {
        let registry = ClientConfigRegistry::new()
            .with_fallback_config_name("shared")
            .with_entries([(
                "shared",
                ClientConfig::new()
                    .with_connect_timeout_millis(5000)
                    .with_default_request_header("X-Tenant", ["acme"]),
            )]);

        let text = toml::to_string_pretty(&registry).unwrap();
        let parsed: ClientConfigRegistry = toml::from_str(&text).unwrap();
        assert_eq!(parsed, registry);
    }
}
