//! Named extension points
//!
//! Client configuration refers to pluggable implementations (retryers,
//! decoders, interceptors, ...) by name only. The embedding application
//! registers a factory per name and resolves references at startup.

use crate::types::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identifier of a pluggable implementation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Registry of factories keyed by [`TypeRef`] name
pub struct ExtensionRegistry<T: ?Sized> {
    factories: BTreeMap<String, Arc<dyn Fn() -> Box<T> + Send + Sync>>,
}

impl<T: ?Sized> Default for ExtensionRegistry<T> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<T: ?Sized> Clone for ExtensionRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ExtensionRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: ?Sized> ExtensionRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one under the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            debug!("Replaced extension factory: {}", name);
        }
        self
    }

    pub fn contains(&self, reference: &TypeRef) -> bool {
        self.factories.contains_key(reference.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the implementation a reference names
    pub fn resolve(&self, reference: &TypeRef) -> Result<Box<T>, ConfigError> {
        let factory = self
            .factories
            .get(reference.as_str())
            .ok_or_else(|| ConfigError::UnknownExtension(reference.to_string()))?;
        Ok(factory())
    }

    /// Instantiate every reference, keeping their order
    pub fn resolve_all(&self, references: &[TypeRef]) -> Result<Vec<Box<T>>, ConfigError> {
        references.iter().map(|r| self.resolve(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Interceptor: Send {
        fn tag(&self) -> &'static str;
    }

    struct Auth;
    struct Tracing;

    impl Interceptor for Auth {
        fn tag(&self) -> &'static str {
            "auth"
        }
    }

    impl Interceptor for Tracing {
        fn tag(&self) -> &'static str {
            "tracing"
        }
    }

    fn registry() -> ExtensionRegistry<dyn Interceptor> {
        let mut registry: ExtensionRegistry<dyn Interceptor> = ExtensionRegistry::new();
        registry
            .register("acme.Auth", || Box::new(Auth))
            .register("acme.Tracing", || Box::new(Tracing));
        registry
    }

    #[test]
    fn test_resolve_known_reference() {
        let registry = registry();
        let interceptor = registry.resolve(&TypeRef::from("acme.Auth")).unwrap();
        assert_eq!(interceptor.tag(), "auth");
    }

    #[test]
    fn test_resolve_unknown_reference() {
        let registry = registry();
        let result = registry.resolve(&TypeRef::from("acme.Missing"));
        assert!(matches!(result, Err(ConfigError::UnknownExtension(name)) if name == "acme.Missing"));
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let registry = registry();
        let refs = vec![
            TypeRef::from("acme.Tracing"),
            TypeRef::from("acme.Auth"),
            TypeRef::from("acme.Tracing"),
        ];
        let tags: Vec<&str> = registry
            .resolve_all(&refs)
            .unwrap()
            .iter()
            .map(|i| i.tag())
            .collect();
        assert_eq!(tags, vec!["tracing", "auth", "tracing"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = registry();
        registry.register("acme.Auth", || Box::new(Tracing));
        let interceptor = registry.resolve(&TypeRef::from("acme.Auth")).unwrap();
        assert_eq!(interceptor.tag(), "tracing");
        assert_eq!(registry.names().count(), 2);
    }

    #[test]
    fn test_type_ref_serializes_as_string() {
        let json = serde_json::to_string(&TypeRef::from("acme.Auth")).unwrap();
        assert_eq!(json, "\"acme.Auth\"");
    }
}
