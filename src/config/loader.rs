//! Configuration loader with layered sources
//!
//! Layers are applied in the order they are added, then environment
//! variables on top:
//! 1. Built-in defaults (or a programmatic registry)
//! 2. Structured files (TOML/JSON), each replacing the registry wholesale
//! 3. Flat properties (`.properties` files, explicit pairs), field by field
//! 4. Environment variables, field by field
//!
//! Without an explicit file, [`ConfigLoader::discover`] checks, in order:
//! 1. ./.clientprops.toml (project-specific)
//! 2. $CLIENTPROPS_CONFIG (environment variable)
//! 3. ~/.config/clientprops/config.toml (user-global)

use crate::config::binder::{parse_properties, PropertyBinder};
use crate::config::defaults::{
    env_prefix_for, CONFIG_PATH_ENV, DEFAULT_PREFIX, PROJECT_CONFIG_FILE, USER_CONFIG_DIR,
};
use crate::config::properties::ClientConfigRegistry;
use crate::types::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Source document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Properties,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        ext.parse()
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            "properties" | "props" => Ok(Format::Properties),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Toml => "toml",
            Format::Json => "json",
            Format::Properties => "properties",
        })
    }
}

pub struct ConfigLoader {
    registry: ClientConfigRegistry,
    binder: PropertyBinder,
    env_prefix: Option<String>,
    sources: Vec<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            registry: ClientConfigRegistry::default(),
            binder: PropertyBinder::new(DEFAULT_PREFIX),
            env_prefix: None,
            sources: Vec::new(),
        }
    }

    /// Property prefix the registry lives under. Set it before adding sources.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.binder = PropertyBinder::new(prefix);
        self
    }

    /// Start from a programmatically built registry instead of the defaults
    pub fn with_registry(mut self, registry: ClientConfigRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Read a TOML, JSON or properties file, chosen by extension
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = Format::from_path(path)?;
        debug!("Loading {} config from: {}", format, path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.apply_document(&content, format, &path.display().to_string())
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            debug!("Optional config not found: {}", path.as_ref().display());
            Ok(self)
        }
    }

    pub fn with_string(self, content: &str, format: Format) -> Result<Self, ConfigError> {
        self.apply_document(content, format, "<string>")
    }

    /// Bind flat `<prefix>.…` pairs on top of what is loaded so far
    pub fn with_properties<I, K, V>(mut self, properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let bound = self.binder.bind_all(&mut self.registry, properties)?;
        debug!("Bound {} programmatic properties", bound);
        self.sources.push("<properties>".to_string());
        Ok(self)
    }

    /// Environment variable prefix applied by [`load`](Self::load), e.g. `HTTP_CLIENTS`
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into().to_uppercase());
        self
    }

    /// Environment prefix derived from the property prefix
    pub fn with_default_env_prefix(self) -> Self {
        let prefix = env_prefix_for(self.binder.prefix());
        self.with_env_prefix(prefix)
    }

    /// Load the first config file found in the well-known locations
    pub fn discover(self) -> Result<Self, ConfigError> {
        for path in Self::config_file_candidates() {
            if path.exists() {
                info!("Discovered config file: {}", path.display());
                return self.with_file(path);
            }
        }

        debug!("No config file found");
        Ok(self)
    }

    /// Candidate config files in priority order
    pub fn config_file_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(PROJECT_CONFIG_FILE));
        }

        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            candidates.push(PathBuf::from(config_path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(USER_CONFIG_DIR).join("config.toml"));
        }

        candidates
    }

    /// Sources applied so far, in order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Apply environment overrides from the process environment and finish
    pub fn load(self) -> Result<ClientConfigRegistry, ConfigError> {
        self.load_from_env(std::env::vars())
    }

    /// Apply environment overrides from `vars` and finish
    pub fn load_from_env<I>(mut self, vars: I) -> Result<ClientConfigRegistry, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if let Some(prefix) = self.env_prefix.take() {
            // Sorted so overlapping variables apply deterministically
            let vars: BTreeMap<String, String> = vars
                .into_iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();

            let mut bound = 0;
            for (var, value) in &vars {
                if self.binder.bind_env(&mut self.registry, &prefix, var, value)? {
                    bound += 1;
                }
            }
            if bound > 0 {
                info!("Applied {} environment override(s) with prefix {}", bound, prefix);
                self.sources.push(format!("env:{}", prefix));
            }
        }

        info!(
            "Loaded configuration for {} client(s) from {} source(s)",
            self.registry.entries().len(),
            self.sources.len()
        );
        Ok(self.registry)
    }

    fn apply_document(
        mut self,
        content: &str,
        format: Format,
        source: &str,
    ) -> Result<Self, ConfigError> {
        let document: serde_json::Value = match format {
            Format::Toml => toml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
            Format::Properties => {
                let bound = self
                    .binder
                    .bind_all(&mut self.registry, parse_properties(content))?;
                debug!("Bound {} properties from {}", bound, source);
                self.sources.push(source.to_string());
                return Ok(self);
            }
        };

        match find_section(&document, self.binder.prefix()) {
            Some(section) => {
                self.registry = serde_json::from_value(section.clone())?;
                self.sources.push(source.to_string());
            }
            None => {
                warn!(
                    "No '{}' section in {}, nothing loaded from it",
                    self.binder.prefix(),
                    source
                );
            }
        }

        Ok(self)
    }
}

fn find_section<'a>(document: &'a serde_json::Value, prefix: &str) -> Option<&'a serde_json::Value> {
    prefix
        .split('.')
        .try_fold(document, |node, segment| node.get(segment))
}
