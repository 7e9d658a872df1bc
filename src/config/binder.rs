//! Flat property binding
//!
//! Applies `<prefix>.…` key/value pairs (from `.properties` files or the
//! environment) onto a [`ClientConfigRegistry`]. Keys are matched loosely:
//! `connect-timeout`, `connectTimeout` and `CONNECT_TIMEOUT` are the same
//! field. Client names containing dots are written in brackets,
//! e.g. `http.clients.config.[api.v2].read-timeout`.

use crate::config::client::{ClientConfig, ExceptionPropagationPolicy, LogLevel, MultiValueMap};
use crate::config::extension::TypeRef;
use crate::config::properties::ClientConfigRegistry;
use crate::types::ConfigError;
use tracing::{debug, trace};

pub struct PropertyBinder {
    prefix: String,
}

impl PropertyBinder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bind one property. Returns `Ok(false)` when the key is outside the prefix.
    pub fn bind(
        &self,
        registry: &mut ClientConfigRegistry,
        key: &str,
        value: &str,
    ) -> Result<bool, ConfigError> {
        let key = key.trim();
        let path = match strip_prefix_relaxed(key, &self.prefix) {
            Some(path) => path,
            None => {
                trace!("Skipping property outside prefix: {}", key);
                return Ok(false);
            }
        };

        bind_path(registry, key, path, value.trim())?;
        debug!("Bound property {}", key);
        Ok(true)
    }

    /// Bind every pair, returning how many fell under the prefix
    pub fn bind_all<I, K, V>(
        &self,
        registry: &mut ClientConfigRegistry,
        properties: I,
    ) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut bound = 0;
        for (key, value) in properties {
            if self.bind(registry, key.as_ref(), value.as_ref())? {
                bound += 1;
            }
        }
        Ok(bound)
    }

    /// Bind one environment variable, e.g. `HTTP_CLIENTS__CONFIG__ORDERS__READ_TIMEOUT`.
    /// Returns `Ok(false)` when the variable is outside `env_prefix`.
    pub fn bind_env(
        &self,
        registry: &mut ClientConfigRegistry,
        env_prefix: &str,
        var: &str,
        value: &str,
    ) -> Result<bool, ConfigError> {
        match env_var_to_key(env_prefix, var) {
            Some(path) => {
                bind_path(registry, var, &path, value.trim())?;
                debug!("Bound environment variable {}", var);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Turn `PREFIX__CONFIG__USER_SERVICE__READ_TIMEOUT` into
/// `config.[user-service].read-timeout`
pub fn env_var_to_key(env_prefix: &str, var: &str) -> Option<String> {
    let rest = var.strip_prefix(env_prefix)?.strip_prefix("__")?;
    if rest.is_empty() {
        return None;
    }

    let segments: Vec<String> = rest
        .split("__")
        .map(|s| s.to_ascii_lowercase().replace('_', "-"))
        .collect();

    // Bracket client names and map keys so dots never split them
    let key = segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i > 0 && segments[0] == "config" && i != 2 {
                format!("[{}]", s)
            } else {
                s.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(".");
    Some(key)
}

/// Parse `key=value` lines (`#` and `!` start comments)
pub fn parse_properties(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(|c: char| c == '=' || c == ':')?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

fn relaxed(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn strip_prefix_relaxed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix_segments = prefix.split('.').count();
    let mut rest = key;
    let mut head = Vec::with_capacity(prefix_segments);
    for _ in 0..prefix_segments {
        let (segment, tail) = split_segment(rest)?;
        head.push(segment);
        rest = tail?;
    }

    let matches = head
        .iter()
        .zip(prefix.split('.'))
        .all(|(a, b)| relaxed(a) == relaxed(b));
    matches.then_some(rest)
}

/// Split off the first path segment. The tail is `None` at the end of the path.
fn split_segment(path: &str) -> Option<(&str, Option<&str>)> {
    if let Some(inner) = path.strip_prefix('[') {
        let close = inner.find(']')?;
        let segment = &inner[..close];
        let after = &inner[close + 1..];
        return match after.strip_prefix('.') {
            Some(tail) => Some((segment, Some(tail))),
            None if after.is_empty() => Some((segment, None)),
            None => None,
        };
    }

    if path.is_empty() {
        return None;
    }
    match path.split_once('.') {
        Some((segment, tail)) => Some((segment, Some(tail))),
        None => Some((path, None)),
    }
}

fn bind_path(
    registry: &mut ClientConfigRegistry,
    key: &str,
    path: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownProperty(key.to_string());
    let (head, tail) = split_segment(path).ok_or_else(unknown)?;

    match (relaxed(head).as_str(), tail) {
        ("defaulttoproperties", None) => {
            registry.set_use_external_configuration_first(parse_bool(key, value)?);
        }
        ("defaultconfig", None) => {
            registry.set_fallback_config_name(value);
        }
        ("decodeslash", None) => {
            registry.set_decode_slash_in_path(parse_bool(key, value)?);
        }
        ("config", Some(rest)) => {
            let (client, rest) = split_segment(rest).ok_or_else(unknown)?;
            let rest = rest.ok_or_else(unknown)?;
            if client.is_empty() {
                return Err(unknown());
            }
            // An entry only appears once a bind sets something; an empty one
            // would shadow the fallback entry
            let existing = registry.entry(client).cloned();
            let had_entry = existing.is_some();
            let mut config = existing.unwrap_or_default();
            bind_client_field(&mut config, key, rest, value)?;

            if had_entry || (!value.is_empty() && !config.is_empty()) {
                *registry.entry_mut(client) = config;
            } else {
                trace!("Nothing to bind for unconfigured client '{}'", client);
            }
        }
        _ => return Err(unknown()),
    }

    Ok(())
}

fn bind_client_field(
    config: &mut ClientConfig,
    key: &str,
    path: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownProperty(key.to_string());
    let (field, tail) = split_segment(path).ok_or_else(unknown)?;

    // Map fields take the entry name as the rest of the path
    let map_key = match tail {
        Some(rest) => {
            let (name, extra) = split_segment(rest).ok_or_else(unknown)?;
            match extra {
                None => Some(name),
                Some(_) => Some(rest),
            }
        }
        None => None,
    };

    match (relaxed(field).as_str(), map_key) {
        ("loggerlevel", None) => config.set_log_level(parse_opt::<LogLevel>(value)?),
        ("connecttimeout", None) => config.set_connect_timeout_millis(parse_int(key, value)?),
        ("readtimeout", None) => config.set_read_timeout_millis(parse_int(key, value)?),
        ("retryer", None) => config.set_retry_policy_ref(parse_type_ref(value)),
        ("errordecoder", None) => config.set_error_decoder_ref(parse_type_ref(value)),
        ("requestinterceptors", None) => {
            let refs = split_list(value).map(|v| v.into_iter().map(TypeRef::from).collect());
            config.set_request_interceptor_refs(refs);
        }
        ("defaultrequestheaders", Some(name)) => {
            let mut headers = config.default_request_headers().cloned().unwrap_or_default();
            put_values(&mut headers, name, value);
            config.set_default_request_headers(Some(headers));
        }
        ("defaultqueryparameters", Some(name)) => {
            let mut params = config.default_query_parameters().cloned().unwrap_or_default();
            put_values(&mut params, name, value);
            config.set_default_query_parameters(Some(params));
        }
        ("decode404", None) => {
            let decode = if value.is_empty() {
                None
            } else {
                Some(parse_bool(key, value)?)
            };
            config.set_decode_not_found_as_empty(decode);
        }
        ("decoder", None) => config.set_decoder_ref(parse_type_ref(value)),
        ("encoder", None) => config.set_encoder_ref(parse_type_ref(value)),
        ("contract", None) => config.set_contract_ref(parse_type_ref(value)),
        ("exceptionpropagationpolicy", None) => {
            config.set_exception_propagation_policy(parse_opt::<ExceptionPropagationPolicy>(
                value,
            )?)
        }
        ("defaultrequestheaders" | "defaultqueryparameters", None) => {
            return Err(ConfigError::invalid_value(
                key,
                "expected a parameter name after the field, e.g. default-request-headers.Accept",
            ));
        }
        _ => return Err(unknown()),
    }

    Ok(())
}

fn put_values(map: &mut MultiValueMap, name: &str, value: &str) {
    match split_list(value) {
        Some(values) => {
            map.insert(name.to_string(), values);
        }
        None => {
            map.remove(name);
        }
    }
}

fn split_list(value: &str) -> Option<Vec<String>> {
    if value.is_empty() {
        return None;
    }
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect(),
    )
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigError::invalid_value(key, format!("expected boolean, got '{}'", value)))
    }
}

fn parse_int(key: &str, value: &str) -> Result<Option<i32>, ConfigError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::invalid_value(key, format!("expected integer, got '{}'", value)))
}

fn parse_opt<T>(value: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr<Err = ConfigError>,
{
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

fn parse_type_ref(value: &str) -> Option<TypeRef> {
    (!value.is_empty()).then(|| TypeRef::from(value))
}
