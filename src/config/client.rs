//! Per-client configuration record

use crate::config::extension::TypeRef;
use crate::types::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Header or query parameter name mapped to its values
pub type MultiValueMap = BTreeMap<String, Vec<String>>;

/// Verbosity of request/response logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "NONE")]
    None,
    #[serde(alias = "BASIC")]
    Basic,
    #[serde(alias = "HEADERS")]
    Headers,
    #[serde(alias = "FULL")]
    Full,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Basic => "basic",
            LogLevel::Headers => "headers",
            LogLevel::Full => "full",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(LogLevel::None),
            "basic" => Ok(LogLevel::Basic),
            "headers" => Ok(LogLevel::Headers),
            "full" => Ok(LogLevel::Full),
            _ => Err(ConfigError::invalid_value(
                "logger-level",
                format!("'{}' is not one of none, basic, headers, full", s),
            )),
        }
    }
}

/// How lower-level failures are surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionPropagationPolicy {
    #[serde(alias = "NONE")]
    None,
    #[serde(alias = "UNWRAP")]
    Unwrap,
}

impl ExceptionPropagationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionPropagationPolicy::None => "none",
            ExceptionPropagationPolicy::Unwrap => "unwrap",
        }
    }
}

impl fmt::Display for ExceptionPropagationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceptionPropagationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ExceptionPropagationPolicy::None),
            "unwrap" => Ok(ExceptionPropagationPolicy::Unwrap),
            _ => Err(ConfigError::invalid_value(
                "exception-propagation-policy",
                format!("'{}' is not one of none, unwrap", s),
            )),
        }
    }
}

/// Settings for one named client (or for the fallback entry)
///
/// Every field is optional. An absent field inherits whatever the consuming
/// framework uses by default; nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    #[serde(rename = "logger-level", skip_serializing_if = "Option::is_none")]
    log_level: Option<LogLevel>,

    #[serde(rename = "connect-timeout", skip_serializing_if = "Option::is_none")]
    connect_timeout_millis: Option<i32>,

    #[serde(rename = "read-timeout", skip_serializing_if = "Option::is_none")]
    read_timeout_millis: Option<i32>,

    #[serde(rename = "retryer", skip_serializing_if = "Option::is_none")]
    retry_policy_ref: Option<TypeRef>,

    #[serde(rename = "error-decoder", skip_serializing_if = "Option::is_none")]
    error_decoder_ref: Option<TypeRef>,

    #[serde(rename = "request-interceptors", skip_serializing_if = "Option::is_none")]
    request_interceptor_refs: Option<Vec<TypeRef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    default_request_headers: Option<MultiValueMap>,

    #[serde(skip_serializing_if = "Option::is_none")]
    default_query_parameters: Option<MultiValueMap>,

    #[serde(rename = "decode404", skip_serializing_if = "Option::is_none")]
    decode_not_found_as_empty: Option<bool>,

    #[serde(rename = "decoder", skip_serializing_if = "Option::is_none")]
    decoder_ref: Option<TypeRef>,

    #[serde(rename = "encoder", skip_serializing_if = "Option::is_none")]
    encoder_ref: Option<TypeRef>,

    #[serde(rename = "contract", skip_serializing_if = "Option::is_none")]
    contract_ref: Option<TypeRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    exception_propagation_policy: Option<ExceptionPropagationPolicy>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    pub fn set_log_level(&mut self, log_level: Option<LogLevel>) {
        self.log_level = log_level;
    }

    pub fn connect_timeout_millis(&self) -> Option<i32> {
        self.connect_timeout_millis
    }

    pub fn set_connect_timeout_millis(&mut self, millis: Option<i32>) {
        self.connect_timeout_millis = millis;
    }

    /// Connect timeout as a `Duration`; negative values have none
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_millis.and_then(millis_to_duration)
    }

    pub fn read_timeout_millis(&self) -> Option<i32> {
        self.read_timeout_millis
    }

    pub fn set_read_timeout_millis(&mut self, millis: Option<i32>) {
        self.read_timeout_millis = millis;
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_millis.and_then(millis_to_duration)
    }

    pub fn retry_policy_ref(&self) -> Option<&TypeRef> {
        self.retry_policy_ref.as_ref()
    }

    pub fn set_retry_policy_ref(&mut self, reference: Option<TypeRef>) {
        self.retry_policy_ref = reference;
    }

    pub fn error_decoder_ref(&self) -> Option<&TypeRef> {
        self.error_decoder_ref.as_ref()
    }

    pub fn set_error_decoder_ref(&mut self, reference: Option<TypeRef>) {
        self.error_decoder_ref = reference;
    }

    /// Interceptors in the order they are applied
    pub fn request_interceptor_refs(&self) -> Option<&[TypeRef]> {
        self.request_interceptor_refs.as_deref()
    }

    pub fn set_request_interceptor_refs(&mut self, references: Option<Vec<TypeRef>>) {
        self.request_interceptor_refs = references;
    }

    pub fn default_request_headers(&self) -> Option<&MultiValueMap> {
        self.default_request_headers.as_ref()
    }

    pub fn set_default_request_headers(&mut self, headers: Option<MultiValueMap>) {
        self.default_request_headers = headers;
    }

    pub fn default_query_parameters(&self) -> Option<&MultiValueMap> {
        self.default_query_parameters.as_ref()
    }

    pub fn set_default_query_parameters(&mut self, parameters: Option<MultiValueMap>) {
        self.default_query_parameters = parameters;
    }

    pub fn decode_not_found_as_empty(&self) -> Option<bool> {
        self.decode_not_found_as_empty
    }

    pub fn set_decode_not_found_as_empty(&mut self, decode: Option<bool>) {
        self.decode_not_found_as_empty = decode;
    }

    pub fn decoder_ref(&self) -> Option<&TypeRef> {
        self.decoder_ref.as_ref()
    }

    pub fn set_decoder_ref(&mut self, reference: Option<TypeRef>) {
        self.decoder_ref = reference;
    }

    pub fn encoder_ref(&self) -> Option<&TypeRef> {
        self.encoder_ref.as_ref()
    }

    pub fn set_encoder_ref(&mut self, reference: Option<TypeRef>) {
        self.encoder_ref = reference;
    }

    pub fn contract_ref(&self) -> Option<&TypeRef> {
        self.contract_ref.as_ref()
    }

    pub fn set_contract_ref(&mut self, reference: Option<TypeRef>) {
        self.contract_ref = reference;
    }

    pub fn exception_propagation_policy(&self) -> Option<ExceptionPropagationPolicy> {
        self.exception_propagation_policy
    }

    pub fn set_exception_propagation_policy(
        &mut self,
        policy: Option<ExceptionPropagationPolicy>,
    ) {
        self.exception_propagation_policy = policy;
    }

    // Builder-style setters for programmatic configuration

    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = Some(log_level);
        self
    }

    pub fn with_connect_timeout_millis(mut self, millis: i32) -> Self {
        self.connect_timeout_millis = Some(millis);
        self
    }

    pub fn with_read_timeout_millis(mut self, millis: i32) -> Self {
        self.read_timeout_millis = Some(millis);
        self
    }

    pub fn with_retry_policy_ref(mut self, reference: impl Into<TypeRef>) -> Self {
        self.retry_policy_ref = Some(reference.into());
        self
    }

    pub fn with_error_decoder_ref(mut self, reference: impl Into<TypeRef>) -> Self {
        self.error_decoder_ref = Some(reference.into());
        self
    }

    /// Append one interceptor after any already configured
    pub fn with_request_interceptor_ref(mut self, reference: impl Into<TypeRef>) -> Self {
        self.request_interceptor_refs
            .get_or_insert_with(Vec::new)
            .push(reference.into());
        self
    }

    /// Add values for one default header, keeping earlier values
    pub fn with_default_request_header<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.default_request_headers
            .get_or_insert_with(BTreeMap::new)
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_default_query_parameter<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.default_query_parameters
            .get_or_insert_with(BTreeMap::new)
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_decode_not_found_as_empty(mut self, decode: bool) -> Self {
        self.decode_not_found_as_empty = Some(decode);
        self
    }

    pub fn with_decoder_ref(mut self, reference: impl Into<TypeRef>) -> Self {
        self.decoder_ref = Some(reference.into());
        self
    }

    pub fn with_encoder_ref(mut self, reference: impl Into<TypeRef>) -> Self {
        self.encoder_ref = Some(reference.into());
        self
    }

    pub fn with_contract_ref(mut self, reference: impl Into<TypeRef>) -> Self {
        self.contract_ref = Some(reference.into());
        self
    }

    pub fn with_exception_propagation_policy(mut self, policy: ExceptionPropagationPolicy) -> Self {
        self.exception_propagation_policy = Some(policy);
        self
    }
}

fn millis_to_duration(millis: i32) -> Option<Duration> {
    u64::try_from(millis).ok().map(Duration::from_millis)
}
