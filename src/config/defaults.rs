//! Built-in defaults
//!
//! Names and locations used when the embedding application does not
//! override them.

/// Entry used by clients that have no entry of their own
pub const DEFAULT_CONFIG_NAME: &str = "default";

/// Property prefix the registry binds under (`http.clients.config.orders.read-timeout`)
pub const DEFAULT_PREFIX: &str = "http.clients";

/// Environment variable prefix (`HTTP_CLIENTS__CONFIG__ORDERS__READ_TIMEOUT`)
pub const DEFAULT_ENV_PREFIX: &str = "HTTP_CLIENTS";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "CLIENTPROPS_CONFIG";

/// Project-local configuration file name
pub const PROJECT_CONFIG_FILE: &str = ".clientprops.toml";

/// Directory under the user config dir holding `config.toml`
pub const USER_CONFIG_DIR: &str = "clientprops";

/// Derive the environment prefix matching a property prefix
pub fn env_prefix_for(prefix: &str) -> String {
    prefix
        .chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_prefix_for_default_prefix() {
        assert_eq!(env_prefix_for(DEFAULT_PREFIX), DEFAULT_ENV_PREFIX);
    }

    #[test]
    fn test_env_prefix_for_custom_prefix() {
        assert_eq!(env_prefix_for("feign.client"), "FEIGN_CLIENT");
        assert_eq!(env_prefix_for("my-app.http"), "MY_APP_HTTP");
    }
}
