//! Configuration management for the gate.
//!
//! Layers, lowest precedence first: built-in defaults, an optional YAML file,
//! `GATE__*` environment variables, then the `RL_TIME_INTERVAL` and
//! `RL_MAX_REQUESTS` variables shared with the host application. A
//! `rate_limiting.routes_file`, when set, replaces the `routes` section. CLI
//! flags are applied on top by the binary, which validates the result.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{GateError, Result};
use crate::ratelimit::{LimiterOptions, RouteLimits, DEFAULT_MAX_TRACKED_KEYS, DEFAULT_WINDOW_MILLIS};

/// Window length in milliseconds, as understood by the host application.
pub const ENV_TIME_INTERVAL: &str = "RL_TIME_INTERVAL";
/// Maximum tracked keys, as understood by the host application.
pub const ENV_MAX_REQUESTS: &str = "RL_MAX_REQUESTS";

/// Main configuration for the gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Counter cache configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Per-route limits
    #[serde(default)]
    pub routes: RouteLimits,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Base URL of the host application admitted requests are forwarded to
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Upstream request timeout in milliseconds
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upstream_url: default_upstream_url(),
            upstream_timeout_ms: default_upstream_timeout(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

// AI suggestions are allowed to stream for up to 30 seconds upstream.
fn default_upstream_timeout() -> u64 {
    30_000
}

/// Counter cache configuration, shared by every route's limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Window length before an untouched counter expires
    #[serde(default = "default_window_millis")]
    pub window_millis: u64,

    /// Maximum distinct keys tracked per route
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,

    /// Interval between expired-counter sweeps in seconds; 0 disables sweeping
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Path to a standalone route limits file
    pub routes_file: Option<String>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_millis: default_window_millis(),
            max_tracked_keys: default_max_tracked_keys(),
            sweep_interval_secs: default_sweep_interval(),
            routes_file: None,
        }
    }
}

fn default_window_millis() -> u64 {
    DEFAULT_WINDOW_MILLIS
}

fn default_max_tracked_keys() -> usize {
    DEFAULT_MAX_TRACKED_KEYS
}

fn default_sweep_interval() -> u64 {
    60
}

impl RateLimitingConfig {
    pub fn limiter_options(&self) -> LimiterOptions {
        LimiterOptions {
            window_millis: Some(self.window_millis),
            max_tracked_keys: Some(self.max_tracked_keys),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl GateConfig {
    /// Load the layered configuration from `path` and the process environment.
    ///
    /// The result is not validated; apply any overrides first, then call
    /// [`GateConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, &std::env::vars().collect())
    }

    /// Load the layered configuration, reading environment variables from `vars`.
    pub fn load_with_env(path: Option<&Path>, vars: &HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&GateConfig::default())?);

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }

        let env: config::Map<String, String> =
            vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut config: GateConfig = builder
            .add_source(
                Environment::with_prefix("GATE")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .build()?
            .try_deserialize()?;

        config.apply_legacy_env(|name| vars.get(name).cloned());

        if let Some(routes_file) = &config.rate_limiting.routes_file {
            config.routes = RouteLimits::from_file(routes_file)?;
        }

        Ok(config)
    }

    /// Apply `RL_TIME_INTERVAL` and `RL_MAX_REQUESTS`.
    ///
    /// Values are read leniently: leading digits are used, and unset, non-numeric
    /// or zero values leave the current setting in place.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(window) = lookup(ENV_TIME_INTERVAL).as_deref().and_then(parse_leading_int) {
            debug!(window_millis = window, "Window overridden from environment");
            self.rate_limiting.window_millis = window;
        }
        if let Some(max) = lookup(ENV_MAX_REQUESTS).as_deref().and_then(parse_leading_int) {
            debug!(max_tracked_keys = max, "Key capacity overridden from environment");
            self.rate_limiting.max_tracked_keys = max as usize;
        }
    }

    /// Check invariants that the limiter and server rely on.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limiting.window_millis == 0 {
            return Err(GateError::Config("window_millis must be positive".to_string()));
        }
        if self.rate_limiting.max_tracked_keys == 0 {
            return Err(GateError::Config("max_tracked_keys must be positive".to_string()));
        }
        if self.server.upstream_url.trim().is_empty() {
            return Err(GateError::Config("upstream_url must not be empty".to_string()));
        }
        self.routes.validate()
    }
}

/// Parse the leading decimal digits of `raw`, ignoring surrounding whitespace.
/// Returns `None` for no digits or a zero value.
fn parse_leading_int(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<u64>().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn temp_yaml(prefix: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.yaml", prefix, uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars(pairs);
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.rate_limiting.window_millis, 60_000);
        assert_eq!(config.rate_limiting.max_tracked_keys, 500);
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_applied() {
        let mut config = GateConfig::default();
        config.apply_legacy_env(lookup(&[("RL_TIME_INTERVAL", "30000"), ("RL_MAX_REQUESTS", "1000")]));
        assert_eq!(config.rate_limiting.window_millis, 30_000);
        assert_eq!(config.rate_limiting.max_tracked_keys, 1000);
    }

    #[test]
    fn test_legacy_env_invalid_values_ignored() {
        let mut config = GateConfig::default();
        config.apply_legacy_env(lookup(&[("RL_TIME_INTERVAL", "soon"), ("RL_MAX_REQUESTS", "0")]));
        assert_eq!(config.rate_limiting.window_millis, 60_000);
        assert_eq!(config.rate_limiting.max_tracked_keys, 500);
    }

    #[test]
    fn test_legacy_env_reads_leading_digits() {
        let mut config = GateConfig::default();
        config.apply_legacy_env(lookup(&[("RL_TIME_INTERVAL", " 45000ms ")]));
        assert_eq!(config.rate_limiting.window_millis, 45_000);
    }

    #[test]
    fn test_from_yaml_file() {
        let path = temp_yaml(
            "anonq-gate",
            r#"
server:
  listen_addr: "0.0.0.0:9000"
  upstream_url: "http://app:3000"
rate_limiting:
  window_millis: 120000
routes:
  sign_up: 10
"#,
        );

        let config = GateConfig::load_with_env(Some(&path), &HashMap::new()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.listen_addr.port(), 9000);
        assert_eq!(config.server.upstream_url, "http://app:3000");
        assert_eq!(config.rate_limiting.window_millis, 120_000);
        assert_eq!(config.rate_limiting.max_tracked_keys, 500);
        assert_eq!(config.routes.sign_up, 10);
        assert_eq!(config.routes.verify_code, 4);
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/gate.yaml");
        let config = GateConfig::load_with_env(Some(&path), &HashMap::new()).unwrap();
        assert_eq!(config.routes, RouteLimits::default());
        assert_eq!(config.rate_limiting.window_millis, 60_000);
        assert_eq!(config.rate_limiting.max_tracked_keys, 500);
        assert_eq!(config.rate_limiting.sweep_interval_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_layers_override_file() {
        let path = temp_yaml(
            "anonq-gate",
            r#"
rate_limiting:
  window_millis: 120000
routes:
  sign_up: 10
"#,
        );
        let env = vars(&[
            ("GATE__SERVER__UPSTREAM_URL", "http://app:4000"),
            ("GATE__ROUTES__SIGN_UP", "7"),
            ("RL_TIME_INTERVAL", "30000"),
        ]);

        let config = GateConfig::load_with_env(Some(&path), &env).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.upstream_url, "http://app:4000");
        assert_eq!(config.routes.sign_up, 7);
        assert_eq!(config.rate_limiting.window_millis, 30_000);
    }

    #[test]
    fn test_load_defers_validation_to_caller() {
        let path = temp_yaml(
            "anonq-gate",
            r#"
server:
  upstream_url: ""
"#,
        );

        let mut config = GateConfig::load_with_env(Some(&path), &HashMap::new()).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(matches!(config.validate(), Err(GateError::Config(_))));

        // as with `--upstream` on the command line
        config.server.upstream_url = "http://app:3000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_routes_file_replaces_routes_section() {
        let routes = temp_yaml("anonq-routes", "send_message: 3\nverify_code: 2\n");
        let path = temp_yaml(
            "anonq-gate",
            &format!(
                "rate_limiting:\n  routes_file: \"{}\"\nroutes:\n  send_message: 9\n",
                routes.display()
            ),
        );

        let config = GateConfig::load_with_env(Some(&path), &HashMap::new()).unwrap();
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&routes).ok();

        assert_eq!(config.routes.send_message, 3);
        assert_eq!(config.routes.verify_code, 2);
        assert_eq!(config.routes.sign_up, 5);
    }

    #[test]
    fn test_validate_rejects_empty_upstream() {
        let mut config = GateConfig::default();
        config.server.upstream_url = "  ".to_string();
        assert!(matches!(config.validate(), Err(GateError::Config(_))));
    }

    #[test]
    fn test_limiter_options_from_config() {
        let config = RateLimitingConfig {
            window_millis: 1_000,
            max_tracked_keys: 7,
            sweep_interval_secs: 0,
            routes_file: None,
        };
        let options = config.limiter_options();
        assert_eq!(options.window(), Duration::from_millis(1_000));
        assert_eq!(options.max_tracked_keys(), 7);
        assert!(config.sweep_interval().is_zero());
    }
}
