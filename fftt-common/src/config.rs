//! Configuration loading and validation
//!
//! Each value is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`BASE_URL`, `APP_ID`, `MOT_DE_PASSE` only)
//! 3. TOML config file (optional, `--config <path>`)
//! 4. Built-in default (optional values only)
//!
//! The three registry credentials have no default: if any is missing or
//! blank the service refuses to start.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::signer::SharedSecret;
use crate::{Error, Result};

pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_APP_ID: &str = "APP_ID";
pub const ENV_PASSWORD: &str = "MOT_DE_PASSE";

pub const DEFAULT_LICENCE_ENDPOINT: &str = "xml_licence_b.php";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Optional bootstrap file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub app_id: Option<String>,

    /// Registry password (prefer `MOT_DE_PASSE` over storing it on disk)
    #[serde(default)]
    pub password: Option<String>,

    /// Registry script serving licence lookups
    #[serde(default)]
    pub licence_endpoint: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub bind: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub app_id: Option<String>,
    pub password: Option<String>,
    pub licence_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Everything the registry client needs
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub app_id: String,
    pub secret: SharedSecret,
    pub licence_endpoint: String,
    pub timeout: Duration,
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    /// Listen address built from `bind` and `port`
    ///
    /// `bind` is a bare IP address, IPv4 or IPv6 (`0.0.0.0`, `::`).
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind.trim().parse().map_err(|_| {
            Error::Config(format!(
                "Invalid bind address '{}': expected an IPv4 or IPv6 address",
                self.bind
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub registry: RegistryConfig,
    pub server: ServerConfig,
}

impl ProxyConfig {
    /// Resolve and validate configuration from all sources
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let base_url = resolve_required(
            "base URL",
            cli.base_url.as_deref(),
            ENV_BASE_URL,
            toml.base_url.as_deref(),
            "--base-url",
            "base_url",
        )?;
        let app_id = resolve_required(
            "application id",
            cli.app_id.as_deref(),
            ENV_APP_ID,
            toml.app_id.as_deref(),
            "--app-id",
            "app_id",
        )?;
        let password = resolve_required(
            "shared secret",
            cli.password.as_deref(),
            ENV_PASSWORD,
            toml.password.as_deref(),
            "--password",
            "password",
        )?;

        let licence_endpoint = cli
            .licence_endpoint
            .clone()
            .or_else(|| toml.licence_endpoint.clone())
            .filter(|v| is_valid_value(v))
            .unwrap_or_else(|| DEFAULT_LICENCE_ENDPOINT.to_string());

        let timeout_secs = cli
            .timeout_secs
            .or(toml.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }

        let registry = RegistryConfig {
            base_url: normalize_base_url(&base_url)?,
            app_id: app_id.trim().to_string(),
            secret: SharedSecret::new(password)?,
            licence_endpoint: licence_endpoint.trim_start_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };

        let server = ServerConfig {
            bind: cli
                .bind
                .clone()
                .or_else(|| toml.bind.clone())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            log_level: toml.logging.level.clone(),
        };

        Ok(Self { registry, server })
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn resolve_required(
    label: &str,
    cli: Option<&str>,
    env_var: &str,
    toml: Option<&str>,
    flag: &str,
    toml_key: &str,
) -> Result<String> {
    let env = std::env::var(env_var).ok();

    let mut sources = Vec::new();
    if cli.is_some_and(is_valid_value) {
        sources.push("command line");
    }
    if env.as_deref().is_some_and(is_valid_value) {
        sources.push("environment");
    }
    if toml.is_some_and(is_valid_value) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    let resolved = cli
        .filter(|v| is_valid_value(v))
        .map(str::to_string)
        .or_else(|| env.filter(|v| is_valid_value(v)))
        .or_else(|| toml.filter(|v| is_valid_value(v)).map(str::to_string));

    match resolved {
        Some(value) => {
            info!("{} loaded from {}", label, sources[0]);
            Ok(value)
        }
        None => Err(Error::Config(format!(
            "{} not configured. Please configure using one of:\n\
             1. Command line: {} <value>\n\
             2. Environment: {}=<value>\n\
             3. TOML config: {} = \"<value>\"",
            label, flag, env_var, toml_key
        ))),
    }
}

/// Validate the registry base URL and strip any trailing slash
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Invalid base URL '{}': scheme must be http or https",
            trimmed
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://www.fftt.com/mobile/pxml/").unwrap(),
            "https://www.fftt.com/mobile/pxml"
        );
        assert_eq!(
            normalize_base_url(" http://127.0.0.1:9000 ").unwrap(),
            "http://127.0.0.1:9000"
        );
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_is_valid_value() {
        assert!(is_valid_value("SW001"));
        assert!(!is_valid_value(""));
        assert!(!is_valid_value(" \t"));
    }

    fn server(bind: &str) -> ServerConfig {
        ServerConfig {
            bind: bind.to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_socket_addr_ipv4() {
        let addr = server("0.0.0.0").socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8000");
    }

    #[test]
    fn test_socket_addr_ipv6() {
        let addr = server("::").socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.to_string(), "[::]:8000");

        let addr = server("::1").socket_addr().unwrap();
        assert_eq!(addr.to_string(), "[::1]:8000");
    }

    #[test]
    fn test_socket_addr_invalid_bind() {
        for bind in ["localhost", "0.0.0.0:9000", ""] {
            let result = server(bind).socket_addr();
            assert!(matches!(result, Err(Error::Config(_))), "bind {:?}", bind);
        }
    }

    #[test]
    fn test_logging_default_level() {
        assert_eq!(LoggingConfig::default().level, "info");
        let cfg: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.logging.level, "info");
    }
}
