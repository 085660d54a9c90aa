//! Configuration management for the ushare daemon.
//!
//! The daemon is started with a single configuration file path. The file
//! declares the listen address and the login → namespace root mapping; it is
//! read once at startup and never reloaded. YAML is the native format, TOML is
//! accepted for files ending in `.toml`.
//!
//! ```yaml
//! listen: 0.0.0.0:8080
//! ushares:
//!   - [alice, /data/alice/]
//!   - [bob, /data/bob/]
//! ```

use std::fs;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use descriptor::DEFAULT_DESCRIPTOR_FILE;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("listen must be an address like 0.0.0.0:8080 or :8080, got {0:?}")]
    InvalidListen(String),

    #[error("ushares must declare at least one login")]
    NoUshares,

    #[error("ushare entry {0} has an empty login")]
    EmptyLogin(usize),

    #[error("ushare {0:?} has an empty root path")]
    EmptyRoot(String),

    #[error("descriptor_file must be a plain file name, got {0:?}")]
    InvalidDescriptorFile(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Locking strategy around the load/resolve/save cycle of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockingMode {
    /// Every request runs an independent load/save cycle. Concurrent requests
    /// against the same limited password may over-consume it.
    #[default]
    None,
    /// Requests against the same namespace are serialized from descriptor
    /// load until their delivery finishes.
    Namespace,
}

/// One login → namespace root mapping, written as a `[login, root]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, PathBuf)", into = "(String, PathBuf)")]
pub struct UshareEntry {
    /// Login name supplied by requesters.
    pub login: String,
    /// Directory holding the descriptor file and shared content.
    pub root: PathBuf,
}

impl UshareEntry {
    pub fn new(login: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            login: login.into(),
            root: root.into(),
        }
    }
}

impl From<(String, PathBuf)> for UshareEntry {
    fn from((login, root): (String, PathBuf)) -> Self {
        Self { login, root }
    }
}

impl From<UshareEntry> for (String, PathBuf) {
    fn from(entry: UshareEntry) -> Self {
        (entry.login, entry.root)
    }
}

/// Main configuration structure for the ushare daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen: String,

    /// Namespace registry. The first entry for a login wins.
    pub ushares: Vec<UshareEntry>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Locking strategy for descriptor updates.
    #[serde(default)]
    pub locking: LockingMode,

    /// Include supplied passwords in failed-attempt log lines.
    #[serde(default)]
    pub log_secrets: bool,

    /// Descriptor file name inside every namespace root.
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_descriptor_file() -> String {
    DEFAULT_DESCRIPTOR_FILE.to_string()
}

impl Config {
    /// Creates a configuration with default optional settings.
    pub fn new(listen: impl Into<String>, ushares: Vec<UshareEntry>) -> Self {
        Self {
            listen: listen.into(),
            ushares,
            log_level: default_log_level(),
            locking: LockingMode::default(),
            log_secrets: false,
            descriptor_file: default_descriptor_file(),
        }
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported variables:
    /// - USHARE_LISTEN: Override the listen address
    /// - USHARE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(listen) = std::env::var("USHARE_LISTEN") {
            if !listen.is_empty() {
                tracing::info!("Overriding listen from environment: {}", listen);
                self.listen = listen;
            }
        }

        if let Ok(level) = std::env::var("USHARE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address()?;

        if self.ushares.is_empty() {
            return Err(ConfigError::NoUshares);
        }

        for (position, entry) in self.ushares.iter().enumerate() {
            if entry.login.is_empty() {
                return Err(ConfigError::EmptyLogin(position));
            }
            if entry.root.as_os_str().is_empty() {
                return Err(ConfigError::EmptyRoot(entry.login.clone()));
            }
        }

        let file = &self.descriptor_file;
        if file.is_empty() || file.contains('/') || file.contains('\\') || file == ".." {
            return Err(ConfigError::InvalidDescriptorFile(file.clone()));
        }

        let level = self.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    /// The address to bind, checked to resolve.
    ///
    /// A bare `:port` binds every IPv4 interface. Host names are resolved, so
    /// `localhost:8080` is accepted.
    pub fn bind_address(&self) -> Result<String, ConfigError> {
        let address = match self.listen.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.listen.clone(),
        };

        match address.to_socket_addrs().map(|mut addrs| addrs.next()) {
            Ok(Some(_)) => Ok(address),
            _ => Err(ConfigError::InvalidListen(self.listen.clone())),
        }
    }

    /// Load configuration from a file.
    ///
    /// A missing or unreadable file is an error: the daemon has no usable
    /// defaults for its namespace registry.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let parsed = if is_toml(path) {
            Self::from_toml(&contents)
        } else {
            Self::from_yaml(&contents)
        };
        parsed.with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| anyhow::anyhow!("Invalid YAML configuration: {}", e))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Serialize configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const SAMPLE_YAML: &str = r#"
listen: 127.0.0.1:8080
ushares:
  - [alice, /data/alice/]
  - [bob, /data/bob/]
"#;

    fn sample() -> Config {
        Config::new(
            "127.0.0.1:8080",
            vec![UshareEntry::new("alice", "/data/alice/")],
        )
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(SAMPLE_YAML).unwrap();

        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(
            config.ushares,
            vec![
                UshareEntry::new("alice", "/data/alice/"),
                UshareEntry::new("bob", "/data/bob/"),
            ]
        );
        assert_eq!(config.log_level, "info");
        assert_eq!(config.locking, LockingMode::None);
        assert!(!config.log_secrets);
        assert_eq!(config.descriptor_file, "shares.yaml");
    }

    #[test]
    fn test_from_yaml_optional_settings() {
        let yaml = r#"
listen: 0.0.0.0:9000
ushares: [[alice, /srv/alice]]
log_level: debug
locking: namespace
log_secrets: true
descriptor_file: access.yaml
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.locking, LockingMode::Namespace);
        assert!(config.log_secrets);
        assert_eq!(config.descriptor_file, "access.yaml");
    }

    #[test]
    fn test_from_yaml_missing_listen() {
        let result = Config::from_yaml("ushares: [[alice, /srv/alice]]\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid YAML"));
    }

    #[test]
    fn test_from_yaml_bad_pair() {
        let result = Config::from_yaml("listen: 0.0.0.0:1\nushares: [[alice]]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
listen = "127.0.0.1:8080"
ushares = [["alice", "/data/alice/"]]
locking = "namespace"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.ushares, vec![UshareEntry::new("alice", "/data/alice/")]);
        assert_eq!(config.locking, LockingMode::Namespace);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("listen = ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_roundtrip_yaml() {
        let mut original = sample();
        original.locking = LockingMode::Namespace;
        original.log_secrets = true;

        let yaml = original.to_yaml().unwrap();
        let loaded = Config::from_yaml(&yaml).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, SAMPLE_YAML).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.ushares.len(), 2);
    }

    #[test]
    fn test_load_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "listen = \"127.0.0.1:1\"\nushares = [[\"a\", \"/a\"]]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.listen, "127.0.0.1:1");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Config::load("/nonexistent/path/config.yaml");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "listen: [").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_sample() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_listen() {
        let mut config = sample();
        config.listen = "localhost".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidListen("localhost".to_string()))
        );

        config.listen = "[::1]:8080".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_address_port_only() {
        let mut config = sample();
        config.listen = ":8080".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address().unwrap(), "0.0.0.0:8080");

        config.listen = ":http".to_string();
        assert_eq!(
            config.bind_address(),
            Err(ConfigError::InvalidListen(":http".to_string()))
        );
    }

    #[test]
    fn test_bind_address_host_name() {
        let mut config = sample();
        config.listen = "localhost:8080".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address().unwrap(), "localhost:8080");
    }

    #[test]
    fn test_validate_no_ushares() {
        let mut config = sample();
        config.ushares.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoUshares));
    }

    #[test]
    fn test_validate_empty_login_and_root() {
        let mut config = sample();
        config.ushares.push(UshareEntry::new("", "/srv/x"));
        assert_eq!(config.validate(), Err(ConfigError::EmptyLogin(1)));

        let mut config = sample();
        config.ushares.push(UshareEntry::new("carol", ""));
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyRoot("carol".to_string()))
        );
    }

    #[test]
    fn test_validate_duplicate_login_allowed() {
        let mut config = sample();
        config.ushares.push(UshareEntry::new("alice", "/elsewhere"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_descriptor_file() {
        let mut config = sample();
        config.descriptor_file = "../shares.yaml".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDescriptorFile(_))
        ));

        config.descriptor_file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = sample();
        config.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.log_level = "warning".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("warning".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_env_override_listen() {
        std::env::remove_var("USHARE_LOG_LEVEL");
        std::env::set_var("USHARE_LISTEN", "127.0.0.1:9999");

        let mut config = sample();
        config.apply_env_overrides();
        assert_eq!(config.listen, "127.0.0.1:9999");

        std::env::remove_var("USHARE_LISTEN");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("USHARE_LISTEN", "");
        std::env::set_var("USHARE_LOG_LEVEL", "");

        let mut config = sample();
        config.apply_env_overrides();
        assert_eq!(config, sample());

        std::env::remove_var("USHARE_LISTEN");
        std::env::remove_var("USHARE_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::remove_var("USHARE_LISTEN");
        std::env::set_var("USHARE_LOG_LEVEL", "trace");

        let mut config = sample();
        config.apply_env_overrides();
        assert_eq!(config.log_level, "trace");

        std::env::remove_var("USHARE_LOG_LEVEL");
    }
}
