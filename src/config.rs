//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILRELAY_CONFIG` (environment variable)
//! 2. `~/.config/mailrelay/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailrelay\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! SMTP credentials live in the same file, keyed by host:
//!
//! ```toml
//! [credentials."smtp.example.com"]
//! username = "relay"
//! password = "secret"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use serde::{Deserialize, Serialize};

use crate::relay::{CredentialStore, HostCredentials};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// CGI environment and tracking headers.
    pub cgi: CgiConfig,
    /// Outgoing SMTP defaults.
    pub smtp: SmtpConfig,
    /// Per-host SMTP credentials.
    pub credentials: BTreeMap<String, HostCredentials>,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory for the log file.
    pub log_dir: Option<PathBuf>,
}

/// CGI environment and tracking headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CgiConfig {
    /// Environment variable holding the authenticated caller's address.
    pub login_var: String,
    /// Header recording the caller's address on every relayed message.
    pub tracking_header: String,
    /// Header recording which server relayed the message.
    pub server_header: String,
}

/// Outgoing SMTP defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Host used when the request does not name one.
    pub host: String,
    /// Port for unauthenticated relaying.
    pub port: u16,
    /// Port for authenticated (STARTTLS) relaying, unless the host overrides it.
    pub auth_port: u16,
    /// SMTP command timeout in seconds.
    pub timeout_secs: u64,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for CgiConfig {
    fn default() -> Self {
        Self {
            login_var: "SSL_CLIENT_S_DN_Email".to_string(),
            tracking_header: "X-Scripts-SSL-Client-Email".to_string(),
            server_header: "X-Relay-Server".to_string(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            auth_port: 587,
            timeout_secs: 30,
        }
    }
}

impl CredentialStore for Config {
    fn credentials_for(&self, host: &str) -> Option<&HostCredentials> {
        self.credentials
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(host))
            .map(|(_, creds)| creds)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration from `path`, or from the standard location.
///
/// A missing file gives the defaults. An unreadable or invalid file also
/// gives the defaults, paired with the error so the caller can report it
/// once logging is set up.
pub fn load_config(path: Option<&Path>) -> (Config, Option<anyhow::Error>) {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return (Config::default(), None);
    };
    if !path.exists() {
        return (Config::default(), None);
    }

    match load_config_from(&path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

/// Read and parse one config file.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILRELAY_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailrelay").join("config.toml"))
}

/// Return the directory for the log file.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailrelay")
}
