//! TOML-based configuration for the client.
//!
//! The file lives at `$XDG_CONFIG_HOME/rsynergy/config.toml` (with the
//! usual `~/.config` fallback); a missing file means defaults.  Every field
//! has a serde default so older config files keep working when new fields
//! appear.
//!
//! ```toml
//! server = "192.168.1.20"
//! port = 24800
//! client_name = "wayland-desk"
//! abs_mouse_move = false
//! mouse_move_threshold = 8
//! mouse_pos_sync_freq = 2
//! tls = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine the config directory (set XDG_CONFIG_HOME or HOME)")]
    NoConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration consumed by the session and dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Server host name or address.
    #[serde(default = "default_server")]
    pub server: String,
    /// Server TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name advertised in the greeting reply; must match a screen name in
    /// the server's layout.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Screen width in pixels; probed at startup when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u16>,
    /// Screen height in pixels; probed at startup when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u16>,

    /// Inject absolute positions instead of reconciled relative deltas.
    #[serde(default)]
    pub abs_mouse_move: bool,
    /// Minimum milliseconds between emitted mouse moves; faster arrivals
    /// coalesce with last-wins semantics.
    #[serde(default = "default_mouse_move_threshold")]
    pub mouse_move_threshold: u64,
    /// Refresh the compositor cursor probe every N moves in relative mode.
    #[serde(default = "default_mouse_pos_sync_freq")]
    pub mouse_pos_sync_freq: u32,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Wrap the connection in TLS.
    #[serde(default)]
    pub tls: bool,
    /// Present a client certificate (implies `tls`).
    #[serde(default)]
    pub mtls: bool,
    /// Skip peer certificate verification.  Logged loudly; only for
    /// self-signed server setups.
    #[serde(default)]
    pub tls_trust: bool,
    /// PEM file holding the client certificate chain and private key.
    #[serde(default = "default_pem_path")]
    pub pem_path: PathBuf,

    /// `tracing` log level when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_server() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    24800
}
fn default_client_name() -> String {
    "rsynergy".to_string()
}
fn default_mouse_move_threshold() -> u64 {
    8
}
fn default_mouse_pos_sync_freq() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_pem_path() -> PathBuf {
    config_dir_or_cwd().join("rsynergy.pem")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            client_name: default_client_name(),
            screen_width: None,
            screen_height: None,
            abs_mouse_move: false,
            mouse_move_threshold: default_mouse_move_threshold(),
            mouse_pos_sync_freq: default_mouse_pos_sync_freq(),
            connect_timeout: default_connect_timeout(),
            tls: false,
            mtls: false,
            tls_trust: false,
            pem_path: default_pem_path(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Rejects configurations the session cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::Invalid("server must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.client_name.trim().is_empty() {
            return Err(ConfigError::Invalid("client_name must not be empty".into()));
        }
        if self.mouse_pos_sync_freq == 0 {
            return Err(ConfigError::Invalid(
                "mouse_pos_sync_freq must be at least 1".into(),
            ));
        }
        if self.screen_width == Some(0) || self.screen_height == Some(0) {
            return Err(ConfigError::Invalid(
                "screen dimensions must be non-zero when set".into(),
            ));
        }
        if self.mtls && !self.pem_path.as_os_str().is_empty() && !self.pem_path.exists() {
            return Err(ConfigError::Invalid(format!(
                "mtls requires a readable PEM at {}",
                self.pem_path.display()
            )));
        }
        Ok(())
    }

    /// `true` when any TLS mode is requested.
    pub fn wants_tls(&self) -> bool {
        self.tls || self.mtls
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// XDG config directory for this application.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("rsynergy"))
}

fn config_dir_or_cwd() -> PathBuf {
    config_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Default config file path.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the configuration from `path`, or from the default location when
/// `path` is `None`.  A missing file yields `ClientConfig::default()`; an
/// explicitly named file that is missing is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors and
/// [`ConfigError::Parse`] for malformed TOML.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_file_path()?, false),
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            Ok(ClientConfig::default())
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_conventions() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.port, 24800);
        assert_eq!(cfg.mouse_move_threshold, 8);
        assert_eq!(cfg.mouse_pos_sync_freq, 2);
        assert_eq!(cfg.connect_timeout, 10);
        assert!(!cfg.abs_mouse_move);
        assert!(!cfg.wants_tls());
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let cfg: ClientConfig = toml::from_str("server = \"10.0.0.2\"").unwrap();
        assert_eq!(cfg.server, "10.0.0.2");
        assert_eq!(cfg.port, 24800);
        assert_eq!(cfg.client_name, "rsynergy");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut cfg = ClientConfig::default();
        cfg.server = "192.168.1.20".to_string();
        cfg.screen_width = Some(2560);
        cfg.screen_height = Some(1440);
        cfg.tls = true;

        let text = toml::to_string_pretty(&cfg).unwrap();
        let restored: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_unset_screen_dimensions_are_omitted_from_toml() {
        let text = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(!text.contains("screen_width"));
        assert!(!text.contains("screen_height"));
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut cfg = ClientConfig::default();
        cfg.port = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_empty_server() {
        let mut cfg = ClientConfig::default();
        cfg.server = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sync_freq() {
        let mut cfg = ClientConfig::default();
        cfg.mouse_pos_sync_freq = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mtls_implies_wants_tls() {
        let mut cfg = ClientConfig::default();
        cfg.mtls = true;
        assert!(cfg.wants_tls());
    }

    #[test]
    fn test_explicitly_named_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/rsynergy/config.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let result: Result<ClientConfig, _> = toml::from_str("[[[ nope");
        assert!(result.is_err());
    }
}
