//! Viewer configuration loaded from TOML.
//!
//! Lives at `<config_dir>/claude-log-viewer/config.toml`. Every field has a
//! default, so a missing file or a partial file is fine. Environment
//! variables are applied on top by [`ViewerConfig::apply_env`]; command-line
//! flags are applied by the server after that.

use crate::error::{Result, ViewerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_DIR_NAME: &str = "claude-log-viewer";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Overrides `server.port`.
pub const PORT_ENV: &str = "PORT";
/// Set to `1` to force debug logging.
pub const DEBUG_LOG_ENV: &str = "CLAUDE_LOG_VIEWER_DEBUG_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of static frontend assets served for non-API paths.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// How often live-update streams check the watched file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Claude Code data directory; `~/.claude` when unset.
    #[serde(default)]
    pub claude_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    #[serde(default = "default_max_matches_per_session")]
    pub max_matches_per_session: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            max_matches_per_session: default_max_matches_per_session(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file here.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6173
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_min_query_len() -> usize {
    3
}

fn default_max_matches_per_session() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ViewerConfig {
    /// Applies `PORT` and `CLAUDE_LOG_VIEWER_DEBUG_LOG` from the process
    /// environment.
    pub fn apply_env(&mut self) {
        let port = std::env::var(PORT_ENV).ok();
        let debug = std::env::var(DEBUG_LOG_ENV).ok();
        self.apply_overrides(port.as_deref(), debug.as_deref());
    }

    fn apply_overrides(&mut self, port: Option<&str>, debug: Option<&str>) {
        if let Some(raw) = port {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(err) => {
                    tracing::warn!(value = raw, error = %err, "Ignoring invalid PORT override")
                }
            }
        }
        if debug.is_some_and(|flag| flag.trim() == "1") {
            self.logging.level = "debug".to_string();
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the configuration from `path`, or from the default location.
/// A missing file yields the defaults.
pub fn load_config(path: Option<PathBuf>) -> Result<ViewerConfig> {
    let Some(config_path) = path.or_else(default_config_path) else {
        return Ok(ViewerConfig::default());
    };

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config file; using defaults");
        return Ok(ViewerConfig::default());
    }

    let content = fs_err::read_to_string(&config_path)
        .map_err(|err| ViewerError::io("reading config", err))?;
    toml::from_str::<ViewerConfig>(&content).map_err(|err| ViewerError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing.toml");
        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 6173);
        assert_eq!(config.search.min_query_len, 3);
        assert_eq!(config.search.max_matches_per_session, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_config_parses_sections_and_keeps_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[server]
port = 8080
static_dir = "public"

[storage]
claude_dir = "/data/claude"

[logging]
level = "viewer_core=trace"
directory = "/var/log/viewer"
"#,
        )
        .expect("write config");

        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.poll_interval_ms, 1000);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("public")));
        assert_eq!(config.storage.claude_dir, Some(PathBuf::from("/data/claude")));
        assert_eq!(config.search, SearchConfig::default());
        assert_eq!(config.logging.level, "viewer_core=trace");
        assert_eq!(
            config.logging.directory,
            Some(PathBuf::from("/var/log/viewer"))
        );
    }

    #[test]
    fn load_config_rejects_malformed_toml() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[server\nport = ").expect("write config");

        let err = load_config(Some(path.clone())).expect_err("should fail");
        match err {
            ViewerError::ConfigMalformed { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_config_rejects_wrong_types() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[server]\nport = \"eighty\"\n").expect("write config");
        assert!(matches!(
            load_config(Some(path)),
            Err(ViewerError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn port_override_applies_when_valid() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(Some("9000"), None);
        assert_eq!(config.server.port, 9000);

        config.apply_overrides(Some("not-a-port"), None);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn debug_flag_forces_debug_level() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(None, Some("0"));
        assert_eq!(config.logging.level, "info");

        config.apply_overrides(None, Some("1"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn default_config_path_names_the_app() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("claude-log-viewer/config.toml"));
        }
    }
}
