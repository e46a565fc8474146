//! Configuration loading for the spectra analyzer client
//!
//! Each setting is resolved with the following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is normal. A malformed one is logged and ignored so
//! the client still starts with defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::packet::EngineIoVersion;
use crate::protocol::DOWNLOADER_NAMESPACE;
use crate::{Error, Result};

/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "SPECTRA_SERVER_URL";
/// Environment variable overriding the config file location
pub const ENV_CONFIG_FILE: &str = "SPECTRA_CONFIG";

const APP_DIR: &str = "spectra-analyzer";

/// Optional settings read from `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server_url: Option<String>,
    pub analyzer_socket_path: Option<String>,
    pub downloader_socket_path: Option<String>,
    pub engine_io: Option<EngineIoVersion>,
    pub images_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Load a config file, degrading to an empty config on any problem
    pub fn load_or_default(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No config file at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Ignoring malformed config file {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

/// Fallback values compiled into the client
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub server_url: String,
    pub analyzer_socket_path: String,
    pub downloader_socket_path: String,
    pub engine_io: EngineIoVersion,
    pub images_dir: PathBuf,
    pub state_file: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./spectra_data"));

        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            analyzer_socket_path: "/socket.io".to_string(),
            // The downloader is deployed behind a path-prefixed proxy
            downloader_socket_path: "/spectra-analyzer/socket.io".to_string(),
            engine_io: EngineIoVersion::V4,
            images_dir: data_dir.join("images"),
            state_file: data_dir.join("cookies.toml"),
            log_level: "info".to_string(),
        }
    }

    /// `~/.config/spectra-analyzer/config.toml` (or the platform equivalent)
    pub fn config_file() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub config_file: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub engine_io: Option<EngineIoVersion>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: Url,
    pub analyzer_socket_path: String,
    pub downloader_socket_path: String,
    pub engine_io: EngineIoVersion,
    pub images_dir: PathBuf,
    pub state_file: PathBuf,
    pub log_level: String,
}

impl ClientConfig {
    /// Resolve configuration from overrides, environment, file and defaults
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let config_file = overrides
            .config_file
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from))
            .unwrap_or_else(CompiledDefaults::config_file);
        let file = TomlConfig::load_or_default(&config_file);

        let server_url = overrides
            .server_url
            .clone()
            .or_else(|| std::env::var(ENV_SERVER_URL).ok())
            .or(file.server_url)
            .unwrap_or(defaults.server_url);
        let server_url = Url::parse(&server_url)
            .map_err(|e| Error::Config(format!("Invalid server URL '{}': {}", server_url, e)))?;

        Ok(Self {
            server_url,
            analyzer_socket_path: file
                .analyzer_socket_path
                .unwrap_or(defaults.analyzer_socket_path),
            downloader_socket_path: file
                .downloader_socket_path
                .unwrap_or(defaults.downloader_socket_path),
            engine_io: overrides
                .engine_io
                .or(file.engine_io)
                .unwrap_or(defaults.engine_io),
            images_dir: overrides
                .images_dir
                .clone()
                .or(file.images_dir)
                .unwrap_or(defaults.images_dir),
            state_file: overrides
                .state_file
                .clone()
                .or(file.state_file)
                .unwrap_or(defaults.state_file),
            log_level: file.log_level.unwrap_or(defaults.log_level),
        })
    }

    /// Socket.IO mount path used by a namespace
    pub fn socket_path(&self, namespace: &str) -> &str {
        if namespace == DOWNLOADER_NAMESPACE {
            &self.downloader_socket_path
        } else {
            &self.analyzer_socket_path
        }
    }

    /// WebSocket endpoint for a namespace:
    /// `ws(s)://host:port/<socket path>/?EIO=<rev>&transport=websocket`
    pub fn websocket_url(&self, namespace: &str) -> Result<Url> {
        let mut url = self.server_url.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::Config(format!(
                    "Unsupported server URL scheme '{}'",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::Config(format!("Cannot use scheme {} for {}", scheme, url)))?;

        let path = format!("{}/", self.socket_path(namespace).trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("EIO", &self.engine_io.as_u8().to_string())
            .append_pair("transport", "websocket");
        Ok(url)
    }
}
