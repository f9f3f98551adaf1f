//! Application configuration.
//!
//! Layers, lowest first: built-in defaults, the TOML file, then
//! `SMARTEAM__SECTION__KEY` environment variables.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::db;
use crate::seed::AdminSeedConfig;

pub const APP_NAME: &str = "smarteam";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SMARTEAM";

const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "smarteam.db";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL. Defaults to `smarteam.db` in the data directory.
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Data directory. `~` and `$VAR` are expanded.
    pub data_dir: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub admin: AdminSeedConfig,
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Load the layered configuration. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let built = Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.allowed_origins"),
            )
            .build()
            .with_context(|| format!("reading config from {}", path.display()))?;

        built
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Load the configuration, writing the default file first if it is missing.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::write_default(path)?;
        }
        Self::load(path)
    }

    /// Write the default configuration with a freshly generated JWT secret.
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let mut config = Self::default();
        config.auth.jwt_secret = Some(AuthConfig::generate_jwt_secret());

        let body = toml::to_string_pretty(&config).context("serializing default config")?;
        let contents = format!(
            "# Configuration for {APP_NAME}\n# Environment overrides use {ENV_PREFIX}__SECTION__KEY\n\n{body}"
        );
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    /// Resolve the data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.paths.data_dir {
            Some(dir) => expand_path(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_NAME))
                .ok_or_else(|| anyhow!("unable to determine data directory")),
        }
    }

    /// Resolve the database URL: explicit override, then config, then the data dir.
    pub fn database_url(&self, override_url: Option<&str>) -> Result<String> {
        if let Some(url) = override_url.or(self.database.url.as_deref()) {
            return Ok(url.to_string());
        }
        Ok(db::sqlite_url_for_path(
            &self.data_dir()?.join(DATABASE_FILE_NAME),
        ))
    }

    /// Address to listen on, with optional command-line overrides.
    pub fn listen_addr(&self, host: Option<&str>, port: Option<u16>) -> Result<SocketAddr> {
        let host = host.unwrap_or(self.server.host.as_str());
        let port = port.unwrap_or(self.server.port);
        format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))
    }
}

/// Resolve the config file path.
///
/// An explicit path may name a directory, in which case `config.toml` inside
/// it is used.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let Some(path) = explicit else {
        return dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| anyhow!("unable to determine configuration directory"));
    };

    let path = match path.to_str() {
        Some(text) => expand_path(text)?,
        None => path.to_path_buf(),
    };
    if path.is_dir() {
        Ok(path.join(CONFIG_FILE_NAME))
    } else {
        Ok(path)
    }
}

fn expand_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).with_context(|| format!("expanding path {text}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}
