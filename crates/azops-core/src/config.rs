//! Configuration for azops.
//!
//! `azops.toml` is located with the following resolution order, the first
//! hit wins:
//!
//! 1. The `AZOPS_CONFIG` environment variable
//! 2. The current directory
//! 3. Parent directories (walking up to the filesystem root)
//! 4. The XDG config directory (`~/.config/azops/azops.toml`)
//!
//! A missing file is not an error; every setting has a default.
//!
//! ```toml
//! [arm]
//! endpoint = "https://management.azure.com"
//!
//! [defaults]
//! subscription_id = "00000000-0000-0000-0000-000000000000"
//! auth_method = "credential"
//!
//! [resolution]
//! loader_timeout_ms = 5000
//!
//! [retry]
//! max_retries = 5
//! mode = "exponential"
//!
//! [server]
//! transport = "http"
//! addr = "127.0.0.1:3333"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "AZOPS_CONFIG";

/// Environment variable carrying a bearer token.
pub const TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

pub const CONFIG_FILE_NAME: &str = "azops.toml";

pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

/// Contents of `azops.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzopsConfig {
    pub arm: ArmConfig,
    pub defaults: DefaultsConfig,
    pub resolution: ResolutionConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

/// Management endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub endpoint: String,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
        }
    }
}

/// Default values for the common arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub tenant_id: Option<String>,
    pub subscription_id: Option<String>,
    pub auth_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Upper bound for a single value loader, in milliseconds.
    pub loader_timeout_ms: u64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            loader_timeout_ms: 10_000,
        }
    }
}

/// Defaults for the retry arguments. Forwarded untouched to the service
/// collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub delay_secs: Option<f64>,
    pub max_delay_secs: Option<f64>,
    pub mode: Option<String>,
    pub network_timeout_secs: Option<f64>,
}

/// Defaults for `server start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: Option<String>,
    pub addr: Option<String>,
    pub path: Option<String>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AzopsConfig {
    /// Finds and loads `azops.toml` using the resolution order above.
    ///
    /// Returns `Ok(None)` when no file exists anywhere.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the current directory cannot be read or
    /// a file that was found cannot be read or parsed.
    pub fn resolve() -> Result<Option<Self>, ConfigError> {
        let current = std::env::current_dir()?;
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let xdg_path = dirs::config_dir().map(|dir| dir.join("azops").join(CONFIG_FILE_NAME));
        resolve_path(env_path, &current, xdg_path)
            .map(|path| Self::load(&path))
            .transpose()
    }

    /// Like [`AzopsConfig::resolve`], falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be loaded.
    pub fn resolve_or_default() -> Result<Self, ConfigError> {
        Ok(Self::resolve()?.unwrap_or_default())
    }

    /// Loads a config file from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn loader_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution.loader_timeout_ms)
    }

    /// Bearer token from `AZURE_ACCESS_TOKEN`, falling back to `[auth] token`.
    pub fn access_token(&self) -> Option<String> {
        pick_token(std::env::var(TOKEN_ENV).ok(), &self.auth)
    }
}

/// Resolution order without touching the process environment.
fn resolve_path(
    env_path: Option<PathBuf>,
    current: &Path,
    xdg_path: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = env_path
        && path.exists()
    {
        return Some(path);
    }

    // Current directory first, then every parent.
    if let Some(path) = current
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
    {
        return Some(path);
    }

    xdg_path.filter(|path| path.is_file())
}

fn pick_token(env_token: Option<String>, auth: &AuthConfig) -> Option<String> {
    env_token
        .filter(|token| !token.is_empty())
        .or_else(|| auth.token.clone().filter(|token| !token.is_empty()))
}
