use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HOST_KEY: &str = "PROCLINK_HOST";
pub const EMAIL_KEY: &str = "EMAIL_ID";
pub const ACCESS_TOKEN_KEY: &str = "ACCESS_TOKEN";
pub const CONNECTION_TIMEOUT_KEY: &str = "CONNECTION_TIMEOUT_SECS";
pub const POLL_COUNT_KEY: &str = "PROC_EXECUTION_STATUS_POLL_COUNT";

pub const CONFIG_DIR_ENV: &str = "PROCLINK_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "proclink.yaml";

pub const KEYS: [&str; 5] = [HOST_KEY, EMAIL_KEY, ACCESS_TOKEN_KEY, CONNECTION_TIMEOUT_KEY, POLL_COUNT_KEY];

fn default_connection_timeout() -> Duration { Duration::from_secs(10) }
fn default_poll_count() -> u32 { 30 }

/// Who is calling and where the daemon lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub email: String,
    pub access_token: String,
}

impl Credentials {
    pub fn is_incomplete(&self) -> bool {
        self.email.is_empty() || self.access_token.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub email: String,
    pub access_token: String,
    pub connection_timeout: Duration,
    pub poll_count: u32,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            email: String::new(),
            access_token: String::new(),
            connection_timeout: default_connection_timeout(),
            poll_count: default_poll_count(),
        }
    }

    pub fn with_identity(mut self, email: impl Into<String>, access_token: impl Into<String>) -> Self {
        self.email = email.into();
        self.access_token = access_token.into();
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            host: self.host.clone(),
            email: self.email.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Source of client configuration, consulted before every daemon call.
pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> Result<ClientConfig>;
}

impl ConfigProvider for ClientConfig {
    fn load(&self) -> Result<ClientConfig> {
        Ok(self.clone())
    }
}

/// On-disk shape of `proclink.yaml`. Every key is optional so partial files
/// and environment overlays can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "PROCLINK_HOST", default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "EMAIL_ID", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "ACCESS_TOKEN", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "CONNECTION_TIMEOUT_SECS", default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout_secs: Option<u64>,
    #[serde(rename = "PROC_EXECUTION_STATUS_POLL_COUNT", default, skip_serializing_if = "Option::is_none")]
    pub poll_count: Option<u32>,
}

impl ConfigFile {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Like `from_yaml_file`, but a missing file is an empty config.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_yaml_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Collect overrides from variables named like the file keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        for key in KEYS {
            if let Some(value) = lookup(key) {
                config.set(key, &value)
                    .with_context(|| format!("Invalid value in environment variable {}", key))?;
            }
        }
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            HOST_KEY => self.host = Some(value.to_string()),
            EMAIL_KEY => self.email = Some(value.to_string()),
            ACCESS_TOKEN_KEY => self.access_token = Some(value.to_string()),
            CONNECTION_TIMEOUT_KEY => {
                let secs: u64 = value.trim().parse()
                    .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, value))?;
                if secs == 0 {
                    return Err(anyhow!("{} must be at least 1 second", key));
                }
                self.connection_timeout_secs = Some(secs);
            }
            POLL_COUNT_KEY => {
                let count = value.trim().parse()
                    .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, value))?;
                self.poll_count = Some(count);
            }
            _ => return Err(anyhow!("Unknown config key: {} (expected one of {})", key, KEYS.join(", "))),
        }
        Ok(())
    }

    /// Merge with another config, preferring values set in other
    pub fn merge(&mut self, other: ConfigFile) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.access_token.is_some() {
            self.access_token = other.access_token;
        }
        if other.connection_timeout_secs.is_some() {
            self.connection_timeout_secs = other.connection_timeout_secs;
        }
        if other.poll_count.is_some() {
            self.poll_count = other.poll_count;
        }
    }

    pub fn resolve(self) -> Result<ClientConfig> {
        let host = self.host.filter(|h| !h.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "{} is not configured. Set it with `proclink config set {}=<host:port>`",
                HOST_KEY,
                HOST_KEY
            )
        })?;

        if self.connection_timeout_secs == Some(0) {
            return Err(anyhow!("{} must be at least 1 second", CONNECTION_TIMEOUT_KEY));
        }

        Ok(ClientConfig {
            host,
            email: self.email.unwrap_or_default(),
            access_token: self.access_token.unwrap_or_default(),
            connection_timeout: self
                .connection_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(default_connection_timeout),
            poll_count: self.poll_count.unwrap_or_else(default_poll_count),
        })
    }
}

/// `$PROCLINK_CONFIG_DIR`, falling back to `$HOME/.proclink`.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME")
        .with_context(|| format!("HOME is not set; set {} to choose a config directory", CONFIG_DIR_ENV))?;
    Ok(PathBuf::from(home).join(".proclink"))
}

/// Reads `proclink.yaml` on every `load`, with environment overrides on top.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
    env_overrides: bool,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), env_overrides: true }
    }

    pub fn from_default_location() -> Result<Self> {
        Ok(Self::new(config_dir()?.join(CONFIG_FILE_NAME)))
    }

    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load(&self) -> Result<ClientConfig> {
        let mut config = ConfigFile::load_or_default(&self.path)?;
        if self.env_overrides {
            config.merge(ConfigFile::from_env()?);
        }
        config.resolve()
    }
}
