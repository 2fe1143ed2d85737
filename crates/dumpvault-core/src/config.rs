//! Configuration loading.
//!
//! Configuration comes from a TOML file, then environment overrides:
//!
//! ```toml
//! [database]
//! host = "db.internal"
//! port = 3306
//! user = "backup"
//! password_sealed = "base64..."   # or `password = "..."`
//! pool_size = 5
//!
//! [backup]
//! directory = "/var/backups/shop"
//! split_mode = "quote_aware"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::context::HostKey;
use crate::error::{VaultError, VaultResult};
use crate::password::DatabasePassword;
use crate::splitter::SplitMode;

pub const ENV_DB_HOST: &str = "DUMPVAULT_DB_HOST";
pub const ENV_DB_PORT: &str = "DUMPVAULT_DB_PORT";
pub const ENV_DB_USER: &str = "DUMPVAULT_DB_USER";
pub const ENV_DB_PASSWORD: &str = "DUMPVAULT_DB_PASSWORD";
pub const ENV_BACKUP_DIR: &str = "DUMPVAULT_BACKUP_DIR";

/// Connection pool size constrained to 1-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PoolSize(u8);

impl PoolSize {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    pub const fn new(size: u8) -> Option<Self> {
        if size < Self::MIN || size > Self::MAX {
            None
        } else {
            Some(Self(size))
        }
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }

    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }
}

impl Default for PoolSize {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<usize> for PoolSize {
    type Error = String;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        u8::try_from(size)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| {
                format!(
                    "pool size {} is out of range (must be {}-{})",
                    size,
                    Self::MIN,
                    Self::MAX
                )
            })
    }
}

impl From<PoolSize> for usize {
    fn from(pool: PoolSize) -> Self {
        pool.get()
    }
}

impl fmt::Display for PoolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection settings for the MySQL server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Clear-text password. Prefer `password_sealed`.
    pub password: Option<DatabasePassword>,
    /// Password sealed with the host key (`dumpvault seal-password`).
    pub password_sealed: Option<String>,
    /// Default schema of pooled connections, if any.
    pub database: Option<String>,
    pub pool_size: PoolSize,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            password_sealed: None,
            database: None,
            pool_size: PoolSize::default(),
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> VaultResult<()> {
        let invalid = |message: &str| VaultError::Config {
            message: message.to_string(),
        };

        if self.host.trim().is_empty() {
            return Err(invalid("database host cannot be empty"));
        }
        if self.host.contains("..") || self.host.contains("//") {
            return Err(invalid("invalid database host: potential path traversal detected"));
        }
        if self.user.trim().is_empty() {
            return Err(invalid("database user cannot be empty"));
        }
        if self.port == 0 {
            return Err(invalid("database port cannot be zero"));
        }
        if self.password.is_some() && self.password_sealed.is_some() {
            return Err(invalid("set either password or password_sealed, not both"));
        }
        Ok(())
    }

    /// Clear-text password, unsealing `password_sealed` with `key` if needed.
    pub fn resolve_password(&self, key: &HostKey) -> VaultResult<Option<DatabasePassword>> {
        if let Some(password) = &self.password {
            return Ok(Some(password.clone()));
        }
        self.password_sealed
            .as_deref()
            .map(|sealed| key.open(sealed))
            .transpose()
    }
}

/// Where and how dumps are stored and replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    pub directory: PathBuf,
    pub split_mode: SplitMode,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("backups"),
            split_mode: SplitMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub database: DatabaseConfig,
    pub backup: BackupSettings,
}

impl VaultConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| VaultError::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
        })?;
        Self::load_from_toml(&content)
    }

    pub fn load_from_toml(content: &str) -> VaultResult<Self> {
        toml::from_str(content).map_err(|e| VaultError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })
    }

    /// Load `path` if given (defaults otherwise), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> VaultResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides read through `lookup` (normally the process
    /// environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> VaultResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_DB_HOST) {
            self.database.host = host;
        }
        if let Some(port) = lookup(ENV_DB_PORT) {
            self.database.port = port.trim().parse().map_err(|_| VaultError::Config {
                message: format!("{} must be a port number, got '{}'", ENV_DB_PORT, port),
            })?;
        }
        if let Some(user) = lookup(ENV_DB_USER) {
            self.database.user = user;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.database.password = Some(DatabasePassword::new(password));
            self.database.password_sealed = None;
        }
        if let Some(directory) = lookup(ENV_BACKUP_DIR) {
            self.backup.directory = PathBuf::from(directory);
        }
        Ok(())
    }

    pub fn validate(&self) -> VaultResult<()> {
        self.database.validate()?;
        if self.backup.directory.as_os_str().is_empty() {
            return Err(VaultError::Config {
                message: "backup directory cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
