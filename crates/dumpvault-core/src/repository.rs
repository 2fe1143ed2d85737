//! Filesystem storage for dump documents.
//!
//! Backups live flat in one directory as `<database>_backup_<timestamp>.sql`.
//! The file name is the only identifier callers use; everything else in a
//! [`BackupDescriptor`] is read back from filesystem metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{VaultError, VaultResult};

/// Literal separator between database name and timestamp token.
pub const BACKUP_SEPARATOR: &str = "_backup_";
/// Extension of every backup file.
pub const BACKUP_EXTENSION: &str = "sql";

/// Metadata of one stored backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDescriptor {
    pub filename: String,
    pub database: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Validated backup file name.
///
/// Guarantees the name stays inside the backup directory and that the
/// database name can be recovered from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupFileName(String);

impl BackupFileName {
    pub fn parse(filename: &str) -> VaultResult<Self> {
        let invalid = |reason: &str| VaultError::InvalidFileName {
            filename: filename.to_string(),
            reason: reason.to_string(),
        };

        if filename.is_empty() {
            return Err(invalid("name is empty"));
        }
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(invalid("name must not contain path components"));
        }
        let Some(stem) = filename.strip_suffix(&format!(".{}", BACKUP_EXTENSION)) else {
            return Err(invalid("missing .sql extension"));
        };
        // The timestamp token never contains the separator; the database name may.
        match stem.rsplit_once(BACKUP_SEPARATOR) {
            Some((database, token)) if !database.is_empty() && !token.is_empty() => {
                Ok(Self(filename.to_string()))
            }
            _ => Err(invalid("expected <database>_backup_<timestamp>.sql")),
        }
    }

    /// Build the canonical name for a backup of `database` taken at `at`.
    pub fn for_database(database: &str, at: DateTime<Utc>) -> VaultResult<Self> {
        Self::parse(&format!(
            "{}{}{}.{}",
            database,
            BACKUP_SEPARATOR,
            timestamp_token(at),
            BACKUP_EXTENSION
        ))
    }

    /// Database name encoded in the file name.
    pub fn database(&self) -> &str {
        self.0
            .rsplit_once(BACKUP_SEPARATOR)
            .map_or(self.0.as_str(), |(database, _)| database)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO-8601 time with `:` and `.` replaced and sub-second/zone suffix trimmed,
/// e.g. `2024-01-15T10-30-45`.
pub fn timestamp_token(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Directory of dump files.
///
/// File names are validated with [`BackupFileName`] on every access, so no
/// operation reaches outside the directory. Backups are never overwritten.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use dumpvault_core::BackupRepository;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let repository = BackupRepository::new(dir.path().join("backups"));
/// assert!(repository.list().await?.is_empty());
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
/// let backup = repository.save_at("shop", "USE `shop`;\n", at).await?;
/// assert_eq!(backup.filename, "shop_backup_2024-01-15T10-30-45.sql");
/// assert_eq!(backup.database, "shop");
/// assert_eq!(repository.read(&backup.filename).await?, "USE `shop`;\n");
///
/// repository.delete(&backup.filename).await?;
/// assert!(repository.list().await?.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupRepository {
    directory: PathBuf,
}

impl BackupRepository {
    /// The directory is not touched until the first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory
    }

    /// Write `document` as a new backup of `database`.
    pub async fn save(&self, database: &str, document: &str) -> VaultResult<BackupDescriptor> {
        self.save_at(database, document, Utc::now()).await
    }

    /// Write `document` as the backup of `database` taken at `at`.
    pub async fn save_at(
        &self,
        database: &str,
        document: &str,
        at: DateTime<Utc>,
    ) -> VaultResult<BackupDescriptor> {
        let name = BackupFileName::for_database(database, at)?;
        self.ensure_directory().await?;

        let path = self.directory.join(name.as_str());
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(VaultError::BackupExists {
                    filename: name.to_string(),
                });
            }
            Err(e) => return Err(VaultError::io(&path, e)),
        };
        file.write_all(document.as_bytes())
            .await
            .map_err(|e| VaultError::io(&path, e))?;
        file.sync_all()
            .await
            .map_err(|e| VaultError::io(&path, e))?;
        drop(file);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| VaultError::io(&path, e))?;

        tracing::info!(
            filename = %name,
            size_bytes = metadata.len(),
            "Backup written"
        );

        Ok(descriptor(&name, &metadata))
    }

    /// All backups, most recently created first.
    pub async fn list(&self) -> VaultResult<Vec<BackupDescriptor>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::io(&self.directory, e)),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| VaultError::io(&self.directory, e))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.ends_with(&format!(".{}", BACKUP_EXTENSION)) {
                continue;
            }
            let name = match BackupFileName::parse(file_name) {
                Ok(name) => name,
                Err(e) => {
                    tracing::debug!(filename = %file_name, error = %e, "Skipping foreign .sql file");
                    continue;
                }
            };
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| VaultError::io(entry.path(), e))?;
            if metadata.is_file() {
                backups.push(descriptor(&name, &metadata));
            }
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(backups)
    }

    /// Read the full text of a stored backup.
    pub async fn read(&self, filename: &str) -> VaultResult<String> {
        let name = BackupFileName::parse(filename)?;
        let path = self.directory.join(name.as_str());
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VaultError::BackupNotFound {
                filename: filename.to_string(),
            }),
            Err(e) => Err(VaultError::io(&path, e)),
        }
    }

    /// Remove a stored backup.
    pub async fn delete(&self, filename: &str) -> VaultResult<()> {
        let name = BackupFileName::parse(filename)?;
        let path = self.directory.join(name.as_str());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(filename = %name, "Backup deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VaultError::BackupNotFound {
                filename: filename.to_string(),
            }),
            Err(e) => Err(VaultError::io(&path, e)),
        }
    }

    async fn ensure_directory(&self) -> VaultResult<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| VaultError::io(&self.directory, e))
    }
}

fn descriptor(name: &BackupFileName, metadata: &Metadata) -> BackupDescriptor {
    let modified_at: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());
    // Not every filesystem records a birth time.
    let created_at = metadata.created().map(DateTime::from).unwrap_or(modified_at);

    BackupDescriptor {
        filename: name.as_str().to_string(),
        database: name.database().to_string(),
        size_bytes: metadata.len(),
        created_at,
        modified_at,
    }
}
