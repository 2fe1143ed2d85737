//! Error types for backup and restore operations.
//!
//! Errors raised before the target database is mutated (connection,
//! introspection, missing backup file) propagate to the caller. Errors raised
//! while replaying a dump are contained by the restore executor and reported
//! through [`RestoreSummary`](crate::restore::RestoreSummary) instead.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while dumping, storing or restoring a database.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Pool exhaustion, authentication failure or a dropped connection.
    #[error("Database connection failed: {reason}")]
    Connection { reason: String },

    /// A database or table disappeared (or could not be read) mid-dump.
    #[error("Introspection of {} failed: {reason}", qualified(database, table.as_deref()))]
    Introspection {
        database: String,
        table: Option<String>,
        reason: String,
    },

    /// The requested backup file does not exist in the repository.
    #[error("Backup file not found: {filename}")]
    BackupNotFound { filename: String },

    /// A backup with the same file name is already stored.
    #[error("Backup file already exists: {filename}")]
    BackupExists { filename: String },

    /// The backup file name is not a valid repository entry.
    #[error("Invalid backup file name '{filename}': {reason}")]
    InvalidFileName { filename: String, reason: String },

    /// A single replayed statement failed.
    #[error("Statement failed: {reason} (statement: {})", preview(statement))]
    Statement { statement: String, reason: String },

    /// Re-enabling foreign key checks failed after a restore.
    #[error("Failed to re-enable foreign key checks: {reason}")]
    Cleanup { reason: String },

    /// Filesystem error inside the backup repository.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Sealing or unsealing a stored credential failed.
    #[error("Secret handling failed: {reason}")]
    Secret { reason: String },
}

impl VaultError {
    /// Build an [`VaultError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VaultError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an introspection error scoped to a whole database.
    pub fn introspection(database: &str, reason: impl Into<String>) -> Self {
        VaultError::Introspection {
            database: database.to_string(),
            table: None,
            reason: reason.into(),
        }
    }

    /// Build an introspection error scoped to one table.
    pub fn table_introspection(database: &str, table: &str, reason: impl Into<String>) -> Self {
        VaultError::Introspection {
            database: database.to_string(),
            table: Some(table.to_string()),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised before anything was mutated.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, VaultError::Statement { .. } | VaultError::Cleanup { .. })
    }
}

fn qualified(database: &str, table: Option<&str>) -> String {
    match table {
        Some(table) => format!("{}.{}", database, table),
        None => database.to_string(),
    }
}

fn preview(statement: &str) -> String {
    const MAX: usize = 120;
    if statement.chars().count() > MAX {
        let head: String = statement.chars().take(MAX - 3).collect();
        format!("{}...", head)
    } else {
        statement.to_string()
    }
}
