//! # Dumpvault
//!
//! Logical backup and restore for MySQL databases.
//!
//! A backup is a self-contained SQL document: for every base table of a
//! database, the server's own creation statement followed by one `INSERT` per
//! row, bracketed by statements that disable and re-enable foreign key checks.
//! Documents are stored as `<database>_backup_<timestamp>.sql` files in a
//! backup directory. Restoring one is destructive: every table currently in
//! the target database is dropped before the document is replayed.
//!
//! ## Crates
//!
//! - `dumpvault-core`: value model, serializer, statement splitter, backup
//!   repository, restore executor and [`BackupService`]
//! - `dumpvault-mysql`: sqlx-backed [`MySqlSource`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use dumpvault::{BackupRepository, BackupService, MySqlSource, VaultConfig};
//!
//! # async fn demo() -> dumpvault::VaultResult<()> {
//! let config = VaultConfig::load(None)?;
//! let source = MySqlSource::connect(&config.database, config.database.password.as_ref()).await?;
//! let service = BackupService::new(source, BackupRepository::new(&config.backup.directory));
//!
//! let backup = service.create_backup("shop").await?;
//! let summary = service.restore_backup(&backup.filename).await?;
//! println!("{}", summary.message);
//! # Ok(())
//! # }
//! ```

pub use dumpvault_core::{
    BackupDescriptor, BackupFileName, BackupRepository, BackupService, DatabaseConfig,
    RestoreSummary, Row, ServiceContext, SplitMode, SqlValue, VaultConfig, VaultError,
    VaultResult, split_statements,
};
pub use dumpvault_mysql::MySqlSource;
