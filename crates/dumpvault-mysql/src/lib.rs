//! # Dumpvault MySQL
//!
//! MySQL implementation of the engine's session seams, built on a sqlx
//! connection pool.
//!
//! ```rust,no_run
//! use dumpvault_core::{BackupRepository, BackupService, DatabaseConfig};
//! use dumpvault_mysql::MySqlSource;
//!
//! # async fn demo() -> dumpvault_core::VaultResult<()> {
//! let source = MySqlSource::connect(&DatabaseConfig::default(), None).await?;
//! let service = BackupService::new(source, BackupRepository::new("backups"));
//! let databases = service.list_databases().await?;
//! # Ok(())
//! # }
//! ```

pub mod decode;
mod error;
pub mod pool;
pub mod session;

pub use pool::MySqlSource;
pub use session::MySqlSession;
