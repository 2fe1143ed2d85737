//! # DumpVault Core
//!
//! Logical backup and restore of MySQL databases as plain SQL text.
//!
//! A backup introspects every table of a database, serializes schema and
//! rows into one dump document and stores it in a [`BackupRepository`]. A
//! restore splits a stored document back into statements and replays them
//! destructively, tolerating individual statement failures.
//!
//! ## Modules
//!
//! - [`introspect`]: reads tables, schema and rows through a [`SqlSession`]
//! - [`dump`]: dump document serializer
//! - [`repository`]: backup files on disk
//! - [`splitter`]: dump text to statements
//! - [`restore`]: restore executor and the foreign key checks guard
//! - [`service`]: [`BackupService`], the public operations
//!
//! The database driver plugs in through [`SessionSource`] and [`SqlSession`];
//! see the `dumpvault-mysql` crate.

pub mod config;
pub mod context;
pub mod dump;
pub mod error;
pub mod introspect;
pub mod repository;
pub mod restore;
pub mod password;
pub mod service;
pub mod session;
pub mod splitter;
pub mod value;

pub use config::{BackupSettings, DatabaseConfig, PoolSize, VaultConfig};
pub use context::{HostKey, ServiceContext};
pub use error::{VaultError, VaultResult};
pub use repository::{BackupDescriptor, BackupFileName, BackupRepository};
pub use restore::{ForeignKeyChecksGuard, RestoreSummary, StatementKind};
pub use password::DatabasePassword;
pub use service::BackupService;
pub use session::{SessionSource, SqlSession};
pub use splitter::{SplitMode, split_statements};
pub use value::{Row, SqlValue, TableDump};
