//! Public backup/restore operations.

use chrono::Utc;

use crate::dump;
use crate::error::{VaultError, VaultResult};
use crate::introspect::introspect_database;
use crate::repository::{BackupDescriptor, BackupFileName, BackupRepository};
use crate::restore::{RestoreSummary, restore_statements};
use crate::session::{SessionSource, SqlSession, is_system_schema};
use crate::splitter::{SplitMode, split_statements};

/// Entry point used by the CLI and by embedding applications.
///
/// Each operation checks out its own session and holds it only for the
/// duration of that operation. Concurrent operations against the same
/// database are not serialized here.
///
/// # Examples
///
/// Any [`SessionSource`] works; `dumpvault-mysql` provides the pooled
/// MySQL one.
///
/// ```no_run
/// use dumpvault_core::{BackupRepository, BackupService, SessionSource, VaultResult};
///
/// async fn refresh_staging<P: SessionSource>(source: P) -> VaultResult<()> {
///     let service = BackupService::new(source, BackupRepository::new("./backups"));
///
///     let backup = service.create_backup("shop").await?;
///     println!("{} ({} bytes)", backup.filename, backup.size_bytes);
///
///     let summary = service.restore_backup(&backup.filename).await?;
///     if summary.statements_failed > 0 {
///         eprintln!("{}", summary.message);
///     }
///     Ok(())
/// }
/// ```
pub struct BackupService<P: SessionSource> {
    source: P,
    repository: BackupRepository,
    split_mode: SplitMode,
}

impl<P: SessionSource> BackupService<P> {
    pub fn new(source: P, repository: BackupRepository) -> Self {
        Self {
            source,
            repository,
            split_mode: SplitMode::default(),
        }
    }

    pub fn with_split_mode(mut self, split_mode: SplitMode) -> Self {
        self.split_mode = split_mode;
        self
    }

    pub fn repository(&self) -> &BackupRepository {
        &self.repository
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub async fn list_databases(&self) -> VaultResult<Vec<String>> {
        let mut session = self.source.checkout().await?;
        session.list_databases().await
    }

    /// Dump `database` and store it as a new backup file.
    ///
    /// Nothing is written if introspection fails.
    pub async fn create_backup(&self, database: &str) -> VaultResult<BackupDescriptor> {
        tracing::info!(database = %database, "Creating backup");

        let tables = {
            let mut session = self.source.checkout().await?;
            introspect_database(&mut session, database).await?
        };

        let document = dump::serialize(database, &tables, Utc::now());
        let descriptor = self.repository.save(database, &document).await?;

        tracing::info!(
            database = %database,
            filename = %descriptor.filename,
            tables = tables.len(),
            size_bytes = descriptor.size_bytes,
            "Backup created"
        );
        Ok(descriptor)
    }

    pub async fn list_backups(&self) -> VaultResult<Vec<BackupDescriptor>> {
        self.repository.list().await
    }

    pub async fn delete_backup(&self, filename: &str) -> VaultResult<()> {
        self.repository.delete(filename).await
    }

    /// Replace the contents of the database named in `filename` with the
    /// backup.
    ///
    /// The file is read and checked before a connection is checked out, so a
    /// missing backup never touches the database. System schemas are never
    /// restored into, and a dump whose `USE` statement selects a different
    /// database than the file name is rejected.
    pub async fn restore_backup(&self, filename: &str) -> VaultResult<RestoreSummary> {
        let name = BackupFileName::parse(filename)?;
        let rejected = |reason: String| VaultError::InvalidFileName {
            filename: name.to_string(),
            reason,
        };
        if is_system_schema(name.database()) {
            return Err(rejected(format!(
                "refusing to restore into system schema '{}'",
                name.database()
            )));
        }

        let document = self.repository.read(name.as_str()).await?;
        let statements = split_statements(&document, self.split_mode);
        if let Some(target) =
            dump::target_database(&statements).filter(|target| target != name.database())
        {
            return Err(rejected(format!(
                "dump selects database '{}', file name names '{}'",
                target,
                name.database()
            )));
        }
        tracing::info!(
            filename = %name,
            database = %name.database(),
            statements = statements.len(),
            split_mode = %self.split_mode,
            "Restoring backup"
        );

        let mut session = self.source.checkout().await?;
        restore_statements(&mut session, name.database(), &statements).await
    }
}
