//! Destructive restore of a database from split dump statements.
//!
//! Phases, all on one session:
//!
//! 1. enumerate the tables currently in the target schema
//! 2. disable foreign key checks ([`ForeignKeyChecksGuard`])
//! 3. drop every enumerated table
//! 4. replay the statements, skipping the ones that fail
//! 5. re-enable foreign key checks, on every exit path of 3 and 4
//!
//! Replay is not transactional: statements applied before a failure stay
//! applied.

use serde::{Deserialize, Serialize};

use crate::dump::{DISABLE_FOREIGN_KEY_CHECKS, ENABLE_FOREIGN_KEY_CHECKS};
use crate::error::{VaultError, VaultResult};
use crate::session::SqlSession;
use crate::value::quote_ident;

/// Outcome of one restore invocation.
///
/// Only statements that succeeded are counted in the first three fields.
/// `success` stays `true` when individual statements were skipped; check
/// `statements_failed` for a partial restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreSummary {
    pub statements_executed: usize,
    /// Successful `CREATE TABLE` statements.
    pub tables_created: usize,
    /// Successful `INSERT` statements, one row each.
    pub rows_inserted: usize,
    pub statements_failed: usize,
    pub success: bool,
    /// Human-readable one-line summary.
    pub message: String,
}

/// Shape of a replayed statement, used for the summary tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    Insert,
    Other,
}

impl StatementKind {
    /// Classify by the leading keywords, ignoring case.
    ///
    /// ```
    /// use dumpvault_core::StatementKind;
    ///
    /// assert_eq!(StatementKind::classify("create table `t` (`id` int);"), StatementKind::CreateTable);
    /// assert_eq!(StatementKind::classify("INSERT INTO `t` (`id`) VALUES (1);"), StatementKind::Insert);
    /// assert_eq!(StatementKind::classify("DROP TABLE IF EXISTS `t`;"), StatementKind::Other);
    /// ```
    pub fn classify(statement: &str) -> Self {
        let words: Vec<String> = statement
            .split_whitespace()
            .take(2)
            .map(str::to_ascii_uppercase)
            .collect();
        match words.as_slice() {
            [first, second] if first == "CREATE" && second == "TABLE" => StatementKind::CreateTable,
            [first, ..] if first == "INSERT" => StatementKind::Insert,
            _ => StatementKind::Other,
        }
    }
}

/// Scoped "foreign key checks disabled" state of a session.
///
/// [`release`](Self::release) re-enables the checks. A guard dropped without
/// being released (panic, cancelled future) discards its session so the
/// connection never returns to the pool with checks still off.
pub struct ForeignKeyChecksGuard<'a, S: SqlSession + ?Sized> {
    session: &'a mut S,
    released: bool,
}

impl<'a, S: SqlSession + ?Sized> ForeignKeyChecksGuard<'a, S> {
    pub async fn disable(session: &'a mut S) -> VaultResult<Self> {
        session.execute(DISABLE_FOREIGN_KEY_CHECKS).await?;
        Ok(Self {
            session,
            released: false,
        })
    }

    pub fn session(&mut self) -> &mut S {
        self.session
    }

    /// Re-enable foreign key checks.
    ///
    /// On failure the session is discarded and [`VaultError::Cleanup`] is
    /// returned.
    pub async fn release(mut self) -> VaultResult<()> {
        let result = self.session.execute(ENABLE_FOREIGN_KEY_CHECKS).await;
        self.released = true;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.session.discard();
                Err(VaultError::Cleanup {
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl<S: SqlSession + ?Sized> Drop for ForeignKeyChecksGuard<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Foreign key checks guard dropped without release, discarding connection");
            self.session.discard();
        }
    }
}

/// Replace the contents of `database` with `statements`.
pub async fn restore_statements<S>(
    session: &mut S,
    database: &str,
    statements: &[String],
) -> VaultResult<RestoreSummary>
where
    S: SqlSession + ?Sized,
{
    let existing = session.existing_tables(database).await?;
    tracing::info!(
        database = %database,
        existing_tables = existing.len(),
        statements = statements.len(),
        "Starting restore"
    );

    let mut guard = ForeignKeyChecksGuard::disable(session).await?;
    let outcome = replace_contents(guard.session(), database, &existing, statements).await;

    if let Err(e) = guard.release().await {
        tracing::warn!(database = %database, error = %e, "Cleanup after restore failed");
    }

    outcome
}

async fn replace_contents<S>(
    session: &mut S,
    database: &str,
    existing: &[String],
    statements: &[String],
) -> VaultResult<RestoreSummary>
where
    S: SqlSession + ?Sized,
{
    let db = quote_ident(database);
    for table in existing {
        session
            .execute(&format!("DROP TABLE IF EXISTS {}.{}", db, quote_ident(table)))
            .await?;
        tracing::debug!(database = %database, table = %table, "Dropped table");
    }
    session
        .execute(&format!("CREATE DATABASE IF NOT EXISTS {}", db))
        .await?;
    session.execute(&format!("USE {}", db)).await?;

    let mut summary = RestoreSummary {
        statements_executed: 0,
        tables_created: 0,
        rows_inserted: 0,
        statements_failed: 0,
        success: true,
        message: String::new(),
    };

    for (index, statement) in statements.iter().enumerate() {
        match session.execute(statement).await {
            Ok(_) => {
                summary.statements_executed += 1;
                match StatementKind::classify(statement) {
                    StatementKind::CreateTable => summary.tables_created += 1,
                    StatementKind::Insert => summary.rows_inserted += 1,
                    StatementKind::Other => {}
                }
            }
            Err(e) => {
                summary.statements_failed += 1;
                let error = match e {
                    VaultError::Statement { .. } => e,
                    other => VaultError::Statement {
                        statement: statement.clone(),
                        reason: other.to_string(),
                    },
                };
                tracing::warn!(
                    database = %database,
                    index,
                    error = %error,
                    "Skipping failed statement"
                );
            }
        }
    }

    summary.message = if summary.statements_failed == 0 {
        format!(
            "Restored {} tables and {} rows from {} statements",
            summary.tables_created, summary.rows_inserted, summary.statements_executed
        )
    } else {
        format!(
            "Restored {} tables and {} rows from {} statements; {} statements failed and were skipped",
            summary.tables_created,
            summary.rows_inserted,
            summary.statements_executed,
            summary.statements_failed
        )
    };
    tracing::info!(
        database = %database,
        tables_created = summary.tables_created,
        rows_inserted = summary.rows_inserted,
        statements_failed = summary.statements_failed,
        "Restore finished"
    );

    Ok(summary)
}
