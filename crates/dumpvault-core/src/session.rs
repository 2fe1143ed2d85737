//! Connection-level seams between the engine and a concrete database driver.
//!
//! A [`SessionSource`] hands out [`SqlSession`]s, each wrapping one connection
//! checked out from a shared pool. Dropping a session returns its connection
//! to the pool, unless [`SqlSession::discard`] was called first.

use async_trait::async_trait;

use crate::error::VaultResult;
use crate::value::Row;

/// Schemas that belong to the server itself and are never backed up.
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "performance_schema", "mysql", "sys"];

/// Whether `database` is one of the built-in system schemas.
pub fn is_system_schema(database: &str) -> bool {
    SYSTEM_SCHEMAS
        .iter()
        .any(|schema| schema.eq_ignore_ascii_case(database))
}

/// One checked-out database connection.
#[async_trait]
pub trait SqlSession: Send {
    /// Names of all user databases, system schemas excluded.
    async fn list_databases(&mut self) -> VaultResult<Vec<String>>;

    /// Base tables of `database` in the engine's enumeration order.
    async fn tables_of(&mut self, database: &str) -> VaultResult<Vec<String>>;

    /// Base tables currently present in `database`, read from the
    /// information schema. A missing database yields an empty list.
    async fn existing_tables(&mut self, database: &str) -> VaultResult<Vec<String>>;

    /// Verbatim creation statement reported by the engine for `table`.
    async fn schema_of(&mut self, database: &str, table: &str) -> VaultResult<String>;

    /// Every row of `table`, values typed by column.
    async fn rows_of(&mut self, database: &str, table: &str) -> VaultResult<Vec<Row>>;

    /// Execute a single statement, returning the affected row count.
    async fn execute(&mut self, sql: &str) -> VaultResult<u64>;

    /// Mark the connection as unfit for reuse; it is closed on drop instead of
    /// being returned to the pool.
    fn discard(&mut self);
}

/// Source of sessions, typically a connection pool.
#[async_trait]
pub trait SessionSource: Send + Sync {
    type Session: SqlSession;

    /// Check out a session for the duration of one operation.
    async fn checkout(&self) -> VaultResult<Self::Session>;
}
