//! One pooled connection driving the engine's queries.

use async_trait::async_trait;
use dumpvault_core::session::is_system_schema;
use dumpvault_core::value::quote_ident;
use dumpvault_core::{Row, SqlSession, VaultError, VaultResult};
use sqlx::mysql::{MySql, MySqlConnection, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Executor, Row as _, TypeInfo};

use crate::decode::decode_value;
use crate::error;

const EXISTING_TABLES_SQL: &str = "SELECT TABLE_NAME FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME";

/// A checked-out connection.
///
/// Statements run over the text protocol so session commands such as `USE`
/// and `SET` behave as in an interactive client.
pub struct MySqlSession {
    connection: Option<PoolConnection<MySql>>,
    discarded: bool,
}

impl MySqlSession {
    pub(crate) fn new(connection: PoolConnection<MySql>) -> Self {
        Self {
            connection: Some(connection),
            discarded: false,
        }
    }

    fn connection(&mut self) -> VaultResult<&mut MySqlConnection> {
        self.connection
            .as_deref_mut()
            .ok_or_else(|| VaultError::Connection {
                reason: "session connection was already released".to_string(),
            })
    }

    async fn fetch_raw(&mut self, sql: &str) -> Result<Vec<MySqlRow>, sqlx::Error> {
        let connection = match self.connection.as_deref_mut() {
            Some(connection) => connection,
            None => return Err(sqlx::Error::PoolClosed),
        };
        connection.fetch_all(sqlx::raw_sql(sql)).await
    }
}

impl Drop for MySqlSession {
    fn drop(&mut self) {
        if self.discarded {
            if let Some(connection) = self.connection.take() {
                // Detached connections close instead of returning to the pool.
                drop(connection.detach());
                tracing::debug!("Closed discarded MySQL connection");
            }
        }
    }
}

/// Column `index` of `row` as text, whatever the reported type.
fn text_column(row: &MySqlRow, index: usize) -> Result<String, sqlx::Error> {
    let raw: Option<Vec<u8>> = row.try_get_unchecked(index)?;
    Ok(raw
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default())
}

fn decode_row(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let type_name = column.type_info().name().to_string();
        let raw: Option<Vec<u8>> = row.try_get_unchecked(index)?;
        decoded.push(column.name(), decode_value(&type_name, raw.as_deref()));
    }
    Ok(decoded)
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn list_databases(&mut self) -> VaultResult<Vec<String>> {
        let rows = self
            .fetch_raw("SHOW DATABASES")
            .await
            .map_err(error::connection)?;
        let mut databases = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = text_column(row, 0).map_err(error::connection)?;
            if !is_system_schema(&name) {
                databases.push(name);
            }
        }
        Ok(databases)
    }

    async fn tables_of(&mut self, database: &str) -> VaultResult<Vec<String>> {
        let sql = format!(
            "SHOW FULL TABLES FROM {} WHERE Table_type = 'BASE TABLE'",
            quote_ident(database)
        );
        let rows = self
            .fetch_raw(&sql)
            .await
            .map_err(|e| error::introspection(database, e))?;
        rows.iter()
            .map(|row| text_column(row, 0).map_err(|e| error::introspection(database, e)))
            .collect()
    }

    async fn existing_tables(&mut self, database: &str) -> VaultResult<Vec<String>> {
        let connection = self.connection()?;
        let rows = connection
            .fetch_all(sqlx::query(EXISTING_TABLES_SQL).bind(database))
            .await
            .map_err(|e| error::introspection(database, e))?;
        rows.iter()
            .map(|row| text_column(row, 0).map_err(|e| error::introspection(database, e)))
            .collect()
    }

    async fn schema_of(&mut self, database: &str, table: &str) -> VaultResult<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_ident(database),
            quote_ident(table)
        );
        let rows = self
            .fetch_raw(&sql)
            .await
            .map_err(|e| error::table_introspection(database, table, e))?;
        let row = rows.first().ok_or_else(|| {
            VaultError::table_introspection(database, table, "no creation statement returned")
        })?;
        text_column(row, 1).map_err(|e| error::table_introspection(database, table, e))
    }

    async fn rows_of(&mut self, database: &str, table: &str) -> VaultResult<Vec<Row>> {
        let sql = format!("SELECT * FROM {}.{}", quote_ident(database), quote_ident(table));
        let rows = self
            .fetch_raw(&sql)
            .await
            .map_err(|e| error::table_introspection(database, table, e))?;
        tracing::debug!(database = %database, table = %table, rows = rows.len(), "Fetched rows");
        rows.iter()
            .map(|row| decode_row(row).map_err(|e| error::table_introspection(database, table, e)))
            .collect()
    }

    async fn execute(&mut self, sql: &str) -> VaultResult<u64> {
        let connection = self.connection()?;
        let result = connection
            .execute(sqlx::raw_sql(sql))
            .await
            .map_err(|e| VaultError::Statement {
                statement: sql.to_string(),
                reason: error::describe(&e),
            })?;
        Ok(result.rows_affected())
    }

    fn discard(&mut self) {
        self.discarded = true;
    }
}
