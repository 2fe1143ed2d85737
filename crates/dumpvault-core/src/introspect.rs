//! Collects schema and rows for every table of a database.

use crate::error::{VaultError, VaultResult};
use crate::session::{SqlSession, is_system_schema};
use crate::value::TableDump;

/// Read every table of `database`, in enumeration order, through `session`.
///
/// Fails if the database is a system schema or if any table cannot be read;
/// no partial result is returned.
pub async fn introspect_database<S>(session: &mut S, database: &str) -> VaultResult<Vec<TableDump>>
where
    S: SqlSession + ?Sized,
{
    if is_system_schema(database) {
        return Err(VaultError::introspection(
            database,
            "system schemas cannot be backed up",
        ));
    }

    let tables = session.tables_of(database).await?;
    tracing::debug!(database = %database, tables = tables.len(), "Enumerated tables");

    let mut dumps = Vec::with_capacity(tables.len());
    for table in tables {
        let create_statement = session.schema_of(database, &table).await?;
        let rows = session.rows_of(database, &table).await?;
        tracing::debug!(
            database = %database,
            table = %table,
            rows = rows.len(),
            "Introspected table"
        );
        dumps.push(TableDump {
            name: table,
            create_statement: create_statement.trim_end().trim_end_matches(';').to_string(),
            rows,
        });
    }

    Ok(dumps)
}
