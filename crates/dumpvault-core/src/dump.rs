//! Dump document serialization.
//!
//! A dump is plain MySQL text:
//!
//! ```text
//! -- Database Backup: shop
//! -- Generated: 2024-01-15T10:30:45+00:00
//!
//! CREATE DATABASE IF NOT EXISTS `shop`;
//! USE `shop`;
//!
//! SET FOREIGN_KEY_CHECKS=0;
//!
//! -- Table: customers
//! DROP TABLE IF EXISTS `customers`;
//! CREATE TABLE `customers` (...);
//! INSERT INTO `customers` (`id`, `name`) VALUES (1, 'Alice');
//!
//! SET FOREIGN_KEY_CHECKS=1;
//! ```
//!
//! Every statement ends with `;` followed by a newline.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write as _;

use crate::value::{Row, TableDump, quote_ident};

pub const DISABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS=0;";
pub const ENABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS=1;";

/// Serialize `tables` of `database` into one dump document.
pub fn serialize(database: &str, tables: &[TableDump], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let db = quote_ident(database);

    // Writing to a String cannot fail.
    let _ = writeln!(out, "-- Database Backup: {}", database);
    let _ = writeln!(
        out,
        "-- Generated: {}",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, false)
    );
    out.push('\n');
    let _ = writeln!(out, "CREATE DATABASE IF NOT EXISTS {};", db);
    let _ = writeln!(out, "USE {};", db);
    out.push('\n');
    out.push_str(DISABLE_FOREIGN_KEY_CHECKS);
    out.push_str("\n\n");

    for table in tables {
        write_table(&mut out, table);
    }

    out.push_str(ENABLE_FOREIGN_KEY_CHECKS);
    out.push('\n');
    out
}

fn write_table(out: &mut String, table: &TableDump) {
    let name = quote_ident(&table.name);
    let _ = writeln!(out, "-- Table: {}", table.name);
    let _ = writeln!(out, "DROP TABLE IF EXISTS {};", name);
    let _ = writeln!(out, "{};", table.create_statement);

    for row in &table.rows {
        let _ = writeln!(out, "{}", insert_statement(&name, row));
    }
    out.push('\n');
}

/// Single-row `INSERT` listing every column of `row`.
pub fn insert_statement(quoted_table: &str, row: &Row) -> String {
    let columns = row.columns().map(quote_ident).collect::<Vec<_>>().join(", ");
    let values = row
        .values()
        .map(|value| value.to_sql_literal())
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) VALUES ({});", quoted_table, columns, values)
}

/// Database selected by the first `USE` statement among `statements`.
///
/// Returns `None` when no statement selects a database.
pub fn target_database(statements: &[String]) -> Option<String> {
    statements.iter().find_map(|statement| {
        let statement = statement.trim().trim_end_matches(';').trim_end();
        let keyword = statement.get(..3)?;
        if !keyword.eq_ignore_ascii_case("USE") {
            return None;
        }
        let rest = statement.get(3..)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let ident = rest.trim();
        match ident.strip_prefix('`').and_then(|i| i.strip_suffix('`')) {
            Some(quoted) => Some(quoted.replace("``", "`")),
            None => Some(ident.to_string()),
        }
    })
}
