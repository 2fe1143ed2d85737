//! # Mock Database
//!
//! An in-memory stand-in for a MySQL server that understands exactly the
//! statement shapes a dump contains: `SET FOREIGN_KEY_CHECKS`,
//! `CREATE DATABASE`, `USE`, `DROP TABLE`, `CREATE TABLE` and single-row
//! `INSERT`. Anything else is rejected like a syntax error.
//!
//! Column types declared in `CREATE TABLE` drive how inserted literals are
//! stored, so values read back through [`SqlSession::rows_of`] have the same
//! shape a real driver would produce.
//!
//! Every executed statement is logged, and failures can be injected per
//! statement or per checkout.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dumpvault_core::session::is_system_schema;
use dumpvault_core::value::TEMPORAL_FORMAT;
use dumpvault_core::{Row, SessionSource, SqlSession, SqlValue, VaultError, VaultResult};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Signed,
    Unsigned,
    Float,
    Decimal,
    Temporal,
    Date,
    Binary,
    Text,
}

impl ColumnType {
    fn from_definition(definition: &str) -> Self {
        let lowered = definition.to_ascii_lowercase();
        let base = lowered
            .split(|c: char| c.is_whitespace() || c == '(')
            .find(|part| !part.is_empty())
            .unwrap_or("");
        match base {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
                if lowered.contains("unsigned") {
                    ColumnType::Unsigned
                } else {
                    ColumnType::Signed
                }
            }
            "float" | "double" | "real" => ColumnType::Float,
            "decimal" | "numeric" => ColumnType::Decimal,
            "datetime" | "timestamp" => ColumnType::Temporal,
            "date" => ColumnType::Date,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
                ColumnType::Binary
            }
            _ => ColumnType::Text,
        }
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    kind: ColumnType,
}

#[derive(Debug, Clone)]
struct Table {
    name: String,
    create_statement: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct Schema {
    name: String,
    tables: Vec<Table>,
}

#[derive(Debug, Default)]
struct State {
    schemas: Vec<Schema>,
    executed: Vec<String>,
    failing_patterns: Vec<String>,
    fail_checkout: bool,
    checkouts: usize,
    active_sessions: usize,
    discarded_sessions: usize,
    returned_with_checks_disabled: usize,
}

impl State {
    fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.iter_mut().find(|s| s.name == name)
    }

    fn ensure_schema(&mut self, name: &str) -> &mut Schema {
        if self.schema(name).is_none() {
            self.schemas.push(Schema {
                name: name.to_string(),
                tables: Vec::new(),
            });
        }
        let index = self
            .schemas
            .iter()
            .position(|s| s.name == name)
            .unwrap_or(self.schemas.len() - 1);
        &mut self.schemas[index]
    }

    fn table_mut(&mut self, database: &str, table: &str) -> VaultResult<&mut Table> {
        self.schema_mut(database)
            .ok_or_else(|| unknown_database(database))?
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .ok_or_else(|| unknown_table(database, table))
    }
}

fn engine_error(reason: impl Into<String>) -> VaultError {
    VaultError::Connection {
        reason: reason.into(),
    }
}

fn unknown_database(database: &str) -> VaultError {
    VaultError::introspection(database, format!("Unknown database '{}'", database))
}

fn unknown_table(database: &str, table: &str) -> VaultError {
    VaultError::table_introspection(
        database,
        table,
        format!("Table '{}.{}' doesn't exist", database, table),
    )
}

/// Shared in-memory server. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<State>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test must not hide the state from later assertions.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create `database` if missing.
    pub fn create_database(&self, database: &str) {
        self.lock().ensure_schema(database);
    }

    /// Create a table from a `CREATE TABLE` statement.
    pub fn create_table(&self, database: &str, create_statement: &str) -> VaultResult<()> {
        let mut state = self.lock();
        create_table(&mut state, database, create_statement)
    }

    /// Append a row. Values are stored as given.
    pub fn insert_row(&self, database: &str, table: &str, row: Row) -> VaultResult<()> {
        let mut state = self.lock();
        state.table_mut(database, table)?.rows.push(row);
        Ok(())
    }

    pub fn database_names(&self) -> Vec<String> {
        self.lock().schemas.iter().map(|s| s.name.clone()).collect()
    }

    pub fn table_names(&self, database: &str) -> Vec<String> {
        self.lock()
            .schema(database)
            .map(|s| s.tables.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn rows(&self, database: &str, table: &str) -> Vec<Row> {
        self.lock()
            .schema(database)
            .and_then(|s| s.tables.iter().find(|t| t.name == table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self, database: &str, table: &str) -> usize {
        self.rows(database, table).len()
    }

    /// Every statement executed through any session, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn clear_log(&self) {
        self.lock().executed.clear();
    }

    /// Make every statement containing `pattern` fail.
    pub fn fail_statements_containing(&self, pattern: impl Into<String>) {
        self.lock().failing_patterns.push(pattern.into());
    }

    /// Make every checkout fail like an exhausted pool.
    pub fn fail_checkouts(&self, fail: bool) {
        self.lock().fail_checkout = fail;
    }

    pub fn checkouts(&self) -> usize {
        self.lock().checkouts
    }

    /// Sessions currently checked out.
    pub fn active_sessions(&self) -> usize {
        self.lock().active_sessions
    }

    /// Sessions closed through [`SqlSession::discard`].
    pub fn discarded_sessions(&self) -> usize {
        self.lock().discarded_sessions
    }

    /// Sessions returned to the pool while foreign key checks were off.
    pub fn sessions_returned_with_checks_disabled(&self) -> usize {
        self.lock().returned_with_checks_disabled
    }
}

#[async_trait]
impl SessionSource for MockDatabase {
    type Session = MockSession;

    async fn checkout(&self) -> VaultResult<MockSession> {
        let mut state = self.lock();
        if state.fail_checkout {
            return Err(VaultError::Connection {
                reason: "Connection pool exhausted".to_string(),
            });
        }
        state.checkouts += 1;
        state.active_sessions += 1;
        Ok(MockSession {
            database: self.clone(),
            current_schema: None,
            foreign_key_checks: true,
            discarded: false,
        })
    }
}

/// One checked-out session of a [`MockDatabase`].
#[derive(Debug)]
pub struct MockSession {
    database: MockDatabase,
    current_schema: Option<String>,
    foreign_key_checks: bool,
    discarded: bool,
}

impl MockSession {
    pub fn foreign_key_checks(&self) -> bool {
        self.foreign_key_checks
    }

    pub fn current_schema(&self) -> Option<&str> {
        self.current_schema.as_deref()
    }

    fn run(&mut self, state: &mut State, sql: &str) -> VaultResult<u64> {
        let statement = sql.trim().trim_end_matches(';').trim();
        let upper = statement.to_ascii_uppercase();

        if let Some(value) = upper.strip_prefix("SET FOREIGN_KEY_CHECKS") {
            match value.trim().trim_start_matches('=').trim() {
                "0" => self.foreign_key_checks = false,
                "1" => self.foreign_key_checks = true,
                other => return Err(engine_error(format!("Invalid FOREIGN_KEY_CHECKS value '{}'", other))),
            }
            return Ok(0);
        }

        if upper.starts_with("CREATE DATABASE") {
            let rest = strip_keywords(statement, &["CREATE", "DATABASE", "IF", "NOT", "EXISTS"]);
            let (name, _) = parse_identifier(rest)?;
            state.ensure_schema(&name);
            return Ok(1);
        }

        if upper.starts_with("USE ") {
            let (name, _) = parse_identifier(statement[4..].trim())?;
            if state.schema(&name).is_none() {
                return Err(unknown_database(&name));
            }
            self.current_schema = Some(name);
            return Ok(0);
        }

        if upper.starts_with("DROP TABLE") {
            let if_exists = upper.starts_with("DROP TABLE IF EXISTS");
            let rest = strip_keywords(statement, &["DROP", "TABLE", "IF", "EXISTS"]);
            let (database, table) = self.qualified_name(rest)?;
            let schema = state.schema_mut(&database);
            let position = schema
                .as_ref()
                .and_then(|s| s.tables.iter().position(|t| t.name == table));
            return match (schema, position) {
                (Some(schema), Some(index)) => {
                    schema.tables.remove(index);
                    Ok(0)
                }
                _ if if_exists => Ok(0),
                _ => Err(unknown_table(&database, &table)),
            };
        }

        if upper.starts_with("CREATE TABLE") {
            let database = self.require_schema()?;
            create_table(state, &database, statement)?;
            return Ok(0);
        }

        if upper.starts_with("INSERT INTO") {
            let database = self.require_schema()?;
            insert(state, &database, statement)?;
            return Ok(1);
        }

        Err(engine_error(format!(
            "You have an error in your SQL syntax near '{}'",
            statement.chars().take(40).collect::<String>()
        )))
    }

    fn require_schema(&self) -> VaultResult<String> {
        self.current_schema
            .clone()
            .ok_or_else(|| engine_error("No database selected"))
    }

    fn qualified_name(&self, text: &str) -> VaultResult<(String, String)> {
        let (first, rest) = parse_identifier(text)?;
        if let Some(rest) = rest.strip_prefix('.') {
            let (second, _) = parse_identifier(rest)?;
            Ok((first, second))
        } else {
            Ok((self.require_schema()?, first))
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        let mut state = self.database.lock();
        state.active_sessions = state.active_sessions.saturating_sub(1);
        if self.discarded {
            state.discarded_sessions += 1;
        } else if !self.foreign_key_checks {
            state.returned_with_checks_disabled += 1;
        }
    }
}

#[async_trait]
impl SqlSession for MockSession {
    async fn list_databases(&mut self) -> VaultResult<Vec<String>> {
        let state = self.database.lock();
        Ok(state
            .schemas
            .iter()
            .map(|s| s.name.clone())
            .filter(|name| !is_system_schema(name))
            .collect())
    }

    async fn tables_of(&mut self, database: &str) -> VaultResult<Vec<String>> {
        let state = self.database.lock();
        let schema = state
            .schema(database)
            .ok_or_else(|| unknown_database(database))?;
        Ok(schema.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn existing_tables(&mut self, database: &str) -> VaultResult<Vec<String>> {
        let state = self.database.lock();
        Ok(state
            .schema(database)
            .map(|s| s.tables.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn schema_of(&mut self, database: &str, table: &str) -> VaultResult<String> {
        let state = self.database.lock();
        state
            .schema(database)
            .and_then(|s| s.tables.iter().find(|t| t.name == table))
            .map(|t| t.create_statement.clone())
            .ok_or_else(|| unknown_table(database, table))
    }

    async fn rows_of(&mut self, database: &str, table: &str) -> VaultResult<Vec<Row>> {
        let state = self.database.lock();
        state
            .schema(database)
            .and_then(|s| s.tables.iter().find(|t| t.name == table))
            .map(|t| t.rows.clone())
            .ok_or_else(|| unknown_table(database, table))
    }

    async fn execute(&mut self, sql: &str) -> VaultResult<u64> {
        let database = self.database.clone();
        let mut state = database.lock();
        state.executed.push(sql.to_string());
        if let Some(pattern) = state.failing_patterns.iter().find(|p| sql.contains(p.as_str())) {
            return Err(engine_error(format!("Injected failure for '{}'", pattern)));
        }
        self.run(&mut state, sql)
    }

    fn discard(&mut self) {
        self.discarded = true;
    }
}

fn strip_keywords<'a>(statement: &'a str, keywords: &[&str]) -> &'a str {
    let mut rest = statement.trim_start();
    for keyword in keywords {
        let candidate = rest.trim_start();
        let matches = candidate
            .get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword));
        if matches
            && candidate[keyword.len()..]
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace())
        {
            rest = &candidate[keyword.len()..];
        }
    }
    rest.trim_start()
}

/// Parse a back-quoted or bare identifier, returning it and the remaining text.
fn parse_identifier(text: &str) -> VaultResult<(String, &str)> {
    let text = text.trim_start();
    if let Some(body) = text.strip_prefix('`') {
        let mut name = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            if c == '`' {
                if matches!(chars.peek(), Some((_, '`'))) {
                    chars.next();
                    name.push('`');
                } else {
                    return Ok((name, &body[index + 1..]));
                }
            } else {
                name.push(c);
            }
        }
        Err(engine_error("Unterminated quoted identifier"))
    } else {
        let end = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(text.len());
        if end == 0 {
            return Err(engine_error("Expected identifier"));
        }
        Ok((text[..end].to_string(), &text[end..]))
    }
}

/// Split the body of a parenthesized list on top-level commas.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' && q != '`' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Body between the first `(` of `text` and its matching `)`, plus the rest.
fn parenthesized(text: &str) -> VaultResult<(&str, &str)> {
    let start = text
        .find('(')
        .ok_or_else(|| engine_error("Expected '('"))?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, c) in text[start..].char_indices() {
        let index = start + index;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&text[start + 1..index], &text[index + 1..]));
                }
            }
            _ => {}
        }
    }
    Err(engine_error("Unbalanced parentheses"))
}

fn create_table(state: &mut State, database: &str, statement: &str) -> VaultResult<()> {
    let rest = strip_keywords(statement, &["CREATE", "TABLE"]);
    let (name, after_name) = parse_identifier(rest)?;
    let (body, _) = parenthesized(after_name)?;

    let columns = split_top_level(body)
        .into_iter()
        .filter(|part| part.starts_with('`'))
        .map(|part| {
            let (column, definition) = parse_identifier(&part)?;
            Ok(Column {
                name: column,
                kind: ColumnType::from_definition(definition),
            })
        })
        .collect::<VaultResult<Vec<_>>>()?;

    let schema = state
        .schema_mut(database)
        .ok_or_else(|| unknown_database(database))?;
    if schema.tables.iter().any(|t| t.name == name) {
        return Err(engine_error(format!("Table '{}' already exists", name)));
    }
    schema.tables.push(Table {
        name,
        create_statement: statement.trim().trim_end_matches(';').to_string(),
        columns,
        rows: Vec::new(),
    });
    Ok(())
}

fn insert(state: &mut State, database: &str, statement: &str) -> VaultResult<()> {
    let rest = strip_keywords(statement, &["INSERT", "INTO"]);
    let (table_name, after_name) = parse_identifier(rest)?;
    let (column_list, after_columns) = parenthesized(after_name)?;
    let after_values = strip_keywords(after_columns, &["VALUES"]);
    if !after_columns.trim_start().to_ascii_uppercase().starts_with("VALUES") {
        return Err(engine_error("Expected VALUES"));
    }
    let (value_list, trailing) = parenthesized(after_values)?;
    if !trailing.trim().is_empty() {
        return Err(engine_error("Only single-row inserts are supported"));
    }

    let names = split_top_level(column_list)
        .iter()
        .map(|part| parse_identifier(part).map(|(name, _)| name))
        .collect::<VaultResult<Vec<_>>>()?;
    let literals = split_top_level(value_list);
    if names.len() != literals.len() {
        return Err(engine_error("Column count doesn't match value count"));
    }

    let table = state.table_mut(database, &table_name)?;
    let mut row = Row::new();
    for (name, literal) in names.iter().zip(&literals) {
        let column = table
            .columns
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| engine_error(format!("Unknown column '{}'", name)))?;
        row.push(name.clone(), coerce(parse_literal(literal)?, column.kind)?);
    }
    table.rows.push(row);
    Ok(())
}

#[derive(Debug)]
enum Literal {
    Null,
    Number(String),
    Text(String),
    Hex(Vec<u8>),
}

fn parse_literal(text: &str) -> VaultResult<Literal> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("NULL") {
        return Ok(Literal::Null);
    }
    if let Some(hex) = text.strip_prefix("0x") {
        if !hex.is_ascii() {
            return Err(engine_error("Invalid hex literal"));
        }
        if hex.len() % 2 != 0 {
            return Err(engine_error("Odd-length hex literal"));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| engine_error("Invalid hex literal"))?;
        return Ok(Literal::Hex(bytes));
    }
    if let Some(body) = text.strip_prefix('\'') {
        return unescape(body).map(Literal::Text);
    }
    let is_number = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    if is_number {
        return Ok(Literal::Number(text.to_string()));
    }
    Err(engine_error(format!("Unexpected literal '{}'", text)))
}

/// Decode a single-quoted MySQL string body (opening quote already removed).
fn unescape(body: &str) -> VaultResult<String> {
    let mut out = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| engine_error("Unterminated string literal"))?;
                match escaped {
                    '0' => out.push('\0'),
                    'b' => out.push('\u{8}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'Z' => out.push('\u{1a}'),
                    '%' | '_' => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    other => out.push(other),
                }
            }
            '\'' => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else if chars.next().is_none() {
                    return Ok(out);
                } else {
                    return Err(engine_error("Unexpected text after string literal"));
                }
            }
            other => out.push(other),
        }
    }
    Err(engine_error("Unterminated string literal"))
}

fn coerce(literal: Literal, kind: ColumnType) -> VaultResult<SqlValue> {
    let invalid = |value: &str| engine_error(format!("Incorrect value '{}' for {:?} column", value, kind));

    Ok(match (literal, kind) {
        (Literal::Null, _) => SqlValue::Null,
        (Literal::Hex(bytes), ColumnType::Binary) => SqlValue::Bytes(bytes),
        (Literal::Hex(bytes), _) => SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        (Literal::Number(n) | Literal::Text(n), ColumnType::Signed) => {
            SqlValue::Integer(n.trim().parse().map_err(|_| invalid(&n))?)
        }
        (Literal::Number(n) | Literal::Text(n), ColumnType::Unsigned) => {
            SqlValue::Unsigned(n.trim().parse().map_err(|_| invalid(&n))?)
        }
        (Literal::Number(n) | Literal::Text(n), ColumnType::Float) => {
            SqlValue::Float(n.trim().parse().map_err(|_| invalid(&n))?)
        }
        (Literal::Number(n) | Literal::Text(n), ColumnType::Decimal) => SqlValue::Decimal(n),
        (Literal::Text(t), ColumnType::Temporal) => SqlValue::Temporal(
            NaiveDateTime::parse_from_str(&t, TEMPORAL_FORMAT).map_err(|_| invalid(&t))?,
        ),
        (Literal::Text(t), ColumnType::Date) => {
            let date = NaiveDate::parse_from_str(&t, "%Y-%m-%d")
                .or_else(|_| NaiveDateTime::parse_from_str(&t, TEMPORAL_FORMAT).map(|ts| ts.date()))
                .map_err(|_| invalid(&t))?;
            SqlValue::Temporal(date.and_time(chrono::NaiveTime::MIN))
        }
        (Literal::Text(t), ColumnType::Binary) => SqlValue::Bytes(t.into_bytes()),
        (Literal::Text(t), ColumnType::Text) | (Literal::Number(t), ColumnType::Text) => {
            SqlValue::Text(t)
        }
        (Literal::Number(n), ColumnType::Temporal | ColumnType::Date | ColumnType::Binary) => {
            return Err(invalid(&n));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MockDatabase {
        let db = MockDatabase::new();
        db.create_database("shop");
        db.create_table(
            "shop",
            "CREATE TABLE `customers` (\n  `id` int unsigned NOT NULL,\n  `name` varchar(64) DEFAULT NULL,\n  `since` datetime DEFAULT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB",
        )
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_coerces_by_column_type() {
        let db = seeded();
        let mut session = db.checkout().await.unwrap();
        session.execute("USE `shop`;").await.unwrap();
        session
            .execute("INSERT INTO `customers` (`id`, `name`, `since`) VALUES (7, 'O\\'Brien\\\\', '2024-01-15 09:05:07');")
            .await
            .unwrap();

        let rows = db.rows("shop", "customers");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&SqlValue::Unsigned(7)));
        assert_eq!(rows[0].get("name"), Some(&SqlValue::from("O'Brien\\")));
        assert!(matches!(rows[0].get("since"), Some(SqlValue::Temporal(_))));
    }

    #[tokio::test]
    async fn test_null_literal_is_not_text() {
        let db = seeded();
        let mut session = db.checkout().await.unwrap();
        session.execute("USE `shop`").await.unwrap();
        session
            .execute("INSERT INTO `customers` (`id`, `name`, `since`) VALUES (1, NULL, NULL)")
            .await
            .unwrap();
        assert_eq!(db.rows("shop", "customers")[0].get("name"), Some(&SqlValue::Null));
    }

    #[tokio::test]
    async fn test_malformed_statements_fail() {
        let db = seeded();
        let mut session = db.checkout().await.unwrap();
        session.execute("USE `shop`").await.unwrap();
        assert!(session.execute("INSERT INTO `customers` (`id`) VALUES (1, 2)").await.is_err());
        assert!(session.execute("INSERT INTO `customers` (`id`) VALUES ('oops)").await.is_err());
        assert!(session.execute("SELEC 1").await.is_err());
        assert!(session.execute("CREATE TABLE `customers` (`id` int)").await.is_err());
        assert_eq!(db.executed().len(), 5);
    }

    #[tokio::test]
    async fn test_drop_and_session_bookkeeping() {
        let db = seeded();
        {
            let mut session = db.checkout().await.unwrap();
            assert_eq!(db.active_sessions(), 1);
            session.execute("SET FOREIGN_KEY_CHECKS=0").await.unwrap();
            assert!(!session.foreign_key_checks());
            session
                .execute("DROP TABLE IF EXISTS `shop`.`customers`")
                .await
                .unwrap();
            session.execute("DROP TABLE IF EXISTS `shop`.`missing`").await.unwrap();
            assert!(session.execute("DROP TABLE `shop`.`missing`").await.is_err());
        }
        assert!(db.table_names("shop").is_empty());
        assert_eq!(db.active_sessions(), 0);
        assert_eq!(db.sessions_returned_with_checks_disabled(), 1);
    }

    #[tokio::test]
    async fn test_discarded_session_is_counted() {
        let db = MockDatabase::new();
        let mut session = db.checkout().await.unwrap();
        session.discard();
        drop(session);
        assert_eq!(db.discarded_sessions(), 1);
        assert_eq!(db.sessions_returned_with_checks_disabled(), 0);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let db = seeded();
        db.fail_statements_containing("`customers`");
        let mut session = db.checkout().await.unwrap();
        session.execute("USE `shop`").await.unwrap();
        assert!(session.execute("DROP TABLE IF EXISTS `customers`").await.is_err());
        assert_eq!(db.table_names("shop"), vec!["customers"]);

        db.fail_checkouts(true);
        assert!(matches!(db.checkout().await, Err(VaultError::Connection { .. })));
    }

    #[test]
    fn test_hex_literals() {
        assert!(matches!(parse_literal("0x00ff27"), Ok(Literal::Hex(bytes)) if bytes == vec![0x00, 0xff, 0x27]));
        assert!(parse_literal("0xaéb").is_err());
        assert!(parse_literal("0xé").is_err());
        assert!(parse_literal("0xabc").is_err());
    }

    #[test]
    fn test_unescape_mysql_sequences() {
        assert_eq!(unescape(r"a\nb\tc\\d\'e''f'").unwrap(), "a\nb\tc\\d'e'f");
        assert!(unescape("no end").is_err());
    }
}
