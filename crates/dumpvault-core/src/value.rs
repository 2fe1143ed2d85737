//! Typed column values and their SQL literal encoding.

use chrono::NaiveDateTime;
use std::fmt;

/// Format used for temporal literals. No zone, no fractional seconds.
pub const TEMPORAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single column value read from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    /// Exact numeric kept in the engine's own textual rendering.
    Decimal(String),
    Temporal(NaiveDateTime),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Whether the value is emitted as an unquoted numeric literal.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlValue::Integer(_) | SqlValue::Unsigned(_) | SqlValue::Float(_) | SqlValue::Decimal(_)
        )
    }

    /// Encode the value as a MySQL literal.
    ///
    /// Text is escaped by doubling every backslash first and only then
    /// prefixing every single quote with a backslash. Bytes that are not
    /// valid UTF-8 become a hexadecimal literal.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use dumpvault_core::SqlValue;
    ///
    /// assert_eq!(SqlValue::Null.to_sql_literal(), "NULL");
    /// assert_eq!(SqlValue::Decimal("12.50".into()).to_sql_literal(), "12.50");
    /// assert_eq!(SqlValue::from(r"O'Brien\").to_sql_literal(), r"'O\'Brien\\'");
    ///
    /// let placed = NaiveDate::from_ymd_opt(2024, 1, 15)
    ///     .and_then(|d| d.and_hms_milli_opt(9, 5, 7, 250))
    ///     .unwrap();
    /// assert_eq!(SqlValue::Temporal(placed).to_sql_literal(), "'2024-01-15 09:05:07'");
    /// assert_eq!(SqlValue::Bytes(vec![0x00, 0xFF]).to_sql_literal(), "0x00FF");
    /// ```
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(v) => v.to_string(),
            SqlValue::Unsigned(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Decimal(v) => v.clone(),
            SqlValue::Temporal(ts) => format!("'{}'", ts.format(TEMPORAL_FORMAT)),
            SqlValue::Text(text) => quote_text(text),
            SqlValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => quote_text(text),
                Err(_) => hex_literal(bytes),
            },
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Temporal(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

fn quote_text(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// One table row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Everything introspected about one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDump {
    pub name: String,
    /// Verbatim `SHOW CREATE TABLE` output, without a trailing semicolon.
    pub create_statement: String,
    pub rows: Vec<Row>,
}
