//! Text-protocol value decoding.
//!
//! Statements go over the text protocol, so every non-null value arrives as
//! the server's textual rendering. The column's reported type name decides
//! which [`SqlValue`] variant it becomes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use dumpvault_core::SqlValue;

/// Broad value class of a MySQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Signed,
    Unsigned,
    Float,
    Decimal,
    DateTime,
    Date,
    Binary,
    Text,
}

impl ValueClass {
    /// Classify a type name as reported by the driver, e.g. `"BIGINT UNSIGNED"`.
    pub fn of(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        let base = upper.split_whitespace().next().unwrap_or("");
        let unsigned = upper.ends_with("UNSIGNED");

        match base {
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR"
            | "BOOLEAN" => {
                if unsigned {
                    ValueClass::Unsigned
                } else {
                    ValueClass::Signed
                }
            }
            "FLOAT" | "DOUBLE" => ValueClass::Float,
            "DECIMAL" | "NUMERIC" => ValueClass::Decimal,
            "DATETIME" | "TIMESTAMP" => ValueClass::DateTime,
            "DATE" => ValueClass::Date,
            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
            | "GEOMETRY" => ValueClass::Binary,
            _ => ValueClass::Text,
        }
    }
}

/// Decode one raw column value. Values that do not parse as their declared
/// class (zero dates, out-of-range numbers) fall back to text.
pub fn decode_value(type_name: &str, raw: Option<&[u8]>) -> SqlValue {
    let Some(raw) = raw else {
        return SqlValue::Null;
    };

    let class = ValueClass::of(type_name);
    if class == ValueClass::Binary {
        return SqlValue::Bytes(raw.to_vec());
    }

    let text = String::from_utf8_lossy(raw).into_owned();
    let parsed = match class {
        ValueClass::Signed => text.parse().ok().map(SqlValue::Integer),
        ValueClass::Unsigned => text.parse().ok().map(SqlValue::Unsigned),
        ValueClass::Float => text.parse().ok().map(SqlValue::Float),
        ValueClass::Decimal => Some(SqlValue::Decimal(text.clone())),
        ValueClass::DateTime => parse_datetime(&text).map(SqlValue::Temporal),
        ValueClass::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .ok()
            .map(|date| SqlValue::Temporal(date.and_time(NaiveTime::MIN))),
        ValueClass::Binary | ValueClass::Text => None,
    };

    parsed.unwrap_or(SqlValue::Text(text))
}

/// Parse `YYYY-MM-DD HH:MM:SS[.ffffff]`, dropping fractional seconds.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .and_then(|ts| ts.with_nanosecond(0))
}
