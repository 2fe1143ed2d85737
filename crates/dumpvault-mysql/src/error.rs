//! Driver error translation.
//!
//! Server-side errors keep only the server's message and SQLSTATE; transport
//! errors are flattened to their display form. Connection strings and
//! credentials never reach a [`VaultError`].

use dumpvault_core::VaultError;

/// Human-readable reason for a driver error.
pub(crate) fn describe(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => format!("{} (SQLSTATE {})", db.message(), code),
            None => db.message().to_string(),
        },
        sqlx::Error::PoolTimedOut => "timed out waiting for a pooled connection".to_string(),
        sqlx::Error::PoolClosed => "connection pool is closed".to_string(),
        sqlx::Error::Io(e) => format!("I/O error talking to server: {}", e),
        sqlx::Error::Tls(_) => "TLS negotiation failed".to_string(),
        sqlx::Error::Configuration(_) => "invalid connection configuration".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn connection(error: sqlx::Error) -> VaultError {
    VaultError::Connection {
        reason: describe(&error),
    }
}

pub(crate) fn introspection(database: &str, error: sqlx::Error) -> VaultError {
    VaultError::introspection(database, describe(&error))
}

pub(crate) fn table_introspection(database: &str, table: &str, error: sqlx::Error) -> VaultError {
    VaultError::table_introspection(database, table, describe(&error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_described() {
        assert_eq!(
            describe(&sqlx::Error::PoolTimedOut),
            "timed out waiting for a pooled connection"
        );
        assert!(matches!(
            connection(sqlx::Error::PoolClosed),
            VaultError::Connection { .. }
        ));
    }

    #[test]
    fn test_table_context_is_kept() {
        let err = table_introspection("shop", "orders", sqlx::Error::RowNotFound);
        assert!(matches!(
            err,
            VaultError::Introspection { table: Some(ref t), .. } if t == "orders"
        ));
    }
}
