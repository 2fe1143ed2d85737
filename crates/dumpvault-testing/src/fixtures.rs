//! Ready-made databases and backup directories for tests and benchmarks.

use chrono::NaiveDate;
use dumpvault_core::{BackupRepository, BackupService, Row, SqlValue, VaultResult};
use tempfile::TempDir;

use crate::mock_database::MockDatabase;

pub const SHOP: &str = "shop";

pub const CUSTOMERS_DDL: &str = "CREATE TABLE `customers` (
  `id` int unsigned NOT NULL AUTO_INCREMENT,
  `name` varchar(128) NOT NULL,
  `note` text,
  `joined_at` datetime DEFAULT NULL,
  `balance` decimal(10,2) NOT NULL DEFAULT '0.00',
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

pub const ORDERS_DDL: &str = "CREATE TABLE `orders` (
  `id` bigint NOT NULL AUTO_INCREMENT,
  `customer_id` int unsigned NOT NULL,
  `total` double NOT NULL,
  `payload` blob,
  PRIMARY KEY (`id`),
  KEY `fk_customer` (`customer_id`),
  CONSTRAINT `fk_customer` FOREIGN KEY (`customer_id`) REFERENCES `customers` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

/// A `shop` database with two related tables and awkward values:
/// quotes, a trailing backslash, statement terminators inside strings,
/// `NULL` and raw bytes.
pub fn shop_database() -> VaultResult<MockDatabase> {
    let db = MockDatabase::new();
    db.create_database(SHOP);
    db.create_table(SHOP, CUSTOMERS_DDL)?;
    db.create_table(SHOP, ORDERS_DDL)?;

    let joined = NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|d| d.and_hms_opt(14, 30, 0))
        .map(SqlValue::Temporal)
        .unwrap_or(SqlValue::Null);

    db.insert_row(
        SHOP,
        "customers",
        Row::new()
            .with("id", SqlValue::Unsigned(1))
            .with("name", "O'Brien\\")
            .with("note", SqlValue::Null)
            .with("joined_at", joined)
            .with("balance", SqlValue::Decimal("12.50".to_string())),
    )?;
    db.insert_row(
        SHOP,
        "customers",
        Row::new()
            .with("id", SqlValue::Unsigned(2))
            .with("name", "Ada")
            .with("note", "first;\nsecond -- not a comment")
            .with("joined_at", SqlValue::Null)
            .with("balance", SqlValue::Decimal("0.00".to_string())),
    )?;
    db.insert_row(
        SHOP,
        "orders",
        Row::new()
            .with("id", 10i64)
            .with("customer_id", SqlValue::Unsigned(1))
            .with("total", SqlValue::Float(99.5))
            .with("payload", SqlValue::Bytes(vec![0x00, 0xff, 0x27, 0x5c])),
    )?;
    Ok(db)
}

/// A service over `db` writing into a fresh temporary directory.
///
/// Keep the returned [`TempDir`] alive for as long as the service is used.
pub fn service_in_tempdir(db: MockDatabase) -> std::io::Result<(BackupService<MockDatabase>, TempDir)> {
    let dir = TempDir::new()?;
    let repository = BackupRepository::new(dir.path().join("backups"));
    Ok((BackupService::new(db, repository), dir))
}
