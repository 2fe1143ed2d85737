//! End-to-end backup and restore behavior against the in-memory database.
//!
//! Every test dumps through a [`BackupService`] into a temporary backup
//! directory and restores through a second service pointing at the same
//! directory, so what reaches the target is exactly what was written to disk.

use chrono::{TimeZone, Utc};
use dumpvault_core::ForeignKeyChecksGuard;
use dumpvault_core::SessionSource;
use dumpvault_core::dump::{DISABLE_FOREIGN_KEY_CHECKS, ENABLE_FOREIGN_KEY_CHECKS};
use dumpvault::{BackupRepository, BackupService, Row, SplitMode, SqlValue, VaultError};
use dumpvault_testing::MockDatabase;
use dumpvault_testing::fixtures::{self, SHOP};
use rstest::rstest;
use tempfile::TempDir;

fn target_service(dir: &TempDir) -> (BackupService<MockDatabase>, MockDatabase) {
    let target = MockDatabase::new();
    let service = BackupService::new(
        target.clone(),
        BackupRepository::new(dir.path().join("backups")),
    );
    (service, target)
}

#[tokio::test]
async fn test_round_trip_reproduces_tables_and_rows() {
    let source = fixtures::shop_database().unwrap();
    let (service, dir) = fixtures::service_in_tempdir(source.clone()).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();
    assert_eq!(backup.database, SHOP);

    let (restorer, target) = target_service(&dir);
    let summary = restorer.restore_backup(&backup.filename).await.unwrap();

    assert!(summary.success);
    assert_eq!(summary.statements_failed, 0);
    assert_eq!(summary.tables_created, 2);
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(target.table_names(SHOP), source.table_names(SHOP));
    for table in source.table_names(SHOP) {
        assert_eq!(target.rows(SHOP, &table), source.rows(SHOP, &table), "table {}", table);
    }
}

#[tokio::test]
async fn test_quote_and_backslash_survive_round_trip() {
    let source = fixtures::shop_database().unwrap();
    let (service, dir) = fixtures::service_in_tempdir(source).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    let document = service.repository().read(&backup.filename).await.unwrap();
    assert!(document.contains(r"'O\'Brien\\'"));

    let (restorer, target) = target_service(&dir);
    restorer.restore_backup(&backup.filename).await.unwrap();
    let rows = target.rows(SHOP, "customers");
    assert_eq!(rows[0].get("name"), Some(&SqlValue::Text("O'Brien\\".to_string())));
}

#[tokio::test]
async fn test_null_restores_as_null_not_text() {
    let source = fixtures::shop_database().unwrap();
    let (service, dir) = fixtures::service_in_tempdir(source).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    let document = service.repository().read(&backup.filename).await.unwrap();
    assert!(document.contains("'O\\'Brien\\\\', NULL,"));
    assert!(!document.contains("'NULL'"));

    let (restorer, target) = target_service(&dir);
    restorer.restore_backup(&backup.filename).await.unwrap();
    assert_eq!(target.rows(SHOP, "customers")[0].get("note"), Some(&SqlValue::Null));
}

#[tokio::test]
async fn test_restore_of_unknown_backup_touches_nothing() {
    let db = fixtures::shop_database().unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(db.clone()).unwrap();

    let err = service
        .restore_backup("shop_backup_2020-01-01T00-00-00.sql")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::BackupNotFound { .. }));

    let err = service.restore_backup("../shop_backup_x.sql").await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidFileName { .. }));

    assert_eq!(db.checkouts(), 0);
    assert!(db.executed().is_empty());
    assert_eq!(db.table_names(SHOP), vec!["customers", "orders"]);
}

#[tokio::test]
async fn test_database_name_containing_separator_restores_into_itself() {
    const ARCHIVE: &str = "shop_backup_archive";
    let db = fixtures::shop_database().unwrap();
    db.create_database(ARCHIVE);
    db.create_table(ARCHIVE, "CREATE TABLE `ledger` (`id` int)").unwrap();
    db.insert_row(ARCHIVE, "ledger", Row::new().with("id", SqlValue::Integer(7)))
        .unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(db.clone()).unwrap();

    let backup = service.create_backup(ARCHIVE).await.unwrap();
    assert!(backup.filename.starts_with("shop_backup_archive_backup_"));
    assert_eq!(backup.database, ARCHIVE);
    assert_eq!(service.list_backups().await.unwrap()[0].database, ARCHIVE);

    db.create_table(ARCHIVE, "CREATE TABLE `scratch` (`id` int)").unwrap();
    let shop_rows = db.rows(SHOP, "customers");

    let summary = service.restore_backup(&backup.filename).await.unwrap();
    assert!(summary.success);
    assert_eq!(db.table_names(SHOP), vec!["customers", "orders"]);
    assert_eq!(db.rows(SHOP, "customers"), shop_rows);
    assert_eq!(db.table_names(ARCHIVE), vec!["ledger"]);
    assert_eq!(db.row_count(ARCHIVE, "ledger"), 1);
}

#[tokio::test]
async fn test_restore_into_system_schema_is_refused() {
    let db = MockDatabase::new();
    db.create_database("mysql");
    db.create_table("mysql", "CREATE TABLE `user` (`Host` char(255))").unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(db.clone()).unwrap();

    let directory = service.repository().directory_path().to_path_buf();
    std::fs::create_dir_all(&directory).unwrap();
    std::fs::write(directory.join("mysql_backup_2024-01-01T00-00-00.sql"), "SELECT 1;\n").unwrap();

    let err = service
        .restore_backup("mysql_backup_2024-01-01T00-00-00.sql")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidFileName { .. }), "{:?}", err);
    assert_eq!(db.checkouts(), 0);
    assert_eq!(db.table_names("mysql"), vec!["user"]);
}

#[tokio::test]
async fn test_dump_for_another_database_is_refused() {
    let db = fixtures::shop_database().unwrap();
    db.create_database("billing");
    db.create_table("billing", "CREATE TABLE `invoices` (`id` int)").unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(db.clone()).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    let document = service.repository().read(&backup.filename).await.unwrap();
    let renamed = "billing_backup_2024-01-01T00-00-00.sql";
    std::fs::write(service.repository().directory_path().join(renamed), document).unwrap();
    let checkouts = db.checkouts();
    db.clear_log();

    let err = service.restore_backup(renamed).await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidFileName { .. }), "{:?}", err);
    assert_eq!(db.checkouts(), checkouts);
    assert!(db.executed().is_empty());
    assert_eq!(db.table_names("billing"), vec!["invoices"]);
}

#[rstest]
#[case::parent_directory("../shop_backup_2024-01-01T00-00-00.sql")]
#[case::nested_path("nested/shop_backup_2024-01-01T00-00-00.sql")]
#[case::wrong_extension("shop_backup_2024-01-01T00-00-00.txt")]
#[case::missing_separator("shop.sql")]
#[case::empty_database("_backup_2024-01-01T00-00-00.sql")]
#[tokio::test]
async fn test_invalid_names_are_rejected_before_any_access(#[case] filename: &str) {
    let db = fixtures::shop_database().unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(db.clone()).unwrap();

    let err = service.restore_backup(filename).await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidFileName { .. }), "{}: {:?}", filename, err);
    let err = service.delete_backup(filename).await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidFileName { .. }));
    assert_eq!(db.checkouts(), 0);
}

#[tokio::test]
async fn test_list_is_newest_first_and_delete_of_unknown_leaves_directory() {
    let dir = TempDir::new().unwrap();
    let repository = BackupRepository::new(dir.path());
    let older = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();

    repository.save_at("shop", "-- one\n", older).await.unwrap();
    repository.save_at("billing", "-- two\n", newer).await.unwrap();

    let listed = repository.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].database, "billing");
    assert_eq!(listed[1].database, "shop");

    let err = repository
        .delete("shop_backup_1999-01-01T00-00-00.sql")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::BackupNotFound { .. }));
    assert_eq!(repository.list().await.unwrap(), listed);

    repository.delete(&listed[0].filename).await.unwrap();
    let remaining = repository.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].database, "shop");
}

#[tokio::test]
async fn test_malformed_insert_is_skipped_and_counted() {
    let source = fixtures::shop_database().unwrap();
    let (service, dir) = fixtures::service_in_tempdir(source).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    let document = service.repository().read(&backup.filename).await.unwrap();
    let broken = document.replace(
        ENABLE_FOREIGN_KEY_CHECKS,
        &format!("INSERT INTO `orders` (`id`) VALUES (1, 2);\n{}", ENABLE_FOREIGN_KEY_CHECKS),
    );
    let later = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
    let broken_backup = service
        .repository()
        .save_at(SHOP, &broken, later)
        .await
        .unwrap();

    let (restorer, target) = target_service(&dir);
    let summary = restorer.restore_backup(&broken_backup.filename).await.unwrap();

    assert!(summary.success);
    assert_eq!(summary.statements_failed, 1);
    assert_eq!(summary.rows_inserted, 3);
    assert!(summary.message.contains("1 statements failed"));
    assert_eq!(target.row_count(SHOP, "orders"), 1);
}

#[tokio::test]
async fn test_zero_table_database() {
    let source = MockDatabase::new();
    source.create_database("empty");
    let (service, dir) = fixtures::service_in_tempdir(source).unwrap();
    let backup = service.create_backup("empty").await.unwrap();

    let document = service.repository().read(&backup.filename).await.unwrap();
    assert!(document.contains(DISABLE_FOREIGN_KEY_CHECKS));
    assert!(document.contains(ENABLE_FOREIGN_KEY_CHECKS));
    assert!(!document.contains("CREATE TABLE"));
    assert!(!document.contains("INSERT"));

    let (restorer, target) = target_service(&dir);
    let summary = restorer.restore_backup(&backup.filename).await.unwrap();
    assert!(summary.success);
    assert_eq!(summary.tables_created, 0);
    assert!(target.table_names("empty").is_empty());
    assert_eq!(target.database_names(), vec!["empty"]);
}

#[tokio::test]
async fn test_restore_replaces_existing_tables() {
    let source = fixtures::shop_database().unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(source.clone()).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    source
        .create_table(SHOP, "CREATE TABLE `scratch` (`id` int)")
        .unwrap();
    source.clear_log();

    let summary = service.restore_backup(&backup.filename).await.unwrap();
    assert!(summary.success);
    assert_eq!(source.table_names(SHOP), vec!["customers", "orders"]);
    assert!(
        source
            .executed()
            .iter()
            .any(|s| s == "DROP TABLE IF EXISTS `shop`.`scratch`")
    );
    assert_eq!(source.sessions_returned_with_checks_disabled(), 0);
}

#[tokio::test]
async fn test_heuristic_split_mis_splits_embedded_terminator() {
    let source = fixtures::shop_database().unwrap();
    let (service, dir) = fixtures::service_in_tempdir(source).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    let (restorer, target) = target_service(&dir);
    let restorer = restorer.with_split_mode(SplitMode::Heuristic);
    let summary = restorer.restore_backup(&backup.filename).await.unwrap();

    // The `first;\nsecond` value is cut in two and both halves fail.
    assert!(summary.success);
    assert_eq!(summary.statements_failed, 2);
    assert_eq!(target.row_count(SHOP, "customers"), 1);
    assert_eq!(target.row_count(SHOP, "orders"), 1);
}

#[tokio::test]
async fn test_backup_failures_write_nothing() {
    let db = fixtures::shop_database().unwrap();
    db.create_database("mysql");
    let (service, _dir) = fixtures::service_in_tempdir(db).unwrap();

    let err = service.create_backup("missing").await.unwrap_err();
    assert!(matches!(err, VaultError::Introspection { .. }));
    let err = service.create_backup("mysql").await.unwrap_err();
    assert!(matches!(err, VaultError::Introspection { .. }));

    assert!(service.list_backups().await.unwrap().is_empty());
    assert_eq!(service.list_databases().await.unwrap(), vec![SHOP]);
}

#[tokio::test]
async fn test_checks_reenabled_when_drop_phase_fails() {
    let db = fixtures::shop_database().unwrap();
    let (service, _dir) = fixtures::service_in_tempdir(db.clone()).unwrap();
    let backup = service.create_backup(SHOP).await.unwrap();

    db.fail_statements_containing("DROP TABLE IF EXISTS `shop`.`orders`");
    db.clear_log();
    assert!(service.restore_backup(&backup.filename).await.is_err());

    let executed = db.executed();
    assert_eq!(executed.first().map(String::as_str), Some(DISABLE_FOREIGN_KEY_CHECKS));
    assert_eq!(executed.last().map(String::as_str), Some(ENABLE_FOREIGN_KEY_CHECKS));
    assert_eq!(db.sessions_returned_with_checks_disabled(), 0);
    assert_eq!(db.active_sessions(), 0);
}

#[tokio::test]
async fn test_unreleased_guard_discards_session() {
    let db = MockDatabase::new();
    let mut session = db.checkout().await.unwrap();
    {
        let guard = ForeignKeyChecksGuard::disable(&mut session).await.unwrap();
        drop(guard);
    }
    assert!(!session.foreign_key_checks());
    drop(session);

    assert_eq!(db.discarded_sessions(), 1);
    assert_eq!(db.sessions_returned_with_checks_disabled(), 0);
}

#[tokio::test]
async fn test_failed_release_reports_cleanup_and_discards() {
    let db = MockDatabase::new();
    db.fail_statements_containing(ENABLE_FOREIGN_KEY_CHECKS);
    let mut session = db.checkout().await.unwrap();

    let guard = ForeignKeyChecksGuard::disable(&mut session).await.unwrap();
    let err = guard.release().await.unwrap_err();
    assert!(matches!(err, VaultError::Cleanup { .. }));

    drop(session);
    assert_eq!(db.discarded_sessions(), 1);
}
