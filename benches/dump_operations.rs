//! Dump Operations Performance Benchmarks
//!
//! Benchmarks the CPU-bound parts of a backup and a restore:
//! - Literal encoding of row values
//! - Serialization of whole databases
//! - Statement splitting in both modes
//! - Full restore replay against the in-memory database

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dumpvault::{Row, SplitMode, SqlValue, split_statements};
use dumpvault_core::dump::serialize;
use dumpvault_core::restore::restore_statements;
use dumpvault_core::value::TableDump;
use dumpvault_core::SessionSource;
use dumpvault_testing::MockDatabase;
use std::hint::black_box;
use std::time::Duration;
use tokio::runtime::Runtime;

fn sample_row(id: i64) -> Row {
    Row::new()
        .with("id", id)
        .with("name", format!("customer {} O'Brien\\", id))
        .with("note", if id % 3 == 0 { None } else { Some("line one;\nline two".to_string()) })
        .with("balance", SqlValue::Decimal(format!("{}.25", id)))
        .with("payload", SqlValue::Bytes(vec![0x00, 0xff, (id % 256) as u8]))
}

fn sample_tables(tables: usize, rows: usize) -> Vec<TableDump> {
    (0..tables)
        .map(|t| TableDump {
            name: format!("table_{}", t),
            create_statement: format!(
                "CREATE TABLE `table_{}` (\n  `id` bigint NOT NULL,\n  `name` varchar(128),\n  `note` text,\n  `balance` decimal(12,2),\n  `payload` blob,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB",
                t
            ),
            rows: (0..rows as i64).map(sample_row).collect(),
        })
        .collect()
}

/// Benchmark literal encoding of single values
fn bench_value_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_encoding");
    group.throughput(Throughput::Elements(1));

    let text = SqlValue::Text("it's a \\path\\ with 'quotes'".repeat(4));
    let bytes = SqlValue::Bytes((0..=255u8).collect());

    group.bench_function("text_literal", |b| b.iter(|| black_box(&text).to_sql_literal()));
    group.bench_function("binary_literal", |b| b.iter(|| black_box(&bytes).to_sql_literal()));
    group.finish();
}

/// Benchmark whole-database serialization and splitting
fn bench_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("dump_document");
    group.measurement_time(Duration::from_secs(10));
    let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();

    for rows in [10usize, 100, 1000] {
        let tables = sample_tables(4, rows);
        let document = serialize("bench", &tables, at);
        group.throughput(Throughput::Bytes(document.len() as u64));

        group.bench_with_input(BenchmarkId::new("serialize", rows), &tables, |b, tables| {
            b.iter(|| serialize("bench", black_box(tables), at))
        });
        group.bench_with_input(BenchmarkId::new("split_quote_aware", rows), &document, |b, doc| {
            b.iter(|| split_statements(black_box(doc), SplitMode::QuoteAware))
        });
        group.bench_with_input(BenchmarkId::new("split_heuristic", rows), &document, |b, doc| {
            b.iter(|| split_statements(black_box(doc), SplitMode::Heuristic))
        });
    }
    group.finish();
}

/// Benchmark replaying a split document into the in-memory database
fn bench_restore_replay(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("restore_replay");
    let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
    let statements = split_statements(&serialize("bench", &sample_tables(2, 200), at), SplitMode::QuoteAware);
    group.throughput(Throughput::Elements(statements.len() as u64));

    group.bench_function("mock_restore_400_rows", |b| {
        b.iter_batched(
            MockDatabase::new,
            |db| {
                rt.block_on(async {
                    let mut session = db.checkout().await.unwrap();
                    black_box(restore_statements(&mut session, "bench", &statements).await.unwrap())
                })
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_value_encoding, bench_document, bench_restore_replay);
criterion_main!(benches);
