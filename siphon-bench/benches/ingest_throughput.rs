//! Siphon benchmark suite.
//!
//! Rough targets on commodity hardware:
//!   record_parse_small .......... < 2μs
//!   ingest_stored_row ........... < 100μs (in-memory SQLite)
//!   ingest_error_row ............ < 100μs

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rusqlite::Connection;

use siphon_core::config::{ColumnConfig, ColumnType, TableConfig};
use siphon_core::{Record, TableRegistry, ingest};

fn bench_registry() -> TableRegistry {
    TableRegistry::from_config(&[TableConfig {
        name: "widgets".to_string(),
        columns: vec![
            ColumnConfig {
                name: "name".to_string(),
                column_type: ColumnType::Text,
            },
            ColumnConfig {
                name: "count".to_string(),
                column_type: ColumnType::Integer,
            },
            ColumnConfig {
                name: "ratio".to_string(),
                column_type: ColumnType::Real,
            },
        ],
    }])
    .expect("registry")
}

fn bench_conn(registry: &TableRegistry) -> Connection {
    let conn = Connection::open_in_memory().expect("open");
    registry.apply_schema(&conn).expect("schema");
    conn
}

/// Benchmark: decode one small datagram.
fn bench_record_parse(c: &mut Criterion) {
    let payload = br#"{"table": "widgets", "name": "foo", "count": 3, "ratio": 0.5}"#;
    c.bench_function("record_parse_small", |b| {
        b.iter(|| {
            let record = Record::parse(black_box(payload)).expect("parse");
            black_box(record);
        });
    });
}

/// Benchmark: full ingest of a well-formed record.
fn bench_ingest_stored(c: &mut Criterion) {
    let registry = bench_registry();
    let mut conn = bench_conn(&registry);
    let payload = br#"{"table": "widgets", "name": "foo", "count": 3, "ratio": 0.5}"#;
    c.bench_function("ingest_stored_row", |b| {
        b.iter(|| {
            let outcome = ingest(&mut conn, &registry, black_box(payload), None);
            black_box(outcome);
        });
    });
}

/// Benchmark: full ingest of an unknown-table record (error-row path).
fn bench_ingest_error(c: &mut Criterion) {
    let registry = bench_registry();
    let mut conn = bench_conn(&registry);
    let payload = br#"{"table": "ghosts", "x": 1}"#;
    c.bench_function("ingest_error_row", |b| {
        b.iter(|| {
            let outcome = ingest(&mut conn, &registry, black_box(payload), None);
            black_box(outcome);
        });
    });
}

criterion_group!(
    benches,
    bench_record_parse,
    bench_ingest_stored,
    bench_ingest_error
);
criterion_main!(benches);
