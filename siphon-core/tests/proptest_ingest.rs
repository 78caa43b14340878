//! Property-based tests for the ingestion pipeline.
//!
//! Two invariants hold for *any* input bytes:
//! - processing never panics, and
//! - each processed datagram accounts for exactly one persisted row
//!   (target table or error table), except the reported double-fault case.

use proptest::prelude::*;
use rusqlite::Connection;

use siphon_core::config::{ColumnConfig, ColumnType, TableConfig};
use siphon_core::persist::IngestOutcome;
use siphon_core::registry::ERROR_TABLE;
use siphon_core::{Record, TableRegistry, ingest};

fn test_registry() -> TableRegistry {
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
        ],
    }])
    .expect("registry")
}

fn fresh_conn(registry: &TableRegistry) -> Connection {
    let conn = Connection::open_in_memory().expect("open");
    registry.apply_schema(&conn).expect("schema");
    conn
}

fn total_rows(conn: &Connection) -> i64 {
    let widgets: i64 = conn
        .query_row("SELECT COUNT(*) FROM widgets", [], |row| row.get(0))
        .expect("count widgets");
    let errors: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {ERROR_TABLE}"), [], |row| {
            row.get(0)
        })
        .expect("count errors");
    widgets + errors
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let registry = test_registry();
        let mut conn = fresh_conn(&registry);
        let outcome = ingest(&mut conn, &registry, &payload, None);
        // Random bytes are overwhelmingly malformed; either way exactly one
        // row lands somewhere.
        prop_assert!(
            !matches!(outcome, IngestOutcome::Lost { .. }),
            "!matches!(outcome, IngestOutcome::Lost {{ .. }})"
        );
        prop_assert_eq!(total_rows(&conn), 1);
    }
}

proptest! {
    #[test]
    fn arbitrary_json_scalars_yield_one_row(
        name in "[a-zA-Z0-9 ]{0,32}",
        count in any::<i64>(),
    ) {
        let registry = test_registry();
        let mut conn = fresh_conn(&registry);
        let payload = serde_json::json!({
            "table": "widgets",
            "name": name,
            "count": count,
        });
        let bytes = serde_json::to_vec(&payload).expect("encode");
        let outcome = ingest(&mut conn, &registry, &bytes, None);
        prop_assert!(
            matches!(outcome, IngestOutcome::Stored { .. }),
            "matches!(outcome, IngestOutcome::Stored {{ .. }})"
        );
        prop_assert_eq!(total_rows(&conn), 1);
    }
}

proptest! {
    #[test]
    fn unknown_tables_always_captured(table in "[a-z]{1,16}") {
        prop_assume!(table != "widgets");
        let registry = test_registry();
        let mut conn = fresh_conn(&registry);
        let payload = serde_json::json!({ "table": table, "x": 1 });
        let bytes = serde_json::to_vec(&payload).expect("encode");
        let outcome = ingest(&mut conn, &registry, &bytes, None);
        prop_assert!(
            matches!(
                outcome,
                IngestOutcome::Captured { class: "unknown_table" }
            ),
            "matches!(outcome, IngestOutcome::Captured {{ class: \"unknown_table\" }})"
        );
        prop_assert_eq!(total_rows(&conn), 1);
    }
}

proptest! {
    #[test]
    fn record_parse_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = Record::parse(&payload);
    }
}
