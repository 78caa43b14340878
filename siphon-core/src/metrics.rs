//! Runtime ingest counters.
//!
//! Lock-free `AtomicU64` counters incremented on the worker hot path and
//! read for the shutdown summary (or a dashboard export). No histograms —
//! per-record timing lives in `tracing` spans.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::persist::IngestOutcome;

/// Atomic counters for ingestion events since startup.
#[derive(Debug, Default)]
pub struct IngestCounters {
    /// Datagrams received by the listener.
    pub datagrams_received: AtomicU64,
    /// Rows committed to their target tables.
    pub rows_stored: AtomicU64,
    /// Error rows committed.
    pub rows_captured: AtomicU64,
    /// Records lost to double-faults.
    pub rows_lost: AtomicU64,
    /// Captured records whose payload failed to decode.
    pub malformed_payloads: AtomicU64,
    /// Captured records naming an unregistered table.
    pub unknown_tables: AtomicU64,
}

impl IngestCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            rows_stored: AtomicU64::new(0),
            rows_captured: AtomicU64::new(0),
            rows_lost: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            unknown_tables: AtomicU64::new(0),
        }
    }

    /// Record the outcome of one processed datagram.
    pub fn record_outcome(&self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Stored { .. } => {
                self.rows_stored.fetch_add(1, Ordering::Relaxed);
            }
            IngestOutcome::Captured { class } => {
                self.rows_captured.fetch_add(1, Ordering::Relaxed);
                self.count_class(class);
            }
            IngestOutcome::Lost { class } => {
                self.rows_lost.fetch_add(1, Ordering::Relaxed);
                self.count_class(class);
            }
        }
    }

    fn count_class(&self, class: &str) {
        match class {
            "malformed_payload" => {
                self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
            }
            "unknown_table" => {
                self.unknown_tables.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Consistent-enough snapshot for logging or export.
    #[must_use]
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            rows_stored: self.rows_stored.load(Ordering::Relaxed),
            rows_captured: self.rows_captured.load(Ordering::Relaxed),
            rows_lost: self.rows_lost.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            unknown_tables: self.unknown_tables.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    /// Datagrams received by the listener.
    pub datagrams_received: u64,
    /// Rows committed to their target tables.
    pub rows_stored: u64,
    /// Error rows committed.
    pub rows_captured: u64,
    /// Records lost to double-faults.
    pub rows_lost: u64,
    /// Captured records whose payload failed to decode.
    pub malformed_payloads: u64,
    /// Captured records naming an unregistered table.
    pub unknown_tables: u64,
}
