//! # Siphon Core Library
//!
//! Ingestion pipeline for a UDP telemetry sink: JSON datagrams in, rows out.
//!
//! Each datagram carries a JSON object naming a target table plus the column
//! values for one row. The pipeline is three stages:
//!
//! - [`record`] — decode a datagram into a [`Record`] (table name + scalar
//!   fields), rejecting anything that is not a flat JSON object.
//! - [`registry`] — resolve the table name against a [`TableRegistry`] built
//!   once at startup from the declared table list.
//! - [`persist`] — write the row inside a transaction, or capture the failure
//!   as an error row in the dedicated `ingest_errors` table.
//!
//! ## Delivery Contract
//!
//! Every accepted datagram produces exactly one persisted row — in its target
//! table or in the error table, never both and never silently dropped. The
//! single exception is a double-fault (the error-row insert itself fails),
//! which is logged and counted but not persisted; given UDP's own lossiness
//! this is an accepted trade-off.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod persist;
pub mod pool;
pub mod record;
pub mod registry;

pub use config::SiphonConfig;
pub use error::SiphonError;
pub use persist::{IngestOutcome, ingest};
pub use pool::ConnectionPool;
pub use record::{FieldValue, Record};
pub use registry::{TableRegistry, TableSchema};
