//! Alexandria Journal Projector
//!
//! Read side: rebuilds a relational model of the journal ledger from its
//! event stream.
//!
//! # Architecture
//!
//! - **Reassembly**: events are grouped per transaction until the control
//!   event's `numEvents` distinct sequence numbers have arrived
//! - **Data manipulations**: every data event maps to one SQL statement
//! - **Projector**: a completed transaction is applied in one SQLite
//!   transaction, all or nothing
//! - **Consumer**: a single tokio task owns the buffer and the projector
//!
//! # Guarantees
//!
//! - The final read model does not depend on the arrival order of events
//!   within a transaction
//! - A failed batch leaves no rows behind, and the consumer stops

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod config;
pub mod consumer;
pub mod dml;
pub mod error;
pub mod metrics;
pub mod projector;
pub mod queries;
pub mod reassembly;
pub mod schema;

// Re-exports
pub use config::{Config, DatabaseConfig};
pub use consumer::{spawn_consumer, ConsumerHandle, ConsumerStatus, Outcome};
pub use dml::DataManipulation;
pub use error::{Error, Result};
pub use projector::Projector;
pub use reassembly::{CompletedTransaction, ReassemblyBuffer};
