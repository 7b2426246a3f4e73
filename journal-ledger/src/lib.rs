//! Alexandria Journal Ledger
//!
//! Write side of a ledger-backed journal and manuscript registry.
//!
//! # Architecture
//!
//! - **Typed addresses**: every record lives at a 70 character address whose
//!   type code names the entity kind
//! - **Staged state**: one `GetState` per command, classified
//!   unknown / empty / filled
//! - **Scoped gateway**: reads and writes outside the declared address sets
//!   fail with an access violation
//! - **Update list**: checkers return atomic updates; the emitter applies
//!   them in memory, publishes one event each and writes once
//!
//! # Invariants
//!
//! - A rejected command publishes no events and writes nothing
//! - Event sequence numbers of a transaction are `0..numEvents`, the control
//!   event at 0
//! - Touched addresses are a subset of the declared write set

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod address;
pub mod command;
pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod processor;
pub mod state;
pub mod update;
pub mod validation;

// Re-exports
pub use address::{Address, EntityKind};
pub use command::{Command, CommandBody};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use gateway::{LedgerAccess, MemoryLedger, ScopedLedger};
pub use processor::{CommandProcessor, TransactionHeader};
pub use state::{AddressState, StagedState};
pub use update::Update;
