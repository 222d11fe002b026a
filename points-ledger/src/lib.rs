//! Points Ledger
//!
//! Loyalty-points ledger: an admin mints time-limited point balances to
//! customers as individually owned token records, customers redeem unexpired
//! balances into a fungible point currency, and the admin sweeps and burns
//! balances whose validity window has lapsed.
//!
//! # Architecture
//!
//! - **Token records**: one escrowed balance per mint, owned independently
//! - **Customer index**: customer → record addresses, so redeem and sweep
//!   never scan every record
//! - **Capability store**: admin identity, mint/burn/freeze rights, registry
//! - **Single writer**: one actor task serializes every operation
//!
//! # Invariants
//!
//! - Registry and index keys are the same set of customers
//! - Supply conservation: supply == Σ(spendable) + Σ(escrowed)
//! - A drained record never regains a balance
//! - Operations are all-or-nothing

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod clock;
pub mod record;
pub mod index;
pub mod capability;
pub mod currency;
pub mod storage;
pub mod ledger;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Address, Points, RecordStatus, SweepReport};
pub use ledger::Ledger;
pub use config::Config;
pub use storage::Storage;
