//! Error types for the points ledger

use crate::types::{Address, Points};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every variant aborts the enclosing operation; no operation leaves a
/// partial effect behind when it returns one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the fixed admin identity
    #[error("Not authorized: {caller} is not the ledger admin")]
    NotAuthorized {
        /// Identity that attempted the privileged call
        caller: Address,
    },

    /// Redeem invoked for a customer without an index entry
    #[error("No tokens for customer: {0}")]
    NoTokensForCustomer(Address),

    /// Sweep invoked while the customer registry is empty
    #[error("No expired tokens: customer registry is empty")]
    NoExpiredTokens,

    /// Extraction requested more than a record holds
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount asked for
        requested: Points,
        /// Amount the record currently holds
        available: Points,
    },

    /// Mint arguments rejected (zero amount or zero validity window)
    #[error("Invalid mint: {0}")]
    InvalidMint(String),

    /// Account is frozen and may not receive redeemed points
    #[error("Account frozen: {0}")]
    AccountFrozen(Address),

    /// Token record does not exist
    #[error("Record not found: {0}")]
    RecordNotFound(Address),

    /// Ownership transfer attempted by someone other than the holder
    #[error("Record {record} is not owned by {caller}")]
    NotRecordOwner {
        /// Record being transferred
        record: Address,
        /// Identity that attempted the transfer
        caller: Address,
    },

    /// Currency supply or an account balance would overflow
    #[error("Point supply overflow")]
    SupplyOverflow,

    /// Ledger already initialized at this location
    #[error("Ledger already initialized")]
    AlreadyInitialized,

    /// No ledger found at this location
    #[error("Ledger not initialized")]
    NotInitialized,

    /// Invariant violation (registry/index drift, supply conservation)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
