//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer points, checked operations)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Amount of the point currency
pub type Points = u64;

/// Length of one validity day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Opaque identity shared by accounts (admin, customers) and token records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(Uuid);

impl Address {
    /// Wrap an existing UUID
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random account identity
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Fresh time-ordered identity (used for token records)
    pub fn fresh_object() -> Self {
        Self(Uuid::now_v7())
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Rebuild from raw key bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Validity state of a token record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordStatus {
    /// Positive balance, redeemable by its owner
    Active = 1,
    /// Positive balance past expiry, waiting for a sweep
    Expired = 2,
    /// Balance fully extracted, still listed in the index
    Drained = 3,
    /// Removed from the index by a sweep (terminal)
    Unindexed = 4,
}

impl RecordStatus {
    /// Check if the record can never pay out again
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Drained | RecordStatus::Unindexed)
    }
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Records removed from the index
    pub records_swept: Vec<Address>,

    /// Points burned out of those records
    pub points_burned: Points,

    /// Customers whose last record was swept
    pub customers_removed: Vec<Address>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_str() {
        let address = Address::random();
        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn test_address_from_bytes() {
        let address = Address::fresh_object();
        assert_eq!(Address::from_bytes(*address.as_bytes()), address);
    }

    #[test]
    fn test_record_status_terminal() {
        assert!(!RecordStatus::Active.is_terminal());
        assert!(!RecordStatus::Expired.is_terminal());
        assert!(RecordStatus::Drained.is_terminal());
        assert!(RecordStatus::Unindexed.is_terminal());
    }

    #[test]
    fn test_invalid_address_rejected() {
        assert!("not-a-uuid".parse::<Address>().is_err());
    }
}
