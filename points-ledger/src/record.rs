//! Token records and the ownership table
//!
//! A token record escrows a point balance until an absolute expiry. Who holds
//! a record is NOT part of the record: it lives in [`RecordStore`]'s
//! ownership table, which can change independently of the customer index.

use crate::{
    error::{Error, Result},
    types::{Address, Points, RecordStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One escrowed point balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Record identity
    pub id: Address,

    /// Customer the record was issued to
    pub recipient: Address,

    /// Escrowed points
    balance: Points,

    /// Not redeemable at or after this instant
    pub expiry: DateTime<Utc>,

    /// Mint timestamp
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Current escrowed balance
    pub fn balance(&self) -> Points {
        self.balance
    }

    /// Remove exactly `amount` from the balance
    pub fn extract(&mut self, amount: Points) -> Result<Points> {
        if amount > self.balance {
            return Err(Error::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(amount)
    }

    /// Owner may redeem strictly before expiry
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }

    /// Sweep may reclaim strictly after expiry
    pub fn is_sweepable_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    /// Validity state ignoring index membership
    pub fn status(&self, now: DateTime<Utc>) -> RecordStatus {
        if self.balance == 0 {
            RecordStatus::Drained
        } else if self.is_redeemable_at(now) {
            RecordStatus::Active
        } else {
            RecordStatus::Expired
        }
    }
}

/// All token records plus who currently holds each one
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: HashMap<Address, TokenRecord>,
    owners: HashMap<Address, Address>,
}

impl RecordStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a record and hand it to `owner`
    ///
    /// A zero amount is accepted here; the ledger decides whether to allow it.
    pub fn create(
        &mut self,
        owner: Address,
        amount: Points,
        expiry: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Address {
        let id = Address::fresh_object();
        let record = TokenRecord {
            id,
            recipient: owner,
            balance: amount,
            expiry,
            created_at,
        };
        self.records.insert(id, record);
        self.owners.insert(id, owner);
        id
    }

    /// Look up a record
    pub fn get(&self, id: &Address) -> Option<&TokenRecord> {
        self.records.get(id)
    }

    /// Check if a record exists
    pub fn exists(&self, id: &Address) -> bool {
        self.records.contains_key(id)
    }

    /// Remove `amount` from a record
    pub fn extract(&mut self, id: &Address, amount: Points) -> Result<Points> {
        self.records
            .get_mut(id)
            .ok_or(Error::RecordNotFound(*id))?
            .extract(amount)
    }

    /// Identity currently holding the record
    pub fn current_owner(&self, id: &Address) -> Option<Address> {
        self.owners.get(id).copied()
    }

    /// Hand a record to a new holder
    pub fn transfer(&mut self, id: &Address, from: Address, to: Address) -> Result<()> {
        let owner = self
            .owners
            .get_mut(id)
            .ok_or(Error::RecordNotFound(*id))?;
        if *owner != from {
            return Err(Error::NotRecordOwner {
                record: *id,
                caller: from,
            });
        }
        *owner = to;
        Ok(())
    }

    /// Number of records ever created
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no record was ever created
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of all escrowed balances
    pub fn total_escrowed(&self) -> Points {
        self.records.values().map(TokenRecord::balance).sum()
    }

    /// Put back a record as loaded from storage
    pub(crate) fn restore(&mut self, record: TokenRecord, owner: Address) {
        self.owners.insert(record.id, owner);
        self.records.insert(record.id, record);
    }

    /// Forget a record (rollback of a creation that never committed)
    pub(crate) fn forget(&mut self, id: &Address) {
        self.records.remove(id);
        self.owners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_with_record(amount: Points) -> (RecordStore, Address, Address, DateTime<Utc>) {
        let mut store = RecordStore::new();
        let owner = Address::random();
        let now = Utc::now();
        let id = store.create(owner, amount, now + Duration::days(30), now);
        (store, id, owner, now)
    }

    #[test]
    fn test_create_sets_owner_and_balance() {
        let (store, id, owner, _) = store_with_record(100);
        let record = store.get(&id).unwrap();
        assert_eq!(record.balance(), 100);
        assert_eq!(record.recipient, owner);
        assert_eq!(store.current_owner(&id), Some(owner));
    }

    #[test]
    fn test_extract_partial_and_overdraw() {
        let (mut store, id, _, _) = store_with_record(100);
        assert_eq!(store.extract(&id, 40).unwrap(), 40);
        assert_eq!(store.get(&id).unwrap().balance(), 60);

        let err = store.extract(&id, 61).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance {
                requested: 61,
                available: 60
            }
        ));
        assert_eq!(store.get(&id).unwrap().balance(), 60);
    }

    #[test]
    fn test_extract_missing_record() {
        let mut store = RecordStore::new();
        let missing = Address::fresh_object();
        assert!(matches!(
            store.extract(&missing, 1),
            Err(Error::RecordNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_zero_amount_record_allowed() {
        let (store, id, _, now) = store_with_record(0);
        assert_eq!(store.get(&id).unwrap().status(now), RecordStatus::Drained);
    }

    #[test]
    fn test_transfer_requires_holder() {
        let (mut store, id, owner, _) = store_with_record(10);
        let stranger = Address::random();
        let friend = Address::random();

        assert!(matches!(
            store.transfer(&id, stranger, friend),
            Err(Error::NotRecordOwner { .. })
        ));

        store.transfer(&id, owner, friend).unwrap();
        assert_eq!(store.current_owner(&id), Some(friend));
        // recipient is fixed at issuance
        assert_eq!(store.get(&id).unwrap().recipient, owner);
    }

    #[test]
    fn test_expiry_boundaries() {
        let (store, id, _, now) = store_with_record(10);
        let record = store.get(&id).unwrap();
        let expiry = record.expiry;

        assert!(record.is_redeemable_at(now));
        assert!(!record.is_redeemable_at(expiry));
        assert!(!record.is_sweepable_at(expiry));
        assert!(record.is_sweepable_at(expiry + Duration::seconds(1)));
        assert_eq!(record.status(expiry), RecordStatus::Expired);
    }
}
