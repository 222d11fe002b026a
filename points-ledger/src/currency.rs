//! Fungible point currency: total supply and spendable balances
//!
//! Supply only changes through [`PointCurrency::mint`] and
//! [`PointCurrency::burn`], and both demand the matching right.

use crate::{
    capability::{BurnRight, FreezeRight, MintRight},
    error::{Error, Result},
    types::{Address, Points},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Spendable state of one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Redeemed points the account can spend
    pub spendable: Points,

    /// Frozen accounts cannot receive deposits
    pub frozen: bool,
}

/// The point currency
#[derive(Debug, Clone, Default)]
pub struct PointCurrency {
    total_supply: Points,
    accounts: HashMap<Address, Account>,
}

impl PointCurrency {
    /// Zero supply, no accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new points; the caller escrows them somewhere
    pub fn mint(&mut self, _right: &MintRight, amount: Points) -> Result<Points> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(Error::SupplyOverflow)?;
        Ok(amount)
    }

    /// Destroy `amount` points taken out of escrow
    pub fn burn(&mut self, _right: &BurnRight, amount: Points) -> Result<()> {
        self.total_supply =
            self.total_supply
                .checked_sub(amount)
                .ok_or(Error::InsufficientBalance {
                    requested: amount,
                    available: self.total_supply,
                })?;
        Ok(())
    }

    /// Check that `account` could receive `amount` right now
    pub fn check_deposit(&self, account: &Address, amount: Points) -> Result<()> {
        let current = self.accounts.get(account).copied().unwrap_or_default();
        if current.frozen {
            return Err(Error::AccountFrozen(*account));
        }
        current
            .spendable
            .checked_add(amount)
            .map(|_| ())
            .ok_or(Error::SupplyOverflow)
    }

    /// Credit points already in supply to a spendable balance
    pub fn deposit(&mut self, account: Address, amount: Points) -> Result<()> {
        self.check_deposit(&account, amount)?;
        let entry = self.accounts.entry(account).or_default();
        entry.spendable += amount;
        Ok(())
    }

    /// Block deposits to `account`
    pub fn freeze(&mut self, _right: &FreezeRight, account: Address) {
        self.accounts.entry(account).or_default().frozen = true;
    }

    /// Allow deposits to `account` again
    pub fn unfreeze(&mut self, _right: &FreezeRight, account: Address) {
        if let Some(entry) = self.accounts.get_mut(&account) {
            entry.frozen = false;
        }
    }

    /// Check if `account` is frozen
    pub fn is_frozen(&self, account: &Address) -> bool {
        self.accounts
            .get(account)
            .map(|a| a.frozen)
            .unwrap_or(false)
    }

    /// Spendable points of `account`
    pub fn spendable(&self, account: &Address) -> Points {
        self.accounts
            .get(account)
            .map(|a| a.spendable)
            .unwrap_or(0)
    }

    /// Full account state, if the account was ever touched
    pub fn account(&self, account: &Address) -> Option<Account> {
        self.accounts.get(account).copied()
    }

    /// Points in existence (spendable plus escrowed)
    pub fn total_supply(&self) -> Points {
        self.total_supply
    }

    /// Sum of all spendable balances
    pub fn total_spendable(&self) -> Points {
        self.accounts.values().map(|a| a.spendable).sum()
    }

    pub(crate) fn restore_supply(&mut self, supply: Points) {
        self.total_supply = supply;
    }

    pub(crate) fn restore_account(&mut self, account: Address, state: Option<Account>) {
        match state {
            Some(state) => {
                self.accounts.insert(account, state);
            }
            None => {
                self.accounts.remove(&account);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityStore;

    #[test]
    fn test_mint_and_burn_track_supply() {
        let caps = CapabilityStore::initialize(Address::random());
        let mut currency = PointCurrency::new();

        currency.mint(caps.mint_right(), 300).unwrap();
        currency.burn(caps.burn_right(), 100).unwrap();
        assert_eq!(currency.total_supply(), 200);

        let err = currency.burn(caps.burn_right(), 201).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(currency.total_supply(), 200);
    }

    #[test]
    fn test_mint_overflow() {
        let caps = CapabilityStore::initialize(Address::random());
        let mut currency = PointCurrency::new();

        currency.mint(caps.mint_right(), Points::MAX).unwrap();
        assert!(matches!(
            currency.mint(caps.mint_right(), 1),
            Err(Error::SupplyOverflow)
        ));
        assert_eq!(currency.total_supply(), Points::MAX);
    }

    #[test]
    fn test_frozen_account_rejects_deposit() {
        let caps = CapabilityStore::initialize(Address::random());
        let mut currency = PointCurrency::new();
        let customer = Address::random();

        currency.deposit(customer, 50).unwrap();
        currency.freeze(caps.freeze_right(), customer);
        assert!(matches!(
            currency.deposit(customer, 10),
            Err(Error::AccountFrozen(_))
        ));
        assert_eq!(currency.spendable(&customer), 50);

        currency.unfreeze(caps.freeze_right(), customer);
        currency.deposit(customer, 10).unwrap();
        assert_eq!(currency.spendable(&customer), 60);
    }
}
