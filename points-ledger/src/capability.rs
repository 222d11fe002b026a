//! Capability store: admin identity, supply rights and customer registry
//!
//! The three rights are plain marker objects that can only be constructed in
//! this module. They are neither `Clone` nor `Copy`, so holding a `&MintRight`
//! proves the caller borrowed it from the one store that owns it.

use crate::{
    error::{Error, Result},
    types::Address,
};
use std::collections::HashSet;

/// Permission to create new points
#[derive(Debug)]
pub struct MintRight {
    _sealed: (),
}

/// Permission to destroy points
#[derive(Debug)]
pub struct BurnRight {
    _sealed: (),
}

/// Permission to freeze and unfreeze accounts
#[derive(Debug)]
pub struct FreezeRight {
    _sealed: (),
}

/// Rights plus the registry of customers holding indexed records
#[derive(Debug)]
pub struct CapabilityStore {
    admin: Address,
    mint_right: MintRight,
    burn_right: BurnRight,
    freeze_right: FreezeRight,
    known_customers: HashSet<Address>,
}

impl CapabilityStore {
    /// Grant all rights to `admin` with an empty registry
    pub fn initialize(admin: Address) -> Self {
        Self {
            admin,
            mint_right: MintRight { _sealed: () },
            burn_right: BurnRight { _sealed: () },
            freeze_right: FreezeRight { _sealed: () },
            known_customers: HashSet::new(),
        }
    }

    /// Fixed admin identity
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Fail unless `caller` is the admin
    pub fn assert_admin(&self, caller: &Address) -> Result<()> {
        if *caller != self.admin {
            return Err(Error::NotAuthorized { caller: *caller });
        }
        Ok(())
    }

    /// Mint right
    pub fn mint_right(&self) -> &MintRight {
        &self.mint_right
    }

    /// Burn right
    pub fn burn_right(&self) -> &BurnRight {
        &self.burn_right
    }

    /// Freeze right
    pub fn freeze_right(&self) -> &FreezeRight {
        &self.freeze_right
    }

    /// Add a customer; returns false if already registered
    pub fn register(&mut self, customer: Address) -> bool {
        self.known_customers.insert(customer)
    }

    /// Drop a customer from the registry
    pub fn deregister(&mut self, customer: &Address) -> bool {
        self.known_customers.remove(customer)
    }

    /// Check registry membership
    pub fn is_registered(&self, customer: &Address) -> bool {
        self.known_customers.contains(customer)
    }

    /// Registered customers (unordered)
    pub fn customers(&self) -> impl Iterator<Item = &Address> + '_ {
        self.known_customers.iter()
    }

    /// Number of registered customers
    pub fn customer_count(&self) -> usize {
        self.known_customers.len()
    }

    /// True if nobody is registered
    pub fn registry_is_empty(&self) -> bool {
        self.known_customers.is_empty()
    }

    /// Replace the registry wholesale (storage load and rollback)
    pub(crate) fn restore_registry(&mut self, customers: impl IntoIterator<Item = Address>) {
        self.known_customers = customers.into_iter().collect();
    }
}
