//! Customer index: customer identity → record addresses in mint order

use crate::types::Address;
use std::collections::HashMap;

/// Result of removing an address from a customer's sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Customer has no entry, or the address was not listed
    NotPresent,
    /// Address removed, entry still holds other addresses
    Removed,
    /// Address removed and the entry was deleted; deregister the customer
    EntryEmptied,
}

/// Per-customer list of token record addresses
#[derive(Debug, Clone, Default)]
pub struct CustomerIndex {
    entries: HashMap<Address, Vec<Address>>,
}

impl CustomerIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sequence for `customer` if absent
    pub fn ensure_entry(&mut self, customer: Address) {
        self.entries.entry(customer).or_default();
    }

    /// Add `address` at the end of `customer`'s sequence
    pub fn append(&mut self, customer: Address, address: Address) {
        self.entries.entry(customer).or_default().push(address);
    }

    /// Remove the first occurrence of `address`
    pub fn remove(&mut self, customer: &Address, address: &Address) -> Removal {
        let Some(sequence) = self.entries.get_mut(customer) else {
            return Removal::NotPresent;
        };
        let Some(position) = sequence.iter().position(|a| a == address) else {
            return Removal::NotPresent;
        };
        sequence.remove(position);

        if sequence.is_empty() {
            self.entries.remove(customer);
            Removal::EntryEmptied
        } else {
            Removal::Removed
        }
    }

    /// Check if `customer` has an entry
    pub fn contains(&self, customer: &Address) -> bool {
        self.entries.contains_key(customer)
    }

    /// Addresses indexed under `customer`
    pub fn entries(&self, customer: &Address) -> Option<&[Address]> {
        self.entries.get(customer).map(Vec::as_slice)
    }

    /// Customers with an entry
    pub fn customers(&self) -> impl Iterator<Item = &Address> + '_ {
        self.entries.keys()
    }

    /// Replace or delete a whole entry (storage load and rollback)
    pub(crate) fn restore(&mut self, customer: Address, sequence: Option<Vec<Address>>) {
        match sequence {
            Some(sequence) => {
                self.entries.insert(customer, sequence);
            }
            None => {
                self.entries.remove(&customer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_entry_idempotent() {
        let mut index = CustomerIndex::new();
        let customer = Address::random();
        let record = Address::fresh_object();

        index.ensure_entry(customer);
        index.append(customer, record);
        index.ensure_entry(customer);

        assert_eq!(index.entries(&customer), Some(&[record][..]));
    }

    #[test]
    fn test_append_preserves_order() {
        let mut index = CustomerIndex::new();
        let customer = Address::random();
        let records: Vec<Address> = (0..3).map(|_| Address::fresh_object()).collect();

        for record in &records {
            index.append(customer, *record);
        }

        assert_eq!(index.entries(&customer).unwrap(), records.as_slice());
    }

    #[test]
    fn test_remove_signals_empty_entry() {
        let mut index = CustomerIndex::new();
        let customer = Address::random();
        let first = Address::fresh_object();
        let second = Address::fresh_object();
        index.append(customer, first);
        index.append(customer, second);

        assert_eq!(index.remove(&customer, &first), Removal::Removed);
        assert_eq!(index.remove(&customer, &first), Removal::NotPresent);
        assert_eq!(index.remove(&customer, &second), Removal::EntryEmptied);
        assert!(!index.contains(&customer));
        assert_eq!(index.entries(&customer), None);
    }

    #[test]
    fn test_unknown_customer_has_no_entry() {
        let mut index = CustomerIndex::new();
        let stranger = Address::random();
        assert!(!index.contains(&stranger));
        assert_eq!(index.entries(&stranger), None);
        assert_eq!(
            index.remove(&stranger, &Address::fresh_object()),
            Removal::NotPresent
        );
    }
}
