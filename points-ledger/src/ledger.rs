//! Main ledger orchestration layer
//!
//! This module ties together the capability store, customer index, token
//! records and point currency into the mint / redeem / sweep API. It is the
//! only place that touches more than one of them.
//!
//! Every operation checks all of its failure conditions before its first
//! mutation. The keys it touches are collected in a [`ChangeSet`] and, when
//! persistence is enabled, written in a single RocksDB batch.
//!
//! # Example
//!
//! ```
//! use points_ledger::{clock::ManualClock, Address, Ledger};
//! use std::sync::Arc;
//!
//! # fn main() -> points_ledger::Result<()> {
//! let admin = Address::random();
//! let customer = Address::random();
//! let clock = ManualClock::default();
//! let mut ledger = Ledger::initialize(admin, Arc::new(clock.clone()))?;
//!
//! ledger.mint(admin, customer, 100, 30)?;
//! assert_eq!(ledger.redeem(customer)?, 100);
//! assert_eq!(ledger.spendable_balance(&customer), 100);
//! # Ok(())
//! # }
//! ```

use crate::{
    capability::CapabilityStore,
    clock::Clock,
    currency::PointCurrency,
    index::{CustomerIndex, Removal},
    metrics::Metrics,
    record::{RecordStore, TokenRecord},
    storage::Storage,
    types::{Address, Points, RecordStatus, SweepReport, SECONDS_PER_DAY},
    Config, Error, Result,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// In-memory ledger state
#[derive(Debug)]
pub struct LedgerState {
    pub(crate) caps: CapabilityStore,
    pub(crate) index: CustomerIndex,
    pub(crate) records: RecordStore,
    pub(crate) currency: PointCurrency,
}

impl LedgerState {
    /// Fresh state owned by `admin`
    pub(crate) fn new(admin: Address) -> Self {
        Self {
            caps: CapabilityStore::initialize(admin),
            index: CustomerIndex::new(),
            records: RecordStore::new(),
            currency: PointCurrency::new(),
        }
    }
}

/// Keys touched by one operation
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    pub(crate) records: BTreeSet<Address>,
    pub(crate) index: BTreeSet<Address>,
    pub(crate) accounts: BTreeSet<Address>,
    pub(crate) registry: bool,
    pub(crate) supply: bool,
}

impl ChangeSet {
    fn is_empty(&self) -> bool {
        self.records.is_empty()
            && self.index.is_empty()
            && self.accounts.is_empty()
            && !self.registry
            && !self.supply
    }
}

/// Main ledger interface
pub struct Ledger {
    state: LedgerState,

    /// RocksDB backing (None for purely in-memory ledgers)
    storage: Option<Storage>,

    clock: Arc<dyn Clock>,

    metrics: Metrics,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("admin", &self.state.caps.admin())
            .field("customers", &self.state.caps.customer_count())
            .field("records", &self.state.records.len())
            .field("total_supply", &self.state.currency.total_supply())
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

impl Ledger {
    /// Initialize an in-memory ledger administered by `admin`
    pub fn initialize(admin: Address, clock: Arc<dyn Clock>) -> Result<Self> {
        tracing::info!(%admin, "Initialized in-memory points ledger");
        Self::assemble(LedgerState::new(admin), None, clock)
    }

    /// Initialize a persistent ledger in `config.data_dir`
    ///
    /// Fails with [`Error::AlreadyInitialized`] if a ledger already lives there.
    pub fn create(config: &Config, admin: Address, clock: Arc<dyn Clock>) -> Result<Self> {
        let storage = Storage::open(config)?;
        if storage.is_initialized()? {
            return Err(Error::AlreadyInitialized);
        }
        storage.write_genesis(admin)?;

        tracing::info!(%admin, data_dir = ?config.data_dir, "Initialized persistent points ledger");
        Self::assemble(LedgerState::new(admin), Some(storage), clock)
    }

    /// Reopen a persistent ledger
    pub fn open(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let storage = Storage::open(config)?;
        let state = storage.load_state()?;

        tracing::info!(
            admin = %state.caps.admin(),
            customers = state.caps.customer_count(),
            records = state.records.len(),
            "Reopened points ledger"
        );
        Self::assemble(state, Some(storage), clock)
    }

    /// Build a ledger as described by `config`
    ///
    /// Persistent ledgers are reopened when present and created otherwise;
    /// creating one requires `config.admin`.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let require_admin = || {
            config
                .admin
                .ok_or_else(|| Error::Config("admin is required to initialize a ledger".into()))
        };

        if !config.persist {
            return Self::initialize(require_admin()?, clock);
        }

        let storage = Storage::open(config)?;
        let initialized = storage.is_initialized()?;
        drop(storage);

        if initialized {
            let ledger = Self::open(config, clock)?;
            if let Some(admin) = config.admin {
                if admin != ledger.admin() {
                    tracing::warn!(
                        configured = %admin,
                        stored = %ledger.admin(),
                        "Configured admin differs from stored admin; stored admin wins"
                    );
                }
            }
            Ok(ledger)
        } else {
            Self::create(config, require_admin()?, clock)
        }
    }

    fn assemble(state: LedgerState, storage: Option<Storage>, clock: Arc<dyn Clock>) -> Result<Self> {
        let metrics = Metrics::new()?;
        metrics.set_registered_customers(state.caps.customer_count());
        Ok(Self {
            state,
            storage,
            clock,
            metrics,
        })
    }

    // Operations

    /// Mint `amount` points to `customer`, valid for `expiry_days`
    ///
    /// Only the admin may mint. Returns the new record's address.
    pub fn mint(
        &mut self,
        caller: Address,
        customer: Address,
        amount: Points,
        expiry_days: u64,
    ) -> Result<Address> {
        let started = Instant::now();
        self.state.caps.assert_admin(&caller)?;

        if amount == 0 {
            return Err(Error::InvalidMint("amount must be positive".to_string()));
        }
        if expiry_days == 0 {
            return Err(Error::InvalidMint("expiry_days must be positive".to_string()));
        }

        let now = self.clock.now();
        let expiry = expiry_after_days(now, expiry_days)?;

        let mut changes = ChangeSet::default();

        let escrowed = self
            .state
            .currency
            .mint(self.state.caps.mint_right(), amount)?;
        changes.supply = true;

        let record = self.state.records.create(customer, escrowed, expiry, now);
        changes.records.insert(record);

        if self.state.caps.register(customer) {
            changes.registry = true;
        }
        self.state.index.ensure_entry(customer);
        self.state.index.append(customer, record);
        changes.index.insert(customer);

        self.commit(changes)?;

        self.metrics.record_mint(amount);
        self.metrics
            .set_registered_customers(self.state.caps.customer_count());
        self.metrics
            .record_duration("mint", started.elapsed().as_secs_f64());

        tracing::info!(
            %customer,
            %record,
            amount,
            expiry = %expiry,
            "Points minted"
        );

        Ok(record)
    }

    /// Drain every unexpired record `customer` still holds
    ///
    /// Records stay indexed (at balance 0) until swept. Returns the amount
    /// deposited into the customer's spendable balance.
    pub fn redeem(&mut self, customer: Address) -> Result<Points> {
        let started = Instant::now();
        if !self.state.index.contains(&customer) {
            return Err(Error::NoTokensForCustomer(customer));
        }

        let mut changes = ChangeSet::default();
        let paid = self.drain(customer, &mut changes)?;
        self.commit(changes)?;

        self.metrics.record_redeem(paid);
        self.metrics
            .record_duration("redeem", started.elapsed().as_secs_f64());

        tracing::info!(%customer, paid, "Points redeemed");

        Ok(paid)
    }

    /// Burn every record strictly past expiry and unindex it
    ///
    /// Reclaims by expiry alone: unlike redeem, no owner check is made, so a
    /// record transferred away from its recipient is swept all the same.
    /// Fails with [`Error::NoExpiredTokens`] when the registry is empty, even
    /// though a non-empty registry with nothing expired is a no-op success.
    pub fn sweep_expired(&mut self, caller: Address) -> Result<SweepReport> {
        let started = Instant::now();
        self.state.caps.assert_admin(&caller)?;

        if self.state.caps.registry_is_empty() {
            return Err(Error::NoExpiredTokens);
        }

        let now = self.clock.now();

        let mut customers: Vec<Address> = self.state.caps.customers().copied().collect();
        customers.sort();

        // (customer, record, balance) for every sweepable record
        let mut plan = Vec::new();
        for customer in &customers {
            for record in self.state.index.entries(customer).unwrap_or_default() {
                match self.state.records.get(record) {
                    Some(r) if r.is_sweepable_at(now) => {
                        plan.push((*customer, *record, r.balance()));
                    }
                    _ => {}
                }
            }
        }

        let to_burn = checked_sum(plan.iter().map(|(_, _, balance)| *balance))?;
        let supply = self.state.currency.total_supply();
        if to_burn > supply {
            return Err(Error::InsufficientBalance {
                requested: to_burn,
                available: supply,
            });
        }

        let mut changes = ChangeSet::default();
        let mut report = SweepReport::default();

        for (customer, record, balance) in plan {
            let burned = self.state.records.extract(&record, balance)?;
            if burned > 0 {
                self.state
                    .currency
                    .burn(self.state.caps.burn_right(), burned)?;
                changes.supply = true;
            }
            changes.records.insert(record);

            if self.state.index.remove(&customer, &record) == Removal::EntryEmptied {
                self.state.caps.deregister(&customer);
                changes.registry = true;
                report.customers_removed.push(customer);
            }
            changes.index.insert(customer);

            tracing::debug!(%customer, %record, burned, "Expired record swept");

            report.records_swept.push(record);
            report.points_burned += burned;
        }

        self.commit(changes)?;

        self.metrics
            .record_sweep(report.records_swept.len(), report.points_burned);
        self.metrics
            .set_registered_customers(self.state.caps.customer_count());
        self.metrics
            .record_duration("sweep", started.elapsed().as_secs_f64());

        tracing::info!(
            records = report.records_swept.len(),
            burned = report.points_burned,
            customers_removed = report.customers_removed.len(),
            "Expired records swept"
        );

        Ok(report)
    }

    /// Balance check that drains like [`Ledger::redeem`]
    ///
    /// Returns 0 for customers without an index entry. Otherwise it performs
    /// the full redeem drain and returns the amount deposited. Use
    /// [`Ledger::peek_balance`] for a read without side effects.
    pub fn balance(&mut self, customer: Address) -> Result<Points> {
        if !self.state.index.contains(&customer) {
            return Ok(0);
        }
        self.redeem(customer)
    }

    /// Points `customer` could redeem right now, without redeeming them
    pub fn peek_balance(&self, customer: &Address) -> Points {
        let now = self.clock.now();
        self.redeemable(customer, now)
            .iter()
            .map(|(_, balance)| *balance)
            .sum()
    }

    /// Block redemptions by `customer` (admin only)
    pub fn freeze_customer(&mut self, caller: Address, customer: Address) -> Result<()> {
        self.state.caps.assert_admin(&caller)?;
        self.state
            .currency
            .freeze(self.state.caps.freeze_right(), customer);

        let mut changes = ChangeSet::default();
        changes.accounts.insert(customer);
        self.commit(changes)?;

        tracing::info!(%customer, "Customer frozen");
        Ok(())
    }

    /// Allow redemptions by `customer` again (admin only)
    pub fn unfreeze_customer(&mut self, caller: Address, customer: Address) -> Result<()> {
        self.state.caps.assert_admin(&caller)?;
        self.state
            .currency
            .unfreeze(self.state.caps.freeze_right(), customer);

        let mut changes = ChangeSet::default();
        changes.accounts.insert(customer);
        self.commit(changes)?;

        tracing::info!(%customer, "Customer unfrozen");
        Ok(())
    }

    /// Hand a record to a new holder
    ///
    /// Ownership moves; the index does not. The record stays listed under
    /// its original recipient and only the new holder can redeem it.
    pub fn transfer_record(&mut self, caller: Address, record: Address, to: Address) -> Result<()> {
        self.state.records.transfer(&record, caller, to)?;

        let mut changes = ChangeSet::default();
        changes.records.insert(record);
        self.commit(changes)?;

        tracing::info!(%record, from = %caller, %to, "Record transferred");
        Ok(())
    }

    // Queries

    /// Fixed admin identity
    pub fn admin(&self) -> Address {
        self.state.caps.admin()
    }

    /// Redeemed points held by `account`
    pub fn spendable_balance(&self, account: &Address) -> Points {
        self.state.currency.spendable(account)
    }

    /// Points in existence (spendable plus escrowed)
    pub fn total_supply(&self) -> Points {
        self.state.currency.total_supply()
    }

    /// Check if `account` is frozen
    pub fn is_frozen(&self, account: &Address) -> bool {
        self.state.currency.is_frozen(account)
    }

    /// Look up a token record
    pub fn record(&self, record: &Address) -> Option<&TokenRecord> {
        self.state.records.get(record)
    }

    /// Current holder of a token record
    pub fn record_owner(&self, record: &Address) -> Option<Address> {
        self.state.records.current_owner(record)
    }

    /// Validity state of a record, including whether a sweep unindexed it
    pub fn record_status(&self, record: &Address) -> Option<RecordStatus> {
        let r = self.state.records.get(record)?;
        let indexed = self
            .state
            .index
            .entries(&r.recipient)
            .map(|entries| entries.contains(record))
            .unwrap_or(false);

        if indexed {
            Some(r.status(self.clock.now()))
        } else {
            Some(RecordStatus::Unindexed)
        }
    }

    /// Record addresses indexed under `customer`
    pub fn indexed_records(&self, customer: &Address) -> Option<&[Address]> {
        self.state.index.entries(customer)
    }

    /// Check registry membership
    pub fn is_registered(&self, customer: &Address) -> bool {
        self.state.caps.is_registered(customer)
    }

    /// Registered customers, sorted
    pub fn registered_customers(&self) -> Vec<Address> {
        let mut customers: Vec<Address> = self.state.caps.customers().copied().collect();
        customers.sort();
        customers
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Verify cross-component invariants
    ///
    /// - registry and index keys are the same set
    /// - supply equals spendable plus escrowed points
    pub fn check_invariants(&self) -> Result<()> {
        let registry: BTreeSet<Address> = self.state.caps.customers().copied().collect();
        let indexed: BTreeSet<Address> = self.state.index.customers().copied().collect();
        if registry != indexed {
            return Err(Error::InvariantViolation(format!(
                "registry has {} customers, index has {}",
                registry.len(),
                indexed.len()
            )));
        }

        let held = self.state.currency.total_spendable() as u128
            + self.state.records.total_escrowed() as u128;
        let supply = self.state.currency.total_supply() as u128;
        if held != supply {
            return Err(Error::InvariantViolation(format!(
                "supply {} != spendable + escrowed {}",
                supply, held
            )));
        }

        Ok(())
    }

    // Internals

    /// Records `customer` holds and may redeem at `now`, with their balances
    fn redeemable(&self, customer: &Address, now: DateTime<Utc>) -> Vec<(Address, Points)> {
        self.state
            .index
            .entries(customer)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| {
                let record = self.state.records.get(id)?;
                let owned = self.state.records.current_owner(id) == Some(*customer);
                (owned && record.is_redeemable_at(now) && record.balance() > 0)
                    .then(|| (*id, record.balance()))
            })
            .collect()
    }

    /// Extract every redeemable balance into `customer`'s spendable balance
    fn drain(&mut self, customer: Address, changes: &mut ChangeSet) -> Result<Points> {
        let now = self.clock.now();
        let eligible = self.redeemable(&customer, now);

        let total = checked_sum(eligible.iter().map(|(_, balance)| *balance))?;
        self.state.currency.check_deposit(&customer, total)?;

        for (record, balance) in eligible {
            let extracted = self.state.records.extract(&record, balance)?;
            self.state.currency.deposit(customer, extracted)?;
            changes.records.insert(record);

            tracing::debug!(%customer, %record, extracted, "Record drained");
        }

        if total > 0 {
            changes.accounts.insert(customer);
        }

        Ok(total)
    }

    /// Persist the change set, or restore the touched keys if that fails
    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };
        if changes.is_empty() {
            return Ok(());
        }

        if let Err(err) = storage.commit(&self.state, &changes) {
            tracing::warn!(error = %err, "Commit failed; restoring touched entries from storage");
            storage.restore(&mut self.state, &changes)?;
            return Err(err);
        }

        Ok(())
    }
}

/// `now + expiry_days` whole days
fn expiry_after_days(now: DateTime<Utc>, expiry_days: u64) -> Result<DateTime<Utc>> {
    i64::try_from(expiry_days)
        .ok()
        .and_then(|days| days.checked_mul(SECONDS_PER_DAY))
        .and_then(Duration::try_seconds)
        .and_then(|window| now.checked_add_signed(window))
        .ok_or_else(|| Error::InvalidMint(format!("expiry_days out of range: {}", expiry_days)))
}

fn checked_sum(mut amounts: impl Iterator<Item = Points>) -> Result<Points> {
    amounts.try_fold(0 as Points, |acc, amount| {
        acc.checked_add(amount).ok_or(Error::SupplyOverflow)
    })
}
