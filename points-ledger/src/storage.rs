//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `meta` - Admin identity, customer registry and total supply
//! - `records` - Token records with their current owner (key: record address)
//! - `index` - Customer index sequences (key: customer address)
//! - `accounts` - Spendable balances and frozen flags (key: account address)
//!
//! Every ledger operation is written as one `WriteBatch`, so a crash never
//! leaves half an operation on disk.

use crate::{
    currency::Account,
    error::{Error, Result},
    ledger::{ChangeSet, LedgerState},
    record::TokenRecord,
    types::{Address, Points},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};

/// Column family names
const CF_META: &str = "meta";
const CF_RECORDS: &str = "records";
const CF_INDEX: &str = "index";
const CF_ACCOUNTS: &str = "accounts";

/// Keys in `meta`
const KEY_ADMIN: &[u8] = b"admin";
const KEY_REGISTRY: &[u8] = b"registry";
const KEY_SUPPLY: &[u8] = b"supply";

/// Record row as written
#[derive(Serialize)]
struct StoredRecordRef<'a> {
    record: &'a TokenRecord,
    owner: Address,
}

/// Record row as read back
#[derive(Deserialize)]
struct StoredRecord {
    record: TokenRecord,
    owner: Address,
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
            ColumnFamilyDescriptor::new(CF_RECORDS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_INDEX, Self::cf_options_lookup()),
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_lookup()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db })
    }

    // Column family options

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_lookup() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups by address benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf_handle(cf)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    // Lifecycle

    /// Check if a ledger has been written here
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.get::<Address>(CF_META, KEY_ADMIN)?.is_some())
    }

    /// Write the admin identity, an empty registry and zero supply
    pub fn write_genesis(&self, admin: Address) -> Result<()> {
        let cf_meta = self.cf_handle(CF_META)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(cf_meta, KEY_ADMIN, bincode::serialize(&admin)?);
        batch.put_cf(cf_meta, KEY_REGISTRY, bincode::serialize(&Vec::<Address>::new())?);
        batch.put_cf(cf_meta, KEY_SUPPLY, bincode::serialize(&(0 as Points))?);
        self.db.write(batch)?;

        tracing::debug!(%admin, "Genesis written");
        Ok(())
    }

    /// Rebuild the full in-memory state
    pub fn load_state(&self) -> Result<LedgerState> {
        let admin: Address = self
            .get(CF_META, KEY_ADMIN)?
            .ok_or(Error::NotInitialized)?;
        let mut state = LedgerState::new(admin);

        let registry: Vec<Address> = self.get(CF_META, KEY_REGISTRY)?.unwrap_or_default();
        state.caps.restore_registry(registry);

        let supply: Points = self.get(CF_META, KEY_SUPPLY)?.unwrap_or(0);
        state.currency.restore_supply(supply);

        for item in self.db.iterator_cf(self.cf_handle(CF_RECORDS)?, IteratorMode::Start) {
            let (_, value) = item?;
            let stored: StoredRecord = bincode::deserialize(&value)?;
            state.records.restore(stored.record, stored.owner);
        }

        for item in self.db.iterator_cf(self.cf_handle(CF_INDEX)?, IteratorMode::Start) {
            let (key, value) = item?;
            let customer = Self::address_from_key(&key)?;
            let sequence: Vec<Address> = bincode::deserialize(&value)?;
            state.index.restore(customer, Some(sequence));
        }

        for item in self.db.iterator_cf(self.cf_handle(CF_ACCOUNTS)?, IteratorMode::Start) {
            let (key, value) = item?;
            let account = Self::address_from_key(&key)?;
            let stored: Account = bincode::deserialize(&value)?;
            state.currency.restore_account(account, Some(stored));
        }

        Ok(state)
    }

    // Batch operations (atomic)

    /// Write the current value of every touched key in one batch
    pub(crate) fn commit(&self, state: &LedgerState, changes: &ChangeSet) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_records = self.cf_handle(CF_RECORDS)?;
        for id in &changes.records {
            match (state.records.get(id), state.records.current_owner(id)) {
                (Some(record), Some(owner)) => {
                    let row = StoredRecordRef { record, owner };
                    batch.put_cf(cf_records, id.as_bytes(), bincode::serialize(&row)?);
                }
                _ => batch.delete_cf(cf_records, id.as_bytes()),
            }
        }

        let cf_index = self.cf_handle(CF_INDEX)?;
        for customer in &changes.index {
            match state.index.entries(customer) {
                Some(sequence) => {
                    batch.put_cf(cf_index, customer.as_bytes(), bincode::serialize(sequence)?)
                }
                None => batch.delete_cf(cf_index, customer.as_bytes()),
            }
        }

        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        for account in &changes.accounts {
            match state.currency.account(account) {
                Some(stored) => {
                    batch.put_cf(cf_accounts, account.as_bytes(), bincode::serialize(&stored)?)
                }
                None => batch.delete_cf(cf_accounts, account.as_bytes()),
            }
        }

        let cf_meta = self.cf_handle(CF_META)?;
        if changes.registry {
            let mut registry: Vec<Address> = state.caps.customers().copied().collect();
            registry.sort();
            batch.put_cf(cf_meta, KEY_REGISTRY, bincode::serialize(&registry)?);
        }
        if changes.supply {
            let supply = state.currency.total_supply();
            batch.put_cf(cf_meta, KEY_SUPPLY, bincode::serialize(&supply)?);
        }

        self.db.write(batch)?;

        tracing::debug!(
            records = changes.records.len(),
            index = changes.index.len(),
            accounts = changes.accounts.len(),
            "Change set committed"
        );

        Ok(())
    }

    /// Overwrite every touched key in memory with its stored value
    pub(crate) fn restore(&self, state: &mut LedgerState, changes: &ChangeSet) -> Result<()> {
        for id in &changes.records {
            match self.get::<StoredRecord>(CF_RECORDS, id.as_bytes())? {
                Some(stored) => state.records.restore(stored.record, stored.owner),
                None => state.records.forget(id),
            }
        }

        for customer in &changes.index {
            let sequence: Option<Vec<Address>> = self.get(CF_INDEX, customer.as_bytes())?;
            state.index.restore(*customer, sequence);
        }

        for account in &changes.accounts {
            let stored: Option<Account> = self.get(CF_ACCOUNTS, account.as_bytes())?;
            state.currency.restore_account(*account, stored);
        }

        if changes.registry {
            let registry: Vec<Address> = self.get(CF_META, KEY_REGISTRY)?.unwrap_or_default();
            state.caps.restore_registry(registry);
        }
        if changes.supply {
            let supply: Points = self.get(CF_META, KEY_SUPPLY)?.unwrap_or(0);
            state.currency.restore_supply(supply);
        }

        Ok(())
    }

    fn address_from_key(key: &[u8]) -> Result<Address> {
        let bytes: [u8; 16] = key
            .try_into()
            .map_err(|_| Error::Storage(format!("Malformed address key of {} bytes", key.len())))?;
        Ok(Address::from_bytes(bytes))
    }
}
