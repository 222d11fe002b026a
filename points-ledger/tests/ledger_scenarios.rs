//! End-to-end ledger scenarios
//!
//! Mint / redeem / sweep lifecycles driven through the public API with a
//! manual clock, plus persistence across reopen.

use points_ledger::{
    clock::ManualClock, Address, Config, Error, Ledger, RecordStatus,
};
use std::sync::Arc;
use tempfile::TempDir;

fn in_memory() -> (Ledger, Address, ManualClock) {
    let clock = ManualClock::default();
    let admin = Address::random();
    let ledger = Ledger::initialize(admin, Arc::new(clock.clone())).unwrap();
    (ledger, admin, clock)
}

fn persistent_config() -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

#[test]
fn test_single_mint_redeem_no_double_pay() {
    let (mut ledger, admin, _) = in_memory();
    let customer = Address::random();

    let record = ledger.mint(admin, customer, 100, 30).unwrap();
    assert_eq!(ledger.indexed_records(&customer).unwrap().len(), 1);
    assert_eq!(ledger.record(&record).unwrap().balance(), 100);

    ledger.redeem(customer).unwrap();
    assert_eq!(ledger.record(&record).unwrap().balance(), 0);
    assert_eq!(ledger.spendable_balance(&customer), 100);

    assert_eq!(ledger.redeem(customer).unwrap(), 0);
    assert_eq!(ledger.spendable_balance(&customer), 100);
    ledger.check_invariants().unwrap();
}

#[test]
fn test_mixed_expiry_redeem_then_sweep() {
    let (mut ledger, admin, clock) = in_memory();
    let customer = Address::random();

    let short = ledger.mint(admin, customer, 100, 10).unwrap();
    let long = ledger.mint(admin, customer, 200, 30).unwrap();

    clock.advance_days(15);
    assert_eq!(ledger.redeem(customer).unwrap(), 200);
    assert_eq!(ledger.spendable_balance(&customer), 200);
    assert_eq!(ledger.record(&short).unwrap().balance(), 100);
    assert_eq!(ledger.record_status(&short), Some(RecordStatus::Expired));

    let report = ledger.sweep_expired(admin).unwrap();
    assert_eq!(report.records_swept, vec![short]);
    assert_eq!(report.points_burned, 100);
    assert!(report.customers_removed.is_empty());

    assert_eq!(ledger.record(&short).unwrap().balance(), 0);
    assert_eq!(ledger.indexed_records(&customer), Some(&[long][..]));
    assert!(ledger.is_registered(&customer));
    assert_eq!(ledger.total_supply(), 200);
    ledger.check_invariants().unwrap();
}

#[test]
fn test_error_cases() {
    let (mut ledger, admin, _) = in_memory();
    let customer = Address::random();

    assert!(matches!(
        ledger.redeem(customer),
        Err(Error::NoTokensForCustomer(_))
    ));
    assert!(matches!(
        ledger.sweep_expired(admin),
        Err(Error::NoExpiredTokens)
    ));
    assert!(matches!(
        ledger.mint(customer, customer, 100, 30),
        Err(Error::NotAuthorized { .. })
    ));
}

#[test]
fn test_second_mint_adds_only_index_address() {
    let (mut ledger, admin, _) = in_memory();
    let customer = Address::random();

    ledger.mint(admin, customer, 10, 5).unwrap();
    assert_eq!(ledger.registered_customers(), vec![customer]);
    assert_eq!(ledger.indexed_records(&customer).unwrap().len(), 1);

    ledger.mint(admin, customer, 10, 5).unwrap();
    assert_eq!(ledger.registered_customers(), vec![customer]);
    assert_eq!(ledger.indexed_records(&customer).unwrap().len(), 2);
}

#[test]
fn test_customer_forgotten_after_last_record_swept() {
    let (mut ledger, admin, clock) = in_memory();
    let customer = Address::random();
    let other = Address::random();

    ledger.mint(admin, customer, 50, 1).unwrap();
    ledger.mint(admin, other, 75, 60).unwrap();

    clock.advance_days(2);
    let report = ledger.sweep_expired(admin).unwrap();
    assert_eq!(report.customers_removed, vec![customer]);

    assert!(!ledger.is_registered(&customer));
    assert_eq!(ledger.indexed_records(&customer), None);
    assert_eq!(ledger.balance(customer).unwrap(), 0);
    assert!(matches!(
        ledger.redeem(customer),
        Err(Error::NoTokensForCustomer(_))
    ));

    // unexpired customer untouched
    assert_eq!(ledger.peek_balance(&other), 75);
    ledger.check_invariants().unwrap();
}

#[test]
fn test_sweep_with_nothing_expired_is_noop() {
    let (mut ledger, admin, _) = in_memory();
    let customer = Address::random();
    ledger.mint(admin, customer, 10, 30).unwrap();

    let report = ledger.sweep_expired(admin).unwrap();
    assert!(report.records_swept.is_empty());
    assert_eq!(report.points_burned, 0);
    assert_eq!(ledger.total_supply(), 10);
}

#[test]
fn test_persistent_ledger_survives_reopen() {
    let (config, _temp) = persistent_config();
    let clock = ManualClock::default();
    let admin = Address::random();
    let customer = Address::random();
    let friend = Address::random();

    let (kept, swept, moved) = {
        let mut ledger = Ledger::create(&config, admin, Arc::new(clock.clone())).unwrap();
        let swept = ledger.mint(admin, customer, 100, 2).unwrap();
        let kept = ledger.mint(admin, customer, 300, 30).unwrap();
        let moved = ledger.mint(admin, customer, 40, 30).unwrap();
        ledger.transfer_record(customer, moved, friend).unwrap();
        ledger.freeze_customer(admin, friend).unwrap();

        clock.advance_days(3);
        ledger.sweep_expired(admin).unwrap();
        assert_eq!(ledger.redeem(customer).unwrap(), 300);
        (kept, swept, moved)
    };

    let ledger = Ledger::open(&config, Arc::new(clock.clone())).unwrap();
    assert_eq!(ledger.admin(), admin);
    assert_eq!(ledger.registered_customers(), vec![customer]);
    assert_eq!(ledger.indexed_records(&customer), Some(&[kept, moved][..]));
    assert_eq!(ledger.record_status(&swept), Some(RecordStatus::Unindexed));
    assert_eq!(ledger.record(&kept).unwrap().balance(), 0);
    assert_eq!(ledger.record_owner(&moved), Some(friend));
    assert_eq!(ledger.spendable_balance(&customer), 300);
    assert!(ledger.is_frozen(&friend));
    assert_eq!(ledger.total_supply(), 340);
    ledger.check_invariants().unwrap();
}

#[test]
fn test_create_twice_rejected() {
    let (config, _temp) = persistent_config();
    let clock = Arc::new(ManualClock::default());
    let admin = Address::random();

    drop(Ledger::create(&config, admin, clock.clone()).unwrap());
    assert!(matches!(
        Ledger::create(&config, Address::random(), clock),
        Err(Error::AlreadyInitialized)
    ));
}

#[test]
fn test_open_uninitialized_rejected() {
    let (config, _temp) = persistent_config();
    assert!(matches!(
        Ledger::open(&config, Arc::new(ManualClock::default())),
        Err(Error::NotInitialized)
    ));
}

#[test]
fn test_from_config() {
    let (mut config, _temp) = persistent_config();
    let clock = Arc::new(ManualClock::default());

    assert!(matches!(
        Ledger::from_config(&config, clock.clone()),
        Err(Error::Config(_))
    ));

    let admin = Address::random();
    config.admin = Some(admin);
    {
        let mut ledger = Ledger::from_config(&config, clock.clone()).unwrap();
        ledger.mint(admin, Address::random(), 5, 5).unwrap();
    }

    // reopened, not re-created
    let ledger = Ledger::from_config(&config, clock.clone()).unwrap();
    assert_eq!(ledger.total_supply(), 5);

    config.persist = false;
    let ledger = Ledger::from_config(&config, clock).unwrap();
    assert_eq!(ledger.total_supply(), 0);
}
