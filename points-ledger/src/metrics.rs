//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//! Each [`Metrics`] owns a private registry so several ledgers can live in
//! one process.
//!
//! # Metrics
//!
//! - `points_minted_total` - Points escrowed by mints
//! - `points_redeemed_total` - Points paid out by redeem/balance drains
//! - `points_burned_total` - Points burned by sweeps
//! - `records_created_total` - Token records minted
//! - `records_swept_total` - Token records removed from the index
//! - `registered_customers` - Customers holding indexed records
//! - `operation_duration_seconds` - Histogram of operation latencies

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Points escrowed by mints
    pub points_minted: IntCounter,

    /// Points paid out to spendable balances
    pub points_redeemed: IntCounter,

    /// Points burned by sweeps
    pub points_burned: IntCounter,

    /// Token records minted
    pub records_created: IntCounter,

    /// Token records swept out of the index
    pub records_swept: IntCounter,

    /// Registered customers
    pub registered_customers: IntGauge,

    /// Operation latency, labelled by operation name
    pub operation_duration: HistogramVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let points_minted =
            IntCounter::new("points_minted_total", "Points escrowed by mints")?;
        registry.register(Box::new(points_minted.clone()))?;

        let points_redeemed = IntCounter::new(
            "points_redeemed_total",
            "Points paid out to spendable balances",
        )?;
        registry.register(Box::new(points_redeemed.clone()))?;

        let points_burned = IntCounter::new("points_burned_total", "Points burned by sweeps")?;
        registry.register(Box::new(points_burned.clone()))?;

        let records_created =
            IntCounter::new("records_created_total", "Token records minted")?;
        registry.register(Box::new(records_created.clone()))?;

        let records_swept = IntCounter::new(
            "records_swept_total",
            "Token records removed from the customer index",
        )?;
        registry.register(Box::new(records_swept.clone()))?;

        let registered_customers = IntGauge::new(
            "registered_customers",
            "Customers holding at least one indexed record",
        )?;
        registry.register(Box::new(registered_customers.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "operation_duration_seconds",
                "Histogram of ledger operation latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            points_minted,
            points_redeemed,
            points_burned,
            records_created,
            records_swept,
            registered_customers,
            operation_duration,
            registry,
        })
    }

    /// Record a committed mint
    pub fn record_mint(&self, amount: u64) {
        self.records_created.inc();
        self.points_minted.inc_by(amount);
    }

    /// Record a committed drain
    pub fn record_redeem(&self, amount: u64) {
        self.points_redeemed.inc_by(amount);
    }

    /// Record a committed sweep
    pub fn record_sweep(&self, records: usize, burned: u64) {
        self.records_swept.inc_by(records as u64);
        self.points_burned.inc_by(burned);
    }

    /// Update registry size
    pub fn set_registered_customers(&self, count: usize) {
        self.registered_customers.set(count as i64);
    }

    /// Record operation duration
    pub fn record_duration(&self, operation: &str, duration_seconds: f64) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("points_minted", &self.points_minted.get())
            .field("points_redeemed", &self.points_redeemed.get())
            .field("points_burned", &self.points_burned.get())
            .finish_non_exhaustive()
    }
}
