//! Actor-based serialization of ledger operations
//!
//! The core [`Ledger`] assumes one operation runs to completion before the
//! next starts. This module provides that guarantee with the single-writer
//! pattern:
//! - One Tokio task owns the ledger; nothing else can touch it
//! - Callers hold a cloneable [`LedgerHandle`] and talk over a bounded mailbox
//! - Each request carries a oneshot channel for its reply
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Admin / customer front-ends (many tasks)       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │     mint / redeem / sweep / balance, one at a time    │
//! │                       │                               │
//! │                       ▼                               │
//! │        Storage::commit() (one RocksDB batch)          │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::types::{Address, Points, SweepReport};
use crate::{Error, Ledger, Result};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Mint points to a customer
    Mint {
        caller: Address,
        customer: Address,
        amount: Points,
        expiry_days: u64,
        response: oneshot::Sender<Result<Address>>,
    },

    /// Redeem a customer's unexpired records
    Redeem {
        customer: Address,
        response: oneshot::Sender<Result<Points>>,
    },

    /// Sweep expired records
    SweepExpired {
        caller: Address,
        response: oneshot::Sender<Result<SweepReport>>,
    },

    /// Draining balance check
    Balance {
        customer: Address,
        response: oneshot::Sender<Result<Points>>,
    },

    /// Side-effect-free balance check
    PeekBalance {
        customer: Address,
        response: oneshot::Sender<Points>,
    },

    /// Freeze or unfreeze a customer
    SetFrozen {
        caller: Address,
        customer: Address,
        frozen: bool,
        response: oneshot::Sender<Result<()>>,
    },

    /// Hand a record to a new holder
    TransferRecord {
        caller: Address,
        record: Address,
        to: Address,
        response: oneshot::Sender<Result<()>>,
    },

    /// Spendable balance of an account
    SpendableBalance {
        account: Address,
        response: oneshot::Sender<Points>,
    },

    /// Total point supply
    TotalSupply {
        response: oneshot::Sender<Points>,
    },

    /// Records indexed under a customer
    IndexedRecords {
        customer: Address,
        response: oneshot::Sender<Option<Vec<Address>>>,
    },

    /// Stop the actor and hand the ledger back
    Shutdown {
        response: oneshot::Sender<Ledger>,
    },
}

/// Actor that owns the ledger
#[derive(Debug)]
pub struct LedgerActor {
    ledger: Ledger,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Ledger, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop
    ///
    /// Returns the ledger once a shutdown arrives or every handle is dropped.
    pub async fn run(mut self) -> Option<Ledger> {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown { response } = msg {
                tracing::info!("Ledger actor shutting down");
                return match response.send(self.ledger) {
                    Ok(()) => None,
                    Err(ledger) => Some(ledger),
                };
            }
            self.handle_message(msg);
        }

        tracing::info!("Ledger actor mailbox closed");
        Some(self.ledger)
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        let ledger = &mut self.ledger;
        match msg {
            LedgerMessage::Mint {
                caller,
                customer,
                amount,
                expiry_days,
                response,
            } => {
                let _ = response.send(ledger.mint(caller, customer, amount, expiry_days));
            }

            LedgerMessage::Redeem { customer, response } => {
                let _ = response.send(ledger.redeem(customer));
            }

            LedgerMessage::SweepExpired { caller, response } => {
                let _ = response.send(ledger.sweep_expired(caller));
            }

            LedgerMessage::Balance { customer, response } => {
                let _ = response.send(ledger.balance(customer));
            }

            LedgerMessage::PeekBalance { customer, response } => {
                let _ = response.send(ledger.peek_balance(&customer));
            }

            LedgerMessage::SetFrozen {
                caller,
                customer,
                frozen,
                response,
            } => {
                let result = if frozen {
                    ledger.freeze_customer(caller, customer)
                } else {
                    ledger.unfreeze_customer(caller, customer)
                };
                let _ = response.send(result);
            }

            LedgerMessage::TransferRecord {
                caller,
                record,
                to,
                response,
            } => {
                let _ = response.send(ledger.transfer_record(caller, record, to));
            }

            LedgerMessage::SpendableBalance { account, response } => {
                let _ = response.send(ledger.spendable_balance(&account));
            }

            LedgerMessage::TotalSupply { response } => {
                let _ = response.send(ledger.total_supply());
            }

            LedgerMessage::IndexedRecords { customer, response } => {
                let _ = response.send(ledger.indexed_records(&customer).map(<[Address]>::to_vec));
            }

            LedgerMessage::Shutdown { .. } => {
                // Handled in run loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Mint points to a customer
    pub async fn mint(
        &self,
        caller: Address,
        customer: Address,
        amount: Points,
        expiry_days: u64,
    ) -> Result<Address> {
        self.request(|response| LedgerMessage::Mint {
            caller,
            customer,
            amount,
            expiry_days,
            response,
        })
        .await?
    }

    /// Redeem a customer's unexpired records
    pub async fn redeem(&self, customer: Address) -> Result<Points> {
        self.request(|response| LedgerMessage::Redeem { customer, response })
            .await?
    }

    /// Sweep expired records
    pub async fn sweep_expired(&self, caller: Address) -> Result<SweepReport> {
        self.request(|response| LedgerMessage::SweepExpired { caller, response })
            .await?
    }

    /// Draining balance check
    pub async fn balance(&self, customer: Address) -> Result<Points> {
        self.request(|response| LedgerMessage::Balance { customer, response })
            .await?
    }

    /// Side-effect-free balance check
    pub async fn peek_balance(&self, customer: Address) -> Result<Points> {
        self.request(|response| LedgerMessage::PeekBalance { customer, response })
            .await
    }

    /// Freeze a customer
    pub async fn freeze_customer(&self, caller: Address, customer: Address) -> Result<()> {
        self.request(|response| LedgerMessage::SetFrozen {
            caller,
            customer,
            frozen: true,
            response,
        })
        .await?
    }

    /// Unfreeze a customer
    pub async fn unfreeze_customer(&self, caller: Address, customer: Address) -> Result<()> {
        self.request(|response| LedgerMessage::SetFrozen {
            caller,
            customer,
            frozen: false,
            response,
        })
        .await?
    }

    /// Hand a record to a new holder
    pub async fn transfer_record(&self, caller: Address, record: Address, to: Address) -> Result<()> {
        self.request(|response| LedgerMessage::TransferRecord {
            caller,
            record,
            to,
            response,
        })
        .await?
    }

    /// Spendable balance of an account
    pub async fn spendable_balance(&self, account: Address) -> Result<Points> {
        self.request(|response| LedgerMessage::SpendableBalance { account, response })
            .await
    }

    /// Total point supply
    pub async fn total_supply(&self) -> Result<Points> {
        self.request(|response| LedgerMessage::TotalSupply { response })
            .await
    }

    /// Records indexed under a customer
    pub async fn indexed_records(&self, customer: Address) -> Result<Option<Vec<Address>>> {
        self.request(|response| LedgerMessage::IndexedRecords { customer, response })
            .await
    }

    /// Stop the actor and take the ledger back
    pub async fn shutdown(&self) -> Result<Ledger> {
        self.request(|response| LedgerMessage::Shutdown { response })
            .await
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(ledger: Ledger, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
