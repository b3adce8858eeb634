//! The transaction ledger and its id counters.
//!
//! Each ledger owns its own counters, so independent ledgers (in tests, or
//! several engines in one process) never share ids.

use crate::amount::Amount;
use crate::event::EventId;
use crate::transaction::{Transaction, TransactionDraft, TransactionId};

/// Append-only list of realized transactions.
#[derive(Debug, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    next_transaction: u64,
    next_event: u64,
}

impl Ledger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next transaction id and appends the transaction.
    pub fn record(&mut self, draft: TransactionDraft) -> TransactionId {
        let id = TransactionId(self.next_transaction);
        self.next_transaction += 1;

        self.transactions.push(draft.into_transaction(id));
        id
    }

    /// Drops every transaction. Id counters keep counting, so nothing issued
    /// after a reset collides with an id from before it.
    pub fn reset(&mut self) {
        self.transactions.clear();
    }

    /// Reserves the next id in the event namespace.
    pub fn allocate_event_id(&mut self) -> EventId {
        let id = EventId(self.next_event);
        self.next_event += 1;
        id
    }

    /// All transactions in the order they were recorded.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Sum of every recorded amount.
    pub fn treasury(&self) -> Amount {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }
}
