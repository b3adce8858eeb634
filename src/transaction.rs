//! Realized money movements.

use crate::amount::Amount;
use chrono::NaiveDate;
use std::fmt;

/// Identifier of a transaction, unique within one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A money movement that has happened.
///
/// Created either from a `tr` command or from an event firing; never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,

    pub name: String,

    pub description: String,

    /// Date the money was added or subtracted
    pub date: NaiveDate,

    /// Positive for income, negative for expenses
    pub amount: Amount,
}

/// The fields of a transaction before the ledger assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub amount: Amount,
}

impl TransactionDraft {
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            name: self.name,
            description: self.description,
            date: self.date,
            amount: self.amount,
        }
    }
}
