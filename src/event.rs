//! Recurring (or single) future money movements.

use crate::amount::Amount;
use crate::transaction::TransactionDraft;
use chrono::{Days, Months, NaiveDate};
use std::fmt;

/// Identifier of an event. Events are numbered independently of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many more times an event fires, counting the pending one.
///
/// The signed command-line counter maps onto this as `-1 => Forever`
/// and `n >= 1 => Times(n)`; zero is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrences {
    Forever,
    Times(u32),
}

impl Occurrences {
    /// Converts the signed counter, rejecting `0` and anything below `-1`.
    pub fn from_counter(counter: i64) -> Option<Self> {
        match counter {
            -1 => Some(Occurrences::Forever),
            n if n >= 1 => u32::try_from(n).ok().map(Occurrences::Times),
            _ => None,
        }
    }

    /// The signed counter: `-1` for infinite recurrence.
    pub fn counter(&self) -> i64 {
        match self {
            Occurrences::Forever => -1,
            Occurrences::Times(n) => i64::from(*n),
        }
    }

    /// Returns `true` if more than the pending firing is owed.
    pub fn repeats(&self) -> bool {
        match self {
            Occurrences::Forever => true,
            Occurrences::Times(n) => *n > 1,
        }
    }
}

/// Calendar distance between two occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Step {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Step {
    pub fn new(years: u32, months: u32, days: u32) -> Self {
        Step {
            years,
            months,
            days,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }

    /// Adds years, then months, then days.
    ///
    /// A day past the end of the resulting month is clamped to its last day,
    /// so Jan 31 plus one month is Feb 28 (or 29). Returns `None` when the
    /// result is outside the supported date range.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.checked_add_months(Months::new(self.years.checked_mul(12)?))?
            .checked_add_months(Months::new(self.months))?
            .checked_add_days(Days::new(u64::from(self.days)))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.years, self.months, self.days)
    }
}

/// A money movement that has not happened yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,

    pub name: String,

    pub description: String,

    /// Next due date, advanced on every re-arm
    pub date: NaiveDate,

    pub remaining: Occurrences,

    pub step: Step,

    pub amount: Amount,
}

impl Event {
    /// Fields of the transaction this event realizes at its current date.
    pub fn realize(&self) -> TransactionDraft {
        TransactionDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            date: self.date,
            amount: self.amount,
        }
    }
}

/// The fields of an event before the ledger assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub remaining: Occurrences,
    pub step: Step,
    pub amount: Amount,
}

impl EventDraft {
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            name: self.name,
            description: self.description,
            date: self.date,
            remaining: self.remaining,
            step: self.step,
            amount: self.amount,
        }
    }
}
