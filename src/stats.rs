//! The published view of the ledger.
//!
//! `Stats` is derived from scratch on every mutation and never stored.
//!
//! Note that income and expenses are taken from *events* due in the
//! current month, not from realized transactions: a plain `tr` entry only
//! ever shows up in the treasury.

use crate::amount::Amount;
use crate::event::Event;
use crate::transaction::Transaction;
use chrono::{Datelike, NaiveDate, NaiveTime, SecondsFormat};
use serde::{Serialize, Serializer};

/// One line of a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    pub name: String,
    pub amount: Amount,
    #[serde(serialize_with = "serialize_timestamp")]
    pub date: NaiveDate,
}

/// A total together with the entries that make it up, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Summary {
    pub total: Amount,
    pub entries: Vec<Entry>,
}

impl Summary {
    fn push(&mut self, name: &str, amount: Amount, date: NaiveDate) {
        self.total += amount;
        self.entries.push(Entry {
            name: name.to_string(),
            amount,
            date,
        });
    }
}

/// Snapshot of the ledger as published to the status file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    /// Every transaction ever recorded
    pub treasury: Summary,

    /// Non-negative events due this month
    pub income: Summary,

    /// Negative events due this month
    pub expenses: Summary,

    /// Signed sum of this month's events
    pub balance: Amount,
}

impl Stats {
    /// Derives the view for the month containing `today`. Pure.
    pub fn aggregate<'a, I>(transactions: &[Transaction], events: I, today: NaiveDate) -> Stats
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut stats = Stats::default();

        for tx in transactions {
            stats.treasury.push(&tx.name, tx.amount, tx.date);
        }

        let this_month = events
            .into_iter()
            .filter(|ev| ev.date.year() == today.year() && ev.date.month() == today.month());

        for ev in this_month {
            if ev.amount.is_expense() {
                stats.expenses.push(&ev.name, ev.amount, ev.date);
            } else {
                stats.income.push(&ev.name, ev.amount, ev.date);
            }
            stats.balance += ev.amount;
        }

        stats
    }
}

/// Dates go out as UTC midnight timestamps, e.g. `2020-01-01T00:00:00Z`.
fn serialize_timestamp<S>(date: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let timestamp = date
        .and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    serializer.serialize_str(&timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventId, Occurrences, Step};
    use crate::transaction::TransactionId;
    use serde_json::Value;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: u64, name: &str, date: NaiveDate, amount: i64) -> Transaction {
        Transaction {
            id: TransactionId(id),
            name: name.to_string(),
            description: String::new(),
            date,
            amount: Amount::from(amount),
        }
    }

    fn ev(id: u64, name: &str, date: NaiveDate, amount: i64) -> Event {
        Event {
            id: EventId(id),
            name: name.to_string(),
            description: String::new(),
            date,
            remaining: Occurrences::Forever,
            step: Step::new(0, 1, 0),
            amount: Amount::from(amount),
        }
    }

    #[test]
    fn test_treasury_keeps_ledger_order() {
        let transactions = vec![
            tx(0, "foo", date(2020, 1, 1), 100),
            tx(1, "baz", date(2020, 1, 2), -40),
        ];
        let stats = Stats::aggregate(&transactions, std::iter::empty(), date(2020, 1, 15));

        assert_eq!(stats.treasury.total, Amount::from(60));
        let names: Vec<_> = stats.treasury.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "baz"]);
    }

    #[test]
    fn test_events_split_by_sign_in_current_month() {
        let events = vec![
            ev(0, "salary", date(2020, 3, 25), 2500),
            ev(1, "rent", date(2020, 3, 1), -1000),
            ev(2, "gift", date(2020, 3, 9), 0),
            ev(3, "insurance", date(2020, 4, 1), -200),
            ev(4, "bonus", date(2019, 3, 1), 300),
        ];
        let stats = Stats::aggregate(&[], &events, date(2020, 3, 10));

        assert_eq!(stats.income.total, Amount::from(2500));
        assert_eq!(stats.income.entries.len(), 2);
        assert_eq!(stats.income.entries[0].name, "salary");
        assert_eq!(stats.income.entries[1].name, "gift");
        assert_eq!(stats.expenses.total, Amount::from(-1000));
        assert_eq!(stats.expenses.entries.len(), 1);
        assert_eq!(stats.balance, Amount::from(1500));
    }

    #[test]
    fn test_plain_transactions_do_not_count_as_income() {
        let transactions = vec![tx(0, "paycheck", date(2020, 3, 1), 900)];
        let stats = Stats::aggregate(&transactions, std::iter::empty(), date(2020, 3, 10));

        assert!(stats.income.entries.is_empty());
        assert!(stats.balance.is_zero());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let transactions = vec![tx(0, "foo", date(2020, 1, 1), 100)];
        let events = vec![ev(0, "rent", date(2020, 1, 31), -1000)];
        let today = date(2020, 1, 5);

        let first = serde_json::to_vec(&Stats::aggregate(&transactions, &events, today)).unwrap();
        let second = serde_json::to_vec(&Stats::aggregate(&transactions, &events, today)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_json_layout() {
        let transactions = vec![tx(0, "foo", date(2020, 1, 1), 100)];
        let stats = Stats::aggregate(&transactions, std::iter::empty(), date(2020, 1, 1));
        let json: Value = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["Treasury"]["Total"].as_f64(), Some(100.0));
        assert_eq!(json["Treasury"]["Entries"][0]["Name"], "foo");
        assert_eq!(json["Treasury"]["Entries"][0]["Date"], "2020-01-01T00:00:00Z");
        assert_eq!(json["Income"]["Entries"], Value::Array(vec![]));
        assert_eq!(json["Expenses"]["Total"].as_f64(), Some(0.0));
        assert_eq!(json["Balance"].as_f64(), Some(0.0));
    }
}
