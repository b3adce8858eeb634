//! Control-line commands.
//!
//! ```text
//! tr <name> <description> <YYYY-MM-DD> <amount>
//! ev <name> <description> <YYYY-MM-DD> <times> <y,m,d> <amount>
//! ```
//!
//! Parsing validates every field before anything touches the ledger, so a
//! rejected line never consumes an id.

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::event::{EventDraft, Occurrences, Step};
use crate::transaction::TransactionDraft;
use chrono::NaiveDate;
use log::warn;
use std::str::FromStr;

pub const TRANSACTION: &str = "tr";
pub const EVENT: &str = "ev";

const TRANSACTION_ARGS: usize = 4;
const EVENT_ARGS: usize = 6;

/// A validated command ready to be applied to a ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Transaction(TransactionDraft),
    Event(EventDraft),
}

impl Command {
    /// Validates a tokenized line. Arguments past the expected count are ignored.
    pub fn parse<S: AsRef<str>>(fields: &[S]) -> Result<Command> {
        let (keyword, args) = match fields.split_first() {
            Some((keyword, args)) => (keyword.as_ref(), args),
            None => return Err(LedgerError::UnknownCommand(String::new())),
        };

        match keyword {
            TRANSACTION => parse_transaction(args).map(Command::Transaction),
            EVENT => parse_event(args).map(Command::Event),
            other => Err(LedgerError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_transaction<S: AsRef<str>>(args: &[S]) -> Result<TransactionDraft> {
    if args.len() < TRANSACTION_ARGS {
        return Err(LedgerError::MissingArguments {
            command: TRANSACTION,
            expected: TRANSACTION_ARGS,
            found: args.len(),
        });
    }

    Ok(TransactionDraft {
        name: args[0].as_ref().to_string(),
        description: args[1].as_ref().to_string(),
        date: parse_date(args[2].as_ref())?,
        amount: parse_amount(args[3].as_ref())?,
    })
}

fn parse_event<S: AsRef<str>>(args: &[S]) -> Result<EventDraft> {
    if args.len() < EVENT_ARGS {
        return Err(LedgerError::MissingArguments {
            command: EVENT,
            expected: EVENT_ARGS,
            found: args.len(),
        });
    }

    let date = parse_date(args[2].as_ref())?;
    let remaining = parse_occurrences(args[3].as_ref())?;

    // a single firing never advances, so its step is not looked at
    let step = if remaining.repeats() {
        parse_step(args[4].as_ref(), remaining)?
    } else {
        Step::default()
    };

    let amount = parse_amount(args[5].as_ref())?;

    Ok(EventDraft {
        name: args[0].as_ref().to_string(),
        description: args[1].as_ref().to_string(),
        date,
        remaining,
        step,
        amount,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDate(value.to_string()))
}

fn parse_amount(value: &str) -> Result<Amount> {
    Amount::from_str(value).map_err(|_| LedgerError::InvalidAmount(value.to_string()))
}

fn parse_occurrences(value: &str) -> Result<Occurrences> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Occurrences::from_counter)
        .ok_or_else(|| LedgerError::InvalidOccurrenceCount(value.to_string()))
}

fn parse_step(value: &str, remaining: Occurrences) -> Result<Step> {
    let invalid = |reason| LedgerError::InvalidStep {
        value: value.to_string(),
        reason,
    };

    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 3 {
        return Err(invalid("expected three comma-separated integers"));
    }

    let mut components = [0u32; 3];
    for (slot, part) in components.iter_mut().zip(&parts) {
        let parsed = part
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("components must be integers"))?;
        if parsed < 0 {
            return Err(invalid("components must not be negative"));
        }
        *slot = u32::try_from(parsed).map_err(|_| invalid("component out of range"))?;
    }

    let step = Step::new(components[0], components[1], components[2]);
    if step.is_zero() {
        match remaining {
            Occurrences::Times(_) => {
                return Err(invalid("step must advance when more than one occurrence remains"))
            }
            Occurrences::Forever => warn!(
                "Event with infinite occurrences has a zero step and will repeat on the same date"
            ),
        }
    }

    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse(line: &str) -> Result<Command> {
        Command::parse(&tokenize(line).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_transaction() {
        let cmd = parse("tr foo bar 2020-01-01 100").unwrap();
        assert_eq!(
            cmd,
            Command::Transaction(TransactionDraft {
                name: "foo".into(),
                description: "bar".into(),
                date: date(2020, 1, 1),
                amount: Amount::from(100),
            })
        );
    }

    #[test]
    fn test_parse_event() {
        let cmd = parse(r#"ev rent "monthly rent" 2020-01-01 2 0,1,0 -1000"#).unwrap();
        match cmd {
            Command::Event(ev) => {
                assert_eq!(ev.name, "rent");
                assert_eq!(ev.description, "monthly rent");
                assert_eq!(ev.date, date(2020, 1, 1));
                assert_eq!(ev.remaining, Occurrences::Times(2));
                assert_eq!(ev.step, Step::new(0, 1, 0));
                assert_eq!(ev.amount, Amount::from(-1000));
            }
            _ => panic!("Expected Event"),
        }
    }

    #[test]
    fn test_unknown_and_empty_commands() {
        assert!(matches!(
            parse("xx a b c"),
            Err(LedgerError::UnknownCommand(k)) if k == "xx"
        ));
        assert!(matches!(parse(""), Err(LedgerError::UnknownCommand(_))));

        let empty: [&str; 0] = [];
        assert!(matches!(
            Command::parse(&empty),
            Err(LedgerError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_missing_arguments() {
        assert!(matches!(
            parse("tr"),
            Err(LedgerError::MissingArguments { command: "tr", found: 0, .. })
        ));
        assert!(matches!(
            parse("ev foo"),
            Err(LedgerError::MissingArguments { command: "ev", found: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_date() {
        assert!(matches!(
            parse("tr foo bar 2020-02-30 1"),
            Err(LedgerError::InvalidDate(_))
        ));
        assert!(matches!(
            parse("tr foo bar 01/01/2020 1"),
            Err(LedgerError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_invalid_amount() {
        assert!(matches!(
            parse("tr foo bar 2020-01-01 lots"),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_zero_occurrences_rejected() {
        assert!(matches!(
            parse("ev foo bar 2020-01-01 0 0,1,0 5"),
            Err(LedgerError::InvalidOccurrenceCount(_))
        ));
        assert!(matches!(
            parse("ev foo bar 2020-01-01 -3 0,1,0 5"),
            Err(LedgerError::InvalidOccurrenceCount(_))
        ));
        assert!(matches!(
            parse("ev foo bar 2020-01-01 many 0,1,0 5"),
            Err(LedgerError::InvalidOccurrenceCount(_))
        ));
    }

    #[test]
    fn test_single_occurrence_skips_step() {
        let cmd = parse("ev foo bar 2020-01-01 1 whatever 5").unwrap();
        match cmd {
            Command::Event(ev) => assert!(ev.step.is_zero()),
            _ => panic!("Expected Event"),
        }
    }

    #[test]
    fn test_invalid_steps() {
        for step in ["0,-1,0", "0,0,0", "1,2", "a,b,c", "1,2,3,4"] {
            let line = format!("ev foo bar 2020-01-01 3 {step} 5");
            assert!(
                matches!(parse(&line), Err(LedgerError::InvalidStep { .. })),
                "step {step} should be rejected"
            );
        }
    }

    #[test]
    fn test_infinite_event_allows_zero_step() {
        let cmd = parse("ev foo bar 2020-01-01 -1 0,0,0 5").unwrap();
        match cmd {
            Command::Event(ev) => assert_eq!(ev.remaining, Occurrences::Forever),
            _ => panic!("Expected Event"),
        }
    }

    #[test]
    fn test_infinite_event_rejects_negative_step() {
        assert!(matches!(
            parse("ev foo bar 2020-01-01 -1 0,0,-7 5"),
            Err(LedgerError::InvalidStep { .. })
        ));
    }
}
