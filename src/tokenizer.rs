//! Splits a control line into fields.
//!
//! Fields are separated by single ASCII spaces. A field that starts with a
//! double quote runs until the matching quote and may contain spaces; a
//! doubled quote inside it stands for one literal quote. Splitting is done
//! by a space-delimited `csv` reader, after a strict pass over the quoting
//! because the reader silently accepts stray quotes.

use crate::error::{LedgerError, Result};
use csv::{ReaderBuilder, StringRecord};

#[derive(Clone, Copy)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    ClosingQuote,
}

/// Tokenizes one line (without its terminator).
///
/// An empty line yields a single empty field.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    check_quoting(line)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .double_quote(true)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(vec![String::new()]);
    }

    Ok(record.iter().map(str::to_owned).collect())
}

/// Rejects quotes the csv reader would otherwise take literally or close at end of input.
fn check_quoting(line: &str) -> Result<()> {
    let mut state = QuoteState::FieldStart;

    for (idx, c) in line.chars().enumerate() {
        let column = idx + 1;
        state = match (state, c) {
            (QuoteState::FieldStart, ' ') => QuoteState::FieldStart,
            (QuoteState::FieldStart, '"') => QuoteState::Quoted,
            (QuoteState::FieldStart, _) => QuoteState::Unquoted,
            (QuoteState::Unquoted, ' ') => QuoteState::FieldStart,
            (QuoteState::Unquoted, '"') => {
                return Err(LedgerError::Format {
                    column,
                    reason: "bare quote in unquoted field",
                })
            }
            (QuoteState::Unquoted, _) => QuoteState::Unquoted,
            (QuoteState::Quoted, '"') => QuoteState::ClosingQuote,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::ClosingQuote, '"') => QuoteState::Quoted,
            (QuoteState::ClosingQuote, ' ') => QuoteState::FieldStart,
            (QuoteState::ClosingQuote, _) => {
                return Err(LedgerError::Format {
                    column,
                    reason: "extraneous character after closing quote",
                })
            }
        };
    }

    if let QuoteState::Quoted = state {
        return Err(LedgerError::Format {
            column: line.chars().count(),
            reason: "unterminated quoted field",
        });
    }

    Ok(())
}
