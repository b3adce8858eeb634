//! Error types for the ledger engine.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while running the ledger.
///
/// Command errors (tokenizing and interpreting a control line) are
/// recoverable: the line is logged and dropped. Everything else terminates
/// the control loop.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed quoting in a control line
    #[error("Malformed line at column {column}: {reason}")]
    Format { column: usize, reason: &'static str },

    /// Control line is not valid UTF-8
    #[error("Control line is not valid UTF-8")]
    Encoding,

    /// First field is neither `tr` nor `ev`
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// Not enough fields after the command keyword
    #[error("{command}: missing arguments (expected {expected}, got {found})")]
    MissingArguments {
        command: &'static str,
        expected: usize,
        found: usize,
    },

    /// Date field is not `YYYY-MM-DD`
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Amount field is not a decimal number
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// Occurrence count is zero, below -1 or not an integer
    #[error("Invalid occurrence count '{0}'")]
    InvalidOccurrenceCount(String),

    /// Step is not three non-negative integers, or is all zero for a repeating event
    #[error("Invalid step '{value}': {reason}")]
    InvalidStep { value: String, reason: &'static str },

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tokenizer or transactions log CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The control file watcher stopped with an error
    #[error("Control file error: {0}")]
    Watcher(std::io::Error),

    /// Unparseable line in the configuration file
    #[error("Error in config file at line {line}: {message}")]
    ConfigFormat { line: usize, message: String },

    /// Configuration file path given but not readable
    #[error("No valid configuration file path provided: {0}")]
    ConfigFilePath(String),
}

impl LedgerError {
    /// Returns `true` for errors that only invalidate the current control line.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::Format { .. }
                | LedgerError::Encoding
                | LedgerError::UnknownCommand(_)
                | LedgerError::MissingArguments { .. }
                | LedgerError::InvalidDate(_)
                | LedgerError::InvalidAmount(_)
                | LedgerError::InvalidOccurrenceCount(_)
                | LedgerError::InvalidStep { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_errors_are_recoverable() {
        assert!(LedgerError::UnknownCommand("xx".into()).is_recoverable());
        assert!(LedgerError::InvalidDate("2020-13-01".into()).is_recoverable());
        assert!(LedgerError::Encoding.is_recoverable());
    }

    #[test]
    fn test_io_errors_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(!LedgerError::Io(io).is_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!LedgerError::Watcher(io).is_recoverable());
    }

    #[test]
    fn test_missing_arguments_message() {
        let err = LedgerError::MissingArguments {
            command: "tr",
            expected: 4,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "tr: missing arguments (expected 4, got 1)"
        );
    }
}
