//! Append-only CSV log of realized transactions.
//!
//! Write-only audit output; the ledger is never rebuilt from it.

use crate::error::Result;
use crate::transaction::Transaction;
use csv::WriterBuilder;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 5] = ["id", "name", "description", "date", "amount"];

pub struct TransactionLog<W: Write = File> {
    writer: csv::Writer<W>,
}

impl TransactionLog<File> {
    /// Opens (or creates) the log for appending. The header is written only
    /// to an empty file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        TransactionLog::new(file, empty)
    }
}

impl<W: Write> TransactionLog<W> {
    pub fn new(writer: W, write_header: bool) -> Result<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        if write_header {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(TransactionLog { writer })
    }

    /// Appends one row and flushes it.
    pub fn append(&mut self, tx: &Transaction) -> Result<()> {
        self.writer.write_record([
            tx.id.to_string(),
            tx.name.clone(),
            tx.description.clone(),
            tx.date.to_string(),
            tx.amount.to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(inner) => inner,
            Err(_) => panic!("log writer failed to flush"),
        }
    }
}
