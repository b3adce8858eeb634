//! # Domestic Ledger
//!
//! A personal ledger daemon. Commands are appended to a control file, one
//! per line:
//!
//! ```text
//! tr <name> <description> <YYYY-MM-DD> <amount>
//! ev <name> <description> <YYYY-MM-DD> <times> <y,m,d> <amount>
//! ```
//!
//! `tr` records a transaction. `ev` schedules an event that turns into a
//! transaction on its due date and then repeats `times` times (`-1` forever)
//! every `y,m,d`. After every change a JSON snapshot with the treasury and
//! this month's income, expenses and balance is written to the status file.
//!
//! ## Design Principles
//!
//! - **Single writer**: all mutation happens on the control loop; timer
//!   tasks only send notifications
//! - **Exact money**: amounts are `rust_decimal` values
//! - **Cancellable timers**: retiring an event or shutting down aborts its
//!   pending wake-up
//! - **Bad lines are harmless**: a rejected command is logged and never
//!   changes the ledger or the snapshot
//!
//! ## Example
//!
//! ```no_run
//! use domestic_ledger::{LedgerEngine, StatusFile, TokioAlarm};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> domestic_ledger::Result<()> {
//! let (firings_tx, _firings) = mpsc::unbounded_channel();
//! let mut engine = LedgerEngine::new(TokioAlarm::new(firings_tx), StatusFile::new("status.json"));
//! engine.execute("tr salary \"march pay\" 2020-03-01 2500")?;
//! engine.publish()?;
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod journal;
pub mod ledger;
pub mod scheduler;
pub mod snapshot;
pub mod stats;
pub mod timer;
pub mod tokenizer;
pub mod transaction;
pub mod watcher;

pub use amount::Amount;
pub use command::Command;
pub use config::Config;
pub use engine::{Applied, ControlEvent, Flow, LedgerEngine};
pub use error::{LedgerError, Result};
pub use event::{Event, EventId, Occurrences, Step};
pub use journal::TransactionLog;
pub use ledger::Ledger;
pub use scheduler::{Alarm, FireOutcome, Scheduler};
pub use snapshot::{StatusFile, StatusSink};
pub use stats::{Entry, Stats, Summary};
pub use timer::{Firing, TokioAlarm};
pub use tokenizer::tokenize;
pub use transaction::{Transaction, TransactionId};
pub use watcher::{ControlFile, WatchEvent};
