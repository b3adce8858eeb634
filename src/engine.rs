//! The control loop.
//!
//! All ledger and event-set mutation happens here, one input at a time:
//! control-file bytes, timer firings, a watcher failure or the shutdown
//! signal. Bytes are assembled into lines; each complete line is tokenized,
//! interpreted and applied. Every mutation republishes the snapshot.
//!
//! When the control file starts over, the state built from the old stream
//! is dropped: transactions, active events and their wake-ups, and any
//! half-read line. A periodic refresh republishes once the local month
//! changes, since income and expenses are per-month figures.
//!
//! Command errors are logged and the line dropped without touching the
//! ledger or republishing. Publish, journal and watcher errors are fatal.

use crate::command::Command;
use crate::error::{LedgerError, Result};
use crate::event::EventId;
use crate::journal::TransactionLog;
use crate::ledger::Ledger;
use crate::scheduler::{Alarm, FireOutcome, Scheduler};
use crate::snapshot::StatusSink;
use crate::stats::Stats;
use crate::timer::Firing;
use crate::tokenizer::tokenize;
use crate::transaction::TransactionId;
use crate::watcher::{ControlInput, WatchEvent};
use chrono::{Datelike, Local, NaiveDate};
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// How often [`LedgerEngine::run`] checks whether the month rolled over.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Everything the control loop reacts to.
#[derive(Debug)]
pub enum ControlEvent {
    /// Raw bytes from the control file
    Data(Vec<u8>),

    /// The control file was truncated or replaced
    Restart,

    /// Periodic check against the given local date
    Refresh(NaiveDate),

    /// The control file watcher stopped
    WatcherFailed(io::Error),

    /// An event's due date was reached
    Fired(Firing),

    Shutdown,
}

/// Whether the loop keeps running after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// What an accepted command added to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Transaction(TransactionId),
    Event(EventId),
}

/// Ledger, active events and the status sink, driven by [`ControlEvent`]s.
pub struct LedgerEngine<A: Alarm, S: StatusSink> {
    ledger: Ledger,
    scheduler: Scheduler<A>,
    sink: S,
    journal: Option<TransactionLog>,
    /// Bytes of the line being assembled
    pending: Vec<u8>,
    refresh_interval: Duration,
    /// Year and month of the last published snapshot
    published_month: Option<(i32, u32)>,
}

impl<A: Alarm, S: StatusSink> LedgerEngine<A, S> {
    /// Creates an engine with an empty ledger.
    pub fn new(alarm: A, sink: S) -> Self {
        LedgerEngine {
            ledger: Ledger::new(),
            scheduler: Scheduler::new(alarm),
            sink,
            journal: None,
            pending: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            published_month: None,
        }
    }

    /// Appends every realized transaction to `journal` as well.
    pub fn with_journal(mut self, journal: TransactionLog) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Sets how often [`run`](Self::run) looks for a month rollover.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Tokenizes, validates and applies one control line. Does not publish.
    pub fn execute(&mut self, line: &str) -> Result<Applied> {
        let fields = tokenize(line)?;
        let command = Command::parse(&fields)?;
        self.apply(command)
    }

    /// Applies an already validated command.
    pub fn apply(&mut self, command: Command) -> Result<Applied> {
        match command {
            Command::Transaction(draft) => {
                debug!("Recording transaction '{}' {}", draft.name, draft.amount);
                let id = self.ledger.record(draft);
                self.journal_latest()?;
                Ok(Applied::Transaction(id))
            }
            Command::Event(draft) => {
                let id = self.ledger.allocate_event_id();
                self.scheduler.register(draft.into_event(id));
                Ok(Applied::Event(id))
            }
        }
    }

    /// Realizes a due event. Unknown ids are a no-op.
    pub fn fire(&mut self, id: EventId) -> Result<FireOutcome> {
        let outcome = self.scheduler.on_fire(id, &mut self.ledger);
        if outcome.transaction().is_some() {
            self.journal_latest()?;
        }
        Ok(outcome)
    }

    /// Snapshot for the current local month.
    pub fn stats(&self) -> Stats {
        self.stats_at(Local::now().date_naive())
    }

    /// Snapshot for the month containing `today`.
    pub fn stats_at(&self, today: NaiveDate) -> Stats {
        Stats::aggregate(self.ledger.transactions(), self.scheduler.events(), today)
    }

    /// Recomputes the snapshot and hands it to the sink.
    pub fn publish(&mut self) -> Result<()> {
        self.publish_at(Local::now().date_naive())
    }

    /// Publishes the snapshot for the month containing `today`.
    pub fn publish_at(&mut self, today: NaiveDate) -> Result<()> {
        let stats = self.stats_at(today);
        self.sink.publish(&stats)?;
        self.published_month = Some((today.year(), today.month()));
        Ok(())
    }

    /// Drops everything built from the previous control stream.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.ledger.reset();
        self.scheduler.clear();
    }

    /// Processes one input.
    pub fn handle(&mut self, event: ControlEvent) -> Result<Flow> {
        match event {
            ControlEvent::Data(bytes) => {
                self.consume(&bytes)?;
                Ok(Flow::Continue)
            }
            ControlEvent::Restart => {
                info!("Control file restarted, dropping current ledger and events");
                self.reset();
                self.publish()?;
                Ok(Flow::Continue)
            }
            ControlEvent::Refresh(today) => {
                if self.published_month != Some((today.year(), today.month())) {
                    debug!("Month changed, republishing for {}", today);
                    self.publish_at(today)?;
                }
                Ok(Flow::Continue)
            }
            ControlEvent::Fired(firing) => {
                debug!("Event {} fired at {}", firing.event_id, firing.fired_at);
                if self.fire(firing.event_id)? != FireOutcome::Ignored {
                    self.publish()?;
                }
                Ok(Flow::Continue)
            }
            ControlEvent::WatcherFailed(e) => Err(LedgerError::Watcher(e)),
            ControlEvent::Shutdown => {
                info!("Shutdown requested");
                self.scheduler.shutdown();
                Ok(Flow::Stop)
            }
        }
    }

    /// Multiplexes the watcher, the firings, the refresh timer and the
    /// shutdown signal into [`handle`](Self::handle) until shutdown or a
    /// fatal error. Pending wake-ups are cancelled on the way out.
    pub async fn run<F>(
        &mut self,
        mut control: mpsc::Receiver<ControlInput>,
        mut firings: mpsc::UnboundedReceiver<Firing>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut refresh = tokio::time::interval(self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        refresh.tick().await;

        let result = loop {
            let event = tokio::select! {
                _ = &mut shutdown => ControlEvent::Shutdown,
                Some(input) = control.recv() => match input {
                    Ok(WatchEvent::Data(bytes)) => ControlEvent::Data(bytes),
                    Ok(WatchEvent::Restart) => ControlEvent::Restart,
                    Err(e) => ControlEvent::WatcherFailed(e),
                },
                Some(firing) = firings.recv() => ControlEvent::Fired(firing),
                _ = refresh.tick() => ControlEvent::Refresh(Local::now().date_naive()),
            };

            match self.handle(event) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.scheduler.shutdown();
        result
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &Scheduler<A> {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn consume(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.pending);
                self.process_line(line)?;
            } else {
                self.pending.push(byte);
            }
        }
        Ok(())
    }

    fn process_line(&mut self, mut raw: Vec<u8>) -> Result<()> {
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }

        let applied = String::from_utf8(raw)
            .map_err(|_| LedgerError::Encoding)
            .and_then(|line| self.execute(&line));

        match applied {
            Ok(applied) => {
                debug!("Applied {:?}", applied);
                self.publish()
            }
            Err(e) if e.is_recoverable() => {
                warn!("Ignoring control line: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Writes the most recently recorded transaction to the journal.
    fn journal_latest(&mut self) -> Result<()> {
        let journal = match self.journal.as_mut() {
            Some(journal) => journal,
            None => return Ok(()),
        };
        match self.ledger.transactions().last() {
            Some(tx) => journal.append(tx),
            None => Ok(()),
        }
    }
}
