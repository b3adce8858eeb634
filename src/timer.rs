//! Tokio-backed wake-ups for scheduled events.
//!
//! Each armed event gets its own task that sleeps until local midnight of
//! the due date and then sends a [`Firing`] to the control loop. The task
//! touches no ledger state. Sleeps are taken in naps of at most an hour and
//! re-checked against the wall clock, so suspend/resume and clock changes
//! do not make a wake-up drift.

use crate::event::EventId;
use crate::scheduler::Alarm;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

const MAX_NAP: Duration = Duration::from_secs(60 * 60);

/// Notification that an event's due date has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub event_id: EventId,
    pub fired_at: DateTime<Local>,
}

/// Spawns one cancellable task per armed event.
///
/// Must be used from inside a tokio runtime.
pub struct TokioAlarm {
    firings: UnboundedSender<Firing>,
    pending: HashMap<EventId, JoinHandle<()>>,
}

impl TokioAlarm {
    pub fn new(firings: UnboundedSender<Firing>) -> Self {
        TokioAlarm {
            firings,
            pending: HashMap::new(),
        }
    }

    /// Number of wake-up tasks that have not been cancelled or replaced.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Alarm for TokioAlarm {
    fn arm(&mut self, event: EventId, due: NaiveDate) {
        let firings = self.firings.clone();
        let handle = tokio::spawn(async move {
            sleep_until(due).await;
            let firing = Firing {
                event_id: event,
                fired_at: Local::now(),
            };
            if firings.send(firing).is_err() {
                debug!("Control loop gone, dropping firing for event {}", event);
            }
        });

        if let Some(previous) = self.pending.insert(event, handle) {
            previous.abort();
        }
    }

    fn disarm(&mut self, event: EventId) {
        if let Some(handle) = self.pending.remove(&event) {
            handle.abort();
        }
    }

    fn disarm_all(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

impl Drop for TokioAlarm {
    fn drop(&mut self) {
        self.disarm_all();
    }
}

/// Start of `due` in the local time zone.
pub fn due_instant(due: NaiveDate) -> DateTime<Local> {
    let midnight = due.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(instant) => instant,
        // midnight skipped by a DST jump
        None => Local.from_utc_datetime(&midnight),
    }
}

async fn sleep_until(due: NaiveDate) {
    let deadline = due_instant(due);
    loop {
        match (deadline - Local::now()).to_std() {
            Ok(left) if !left.is_zero() => tokio::time::sleep(left.min(MAX_NAP)).await,
            _ => break,
        }
    }
}
