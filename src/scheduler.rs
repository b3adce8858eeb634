//! Active recurring events and their re-arming protocol.
//!
//! Every active event has exactly one pending wake-up. A firing turns the
//! event into a transaction, then either moves the event to its next date
//! and arms a new wake-up, or retires it. Firings for ids that are no longer
//! active are ignored, which covers a wake-up that raced with retirement.

use crate::event::{Event, EventId, Occurrences};
use crate::ledger::Ledger;
use crate::transaction::TransactionId;
use chrono::NaiveDate;
use log::{debug, error};
use std::collections::BTreeMap;

/// Backend that delivers a wake-up for an event once its due date arrives.
pub trait Alarm {
    /// Schedules a wake-up, replacing any pending one for the same event.
    fn arm(&mut self, event: EventId, due: NaiveDate);

    /// Cancels the pending wake-up of an event, if any.
    fn disarm(&mut self, event: EventId);

    /// Cancels every pending wake-up.
    fn disarm_all(&mut self);
}

/// What a firing did to the event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The id was not active; nothing changed.
    Ignored,

    /// A transaction was recorded and the event re-armed at `next`.
    Rearmed {
        transaction: TransactionId,
        next: NaiveDate,
    },

    /// A transaction was recorded and the event removed.
    Retired { transaction: TransactionId },
}

impl FireOutcome {
    /// Transaction recorded by the firing, if any.
    pub fn transaction(&self) -> Option<TransactionId> {
        match self {
            FireOutcome::Ignored => None,
            FireOutcome::Rearmed { transaction, .. } | FireOutcome::Retired { transaction } => {
                Some(*transaction)
            }
        }
    }
}

/// Owns the active events, keyed (and therefore ordered) by id.
pub struct Scheduler<A: Alarm> {
    events: BTreeMap<EventId, Event>,
    alarm: A,
}

impl<A: Alarm> Scheduler<A> {
    pub fn new(alarm: A) -> Self {
        Scheduler {
            events: BTreeMap::new(),
            alarm,
        }
    }

    /// Activates an event and arms its first wake-up.
    pub fn register(&mut self, event: Event) {
        debug!(
            "Registering event {} '{}' due {} ({} remaining)",
            event.id,
            event.name,
            event.date,
            event.remaining.counter()
        );
        self.alarm.arm(event.id, event.date);
        self.events.insert(event.id, event);
    }

    /// Handles a wake-up for `id`.
    pub fn on_fire(&mut self, id: EventId, ledger: &mut Ledger) -> FireOutcome {
        let event = match self.events.get_mut(&id) {
            Some(event) => event,
            None => {
                debug!("Firing for inactive event {}, ignoring", id);
                return FireOutcome::Ignored;
            }
        };

        let transaction = ledger.record(event.realize());

        let remaining = match event.remaining {
            Occurrences::Forever => Some(Occurrences::Forever),
            Occurrences::Times(n) if n > 1 => Some(Occurrences::Times(n - 1)),
            Occurrences::Times(_) => None,
        };

        let next = match remaining {
            Some(remaining) => match event.step.advance(event.date) {
                Some(next) => {
                    event.date = next;
                    event.remaining = remaining;
                    Some(next)
                }
                None => {
                    error!(
                        "Event {} cannot advance past {} by {}, retiring it",
                        id, event.date, event.step
                    );
                    None
                }
            },
            None => None,
        };

        match next {
            Some(next) => {
                debug!("Event {} fired as transaction {}, next due {}", id, transaction, next);
                self.alarm.arm(id, next);
                FireOutcome::Rearmed { transaction, next }
            }
            None => {
                debug!("Event {} fired as transaction {}, retired", id, transaction);
                self.events.remove(&id);
                self.alarm.disarm(id);
                FireOutcome::Retired { transaction }
            }
        }
    }

    /// Active events in registration order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Cancels all pending wake-ups. Events stay in place but never fire again.
    pub fn shutdown(&mut self) {
        debug!("Cancelling {} pending wake-ups", self.events.len());
        self.alarm.disarm_all();
    }

    /// Drops every active event and cancels their wake-ups.
    pub fn clear(&mut self) {
        debug!("Dropping {} active events", self.events.len());
        self.alarm.disarm_all();
        self.events.clear();
    }

    pub fn alarm(&self) -> &A {
        &self.alarm
    }
}

/// Alarm that only records what it was asked to do; firings are driven by hand.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ManualAlarm {
    pub armed: BTreeMap<EventId, NaiveDate>,
    pub history: Vec<(EventId, NaiveDate)>,
}

#[cfg(test)]
impl Alarm for ManualAlarm {
    fn arm(&mut self, event: EventId, due: NaiveDate) {
        self.armed.insert(event, due);
        self.history.push((event, due));
    }

    fn disarm(&mut self, event: EventId) {
        self.armed.remove(&event);
    }

    fn disarm_all(&mut self) {
        self.armed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::event::{EventDraft, Step};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn register(
        scheduler: &mut Scheduler<ManualAlarm>,
        ledger: &mut Ledger,
        remaining: Occurrences,
        step: Step,
    ) -> EventId {
        let id = ledger.allocate_event_id();
        let event = EventDraft {
            name: "rent".into(),
            description: "flat".into(),
            date: date(2020, 1, 1),
            remaining,
            step,
            amount: Amount::from(-1000),
        }
        .into_event(id);
        scheduler.register(event);
        id
    }

    #[test]
    fn test_register_arms_at_event_date() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        let id = register(&mut scheduler, &mut ledger, Occurrences::Times(1), Step::default());

        assert_eq!(scheduler.alarm().armed.get(&id), Some(&date(2020, 1, 1)));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_single_occurrence_retires() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        let id = register(&mut scheduler, &mut ledger, Occurrences::Times(1), Step::default());

        let outcome = scheduler.on_fire(id, &mut ledger);
        assert_eq!(
            outcome,
            FireOutcome::Retired {
                transaction: TransactionId(0)
            }
        );
        assert!(scheduler.is_empty());
        assert!(scheduler.alarm().armed.is_empty());
        assert_eq!(ledger.len(), 1);

        // spurious second firing
        assert_eq!(scheduler.on_fire(id, &mut ledger), FireOutcome::Ignored);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_counted_event_decrements_then_retires() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        let id = register(&mut scheduler, &mut ledger, Occurrences::Times(3), Step::new(0, 1, 0));

        scheduler.on_fire(id, &mut ledger);
        assert_eq!(scheduler.get(id).unwrap().remaining.counter(), 2);
        scheduler.on_fire(id, &mut ledger);
        assert_eq!(scheduler.get(id).unwrap().remaining.counter(), 1);
        assert_eq!(scheduler.get(id).unwrap().date, date(2020, 3, 1));

        let outcome = scheduler.on_fire(id, &mut ledger);
        assert!(matches!(outcome, FireOutcome::Retired { .. }));
        assert!(scheduler.get(id).is_none());

        let dates: Vec<_> = ledger.transactions().iter().map(|tx| tx.date).collect();
        assert_eq!(dates, vec![date(2020, 1, 1), date(2020, 2, 1), date(2020, 3, 1)]);
    }

    #[test]
    fn test_infinite_event_never_decrements() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        let id = register(&mut scheduler, &mut ledger, Occurrences::Forever, Step::new(0, 0, 7));

        for _ in 0..10 {
            assert!(matches!(
                scheduler.on_fire(id, &mut ledger),
                FireOutcome::Rearmed { .. }
            ));
        }

        let event = scheduler.get(id).unwrap();
        assert_eq!(event.remaining.counter(), -1);
        assert_eq!(event.date, date(2020, 3, 11));
        assert_eq!(ledger.len(), 10);

        let dates: Vec<_> = ledger.transactions().iter().map(|tx| tx.date).collect();
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_rearm_replaces_pending_wakeup() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        let id = register(&mut scheduler, &mut ledger, Occurrences::Times(2), Step::new(0, 1, 0));

        scheduler.on_fire(id, &mut ledger);

        assert_eq!(scheduler.alarm().armed.len(), 1);
        assert_eq!(scheduler.alarm().armed.get(&id), Some(&date(2020, 2, 1)));
        assert_eq!(
            scheduler.alarm().history,
            vec![(id, date(2020, 1, 1)), (id, date(2020, 2, 1))]
        );
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());

        assert_eq!(scheduler.on_fire(EventId(42), &mut ledger), FireOutcome::Ignored);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_shutdown_disarms_everything() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        register(&mut scheduler, &mut ledger, Occurrences::Forever, Step::new(0, 1, 0));
        register(&mut scheduler, &mut ledger, Occurrences::Times(4), Step::new(1, 0, 0));

        scheduler.shutdown();
        assert!(scheduler.alarm().armed.is_empty());
    }

    #[test]
    fn test_clear_drops_events_and_wakeups() {
        let mut ledger = Ledger::new();
        let mut scheduler = Scheduler::new(ManualAlarm::default());
        let id = register(&mut scheduler, &mut ledger, Occurrences::Forever, Step::new(0, 1, 0));

        scheduler.clear();
        assert!(scheduler.is_empty());
        assert!(scheduler.alarm().armed.is_empty());

        // a wake-up already in flight finds nothing to fire
        assert_eq!(scheduler.on_fire(id, &mut ledger), FireOutcome::Ignored);
        assert!(ledger.is_empty());
    }
}
