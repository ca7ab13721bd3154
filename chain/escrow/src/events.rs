//! Ledger events
//!
//! Every successful mutation appends exactly one immutable record to the
//! ledger's [`EventLog`]. Consumers poll the log by sequence number or
//! register an [`EventObserver`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use types::ids::{AccountId, AssetId, OperationId};
use types::numeric::Amount;
use uuid::Uuid;

/// Asset added to the allowlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAdded {
    pub asset: AssetId,
    pub added_by: AccountId,
}

/// Operation created and its deposit taken into custody
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCreated {
    pub operation_id: OperationId,
    pub creator: AccountId,
    pub token_a: AssetId,
    pub token_b: AssetId,
    pub amount_a: Amount,
    pub amount_b: Amount,
}

/// Operation fulfilled by a counterparty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCompleted {
    pub operation_id: OperationId,
    pub creator: AccountId,
    pub completer: AccountId,
    pub token_a: AssetId,
    pub token_b: AssetId,
    pub amount_a: Amount,
    pub amount_b: Amount,
}

/// Operation withdrawn by its creator and the deposit returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCancelled {
    pub operation_id: OperationId,
    pub creator: AccountId,
    pub token_a: AssetId,
    pub amount_a: Amount,
}

/// Enum wrapper for all ledger events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    AssetAdded(AssetAdded),
    OperationCreated(OperationCreated),
    OperationCompleted(OperationCompleted),
    OperationCancelled(OperationCancelled),
}

impl LedgerEvent {
    /// Label for logging.
    pub fn event_type_label(&self) -> &'static str {
        match self {
            LedgerEvent::AssetAdded(_) => "asset_added",
            LedgerEvent::OperationCreated(_) => "operation_created",
            LedgerEvent::OperationCompleted(_) => "operation_completed",
            LedgerEvent::OperationCancelled(_) => "operation_cancelled",
        }
    }

    /// The operation this event concerns, if any.
    pub fn operation_id(&self) -> Option<OperationId> {
        match self {
            LedgerEvent::AssetAdded(_) => None,
            LedgerEvent::OperationCreated(e) => Some(e.operation_id),
            LedgerEvent::OperationCompleted(e) => Some(e.operation_id),
            LedgerEvent::OperationCancelled(e) => Some(e.operation_id),
        }
    }
}

/// Envelope stored in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    /// Position in the log, starting at 0, no gaps.
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// Subscriber notified synchronously of each appended record.
pub trait EventObserver {
    fn on_event(&self, record: &EventRecord);
}

/// Append-only event log.
///
/// Records reach observers strictly in sequence order. A record appended
/// while observers are being notified (an observer calling back into the
/// ledger) is queued and delivered by the outermost `emit` once every
/// observer has seen the current record. Observers may subscribe from
/// inside `on_event`; they receive records delivered after that point.
#[derive(Default)]
pub struct EventLog {
    records: RefCell<Vec<EventRecord>>,
    observers: RefCell<Vec<Rc<dyn EventObserver>>>,
    pending: RefCell<VecDeque<EventRecord>>,
    delivering: Cell<bool>,
}

/// Clears the delivery flag on drop, including when an observer panics.
struct Delivery<'a>(&'a Cell<bool>);

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and notify observers. Returns the new record.
    pub fn emit(&self, event: LedgerEvent) -> EventRecord {
        let record = {
            let mut records = self.records.borrow_mut();
            let record = EventRecord {
                event_id: Uuid::now_v7(),
                sequence: records.len() as u64,
                recorded_at: Utc::now(),
                event,
            };
            records.push(record.clone());
            record
        };
        self.pending.borrow_mut().push_back(record.clone());

        if self.delivering.replace(true) {
            return record;
        }
        let _delivery = Delivery(&self.delivering);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(next) = next else {
                break;
            };
            let observers: Vec<Rc<dyn EventObserver>> = self.observers.borrow().clone();
            for observer in observers {
                observer.on_event(&next);
            }
        }
        record
    }

    pub fn subscribe(&self, observer: Box<dyn EventObserver>) {
        self.observers.borrow_mut().push(Rc::from(observer));
    }

    /// Get all emitted events.
    pub fn events(&self) -> Vec<EventRecord> {
        self.records.borrow().clone()
    }

    /// Records with `sequence >= from`, for polling consumers.
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        let skip = usize::try_from(from).unwrap_or(usize::MAX);
        self.records
            .borrow()
            .iter()
            .skip(skip)
            .cloned()
            .collect()
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("records", &self.records.borrow().len())
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: u64) -> LedgerEvent {
        LedgerEvent::OperationCreated(OperationCreated {
            operation_id: OperationId::new(id),
            creator: AccountId::new(),
            token_a: AssetId::new("BTC"),
            token_b: AssetId::new("USDT"),
            amount_a: Amount::from(1),
            amount_b: Amount::from(50_000),
        })
    }

    #[test]
    fn test_operation_created_serialization() {
        let event = created(0);
        let json = serde_json::to_string(&event).unwrap();
        let deser: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_event_record_serialization() {
        let log = EventLog::new();
        let record = log.emit(LedgerEvent::AssetAdded(AssetAdded {
            asset: AssetId::new("ETH"),
            added_by: AccountId::new(),
        }));
        let json = serde_json::to_string(&record).unwrap();
        let deser: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deser);
    }

    #[test]
    fn test_sequences_are_contiguous() {
        let log = EventLog::new();
        for i in 0..5 {
            log.emit(created(i));
        }
        let sequences: Vec<u64> = log.events().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_events_since() {
        let log = EventLog::new();
        for i in 0..4 {
            log.emit(created(i));
        }
        let tail = log.events_since(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence, 2);
        assert!(log.events_since(10).is_empty());
    }

    #[test]
    fn test_observer_notified_in_order() {
        struct Recorder(Rc<RefCell<Vec<u64>>>);

        impl EventObserver for Recorder {
            fn on_event(&self, record: &EventRecord) {
                self.0.borrow_mut().push(record.sequence);
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = EventLog::new();
        log.subscribe(Box::new(Recorder(seen.clone())));
        log.emit(created(0));
        log.emit(created(1));

        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_nested_emit_delivered_after_current_record() {
        // First observer emits a follow-up record while handling sequence 0.
        struct Echo {
            log: Rc<EventLog>,
        }

        impl EventObserver for Echo {
            fn on_event(&self, record: &EventRecord) {
                if record.sequence == 0 {
                    self.log.emit(created(99));
                }
            }
        }

        struct Recorder(Rc<RefCell<Vec<u64>>>);

        impl EventObserver for Recorder {
            fn on_event(&self, record: &EventRecord) {
                self.0.borrow_mut().push(record.sequence);
            }
        }

        let log = Rc::new(EventLog::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        log.subscribe(Box::new(Echo { log: log.clone() }));
        log.subscribe(Box::new(Recorder(seen.clone())));

        log.emit(created(0));
        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert!(!log.delivering.get());
        assert!(log.pending.borrow().is_empty());
    }

    #[test]
    fn test_subscribe_from_observer() {
        struct Recorder(Rc<RefCell<Vec<u64>>>);

        impl EventObserver for Recorder {
            fn on_event(&self, record: &EventRecord) {
                self.0.borrow_mut().push(record.sequence);
            }
        }

        struct Recruiter {
            log: Rc<EventLog>,
            late: Rc<RefCell<Vec<u64>>>,
        }

        impl EventObserver for Recruiter {
            fn on_event(&self, record: &EventRecord) {
                if record.sequence == 0 {
                    self.log.subscribe(Box::new(Recorder(self.late.clone())));
                }
            }
        }

        let log = Rc::new(EventLog::new());
        let late = Rc::new(RefCell::new(Vec::new()));
        log.subscribe(Box::new(Recruiter {
            log: log.clone(),
            late: late.clone(),
        }));

        log.emit(created(0));
        log.emit(created(1));
        assert_eq!(*late.borrow(), vec![1]);
    }

    #[test]
    fn test_events_since_beyond_end() {
        let log = EventLog::new();
        log.emit(created(0));
        assert!(log.events_since(u64::MAX).is_empty());
    }

    #[test]
    fn test_event_labels() {
        assert_eq!(created(3).event_type_label(), "operation_created");
        assert_eq!(created(3).operation_id(), Some(OperationId::new(3)));
    }
}
