//! Entity state and request bookkeeping

use crate::core::error::ErrorInfo;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;

/// Identifies one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    slot: Option<&'static str>,
    seq: u64,
}

/// In-flight counter plus per-slot dispatch/apply sequence numbers
///
/// `loading` is derived from the counter, so overlapping requests keep the
/// flag raised until the last one resolves. A reset starts a new epoch;
/// tickets from an older epoch are stale and must not touch state or cache.
#[derive(Debug, Clone, Default)]
pub struct RequestLedger {
    in_flight: usize,
    epoch: u64,
    dispatched: HashMap<&'static str, u64>,
    applied: HashMap<&'static str, u64>,
}

impl RequestLedger {
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn begin(&mut self, slot: Option<&'static str>) -> Ticket {
        self.in_flight += 1;
        let seq = match slot {
            Some(name) => {
                let counter = self.dispatched.entry(name).or_insert(0);
                *counter += 1;
                *counter
            }
            None => 0,
        };
        Ticket {
            epoch: self.epoch,
            slot,
            seq,
        }
    }

    /// Release the in-flight count held by `ticket`
    pub fn finish(&mut self, ticket: Ticket) {
        if ticket.epoch == self.epoch {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
    }

    /// Whether `ticket` was dispatched in the current epoch
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Whether a newer request for the same slot has already been applied
    pub fn is_superseded(&self, ticket: Ticket) -> bool {
        match ticket.slot {
            Some(name) => self.applied.get(name).is_some_and(|&applied| applied > ticket.seq),
            None => false,
        }
    }

    pub fn mark_applied(&mut self, ticket: Ticket) {
        if let Some(name) = ticket.slot {
            let applied = self.applied.entry(name).or_insert(0);
            *applied = (*applied).max(ticket.seq);
        }
    }

    pub fn reset(&mut self) {
        self.epoch += 1;
        self.in_flight = 0;
        self.dispatched.clear();
        self.applied.clear();
    }
}

/// State that records request outcomes
pub trait Tracked {
    fn ledger(&self) -> &RequestLedger;

    fn ledger_mut(&mut self) -> &mut RequestLedger;

    fn record_success(&mut self, status: u16);

    fn record_failure(&mut self, error: &ErrorInfo);

    fn set_message(&mut self, message: Option<String>);

    fn loading(&self) -> bool {
        self.ledger().loading()
    }
}

/// Mirror of one resource plus the outcome of its latest request
#[derive(Debug, Clone, Serialize)]
pub struct EntityState<T> {
    pub collection: Option<Vec<T>>,
    pub current: Option<T>,
    pub error: Option<ErrorInfo>,
    pub status: Option<u16>,
    /// Server message of the latest upload, role change or delete
    pub message: Option<String>,
    #[serde(skip)]
    ledger: RequestLedger,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            collection: None,
            current: None,
            error: None,
            status: None,
            message: None,
            ledger: RequestLedger::default(),
        }
    }
}

impl<T> EntityState<T> {
    pub fn loading(&self) -> bool {
        self.ledger.loading()
    }

    /// Drop all data and start a new request epoch
    pub fn reset(&mut self) {
        self.collection = None;
        self.current = None;
        self.error = None;
        self.status = None;
        self.message = None;
        self.ledger.reset();
    }
}

impl<T> Tracked for EntityState<T> {
    fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut RequestLedger {
        &mut self.ledger
    }

    fn record_success(&mut self, status: u16) {
        self.status = Some(status);
        self.error = None;
    }

    fn record_failure(&mut self, error: &ErrorInfo) {
        self.status = error.status_code;
        self.error = Some(error.clone());
    }

    fn set_message(&mut self, message: Option<String>) {
        self.message = message;
    }
}

/// Target of a request's payload inside some state `S`
pub trait Slot<S>: Copy {
    type Value;

    /// Name used to order responses; `None` opts out of ordering
    fn name(self) -> Option<&'static str>;

    /// Store a successful payload, or `None` after a failure
    fn assign(self, state: &mut S, value: Option<Self::Value>);
}

/// `EntityState::collection`
#[derive(Debug, Clone, Copy)]
pub struct Collection;

impl<T> Slot<EntityState<T>> for Collection {
    type Value = Vec<T>;

    fn name(self) -> Option<&'static str> {
        Some("collection")
    }

    fn assign(self, state: &mut EntityState<T>, value: Option<Vec<T>>) {
        state.collection = value;
    }
}

/// `EntityState::current`
#[derive(Debug, Clone, Copy)]
pub struct Current;

impl<T> Slot<EntityState<T>> for Current {
    type Value = T;

    fn name(self) -> Option<&'static str> {
        Some("current")
    }

    fn assign(self, state: &mut EntityState<T>, value: Option<T>) {
        state.current = value;
    }
}

/// Responses that carry a displayable server message
pub trait Notice {
    fn notice(&self) -> Option<String>;
}

impl Notice for crate::api::Ack {
    fn notice(&self) -> Option<String> {
        self.message.clone()
    }
}

impl Notice for crate::api::UploadSummary {
    fn notice(&self) -> Option<String> {
        self.resolved_message().map(str::to_string)
    }
}

/// The state's `message`, fed from a [`Notice`] response
pub struct Message<V>(PhantomData<fn() -> V>);

impl<V> Message<V> {
    pub fn new() -> Self {
        Message(PhantomData)
    }
}

impl<V> Default for Message<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Message<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Message<V> {}

impl<S: Tracked, V: Notice> Slot<S> for Message<V> {
    type Value = V;

    fn name(self) -> Option<&'static str> {
        None
    }

    fn assign(self, state: &mut S, value: Option<V>) {
        state.set_message(value.and_then(|v| v.notice()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_follows_in_flight_count() {
        let mut ledger = RequestLedger::default();
        let first = ledger.begin(Some("collection"));
        let second = ledger.begin(Some("collection"));
        assert!(ledger.loading());

        ledger.finish(first);
        assert!(ledger.loading());
        ledger.finish(second);
        assert!(!ledger.loading());
    }

    #[test]
    fn test_superseded_by_newer_dispatch() {
        let mut ledger = RequestLedger::default();
        let older = ledger.begin(Some("collection"));
        let newer = ledger.begin(Some("collection"));
        let other_slot = ledger.begin(Some("current"));

        ledger.mark_applied(newer);
        assert!(ledger.is_superseded(older));
        assert!(!ledger.is_superseded(newer));
        assert!(!ledger.is_superseded(other_slot));
    }

    #[test]
    fn test_reset_makes_tickets_stale() {
        let mut ledger = RequestLedger::default();
        let ticket = ledger.begin(Some("collection"));
        ledger.reset();

        assert!(!ledger.is_current(ticket));
        assert!(!ledger.loading());

        // A stale finish must not underflow the new epoch's counter
        let fresh = ledger.begin(Some("collection"));
        ledger.finish(ticket);
        assert!(ledger.loading());
        ledger.finish(fresh);
        assert!(!ledger.loading());
    }

    #[test]
    fn test_failure_then_success_clears_error() {
        let mut state = EntityState::<u32>::default();
        state.record_failure(&ErrorInfo::http(422, "invalid"));
        assert_eq!(state.status, Some(422));
        assert!(state.error.is_some());

        state.record_success(200);
        assert_eq!(state.status, Some(200));
        assert!(state.error.is_none());
    }
}
