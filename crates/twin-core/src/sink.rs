//! Observers for engine transitions.
//!
//! The matcher reports every transition through an [`EventSink`] it was
//! handed at construction. [`TracingSink`] writes them to the `tracing`
//! pipeline; a `Vec<EngineEvent>` collects them for inspection.

use crate::buffer::BufferEntry;
use crate::engine::{Match, Outcome, Processed};
use crate::record::Record;
use crate::time::Timestamp;

/// Receiver of engine transitions.
pub trait EventSink {
    /// Entries purged at `now`. Never called with an empty slice.
    fn expired(&mut self, entries: &[BufferEntry], now: Timestamp);
    fn matched(&mut self, m: &Match);
    fn buffered(&mut self, entry: &BufferEntry);
    fn rejected(&mut self, record: &Record);
}

/// Forward one processing result to `sink`: the purge first (if anything
/// expired), then exactly one outcome event.
pub fn dispatch<S: EventSink + ?Sized>(sink: &mut S, processed: &Processed, now: Timestamp) {
    if !processed.expired.is_empty() {
        sink.expired(&processed.expired, now);
    }
    match &processed.outcome {
        Outcome::Matched(m) => sink.matched(m),
        Outcome::Buffered(entry) => sink.buffered(entry),
        Outcome::Rejected(record) => sink.rejected(record),
    }
}

/// Owned copy of a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    Expired {
        entries: Vec<BufferEntry>,
        now: Timestamp,
    },
    Matched(Match),
    Buffered(BufferEntry),
    Rejected(Record),
}

impl EventSink for Vec<EngineEvent> {
    fn expired(&mut self, entries: &[BufferEntry], now: Timestamp) {
        self.push(EngineEvent::Expired {
            entries: entries.to_vec(),
            now,
        });
    }

    fn matched(&mut self, m: &Match) {
        self.push(EngineEvent::Matched(m.clone()));
    }

    fn buffered(&mut self, entry: &BufferEntry) {
        self.push(EngineEvent::Buffered(entry.clone()));
    }

    fn rejected(&mut self, record: &Record) {
        self.push(EngineEvent::Rejected(record.clone()));
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn expired(&mut self, entries: &[BufferEntry], now: Timestamp) {
        (**self).expired(entries, now)
    }

    fn matched(&mut self, m: &Match) {
        (**self).matched(m)
    }

    fn buffered(&mut self, entry: &BufferEntry) {
        (**self).buffered(entry)
    }

    fn rejected(&mut self, record: &Record) {
        (**self).rejected(record)
    }
}

/// Logs every transition under the `twin::matcher` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn expired(&mut self, entries: &[BufferEntry], now: Timestamp) {
        for entry in entries {
            tracing::debug!(
                target: "twin::matcher",
                record = %entry.record,
                inserted_at = %entry.inserted_at,
                age_ms = entry.age_at(now).as_millis() as u64,
                "expired entry"
            );
        }
        tracing::info!(target: "twin::matcher", count = entries.len(), %now, "expired entries purged");
    }

    fn matched(&mut self, m: &Match) {
        tracing::info!(
            target: "twin::matcher",
            incoming = %m.incoming,
            found = %m.found.record,
            found_at = %m.found.inserted_at,
            score = m.score.value(),
            "matched"
        );
    }

    fn buffered(&mut self, entry: &BufferEntry) {
        tracing::debug!(
            target: "twin::matcher",
            record = %entry.record,
            inserted_at = %entry.inserted_at,
            "buffered"
        );
    }

    fn rejected(&mut self, record: &Record) {
        tracing::warn!(target: "twin::matcher", %record, "rejected malformed record");
    }
}
