//! Match engine core.
//!
//! Every incoming record goes through the same two steps: purge expired
//! entries, then pair the record with the best-scoring survivor or buffer
//! it. The engine owns its buffer outright and is driven from one thread.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::buffer::{BufferEntry, RecencyBuffer};
use crate::record::{Record, Score};
use crate::time::Timestamp;

/// Default time-to-live for buffered records.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// What to do with a record whose identifiers are both empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MalformedPolicy {
    /// Reject before purging or scoring; the buffer is not touched.
    #[default]
    Drop,
    /// Treat it like any other record.
    Accept,
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MalformedPolicy::Drop => "drop",
            MalformedPolicy::Accept => "accept",
        })
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(MalformedPolicy::Drop),
            "accept" => Ok(MalformedPolicy::Accept),
            other => Err(format!("unknown malformed-record policy `{other}`")),
        }
    }
}

/// Engine settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Age at which a buffered record is purged.
    pub delay: Duration,
    pub malformed: MalformedPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            malformed: MalformedPolicy::default(),
        }
    }
}

/// An incoming record paired with a buffered one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub incoming: Record,
    pub found: BufferEntry,
    pub score: Score,
}

/// How an incoming record was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Paired with a buffered record, which left the buffer.
    Matched(Match),
    /// No candidate; the record now sits at the newest position.
    Buffered(BufferEntry),
    /// Malformed and dropped under [`MalformedPolicy::Drop`].
    Rejected(Record),
}

/// Result of processing one record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Processed {
    /// Entries purged before scoring, newest first.
    pub expired: Vec<BufferEntry>,
    pub outcome: Outcome,
}

/// Running outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub processed: u64,
    pub matched_full: u64,
    pub matched_partial: u64,
    pub buffered: u64,
    pub expired: u64,
    pub rejected: u64,
}

impl EngineStats {
    #[inline]
    pub fn matched(&self) -> u64 {
        self.matched_full + self.matched_partial
    }
}

/// The match engine.
#[derive(Debug)]
pub struct MatchEngine {
    buffer: RecencyBuffer,
    config: EngineConfig,
    stats: EngineStats,
}

impl MatchEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            buffer: RecencyBuffer::new(),
            config,
            stats: EngineStats::default(),
        }
    }

    /// Engine with default settings and the given delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self::new(EngineConfig {
            delay,
            ..EngineConfig::default()
        })
    }

    /// Handle one incoming record observed at `now`.
    ///
    /// `now` must not go backwards between calls.
    pub fn process(&mut self, record: Record, now: Timestamp) -> Processed {
        self.stats.processed += 1;

        if self.config.malformed == MalformedPolicy::Drop && !record.is_well_formed() {
            self.stats.rejected += 1;
            return Processed {
                expired: Vec::new(),
                outcome: Outcome::Rejected(record),
            };
        }

        let expired = self.remove_expired(now);
        let outcome = self.match_or_buffer(record, now);

        Processed { expired, outcome }
    }

    /// Purge entries whose age at `now` has reached the delay.
    pub fn remove_expired(&mut self, now: Timestamp) -> Vec<BufferEntry> {
        let expired = self.buffer.remove_expired(now, self.config.delay);
        self.stats.expired += expired.len() as u64;
        expired
    }

    /// Pair `record` with its best candidate, or buffer it.
    ///
    /// Does not purge; call [`remove_expired`](Self::remove_expired) first.
    pub fn match_or_buffer(&mut self, record: Record, now: Timestamp) -> Outcome {
        let found = self
            .buffer
            .best_match(&record)
            .and_then(|candidate| Some((self.buffer.remove(candidate.index)?, candidate.score)));

        match found {
            Some((found, score)) => {
                if score == Score::FULL {
                    self.stats.matched_full += 1;
                } else {
                    self.stats.matched_partial += 1;
                }
                Outcome::Matched(Match {
                    incoming: record,
                    found,
                    score,
                })
            }
            None => {
                self.stats.buffered += 1;
                Outcome::Buffered(self.buffer.insert_newest(record, now).clone())
            }
        }
    }

    /// Drop all buffered entries. Returns how many there were.
    pub fn discard_buffer(&mut self) -> usize {
        self.buffer.clear()
    }

    #[inline]
    pub fn buffer(&self) -> &RecencyBuffer {
        &self.buffer
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}
