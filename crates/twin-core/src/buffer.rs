//! Recency buffer of unmatched records.
//!
//! Entries are kept newest-first: index 0 is the most recent insertion and
//! the back is the oldest. Since insertion times never decrease, ages are
//! non-decreasing from front to back, so the expired entries always form a
//! contiguous suffix.

use std::collections::VecDeque;
use std::time::Duration;

use crate::record::{Record, Score};
use crate::time::Timestamp;

/// A buffered record and the time it was inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferEntry {
    pub record: Record,
    pub inserted_at: Timestamp,
}

impl BufferEntry {
    #[inline(always)]
    pub fn age_at(&self, now: Timestamp) -> Duration {
        self.inserted_at.age_at(now)
    }

    #[inline(always)]
    pub fn is_expired(&self, now: Timestamp, delay: Duration) -> bool {
        self.age_at(now) >= delay
    }
}

/// Best-scoring buffered entry for some incoming record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Position in the buffer (0 = newest).
    pub index: usize,
    pub score: Score,
}

/// Newest-first buffer of unmatched records.
#[derive(Clone, Debug, Default)]
pub struct RecencyBuffer {
    entries: VecDeque<BufferEntry>,
}

impl RecencyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recently inserted entry.
    #[inline]
    pub fn newest(&self) -> Option<&BufferEntry> {
        self.entries.front()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&BufferEntry> {
        self.entries.get(index)
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BufferEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Insert at the newest position.
    ///
    /// `now` must not be earlier than the current newest entry.
    pub fn insert_newest(&mut self, record: Record, now: Timestamp) -> &BufferEntry {
        debug_assert!(
            self.newest().map_or(true, |newest| newest.inserted_at <= now),
            "insertion time went backwards"
        );
        self.entries.push_front(BufferEntry {
            record,
            inserted_at: now,
        });
        &self.entries[0]
    }

    /// Drop every entry whose age at `now` is at least `delay`.
    ///
    /// Returns the removed entries in buffer order (newest of them first).
    /// The buffer is untouched when nothing has expired.
    pub fn remove_expired(&mut self, now: Timestamp, delay: Duration) -> Vec<BufferEntry> {
        let first_expired = self
            .entries
            .partition_point(|entry| !entry.is_expired(now, delay));

        if first_expired == self.entries.len() {
            return Vec::new();
        }
        Vec::from(self.entries.split_off(first_expired))
    }

    /// Highest-scoring entry for `record`, scanning oldest to newest.
    ///
    /// A candidate only replaces the running best on a strictly higher
    /// score, so among equal scores the oldest entry wins. Entries scoring
    /// zero are never returned.
    pub fn best_match(&self, record: &Record) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for index in (0..self.entries.len()).rev() {
            let score = record.score_against(&self.entries[index].record);
            if !score.is_match() {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(Candidate { index, score });
                if score == Score::FULL {
                    break;
                }
            }
        }

        best
    }

    /// Remove the entry at `index` (0 = newest).
    #[inline]
    pub fn remove(&mut self, index: usize) -> Option<BufferEntry> {
        self.entries.remove(index)
    }

    /// Drop everything. Returns how many entries were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.entries.len();
        self.entries.clear();
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DELAY: Duration = Duration::from_secs(5);

    fn secs(s: u64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    #[test]
    fn test_insert_newest_first() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("p1", "l1"), secs(0));
        buffer.insert_newest(Record::new("p2", "l2"), secs(1));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.newest().unwrap().record, Record::new("p2", "l2"));
        assert_eq!(buffer.iter().last().unwrap().record, Record::new("p1", "l1"));

        let order: Vec<_> = buffer.iter().map(|e| e.inserted_at).collect();
        assert_eq!(order, vec![secs(1), secs(0)]);
    }

    #[test]
    fn test_remove_expired_suffix() {
        let mut buffer = RecencyBuffer::new();
        for t in 0..6 {
            buffer.insert_newest(Record::new(format!("p{t}"), "l"), secs(t));
        }

        // At t=7 the entries from t=0,1,2 have age >= 5.
        let expired = buffer.remove_expired(secs(7), DELAY);

        let expired_at: Vec<_> = expired.iter().map(|e| e.inserted_at).collect();
        assert_eq!(expired_at, vec![secs(2), secs(1), secs(0)]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.iter().last().unwrap().inserted_at, secs(3));
    }

    #[test]
    fn test_remove_expired_boundary_is_inclusive() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("x", "y"), secs(0));

        assert!(buffer.remove_expired(Timestamp::from_millis(4_999), DELAY).is_empty());
        assert_eq!(buffer.len(), 1);

        assert_eq!(buffer.remove_expired(secs(5), DELAY).len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_remove_expired_nothing_to_do() {
        let mut buffer = RecencyBuffer::new();
        assert!(buffer.remove_expired(secs(100), DELAY).is_empty());

        buffer.insert_newest(Record::new("x", "y"), secs(10));
        assert!(buffer.remove_expired(secs(12), DELAY).is_empty());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_best_match_prefers_higher_score() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("p1", "other"), secs(0));
        buffer.insert_newest(Record::new("p1", "l1"), secs(1));

        let candidate = buffer.best_match(&Record::new("p1", "l1")).unwrap();
        assert_eq!(candidate, Candidate { index: 0, score: Score::FULL });
    }

    #[test]
    fn test_best_match_oldest_wins_tie() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("z", "w"), secs(0));
        buffer.insert_newest(Record::new("z", "w"), secs(1));

        let candidate = buffer.best_match(&Record::new("z", "w")).unwrap();
        assert_eq!(candidate.index, 1);
        assert_eq!(buffer.get(candidate.index).unwrap().inserted_at, secs(0));
    }

    #[test]
    fn test_best_match_partial_tie_oldest_wins() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("a", "1"), secs(0));
        buffer.insert_newest(Record::new("b", "1"), secs(1));
        buffer.insert_newest(Record::new("c", "1"), secs(2));

        let candidate = buffer.best_match(&Record::new("q", "1")).unwrap();
        assert_eq!(candidate, Candidate { index: 2, score: Score::PARTIAL });
    }

    #[test]
    fn test_best_match_ignores_zero_scores() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("p1", "l1"), secs(0));

        assert_eq!(buffer.best_match(&Record::new("p2", "l2")), None);
        assert_eq!(RecencyBuffer::new().best_match(&Record::new("p2", "l2")), None);
    }

    #[test]
    fn test_remove_by_position() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("p1", "l1"), secs(0));
        buffer.insert_newest(Record::new("p2", "l2"), secs(1));
        buffer.insert_newest(Record::new("p3", "l3"), secs(2));

        let removed = buffer.remove(1).unwrap();
        assert_eq!(removed.record, Record::new("p2", "l2"));

        let left: Vec<_> = buffer.iter().map(|e| e.record.identifier_a().to_string()).collect();
        assert_eq!(left, vec!["p3", "p1"]);
        assert_eq!(buffer.remove(5), None);
    }

    #[test]
    fn test_clear() {
        let mut buffer = RecencyBuffer::new();
        buffer.insert_newest(Record::new("p1", "l1"), secs(0));
        buffer.insert_newest(Record::new("p2", "l2"), secs(0));

        assert_eq!(buffer.clear(), 2);
        assert!(buffer.is_empty());
    }

    proptest! {
        #[test]
        fn test_expiry_leaves_only_fresh_entries(
            gaps in proptest::collection::vec(0u64..3_000, 0..64),
            probe in 0u64..200_000,
            delay_ms in 1u64..10_000,
        ) {
            let delay = Duration::from_millis(delay_ms);
            let mut buffer = RecencyBuffer::new();
            let mut t = 0u64;
            for (i, gap) in gaps.iter().enumerate() {
                t += gap;
                buffer.insert_newest(Record::new(format!("p{i}"), "l"), Timestamp::from_millis(t));
            }
            let before = buffer.len();
            let now = Timestamp::from_millis(t + probe % 20_000);

            let expired = buffer.remove_expired(now, delay);

            prop_assert_eq!(before, buffer.len() + expired.len());
            prop_assert!(buffer.iter().all(|e| e.age_at(now) < delay));
            prop_assert!(expired.iter().all(|e| e.age_at(now) >= delay));
        }

        #[test]
        fn test_best_match_is_maximal_and_oldest(
            fields in proptest::collection::vec((0u8..3, 0u8..3), 1..32),
            probe in (0u8..3, 0u8..3),
        ) {
            let mut buffer = RecencyBuffer::new();
            for (i, (a, b)) in fields.iter().enumerate() {
                buffer.insert_newest(Record::new(a.to_string(), b.to_string()), Timestamp::from_secs(i as u64));
            }
            let incoming = Record::new(probe.0.to_string(), probe.1.to_string());

            let scores: Vec<Score> = buffer.iter().map(|e| incoming.score_against(&e.record)).collect();
            let max = scores.iter().copied().max().unwrap_or(Score::NONE);

            match buffer.best_match(&incoming) {
                None => prop_assert_eq!(max, Score::NONE),
                Some(candidate) => {
                    prop_assert_eq!(candidate.score, max);
                    // No older entry (higher index) ties the maximum.
                    prop_assert!(scores[candidate.index + 1..].iter().all(|&s| s < max));
                }
            }
        }
    }
}
