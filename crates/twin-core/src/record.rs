//! Records and the similarity score between two of them.

use core::fmt;

/// Number of identifying fields two records have in common.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(pub u8);

impl Score {
    /// No field in common. Never counts as a match.
    pub const NONE: Self = Self(0);
    /// Exactly one field in common.
    pub const PARTIAL: Self = Self(1);
    /// Both fields in common.
    pub const FULL: Self = Self(2);

    #[inline(always)]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this score is high enough to pair two records.
    #[inline(always)]
    pub const fn is_match(self) -> bool {
        self.0 > Self::NONE.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable pair of identifiers, e.g. a phone number and a login.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Record {
    identifier_a: String,
    identifier_b: String,
}

impl Record {
    pub fn new(identifier_a: impl Into<String>, identifier_b: impl Into<String>) -> Self {
        Self {
            identifier_a: identifier_a.into(),
            identifier_b: identifier_b.into(),
        }
    }

    /// First identifier (phone-number-shaped in the demo feed).
    #[inline(always)]
    pub fn identifier_a(&self) -> &str {
        &self.identifier_a
    }

    /// Second identifier (login-shaped in the demo feed).
    #[inline(always)]
    pub fn identifier_b(&self) -> &str {
        &self.identifier_b
    }

    /// At least one identifier is non-empty.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        !self.identifier_a.is_empty() || !self.identifier_b.is_empty()
    }

    /// Count of equal fields between `self` and `other`.
    #[inline]
    pub fn score_against(&self, other: &Record) -> Score {
        let a = (self.identifier_a == other.identifier_a) as u8;
        let b = (self.identifier_b == other.identifier_b) as u8;
        Score(a + b)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.identifier_a, self.identifier_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_table() {
        let base = Record::new("+1-555-0100", "login_x");

        assert_eq!(base.score_against(&Record::new("+1-555-0100", "login_x")), Score::FULL);
        assert_eq!(base.score_against(&Record::new("+1-555-0100", "login_y")), Score::PARTIAL);
        assert_eq!(base.score_against(&Record::new("+1-555-0199", "login_x")), Score::PARTIAL);
        assert_eq!(base.score_against(&Record::new("+1-555-0199", "login_y")), Score::NONE);
    }

    #[test]
    fn test_score_is_symmetric() {
        let a = Record::new("p1", "l1");
        let b = Record::new("p1", "l2");
        assert_eq!(a.score_against(&b), b.score_against(&a));
    }

    #[test]
    fn test_well_formed() {
        assert!(Record::new("p", "").is_well_formed());
        assert!(Record::new("", "l").is_well_formed());
        assert!(Record::new("p", "l").is_well_formed());
        assert!(!Record::new("", "").is_well_formed());
        assert!(!Record::default().is_well_formed());
    }

    #[test]
    fn test_score_ordering() {
        assert!(Score::FULL > Score::PARTIAL);
        assert!(Score::PARTIAL > Score::NONE);
        assert!(!Score::NONE.is_match());
        assert!(Score::PARTIAL.is_match());
    }

    #[test]
    fn test_display() {
        assert_eq!(Record::new("+7-915-1", "Mobious").to_string(), "(+7-915-1, Mobious)");
    }
}
