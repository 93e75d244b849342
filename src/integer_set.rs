//! Ordered unions of closed integer intervals.
//!
//! Used by index, scan-number, MS-level and charge-state filters. The textual
//! form is a whitespace (or comma) separated list of intervals:
//!
//! ```text
//! [0,2] 5-7     -> {0, 1, 2, 5, 6, 7}
//! 10-           -> [10, i32::MAX]
//! 3             -> {3}
//! ```
//!
//! ```rust
//! use mzaccess::integer_set::IntegerSet;
//!
//! let set: IntegerSet = "[0,2] 5-7".parse()?;
//! assert!(set.contains(6));
//! assert!(!set.contains(4));
//! assert!(set.has_upper_bound(7));
//! # Ok::<(), mzaccess::integer_set::IntegerSetError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Errors produced while parsing the integer-set mini-language
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegerSetError {
    /// A token could not be interpreted as an interval
    #[error("invalid integer set token '{0}'")]
    InvalidToken(String),

    /// An interval with begin > end
    #[error("invalid interval [{begin},{end}]: begin exceeds end")]
    InvertedInterval {
        /// Lower end
        begin: i32,
        /// Upper end
        end: i32,
    },

    /// A bracket was opened and never closed
    #[error("unterminated interval in '{0}'")]
    Unterminated(String),
}

/// A closed integer interval `[begin, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// First member
    pub begin: i32,
    /// Last member (inclusive)
    pub end: i32,
}

impl Interval {
    /// Create an interval; `begin` must not exceed `end`
    pub fn new(begin: i32, end: i32) -> Result<Self, IntegerSetError> {
        if begin > end {
            return Err(IntegerSetError::InvertedInterval { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Single-member interval
    pub fn single(value: i32) -> Self {
        Self {
            begin: value,
            end: value,
        }
    }

    /// Membership test
    pub fn contains(&self, value: i32) -> bool {
        self.begin <= value && value <= self.end
    }
}

/// Ordered union of closed intervals, merged on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntegerSet {
    intervals: Vec<Interval>,
}

impl IntegerSet {
    /// The empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing `[begin, end]`
    pub fn from_range(begin: i32, end: i32) -> Result<Self, IntegerSetError> {
        let mut set = Self::new();
        set.insert_interval(Interval::new(begin, end)?);
        Ok(set)
    }

    /// Parse the mini-language (see module docs)
    pub fn parse(text: &str) -> Result<Self, IntegerSetError> {
        let mut set = Self::new();
        for token in tokenize(text)? {
            set.insert_interval(parse_token(&token)?);
        }
        Ok(set)
    }

    /// Insert a single value
    pub fn insert(&mut self, value: i32) {
        self.insert_interval(Interval::single(value));
    }

    /// Insert `[begin, end]`
    pub fn insert_range(&mut self, begin: i32, end: i32) -> Result<(), IntegerSetError> {
        self.insert_interval(Interval::new(begin, end)?);
        Ok(())
    }

    /// Insert an interval, merging with overlapping or adjacent neighbours
    pub fn insert_interval(&mut self, interval: Interval) {
        let mut merged = interval;
        let mut kept = Vec::with_capacity(self.intervals.len() + 1);
        for existing in self.intervals.drain(..) {
            let touches = existing.begin <= merged.end.saturating_add(1)
                && merged.begin <= existing.end.saturating_add(1);
            if touches {
                merged.begin = merged.begin.min(existing.begin);
                merged.end = merged.end.max(existing.end);
            } else {
                kept.push(existing);
            }
        }
        let position = kept.partition_point(|i| i.begin < merged.begin);
        kept.insert(position, merged);
        self.intervals = kept;
    }

    /// Membership test
    pub fn contains(&self, value: i32) -> bool {
        let position = self.intervals.partition_point(|i| i.end < value);
        self.intervals
            .get(position)
            .map_or(false, |interval| interval.contains(value))
    }

    /// Membership test for unsigned ordinals
    pub fn contains_usize(&self, value: usize) -> bool {
        i32::try_from(value).map_or(false, |v| self.contains(v))
    }

    /// True iff no member of the set exceeds `n`.
    ///
    /// Filters scanning a strictly increasing sequence use this to stop early.
    /// The empty set is bounded by everything.
    pub fn has_upper_bound(&self, n: i32) -> bool {
        self.intervals.last().map_or(true, |last| last.end <= n)
    }

    /// [`Self::has_upper_bound`] for unsigned ordinals
    pub fn has_upper_bound_usize(&self, n: usize) -> bool {
        match i32::try_from(n) {
            Ok(n) => self.has_upper_bound(n),
            Err(_) => true,
        }
    }

    /// True when the set has no members
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The merged intervals in ascending order
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate over every member in ascending order.
    ///
    /// Sets with an open upper bound iterate up to `i32::MAX`.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|i| i.begin..=i.end)
    }
}

impl FromStr for IntegerSet {
    type Err = IntegerSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, interval) in self.intervals.iter().enumerate() {
            if n > 0 {
                f.write_str(" ")?;
            }
            if interval.begin == interval.end {
                write!(f, "{}", interval.begin)?;
            } else if interval.end == i32::MAX {
                write!(f, "{}-", interval.begin)?;
            } else {
                write!(f, "[{},{}]", interval.begin, interval.end)?;
            }
        }
        Ok(())
    }
}

impl FromIterator<i32> for IntegerSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

fn tokenize(text: &str) -> Result<Vec<String>, IntegerSetError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;

    for c in text.chars() {
        match c {
            '[' if !in_bracket => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                in_bracket = true;
                current.push(c);
            }
            ']' if in_bracket => {
                current.push(c);
                tokens.push(std::mem::take(&mut current));
                in_bracket = false;
            }
            c if in_bracket => {
                if !c.is_whitespace() {
                    current.push(c);
                }
            }
            c if c.is_whitespace() || c == ',' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_bracket {
        return Err(IntegerSetError::Unterminated(text.to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_token(token: &str) -> Result<Interval, IntegerSetError> {
    let invalid = || IntegerSetError::InvalidToken(token.to_string());

    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let (begin, end) = inner.split_once(',').ok_or_else(invalid)?;
        let begin = begin.parse::<i32>().map_err(|_| invalid())?;
        let end = end.parse::<i32>().map_err(|_| invalid())?;
        return Interval::new(begin, end);
    }

    // a leading sign belongs to the first number, not to a range
    let split_at = token
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i);

    match split_at {
        Some(i) => {
            let begin = token[..i].parse::<i32>().map_err(|_| invalid())?;
            let rest = &token[i + 1..];
            let end = if rest.is_empty() {
                i32::MAX
            } else {
                rest.parse::<i32>().map_err(|_| invalid())?
            };
            Interval::new(begin, end)
        }
        None => token
            .parse::<i32>()
            .map(Interval::single)
            .map_err(|_| invalid()),
    }
}

impl<'de> Deserialize<'de> for IntegerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IntegerSetVisitor;

        impl<'de> Visitor<'de> for IntegerSetVisitor {
            type Value = IntegerSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer set such as \"[1,2] 5-\" or a list of integers")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                IntegerSet::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                let v = i32::try_from(v).map_err(E::custom)?;
                Ok(std::iter::once(v).collect())
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                let v = i32::try_from(v).map_err(E::custom)?;
                Ok(std::iter::once(v).collect())
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut set = IntegerSet::new();
                while let Some(value) = seq.next_element::<i32>()? {
                    set.insert(value);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_any(IntegerSetVisitor)
    }
}

impl serde::Serialize for IntegerSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
