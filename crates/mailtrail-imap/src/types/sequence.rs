//! Sequence sets for message ranges.
//!
//! The same wire form (`1:4,7,9:*`) serves message sequence numbers and
//! UIDs; which one a set means depends on whether the command carries the
//! `UID` prefix.

/// Ordered set of message numbers or ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single number.
    Single(u32),
    /// Inclusive range.
    Range(u32, u32),
    /// Range from start to the last message (`n:*`).
    RangeFrom(u32),
    /// All messages (`1:*`).
    All,
    /// Multiple specifications joined with commas.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a sequence set from a single number.
    #[must_use]
    pub const fn single(n: u32) -> Option<Self> {
        if n == 0 { None } else { Some(Self::Single(n)) }
    }

    /// Creates a range sequence set.
    #[must_use]
    pub const fn range(start: u32, end: u32) -> Option<Self> {
        if start == 0 || end == 0 {
            None
        } else {
            Some(Self::Range(start, end))
        }
    }

    /// Builds the compressed form of an arbitrary list of numbers.
    ///
    /// Numbers are sorted, duplicates and zeros dropped, and consecutive
    /// runs merged, so `[5, 1, 2, 3, 9]` becomes `1:3,5,9`. Returns `None`
    /// when no non-zero number remains.
    #[must_use]
    pub fn from_numbers(numbers: impl IntoIterator<Item = u32>) -> Option<Self> {
        let mut sorted: Vec<u32> = numbers.into_iter().filter(|&n| n != 0).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut parts = Vec::new();
        let mut iter = sorted.into_iter();
        let mut start = iter.next()?;
        let mut end = start;
        for n in iter {
            if end.checked_add(1) == Some(n) {
                end = n;
            } else {
                parts.push(Self::run(start, end));
                start = n;
                end = n;
            }
        }
        parts.push(Self::run(start, end));

        Some(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Self::Set(parts)
        })
    }

    const fn run(start: u32, end: u32) -> Self {
        if start == end {
            Self::Single(start)
        } else {
            Self::Range(start, end)
        }
    }

    /// Returns true if the set names no message at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Set(items) if items.iter().all(Self::is_empty))
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => f.write_str("1:*"),
            Self::Set(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 10).is_none());
        assert!(SequenceSet::from_numbers([0, 0]).is_none());
    }

    #[test]
    fn display_forms() {
        assert_eq!(SequenceSet::single(42).unwrap().to_string(), "42");
        assert_eq!(SequenceSet::range(1, 100).unwrap().to_string(), "1:100");
        assert_eq!(SequenceSet::RangeFrom(50).to_string(), "50:*");
        assert_eq!(SequenceSet::All.to_string(), "1:*");
    }

    #[test]
    fn compresses_runs() {
        let set = SequenceSet::from_numbers([5, 1, 2, 3, 9, 3]).unwrap();
        assert_eq!(set.to_string(), "1:3,5,9");
    }

    #[test]
    fn single_run_is_not_wrapped() {
        let set = SequenceSet::from_numbers([7, 8, 9]).unwrap();
        assert_eq!(set, SequenceSet::Range(7, 9));
    }

    #[test]
    fn handles_u32_max() {
        let set = SequenceSet::from_numbers([u32::MAX, u32::MAX - 1, 1]).unwrap();
        assert_eq!(set.to_string(), format!("1,{}:{}", u32::MAX - 1, u32::MAX));
    }

    #[test]
    fn empty_set() {
        assert!(SequenceSet::Set(vec![]).is_empty());
        assert!(!SequenceSet::All.is_empty());
    }
}
