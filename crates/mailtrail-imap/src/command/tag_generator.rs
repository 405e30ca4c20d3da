//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

use crate::types::Tag;
use crate::{Error, Result};

/// Tag generator for IMAP commands.
///
/// Generates sequential tags `A1`, `A2`, ... Each tag is used once, whatever
/// the outcome of its command, so tags strictly increase over a
/// connection's lifetime.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Generates the next tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] once `u32::MAX` tags have been issued;
    /// tags are never reused.
    pub fn next_tag(&mut self) -> Result<Tag> {
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| Error::Protocol("tag counter exhausted".to_string()))?;
        Ok(Tag::new(format!("{}{}", self.prefix, self.counter)))
    }

    /// Returns how many tags have been issued.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_generation() {
        let mut generator = TagGenerator::default();
        assert_eq!(generator.next_tag().unwrap().as_str(), "A1");
        assert_eq!(generator.next_tag().unwrap().as_str(), "A2");
        assert_eq!(generator.next_tag().unwrap().as_str(), "A3");
    }

    #[test]
    fn test_custom_prefix() {
        let mut generator = TagGenerator::new('T');
        assert_eq!(generator.next_tag().unwrap().as_str(), "T1");
    }

    #[test]
    fn test_issued() {
        let mut generator = TagGenerator::default();
        assert_eq!(generator.issued(), 0);
        let _ = generator.next_tag();
        assert_eq!(generator.issued(), 1);
    }

    #[test]
    fn test_uniqueness() {
        let mut generator = TagGenerator::default();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..10000 {
            let tag = generator.next_tag().unwrap();
            assert!(seen.insert(tag), "duplicate tag generated");
        }
    }

    #[test]
    fn test_no_padding_across_digit_boundary() {
        let mut generator = TagGenerator::new('X');
        for _ in 0..9 {
            let _ = generator.next_tag();
        }
        assert_eq!(generator.next_tag().unwrap().as_str(), "X10");
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut generator = TagGenerator::default();
        generator.counter = u32::MAX;
        assert!(generator.next_tag().is_err());
        assert!(generator.next_tag().is_err());
    }
}
