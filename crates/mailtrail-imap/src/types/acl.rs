//! Access control lists (RFC 4314).

/// One identifier and the rights granted to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    /// User or group identifier; `-` prefixed for negative rights.
    pub identifier: String,
    /// Rights as a string of right characters, e.g. `lrswipkxte`.
    pub rights: String,
}

impl AclEntry {
    /// Returns true if `right` is among the granted rights.
    #[must_use]
    pub fn grants(&self, right: char) -> bool {
        self.rights.contains(right)
    }
}

/// Rights an identifier may be granted on a mailbox (LISTRIGHTS).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RightsList {
    /// Identifier the answer is about.
    pub identifier: String,
    /// Rights always granted.
    pub required: String,
    /// Groups of rights that can be granted, each group all-or-nothing.
    pub optional: Vec<String>,
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
    fn grants_checks_single_rights() {
        let entry = AclEntry {
            identifier: "fred".to_string(),
            rights: "lrs".to_string(),
        };
        assert!(entry.grants('r'));
        assert!(!entry.grants('d'));
    }
}
