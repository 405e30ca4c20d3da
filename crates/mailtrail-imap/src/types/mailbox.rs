//! Mailbox types.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Mailbox name as the user sees it (already decoded from the wire
/// charset).
///
/// Encoding to modified UTF-7 happens when a command is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for INBOX in any letter case.
    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.0.eq_ignore_ascii_case("INBOX")
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mailbox {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Mailbox state gathered from SELECT, EXAMINE, STATUS or NOOP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Sequence number of the first unseen message.
    pub first_unseen: Option<SeqNum>,
    /// Number of unseen messages (STATUS only).
    pub unseen: Option<u32>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Flags that can be permanently stored.
    pub permanent_flags: Flags,
    /// Whether the mailbox is read-only.
    pub read_only: bool,
}

/// Entry of a LIST or LSUB response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter, `None` for a flat namespace.
    pub delimiter: Option<char>,
    /// Decoded mailbox name.
    pub mailbox: Mailbox,
}

impl ListEntry {
    /// Returns true if the mailbox can be selected.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&MailboxAttribute::NoSelect)
    }

    /// Returns true if the mailbox cannot have children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.attributes.iter().any(|a| {
            matches!(
                a,
                MailboxAttribute::NoInferiors | MailboxAttribute::HasNoChildren
            )
        })
    }
}

/// Mailbox attributes from LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// No child mailboxes can exist.
    NoInferiors,
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox has no children.
    HasNoChildren,
    /// Unknown attribute.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\NOSELECT" => Self::NoSelect,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn inbox_is_case_insensitive() {
        assert!(Mailbox::new("inbox").is_inbox());
        assert!(Mailbox::inbox().is_inbox());
        assert!(!Mailbox::new("INBOX.Sent").is_inbox());
    }

    #[test]
    fn parse_attributes() {
        assert_eq!(
            MailboxAttribute::parse("\\Noinferiors"),
            MailboxAttribute::NoInferiors
        );
        assert_eq!(
            MailboxAttribute::parse("\\NoSelect"),
            MailboxAttribute::NoSelect
        );
        assert_eq!(
            MailboxAttribute::parse("\\Archive"),
            MailboxAttribute::Unknown("\\Archive".to_string())
        );
    }

    #[test]
    fn list_entry_helpers() {
        let entry = ListEntry {
            attributes: vec![MailboxAttribute::NoSelect, MailboxAttribute::NoInferiors],
            delimiter: Some('/'),
            mailbox: Mailbox::new("Archive"),
        };
        assert!(!entry.is_selectable());
        assert!(entry.is_leaf());
    }
}
