//! Command-related type definitions.

use crate::types::{Flag, SequenceSet};

/// STATUS attributes to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Number of messages.
    Messages,
    /// Number of recent messages.
    Recent,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
}

impl StatusAttribute {
    /// All attributes defined by RFC 3501.
    pub const ALL: [Self; 5] = [
        Self::Messages,
        Self::Recent,
        Self::UidNext,
        Self::UidValidity,
        Self::Unseen,
    ];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// Fetch all (equivalent to FLAGS INTERNALDATE RFC822.SIZE ENVELOPE).
    All,
    /// Fetch full (equivalent to FLAGS INTERNALDATE RFC822.SIZE ENVELOPE BODY).
    Full,
    /// Fetch fast (equivalent to FLAGS INTERNALDATE RFC822.SIZE).
    Fast,
    /// Custom list of items.
    Items(Vec<FetchAttribute>),
}

impl From<FetchAttribute> for FetchItems {
    fn from(attr: FetchAttribute) -> Self {
        Self::Items(vec![attr])
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822 size.
    Rfc822Size,
    /// Envelope structure.
    Envelope,
    /// Body structure.
    BodyStructure,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier.
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
        /// Partial fetch range: origin and octet count.
        partial: Option<(u64, u64)>,
    },
    /// RFC822 (full message).
    Rfc822,
    /// RFC822.HEADER.
    Rfc822Header,
    /// RFC822.TEXT.
    Rfc822Text,
}

impl FetchAttribute {
    /// `BODY.PEEK[section]<origin.len>`.
    #[must_use]
    pub fn partial_peek(section: Option<String>, origin: u64, len: u64) -> Self {
        Self::Body {
            section,
            peek: true,
            partial: Some((origin, len)),
        }
    }
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace flags.
    SetFlags(Vec<Flag>),
    /// Add flags.
    AddFlags(Vec<Flag>),
    /// Remove flags.
    RemoveFlags(Vec<Flag>),
}

impl StoreAction {
    pub(crate) fn parts(&self) -> (&'static str, &[Flag]) {
        match self {
            Self::SetFlags(f) => ("FLAGS", f),
            Self::AddFlags(f) => ("+FLAGS", f),
            Self::RemoveFlags(f) => ("-FLAGS", f),
        }
    }
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with \Answered flag.
    Answered,
    /// Messages with \Deleted flag.
    Deleted,
    /// Messages with \Draft flag.
    Draft,
    /// Messages with \Flagged flag.
    Flagged,
    /// Recent and unseen messages.
    New,
    /// Messages with \Recent flag.
    Recent,
    /// Messages without \Recent flag.
    Old,
    /// Messages without \Answered flag.
    Unanswered,
    /// Messages without \Deleted flag.
    Undeleted,
    /// Messages without \Flagged flag.
    Unflagged,
    /// Messages without \Seen flag.
    Unseen,
    /// Messages with \Seen flag.
    Seen,
    /// Messages with a keyword flag.
    Keyword(String),
    /// Messages without a keyword flag.
    Unkeyword(String),
    /// Sequence number set.
    SequenceSet(SequenceSet),
    /// UID set.
    Uid(SequenceSet),
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// To contains text.
    To(String),
    /// Cc contains text.
    Cc(String),
    /// Bcc contains text.
    Bcc(String),
    /// Body contains text.
    Body(String),
    /// Text in header or body.
    Text(String),
    /// Messages since date (`1-Feb-1994`).
    Since(String),
    /// Messages before date.
    Before(String),
    /// Messages on date.
    On(String),
    /// Larger than size.
    Larger(u32),
    /// Smaller than size.
    Smaller(u32),
    /// Header field contains value.
    Header(String, String),
    /// AND of criteria.
    And(Vec<Self>),
    /// OR of criteria.
    Or(Box<Self>, Box<Self>),
    /// NOT of criteria.
    Not(Box<Self>),
}
