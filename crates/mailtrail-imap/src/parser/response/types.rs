//! Response data types.

use crate::types::{
    AclEntry, Capability, Flags, ListEntry, Mailbox, Namespace, Quota, ResponseCode, RightsList,
    SeqNum, Uid, UidValidity,
};

/// Generic value, for FETCH items and responses without a dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// NIL.
    Nil,
    /// Bare atom.
    Atom(String),
    /// Number.
    Number(u64),
    /// Quoted string.
    String(String),
    /// Literal bytes.
    Literal(Vec<u8>),
    /// Parenthesized list.
    List(Vec<Value>),
}

impl Value {
    /// Returns the textual content of an atom, string or UTF-8 literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Atom(s) | Self::String(s) => Some(s),
            Self::Literal(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Returns the list elements, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// FETCH response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date.
    InternalDate(String),
    /// RFC822 size.
    Rfc822Size(u32),
    /// UID.
    Uid(Uid),
    /// BODY section (also the echo of BODY.PEEK).
    Body {
        /// Section specifier.
        section: Option<String>,
        /// Origin offset of a partial fetch.
        origin: Option<u64>,
        /// Body data.
        data: Option<Vec<u8>>,
    },
    /// RFC822: the whole message.
    Rfc822(Option<Vec<u8>>),
    /// RFC822.HEADER.
    Rfc822Header(Option<Vec<u8>>),
    /// RFC822.TEXT.
    Rfc822Text(Option<Vec<u8>>),
    /// Any other item, kept as a value tree.
    Other {
        /// Upper-cased item name, including any section.
        name: String,
        /// The item value.
        value: Value,
    },
}

/// One message's FETCH data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStatus {
    /// Message sequence number.
    pub seq: SeqNum,
    /// Data items in wire order.
    pub items: Vec<FetchItem>,
}

impl MessageStatus {
    /// Returns the message flags, if they were fetched.
    #[must_use]
    pub fn flags(&self) -> Option<&Flags> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Flags(flags) => Some(flags),
            _ => None,
        })
    }

    /// Returns the UID, if it was fetched.
    #[must_use]
    pub fn uid(&self) -> Option<Uid> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Uid(uid) => Some(*uid),
            _ => None,
        })
    }

    /// Returns the RFC822 size, if it was fetched.
    #[must_use]
    pub fn size(&self) -> Option<u32> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Rfc822Size(size) => Some(*size),
            _ => None,
        })
    }

    /// Returns the data of the BODY item for `section`.
    ///
    /// `None` matches `BODY[]`.
    #[must_use]
    pub fn body(&self, section: Option<&str>) -> Option<&[u8]> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Body {
                section: s, data, ..
            } if s.as_deref() == section => data.as_deref(),
            _ => None,
        })
    }

    /// Merges items from a later FETCH of the same message.
    pub fn merge(&mut self, items: Vec<FetchItem>) {
        self.items.extend(items);
    }
}

/// STATUS response item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    /// Number of messages.
    Messages(u32),
    /// Number of recent messages.
    Recent(u32),
    /// Next UID.
    UidNext(Uid),
    /// UIDVALIDITY value.
    UidValidity(UidValidity),
    /// Number of unseen messages.
    Unseen(u32),
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// OK response with optional code.
    Ok {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// NO response.
    No {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BAD response.
    Bad {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// PREAUTH greeting.
    PreAuth {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BYE response.
    Bye {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY response.
    Capability(Vec<Capability>),
    /// LIST response.
    List(ListEntry),
    /// LSUB response.
    Lsub(ListEntry),
    /// FLAGS response.
    Flags(Flags),
    /// EXISTS response (message count).
    Exists(u32),
    /// RECENT response.
    Recent(u32),
    /// EXPUNGE response (message removed).
    Expunge(SeqNum),
    /// FETCH response.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Fetch data items.
        items: Vec<FetchItem>,
    },
    /// SEARCH response: sequence numbers or UIDs.
    Search(Vec<u32>),
    /// STATUS response.
    Status {
        /// Decoded mailbox name.
        mailbox: Mailbox,
        /// Status items.
        items: Vec<StatusItem>,
    },
    /// NAMESPACE response.
    Namespace(Namespace),
    /// QUOTA response.
    Quota(Quota),
    /// QUOTAROOT response.
    QuotaRoot {
        /// Decoded mailbox name.
        mailbox: Mailbox,
        /// Quota roots governing the mailbox.
        roots: Vec<String>,
    },
    /// ACL response: every identifier with rights on a mailbox.
    Acl {
        /// Decoded mailbox name.
        mailbox: Mailbox,
        /// Identifier and rights pairs.
        entries: Vec<AclEntry>,
    },
    /// LISTRIGHTS response.
    ListRights {
        /// Decoded mailbox name.
        mailbox: Mailbox,
        /// Required and optional rights for one identifier.
        rights: RightsList,
    },
    /// MYRIGHTS response.
    MyRights {
        /// Decoded mailbox name.
        mailbox: Mailbox,
        /// Rights of the logged-in user.
        rights: String,
    },
    /// Any other untagged response, kept as generic values.
    ///
    /// Covers extensions such as `ENABLED`, `ID`, `ESEARCH` or
    /// `VANISHED`, and responses whose mailbox names could not be decoded.
    Other {
        /// Keyword, upper-cased.
        keyword: String,
        /// Leading number for message data such as `3 VANISHED`.
        number: Option<u32>,
        /// Remaining values.
        payload: Vec<Value>,
    },
}

impl UntaggedResponse {
    /// Returns the response code of a status response.
    #[must_use]
    pub const fn code(&self) -> Option<&ResponseCode> {
        match self {
            Self::Ok { code, .. }
            | Self::No { code, .. }
            | Self::Bad { code, .. }
            | Self::PreAuth { code, .. }
            | Self::Bye { code, .. } => code.as_ref(),
            _ => None,
        }
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
    use crate::types::Flag;

    fn message(items: Vec<FetchItem>) -> MessageStatus {
        MessageStatus {
            seq: SeqNum::new(3).unwrap(),
            items,
        }
    }

    #[test]
    fn accessors_find_items() {
        let msg = message(vec![
            FetchItem::Uid(Uid::new(42).unwrap()),
            FetchItem::Flags([Flag::Seen].into_iter().collect()),
            FetchItem::Rfc822Size(1200),
        ]);
        assert_eq!(msg.uid().map(Uid::get), Some(42));
        assert!(msg.flags().unwrap().is_seen());
        assert_eq!(msg.size(), Some(1200));
    }

    #[test]
    fn body_matches_section() {
        let msg = message(vec![
            FetchItem::Body {
                section: Some("HEADER".to_string()),
                origin: None,
                data: Some(b"Subject: x\r\n".to_vec()),
            },
            FetchItem::Body {
                section: None,
                origin: Some(0),
                data: Some(b"whole".to_vec()),
            },
        ]);
        assert_eq!(msg.body(Some("HEADER")), Some(&b"Subject: x\r\n"[..]));
        assert_eq!(msg.body(None), Some(&b"whole"[..]));
        assert_eq!(msg.body(Some("TEXT")), None);
    }

    #[test]
    fn merge_appends_items() {
        let mut msg = message(vec![FetchItem::Rfc822Size(1)]);
        msg.merge(vec![FetchItem::Uid(Uid::new(9).unwrap())]);
        assert_eq!(msg.items.len(), 2);
        assert!(msg.uid().is_some());
    }

    #[test]
    fn value_accessors() {
        let value = Value::List(vec![Value::String("a".into()), Value::Literal(b"b".to_vec())]);
        let items = value.as_list().unwrap();
        assert_eq!(items[0].as_str(), Some("a"));
        assert_eq!(items[1].as_str(), Some("b"));
        assert_eq!(Value::Nil.as_str(), None);
    }

    #[test]
    fn code_only_on_status_responses() {
        let ok = UntaggedResponse::Ok {
            code: Some(ResponseCode::Alert),
            text: "x".into(),
        };
        assert!(ok.code().unwrap().is_alert());
        assert!(UntaggedResponse::Exists(1).code().is_none());
    }
}
