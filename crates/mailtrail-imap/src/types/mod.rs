//! Core IMAP types.
//!
//! Flags, identifiers, mailbox records and response codes shared by the
//! parser and the connection layer (RFC 3501).

#![allow(clippy::missing_const_for_fn)]

mod acl;
mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod namespace;
mod response_code;
mod sequence;

pub use acl::{AclEntry, RightsList};
pub use capability::{Capability, Status};
pub use flags::{Flag, FlagSnapshot, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListEntry, Mailbox, MailboxAttribute, MailboxStatus};
pub use namespace::{Namespace, NamespaceEntry, Quota, QuotaResource};
pub use response_code::ResponseCode;
pub use sequence::SequenceSet;
