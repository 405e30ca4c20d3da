//! Response codes.

use super::{Capability, Flags, SeqNum, Uid, UidValidity};

/// Bracketed response code at the start of a status response's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: human-readable message that must be shown to the user.
    Alert,
    /// READ-WRITE: mailbox selected as read-write.
    ReadWrite,
    /// READ-ONLY: mailbox selected as read-only.
    ReadOnly,
    /// TRYCREATE: target mailbox does not exist but could be created.
    TryCreate,
    /// UIDVALIDITY n.
    UidValidity(UidValidity),
    /// UIDNEXT n.
    UidNext(Uid),
    /// UNSEEN n: first unseen message.
    Unseen(SeqNum),
    /// PERMANENTFLAGS (...).
    PermanentFlags(Flags),
    /// CAPABILITY ...: capabilities piggybacked on a status response.
    Capability(Vec<Capability>),
    /// PARSE: the server failed to parse a message header.
    Parse,
    /// APPENDUID (RFC 4315).
    AppendUid {
        /// UIDVALIDITY of the target mailbox.
        uid_validity: UidValidity,
        /// UID assigned to the appended message.
        uid: Uid,
    },
    /// COPYUID (RFC 4315). Sets are kept in wire form.
    CopyUid {
        /// UIDVALIDITY of the target mailbox.
        uid_validity: UidValidity,
        /// Source UID set.
        source: String,
        /// Destination UID set.
        destination: String,
    },
    /// Any other code with its raw parameter text.
    Other {
        /// Upper-cased code name.
        name: String,
        /// Raw text between the name and the closing bracket.
        params: Option<String>,
    },
}

impl ResponseCode {
    /// Returns true for the ALERT code.
    #[must_use]
    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::Alert)
    }
}
