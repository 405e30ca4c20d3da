//! Runtime protocol state of a connection.
//!
//! RFC 3501 section 3 defines four states. The connection tracks which one
//! it is in so callers can inspect it; the server remains the authority on
//! which commands are accepted.

use crate::parser::UntaggedResponse;
use crate::types::{Mailbox, MailboxStatus, ResponseCode};

/// Protocol state as defined by RFC 3501.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProtocolState {
    /// Waiting for credentials.
    #[default]
    NotAuthenticated,
    /// Logged in, no mailbox selected.
    Authenticated,
    /// A mailbox is open.
    Selected(SelectedState),
    /// The server said BYE; no more commands can be sent.
    Logout,
}

impl ProtocolState {
    /// Returns `true` if we're authenticated (authenticated or selected).
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected(_))
    }

    /// Returns `true` if a mailbox is selected.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        matches!(self, Self::Selected(_))
    }

    /// Returns the selected mailbox, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&SelectedState> {
        match self {
            Self::Selected(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn selected_mut(&mut self) -> Option<&mut SelectedState> {
        match self {
            Self::Selected(state) => Some(state),
            _ => None,
        }
    }
}

/// The open mailbox and what the server has told us about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedState {
    /// Name of the selected mailbox.
    pub mailbox: Mailbox,
    /// Mailbox status as of the last update.
    pub status: MailboxStatus,
}

impl SelectedState {
    /// Returns true if the mailbox was opened read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.read_only
    }
}

/// Folds one untagged response into a mailbox status.
///
/// Returns false for responses that carry no mailbox status.
pub(crate) fn apply(status: &mut MailboxStatus, response: &UntaggedResponse) -> bool {
    match response {
        UntaggedResponse::Exists(n) => status.exists = *n,
        UntaggedResponse::Recent(n) => status.recent = *n,
        UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
        UntaggedResponse::Ok { code: Some(code), .. } => return apply_code(status, code),
        _ => return false,
    }
    true
}

/// Folds a response code into a mailbox status.
pub(crate) fn apply_code(status: &mut MailboxStatus, code: &ResponseCode) -> bool {
    match code {
        ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
        ResponseCode::UidNext(uid) => status.uid_next = Some(*uid),
        ResponseCode::Unseen(seq) => status.first_unseen = Some(*seq),
        ResponseCode::PermanentFlags(flags) => status.permanent_flags = flags.clone(),
        ResponseCode::ReadOnly => status.read_only = true,
        ResponseCode::ReadWrite => status.read_only = false,
        _ => return false,
    }
    true
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
    use crate::types::{Flag, Flags, SeqNum, Uid, UidValidity};

    fn selected(read_only: bool) -> ProtocolState {
        ProtocolState::Selected(SelectedState {
            mailbox: Mailbox::inbox(),
            status: MailboxStatus {
                read_only,
                ..MailboxStatus::default()
            },
        })
    }

    #[test]
    fn test_protocol_state_default() {
        assert_eq!(ProtocolState::default(), ProtocolState::NotAuthenticated);
    }

    #[test]
    fn test_is_authenticated() {
        assert!(!ProtocolState::NotAuthenticated.is_authenticated());
        assert!(ProtocolState::Authenticated.is_authenticated());
        assert!(selected(false).is_authenticated());
        assert!(!ProtocolState::Logout.is_authenticated());
    }

    #[test]
    fn test_selected_accessors() {
        assert!(ProtocolState::Authenticated.selected().is_none());
        let state = selected(true);
        assert!(state.is_selected());
        let open = state.selected().unwrap();
        assert!(open.mailbox.is_inbox());
        assert!(open.is_read_only());
    }

    #[test]
    fn test_apply_select_responses() {
        let mut status = MailboxStatus::default();
        assert!(apply(&mut status, &UntaggedResponse::Exists(172)));
        assert!(apply(&mut status, &UntaggedResponse::Recent(1)));
        assert!(apply(
            &mut status,
            &UntaggedResponse::Flags([Flag::Seen, Flag::Deleted].into_iter().collect::<Flags>())
        ));
        assert!(apply(
            &mut status,
            &UntaggedResponse::Ok {
                code: Some(ResponseCode::UidValidity(UidValidity::new(3857529045).unwrap())),
                text: "UIDs valid".into(),
            }
        ));
        assert!(apply_code(
            &mut status,
            &ResponseCode::Unseen(SeqNum::new(12).unwrap())
        ));
        assert!(apply_code(
            &mut status,
            &ResponseCode::UidNext(Uid::new(4392).unwrap())
        ));
        assert!(!apply(&mut status, &UntaggedResponse::Search(vec![1])));

        assert_eq!(status.exists, 172);
        assert_eq!(status.recent, 1);
        assert_eq!(status.flags.len(), 2);
        assert_eq!(status.uid_validity.unwrap().get(), 3857529045);
        assert_eq!(status.first_unseen.unwrap().get(), 12);
        assert_eq!(status.uid_next.unwrap().get(), 4392);
    }

    #[test]
    fn test_apply_read_only_codes() {
        let mut status = MailboxStatus::default();
        apply_code(&mut status, &ResponseCode::ReadOnly);
        assert!(status.read_only);
        apply_code(&mut status, &ResponseCode::ReadWrite);
        assert!(!status.read_only);
    }
}
