//! IMAP command builder.
//!
//! This module provides types and serialization for IMAP commands.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{Flag, Mailbox, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, SearchCriteria, StatusAttribute, StoreAction};

use serialize::{Writer, write_fetch_items, write_search_criteria};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// AUTHENTICATE command.
    Authenticate {
        /// Authentication mechanism.
        mechanism: String,
        /// Initial response (SASL-IR), already base64-encoded.
        initial_response: Option<String>,
    },

    // Authenticated State Commands
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: Mailbox,
        /// New mailbox name.
        to: Mailbox,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// LSUB command.
    Lsub {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// NAMESPACE command (RFC 2342).
    Namespace,
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items to request.
        items: Vec<StatusAttribute>,
    },
    /// APPEND command.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set; omitted from the wire when empty.
        flags: Vec<Flag>,
        /// Internal date such as `17-Jul-1996 02:44:25 -0700`.
        date: Option<String>,
        /// Message data.
        message: Vec<u8>,
    },
    /// GETQUOTA command (RFC 2087).
    GetQuota {
        /// Quota root.
        root: String,
    },
    /// GETQUOTAROOT command (RFC 2087).
    GetQuotaRoot {
        /// Mailbox whose quota roots are requested.
        mailbox: Mailbox,
    },
    /// SETQUOTA command (RFC 2087).
    SetQuota {
        /// Quota root.
        root: String,
        /// Resource names and their new limits.
        limits: Vec<(String, u64)>,
    },
    /// SETACL command (RFC 4314).
    SetAcl {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Identifier the rights apply to.
        identifier: String,
        /// Rights, optionally prefixed with `+` or `-`.
        rights: String,
    },
    /// DELETEACL command (RFC 4314).
    DeleteAcl {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Identifier whose entry is removed.
        identifier: String,
    },
    /// GETACL command (RFC 4314).
    GetAcl {
        /// Mailbox name.
        mailbox: Mailbox,
    },
    /// LISTRIGHTS command (RFC 4314).
    ListRights {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Identifier to query.
        identifier: String,
    },
    /// MYRIGHTS command (RFC 4314).
    MyRights {
        /// Mailbox name.
        mailbox: Mailbox,
    },

    // Selected State Commands
    /// CHECK command.
    Check,
    /// CLOSE command.
    Close,
    /// EXPUNGE command.
    Expunge,
    /// UID EXPUNGE command (RFC 4315 UIDPLUS) - expunge specific UIDs.
    UidExpunge {
        /// UIDs to expunge.
        uids: SequenceSet,
    },
    /// SEARCH command.
    Search {
        /// Charset of the string arguments.
        charset: Option<String>,
        /// Search criteria.
        criteria: SearchCriteria,
        /// Use UIDs.
        uid: bool,
    },
    /// FETCH command.
    Fetch {
        /// Sequence set.
        sequence: SequenceSet,
        /// Items to fetch.
        items: FetchItems,
        /// Use UIDs.
        uid: bool,
    },
    /// STORE command.
    Store {
        /// Sequence set.
        sequence: SequenceSet,
        /// Store action.
        action: StoreAction,
        /// Use UIDs.
        uid: bool,
        /// Silent mode (no FETCH response).
        silent: bool,
    },
    /// COPY command.
    Copy {
        /// Sequence set.
        sequence: SequenceSet,
        /// Target mailbox.
        mailbox: Mailbox,
        /// Use UIDs.
        uid: bool,
    },
}

impl Command {
    /// Returns the command verb, safe to log.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::List { .. } => "LIST",
            Self::Lsub { .. } => "LSUB",
            Self::Namespace => "NAMESPACE",
            Self::Status { .. } => "STATUS",
            Self::Append { .. } => "APPEND",
            Self::GetQuota { .. } => "GETQUOTA",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::SetQuota { .. } => "SETQUOTA",
            Self::SetAcl { .. } => "SETACL",
            Self::DeleteAcl { .. } => "DELETEACL",
            Self::GetAcl { .. } => "GETACL",
            Self::ListRights { .. } => "LISTRIGHTS",
            Self::MyRights { .. } => "MYRIGHTS",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::UidExpunge { .. } => "UID EXPUNGE",
            Self::Search { uid: false, .. } => "SEARCH",
            Self::Search { uid: true, .. } => "UID SEARCH",
            Self::Fetch { uid: false, .. } => "FETCH",
            Self::Fetch { uid: true, .. } => "UID FETCH",
            Self::Store { uid: false, .. } => "STORE",
            Self::Store { uid: true, .. } => "UID STORE",
            Self::Copy { uid: false, .. } => "COPY",
            Self::Copy { uid: true, .. } => "UID COPY",
        }
    }

    /// Serializes the command to bytes with the given tag.
    ///
    /// Literal segments are concatenated; use [`Command::segments`] to send
    /// them with continuation handling.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        self.segments(tag).concat()
    }

    /// Serializes the command into segments split after each literal
    /// announcement.
    #[must_use]
    pub fn segments(&self, tag: &str) -> Vec<Vec<u8>> {
        let mut w = Writer::default();
        w.raw(tag.as_bytes());
        w.push(b' ');
        w.raw(self.name().as_bytes());

        match self {
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::StartTls
            | Self::Namespace
            | Self::Check
            | Self::Close
            | Self::Expunge => {}

            Self::Login { username, password } => {
                w.push(b' ');
                w.astring(username);
                w.push(b' ');
                w.astring(password);
            }

            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                w.push(b' ');
                w.raw(mechanism.as_bytes());
                if let Some(resp) = initial_response {
                    w.push(b' ');
                    // Empty initial response per RFC 4959.
                    w.raw(if resp.is_empty() { &b"="[..] } else { resp.as_bytes() });
                }
            }

            Self::Select { mailbox }
            | Self::Examine { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox }
            | Self::Unsubscribe { mailbox }
            | Self::GetQuotaRoot { mailbox }
            | Self::GetAcl { mailbox }
            | Self::MyRights { mailbox } => {
                w.push(b' ');
                w.mailbox(mailbox);
            }

            Self::Rename { from, to } => {
                w.push(b' ');
                w.mailbox(from);
                w.push(b' ');
                w.mailbox(to);
            }

            Self::List { reference, pattern } | Self::Lsub { reference, pattern } => {
                w.push(b' ');
                w.mailbox(&Mailbox::new(reference.as_str()));
                w.push(b' ');
                w.mailbox(&Mailbox::new(pattern.as_str()));
            }

            Self::Status { mailbox, items } => {
                w.push(b' ');
                w.mailbox(mailbox);
                w.raw(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    w.raw(item.as_str().as_bytes());
                }
                w.push(b')');
            }

            Self::Append {
                mailbox,
                flags,
                date,
                message,
            } => {
                w.push(b' ');
                w.mailbox(mailbox);
                if !flags.is_empty() {
                    w.push(b' ');
                    w.flag_list(flags);
                }
                if let Some(date) = date {
                    w.push(b' ');
                    w.quoted(date);
                }
                w.push(b' ');
                w.literal(message);
            }

            Self::GetQuota { root } => {
                w.push(b' ');
                w.astring(root);
            }

            Self::SetQuota { root, limits } => {
                w.push(b' ');
                w.astring(root);
                w.raw(b" (");
                for (i, (resource, limit)) in limits.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    w.astring(resource);
                    w.raw(format!(" {limit}").as_bytes());
                }
                w.push(b')');
            }

            Self::SetAcl {
                mailbox,
                identifier,
                rights,
            } => {
                w.push(b' ');
                w.mailbox(mailbox);
                w.push(b' ');
                w.astring(identifier);
                w.push(b' ');
                w.astring(rights);
            }

            Self::DeleteAcl {
                mailbox,
                identifier,
            }
            | Self::ListRights {
                mailbox,
                identifier,
            } => {
                w.push(b' ');
                w.mailbox(mailbox);
                w.push(b' ');
                w.astring(identifier);
            }

            Self::UidExpunge { uids } => {
                w.push(b' ');
                w.raw(uids.to_string().as_bytes());
            }

            Self::Search {
                charset, criteria, ..
            } => {
                if let Some(charset) = charset {
                    w.raw(b" CHARSET ");
                    w.astring(charset);
                }
                w.push(b' ');
                write_search_criteria(&mut w, criteria);
            }

            Self::Fetch { sequence, items, .. } => {
                w.push(b' ');
                w.raw(sequence.to_string().as_bytes());
                w.push(b' ');
                write_fetch_items(&mut w, items);
            }

            Self::Store {
                sequence,
                action,
                silent,
                ..
            } => {
                let (item, flags) = action.parts();
                w.push(b' ');
                w.raw(sequence.to_string().as_bytes());
                w.push(b' ');
                w.raw(item.as_bytes());
                if *silent {
                    w.raw(b".SILENT");
                }
                w.push(b' ');
                w.flag_list(flags);
            }

            Self::Copy {
                sequence, mailbox, ..
            } => {
                w.push(b' ');
                w.raw(sequence.to_string().as_bytes());
                w.push(b' ');
                w.mailbox(mailbox);
            }
        }

        w.finish()
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
    use crate::types::Flag;

    use super::*;

    #[test]
    fn test_capability_command() {
        let cmd = Command::Capability;
        assert_eq!(cmd.serialize("A1"), b"A1 CAPABILITY\r\n");
    }

    #[test]
    fn test_login_command() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 LOGIN user pass\r\n");
    }

    #[test]
    fn test_login_quoted() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pass word".to_string(),
        };
        assert_eq!(
            cmd.serialize("A1"),
            b"A1 LOGIN user@example.com \"pass word\"\r\n"
        );
    }

    #[test]
    fn test_name_never_contains_credentials() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(cmd.name(), "LOGIN");
    }

    #[test]
    fn test_select_command() {
        let cmd = Command::Select {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 SELECT INBOX\r\n");
    }

    #[test]
    fn test_select_encodes_name() {
        let cmd = Command::Select {
            mailbox: Mailbox::new("Entwürfe"),
        };
        assert_eq!(cmd.serialize("A2"), b"A2 SELECT Entw&APw-rfe\r\n");
    }

    #[test]
    fn test_rename_quotes_spaces() {
        let cmd = Command::Rename {
            from: Mailbox::new("Old Stuff"),
            to: Mailbox::new("Archive"),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 RENAME \"Old Stuff\" Archive\r\n");
    }

    #[test]
    fn test_list_command() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn test_lsub_command() {
        let cmd = Command::Lsub {
            reference: "#news.".to_string(),
            pattern: "comp.mail.%".to_string(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 LSUB #news. \"comp.mail.%\"\r\n");
    }

    #[test]
    fn test_status_command() {
        let cmd = Command::Status {
            mailbox: Mailbox::new("blurdybloop"),
            items: vec![StatusAttribute::UidNext, StatusAttribute::Messages],
        };
        assert_eq!(
            cmd.serialize("A1"),
            b"A1 STATUS blurdybloop (UIDNEXT MESSAGES)\r\n"
        );
    }

    #[test]
    fn test_fetch_command() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::range(1, 10).unwrap(),
            items: FetchItems::Items(vec![FetchAttribute::Flags, FetchAttribute::Uid]),
            uid: false,
        };
        assert_eq!(cmd.serialize("A1"), b"A1 FETCH 1:10 (FLAGS UID)\r\n");
    }

    #[test]
    fn test_partial_fetch_command() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::single(7).unwrap(),
            items: FetchAttribute::partial_peek(Some("TEXT".to_string()), 5000, 5000).into(),
            uid: false,
        };
        assert_eq!(
            cmd.serialize("A9"),
            b"A9 FETCH 7 BODY.PEEK[TEXT]<5000.5000>\r\n"
        );
    }

    #[test]
    fn test_uid_fetch_command() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::All,
            items: FetchItems::All,
            uid: true,
        };
        assert_eq!(cmd.serialize("A1"), b"A1 UID FETCH 1:* ALL\r\n");
    }

    #[test]
    fn test_store_command() {
        let cmd = Command::Store {
            sequence: SequenceSet::single(1).unwrap(),
            action: StoreAction::AddFlags(vec![Flag::Seen]),
            uid: false,
            silent: true,
        };
        assert_eq!(cmd.serialize("A1"), b"A1 STORE 1 +FLAGS.SILENT (\\Seen)\r\n");
    }

    #[test]
    fn test_search_command() {
        let cmd = Command::Search {
            charset: None,
            criteria: SearchCriteria::Unseen,
            uid: false,
        };
        assert_eq!(cmd.serialize("A1"), b"A1 SEARCH UNSEEN\r\n");
    }

    #[test]
    fn test_search_with_charset_uses_literal() {
        let cmd = Command::Search {
            charset: Some("UTF-8".to_string()),
            criteria: SearchCriteria::Subject("café".to_string()),
            uid: true,
        };
        assert_eq!(
            cmd.segments("A4"),
            vec![
                b"A4 UID SEARCH CHARSET UTF-8 SUBJECT {5}\r\n".to_vec(),
                "café\r\n".as_bytes().to_vec(),
            ]
        );
    }

    #[test]
    fn test_search_composite() {
        let cmd = Command::Search {
            charset: None,
            criteria: SearchCriteria::And(vec![
                SearchCriteria::Not(Box::new(SearchCriteria::Seen)),
                SearchCriteria::Or(
                    Box::new(SearchCriteria::From("alice".to_string())),
                    Box::new(SearchCriteria::Larger(1000)),
                ),
            ]),
            uid: false,
        };
        assert_eq!(
            cmd.serialize("A1"),
            b"A1 SEARCH (NOT SEEN OR FROM alice LARGER 1000)\r\n"
        );
    }

    #[test]
    fn test_append_splits_at_literal() {
        let cmd = Command::Append {
            mailbox: Mailbox::new("Sent"),
            flags: vec![Flag::Seen],
            date: None,
            message: b"Subject: hi\r\n\r\nbody".to_vec(),
        };
        assert_eq!(
            cmd.segments("A3"),
            vec![
                b"A3 APPEND Sent (\\Seen) {19}\r\n".to_vec(),
                b"Subject: hi\r\n\r\nbody\r\n".to_vec(),
            ]
        );
    }

    #[test]
    fn test_append_without_flags() {
        let cmd = Command::Append {
            mailbox: Mailbox::inbox(),
            flags: vec![],
            date: None,
            message: b"x".to_vec(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 APPEND INBOX {1}\r\nx\r\n");
    }

    #[test]
    fn test_append_with_internal_date() {
        let cmd = Command::Append {
            mailbox: Mailbox::new("saved-messages"),
            flags: vec![Flag::Seen],
            date: Some(" 7-Feb-1994 21:52:25 -0800".to_string()),
            message: b"x".to_vec(),
        };
        assert_eq!(
            cmd.serialize("A1"),
            b"A1 APPEND saved-messages (\\Seen) \" 7-Feb-1994 21:52:25 -0800\" {1}\r\nx\r\n"
        );
    }

    #[test]
    fn test_authenticate_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: "PLAIN".to_string(),
            initial_response: Some("AHUAcA==".to_string()),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 AUTHENTICATE PLAIN AHUAcA==\r\n");
    }

    #[test]
    fn test_quota_commands() {
        let cmd = Command::GetQuota {
            root: String::new(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 GETQUOTA \"\"\r\n");
        let cmd = Command::GetQuotaRoot {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(cmd.serialize("A2"), b"A2 GETQUOTAROOT INBOX\r\n");
        let cmd = Command::SetQuota {
            root: String::new(),
            limits: vec![("STORAGE".to_string(), 512), ("MESSAGE".to_string(), 1000)],
        };
        assert_eq!(
            cmd.serialize("A3"),
            b"A3 SETQUOTA \"\" (STORAGE 512 MESSAGE 1000)\r\n"
        );
    }

    #[test]
    fn test_acl_commands() {
        let cmd = Command::SetAcl {
            mailbox: Mailbox::new("Entw\u{fc}rfe"),
            identifier: "fred".to_string(),
            rights: "+lrs".to_string(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 SETACL Entw&APw-rfe fred +lrs\r\n");

        let cmd = Command::DeleteAcl {
            mailbox: Mailbox::inbox(),
            identifier: "-anyone".to_string(),
        };
        assert_eq!(cmd.serialize("A2"), b"A2 DELETEACL INBOX -anyone\r\n");

        let cmd = Command::GetAcl {
            mailbox: Mailbox::new("Shared Stuff"),
        };
        assert_eq!(cmd.serialize("A3"), b"A3 GETACL \"Shared Stuff\"\r\n");

        let cmd = Command::ListRights {
            mailbox: Mailbox::inbox(),
            identifier: "smith".to_string(),
        };
        assert_eq!(cmd.serialize("A4"), b"A4 LISTRIGHTS INBOX smith\r\n");

        let cmd = Command::MyRights {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(cmd.name(), "MYRIGHTS");
        assert_eq!(cmd.serialize("A5"), b"A5 MYRIGHTS INBOX\r\n");
    }

    #[test]
    fn test_copy_and_uid_expunge() {
        let cmd = Command::Copy {
            sequence: SequenceSet::range(2, 4).unwrap(),
            mailbox: Mailbox::new("Trash"),
            uid: true,
        };
        assert_eq!(cmd.serialize("A1"), b"A1 UID COPY 2:4 Trash\r\n");

        let cmd = Command::UidExpunge {
            uids: SequenceSet::range(100, 200).unwrap(),
        };
        assert_eq!(cmd.serialize("A1"), b"A1 UID EXPUNGE 100:200\r\n");
    }
}
