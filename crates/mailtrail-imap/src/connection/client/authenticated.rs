//! Mailbox-level operations.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{self, ProtocolState, SelectedState};
use super::Connection;
use crate::command::{Command, StatusAttribute};
use crate::connection::events::EventKind;
use crate::parser::{StatusItem, UntaggedResponse};
use crate::types::{
    AclEntry, Flag, ListEntry, Mailbox, MailboxStatus, Namespace, Quota, RightsList,
};
use crate::{Error, Result};

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    ///
    /// Returns `None` if the server refused; any previously selected
    /// mailbox is then no longer selected.
    pub async fn select(&mut self, mailbox: &str) -> Result<Option<MailboxStatus>> {
        self.open(Mailbox::new(mailbox), false).await
    }

    /// Examines a mailbox for read-only access.
    pub async fn examine(&mut self, mailbox: &str) -> Result<Option<MailboxStatus>> {
        self.open(Mailbox::new(mailbox), true).await
    }

    async fn open(&mut self, mailbox: Mailbox, read_only: bool) -> Result<Option<MailboxStatus>> {
        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.clone(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.clone(),
            }
        };
        let done = self
            .invoke(
                &command,
                &[
                    EventKind::Flags,
                    EventKind::Exists,
                    EventKind::Recent,
                    EventKind::Condition,
                ],
            )
            .await?;

        if !done.is_ok() {
            if self.state.is_selected() {
                self.state = ProtocolState::Authenticated;
            }
            for response in done.responses {
                self.events.push(response);
            }
            return Ok(None);
        }

        let mut status = MailboxStatus {
            read_only,
            ..MailboxStatus::default()
        };
        for response in done.responses {
            if !states::apply(&mut status, &response) {
                self.events.push(response);
            }
        }
        if let Some(code) = &done.code {
            states::apply_code(&mut status, code);
        }

        self.state = ProtocolState::Selected(SelectedState {
            mailbox,
            status: status.clone(),
        });
        Ok(Some(status))
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &str) -> Result<bool> {
        let command = Command::Create {
            mailbox: Mailbox::new(mailbox),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Deletes a mailbox.
    pub async fn delete(&mut self, mailbox: &str) -> Result<bool> {
        let command = Command::Delete {
            mailbox: Mailbox::new(mailbox),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Renames a mailbox.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<bool> {
        let command = Command::Rename {
            from: Mailbox::new(from),
            to: Mailbox::new(to),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Adds a mailbox to the subscription list.
    pub async fn subscribe(&mut self, mailbox: &str) -> Result<bool> {
        let command = Command::Subscribe {
            mailbox: Mailbox::new(mailbox),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Removes a mailbox from the subscription list.
    pub async fn unsubscribe(&mut self, mailbox: &str) -> Result<bool> {
        let command = Command::Unsubscribe {
            mailbox: Mailbox::new(mailbox),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Lists mailboxes matching `pattern` relative to `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>> {
        let command = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        let done = self.invoke(&command, &[EventKind::List]).await?;
        Ok(done
            .responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Lists subscribed mailboxes matching `pattern`.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>> {
        let command = Command::Lsub {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        let done = self.invoke(&command, &[EventKind::Lsub]).await?;
        Ok(done
            .responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Lsub(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Requests STATUS items for a mailbox that need not be selected.
    pub async fn status(
        &mut self,
        mailbox: &str,
        items: &[StatusAttribute],
    ) -> Result<Option<MailboxStatus>> {
        let mailbox = Mailbox::new(mailbox);
        let command = Command::Status {
            mailbox: mailbox.clone(),
            items: items.to_vec(),
        };
        let done = self.invoke(&command, &[EventKind::Status]).await?;
        if !done.is_ok() {
            return Ok(None);
        }

        let mut result = None;
        for response in done.responses {
            match response {
                UntaggedResponse::Status {
                    mailbox: reported,
                    items,
                } if result.is_none() && same_mailbox(&reported, &mailbox) => {
                    result = Some(status_from_items(&items));
                }
                other => self.events.push(other),
            }
        }
        Ok(Some(result.unwrap_or_default()))
    }

    /// Appends a message to a mailbox.
    ///
    /// `date` sets the internal date, in the `date-time` form
    /// `dd-Mon-yyyy hh:mm:ss +zzzz`; anything else fails with
    /// [`Error::Configuration`] before sending. The message is sent as a
    /// literal once the server answers with a continuation. Returns false
    /// if the server refused, including a refusal in place of the
    /// continuation.
    pub async fn append(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        date: Option<&str>,
        content: &[u8],
    ) -> Result<bool> {
        if let Some(date) = date.filter(|d| !is_internal_date(d)) {
            return Err(Error::Configuration(format!("invalid internal date: {date:?}")));
        }
        let command = Command::Append {
            mailbox: Mailbox::new(mailbox),
            flags: flags.to_vec(),
            date: date.map(str::to_string),
            message: content.to_vec(),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Requests the server's namespaces (RFC 2342).
    pub async fn namespace(&mut self) -> Result<Option<Namespace>> {
        let done = self
            .invoke(&Command::Namespace, &[EventKind::Namespace])
            .await?;
        if !done.is_ok() {
            return Ok(None);
        }
        Ok(done.responses.into_iter().find_map(|r| match r {
            UntaggedResponse::Namespace(ns) => Some(ns),
            _ => None,
        }))
    }

    /// Requests the usage and limits of a quota root (RFC 2087).
    pub async fn get_quota(&mut self, root: &str) -> Result<Vec<Quota>> {
        let command = Command::GetQuota {
            root: root.to_string(),
        };
        let done = self.invoke(&command, &[EventKind::Quota]).await?;
        Ok(done
            .responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Quota(quota) => Some(quota),
                _ => None,
            })
            .collect())
    }

    /// Requests the quota roots of a mailbox and their usage.
    ///
    /// Every root named by QUOTAROOT appears in the result, with no
    /// resources if the server sent no QUOTA data for it.
    pub async fn get_quota_root(&mut self, mailbox: &str) -> Result<Vec<Quota>> {
        let command = Command::GetQuotaRoot {
            mailbox: Mailbox::new(mailbox),
        };
        let done = self
            .invoke(&command, &[EventKind::QuotaRoot, EventKind::Quota])
            .await?;

        let mut quotas: Vec<Quota> = Vec::new();
        for response in done.responses {
            match response {
                UntaggedResponse::QuotaRoot { roots, .. } => {
                    for root in roots {
                        if !quotas.iter().any(|q| q.root == root) {
                            quotas.push(Quota {
                                root,
                                resources: Vec::new(),
                            });
                        }
                    }
                }
                UntaggedResponse::Quota(quota) => {
                    match quotas.iter_mut().find(|q| q.root == quota.root) {
                        Some(existing) => existing.resources = quota.resources,
                        None => quotas.push(quota),
                    }
                }
                other => self.events.push(other),
            }
        }
        Ok(quotas)
    }

    /// Sets resource limits on a quota root (RFC 2087).
    ///
    /// The QUOTA data the server sends back is left on the event queue.
    pub async fn set_quota(&mut self, root: &str, limits: &[(&str, u64)]) -> Result<bool> {
        let command = Command::SetQuota {
            root: root.to_string(),
            limits: limits
                .iter()
                .map(|&(resource, limit)| (resource.to_string(), limit))
                .collect(),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Grants, adds (`+`) or removes (`-`) rights for an identifier
    /// (RFC 4314).
    pub async fn set_acl(&mut self, mailbox: &str, identifier: &str, rights: &str) -> Result<bool> {
        let command = Command::SetAcl {
            mailbox: Mailbox::new(mailbox),
            identifier: identifier.to_string(),
            rights: rights.to_string(),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Removes an identifier's entry from a mailbox's ACL.
    pub async fn delete_acl(&mut self, mailbox: &str, identifier: &str) -> Result<bool> {
        let command = Command::DeleteAcl {
            mailbox: Mailbox::new(mailbox),
            identifier: identifier.to_string(),
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Returns a mailbox's access control list, or `None` if refused.
    pub async fn get_acl(&mut self, mailbox: &str) -> Result<Option<Vec<AclEntry>>> {
        let mailbox = Mailbox::new(mailbox);
        let command = Command::GetAcl {
            mailbox: mailbox.clone(),
        };
        let done = self.invoke(&command, &[EventKind::Acl]).await?;
        if !done.is_ok() {
            return Ok(None);
        }

        let mut entries = Vec::new();
        for response in done.responses {
            match response {
                UntaggedResponse::Acl {
                    mailbox: reported,
                    entries: found,
                } if same_mailbox(&reported, &mailbox) => entries.extend(found),
                other => self.events.push(other),
            }
        }
        Ok(Some(entries))
    }

    /// Returns the rights `identifier` can be granted on a mailbox.
    pub async fn list_rights(
        &mut self,
        mailbox: &str,
        identifier: &str,
    ) -> Result<Option<RightsList>> {
        let command = Command::ListRights {
            mailbox: Mailbox::new(mailbox),
            identifier: identifier.to_string(),
        };
        let done = self.invoke(&command, &[EventKind::ListRights]).await?;
        if !done.is_ok() {
            return Ok(None);
        }
        Ok(done.responses.into_iter().find_map(|r| match r {
            UntaggedResponse::ListRights { rights, .. } => Some(rights),
            _ => None,
        }))
    }

    /// Returns the logged-in user's rights on a mailbox.
    pub async fn my_rights(&mut self, mailbox: &str) -> Result<Option<String>> {
        let command = Command::MyRights {
            mailbox: Mailbox::new(mailbox),
        };
        let done = self.invoke(&command, &[EventKind::MyRights]).await?;
        if !done.is_ok() {
            return Ok(None);
        }
        Ok(done.responses.into_iter().find_map(|r| match r {
            UntaggedResponse::MyRights { rights, .. } => Some(rights),
            _ => None,
        }))
    }
}

/// Checks the `date-time` shape `dd-Mon-yyyy hh:mm:ss +zzzz`, where the
/// day may be space-padded.
fn is_internal_date(s: &str) -> bool {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let b = s.as_bytes();
    if b.len() != 26 {
        return false;
    }
    let digits = |from: usize, to: usize| b[from..to].iter().all(u8::is_ascii_digit);

    (b[0] == b' ' || b[0].is_ascii_digit())
        && b[1].is_ascii_digit()
        && b[2] == b'-'
        && MONTHS
            .iter()
            .any(|m| m.as_bytes().eq_ignore_ascii_case(&b[3..6]))
        && b[6] == b'-'
        && digits(7, 11)
        && b[11] == b' '
        && digits(12, 14)
        && b[14] == b':'
        && digits(15, 17)
        && b[17] == b':'
        && digits(18, 20)
        && b[20] == b' '
        && matches!(b[21], b'+' | b'-')
        && digits(22, 26)
}

fn same_mailbox(a: &Mailbox, b: &Mailbox) -> bool {
    a == b || (a.is_inbox() && b.is_inbox())
}

fn status_from_items(items: &[StatusItem]) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for item in items {
        match *item {
            StatusItem::Messages(n) => status.exists = n,
            StatusItem::Recent(n) => status.recent = n,
            StatusItem::UidNext(uid) => status.uid_next = Some(uid),
            StatusItem::UidValidity(v) => status.uid_validity = Some(v),
            StatusItem::Unseen(n) => status.unseen = Some(n),
        }
    }
    status
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::config::Config;
    use crate::parser::Value;
    use crate::types::MailboxAttribute;
    use crate::ErrorKind;

    async fn connect(mock: Mock) -> Connection<Mock> {
        Connection::from_stream(mock, Config::new("imap.example.com"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_select() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 SELECT INBOX\r\n")
            .read(b"* 172 EXISTS\r\n")
            .read(b"* 1 RECENT\r\n")
            .read(b"* OK [UNSEEN 12] Message 12 is first unseen\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4392] Predicted next UID\r\n")
            .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
            .read(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n")
            .read(b"* OK [HIGHESTMODSEQ 9] unknown to us\r\n")
            .read(b"A1 OK [READ-WRITE] SELECT completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let status = conn.select("INBOX").await.unwrap().unwrap();
        assert_eq!(status.exists, 172);
        assert_eq!(status.recent, 1);
        assert_eq!(status.first_unseen.unwrap().get(), 12);
        assert_eq!(status.uid_validity.unwrap().get(), 3857529045);
        assert_eq!(status.uid_next.unwrap().get(), 4392);
        assert_eq!(status.flags.len(), 5);
        assert!(status.permanent_flags.contains(&Flag::MayCreate));
        assert!(!status.read_only);

        let selected = conn.state().selected().unwrap();
        assert!(selected.mailbox.is_inbox());
        // The unrecognized code is not lost.
        assert_eq!(conn.take_events().len(), 1);
    }

    #[tokio::test]
    async fn test_examine_is_read_only() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 EXAMINE Archive\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"A1 OK [READ-ONLY] EXAMINE completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let status = conn.examine("Archive").await.unwrap().unwrap();
        assert!(status.read_only);
        assert!(conn.state().selected().unwrap().is_read_only());
    }

    #[tokio::test]
    async fn test_select_refused_deselects() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 SELECT INBOX\r\n")
            .read(b"A1 OK selected\r\n")
            .write(b"A2 SELECT Missing\r\n")
            .read(b"A2 NO [NONEXISTENT] no such mailbox\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.select("INBOX").await.unwrap().is_some());
        assert!(conn.select("Missing").await.unwrap().is_none());
        assert_eq!(conn.state(), &ProtocolState::Authenticated);
    }

    #[tokio::test]
    async fn test_mailbox_management() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 CREATE Entw&APw-rfe\r\n")
            .read(b"A1 OK created\r\n")
            .write(b"A2 RENAME Entw&APw-rfe Drafts\r\n")
            .read(b"A2 OK renamed\r\n")
            .write(b"A3 SUBSCRIBE Drafts\r\n")
            .read(b"A3 OK subscribed\r\n")
            .write(b"A4 UNSUBSCRIBE Drafts\r\n")
            .read(b"A4 OK unsubscribed\r\n")
            .write(b"A5 DELETE Drafts\r\n")
            .read(b"A5 NO [INUSE] mailbox in use\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.create("Entwürfe").await.unwrap());
        assert!(conn.rename("Entwürfe", "Drafts").await.unwrap());
        assert!(conn.subscribe("Drafts").await.unwrap());
        assert!(conn.unsubscribe("Drafts").await.unwrap());
        assert!(!conn.delete("Drafts").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_decodes_names() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\Noselect) \"/\" \"Entw&APw-rfe\"\r\n")
            .read(b"* 5 EXISTS\r\n")
            .read(b"A1 OK LIST completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let entries = conn.list("", "*").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].mailbox.is_inbox());
        assert_eq!(entries[1].mailbox.as_str(), "Entwürfe");
        assert_eq!(entries[1].delimiter, Some('/'));
        assert_eq!(entries[1].attributes, vec![MailboxAttribute::NoSelect]);
        assert_eq!(conn.take_events(), vec![UntaggedResponse::Exists(5)]);
    }

    #[tokio::test]
    async fn test_undecodable_name_keeps_other_entries() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 LIST \"\" \"*\"\r\n")
            .read(b"* LIST () \"/\" INBOX\r\n")
            .read(b"* LIST () \"/\" Sent\r\n")
            .read(b"* LIST () \"/\" \"Bad&AOk\"\r\n")
            .read(b"A1 OK LIST completed\r\n")
            .write(b"A2 NOOP\r\n")
            .read(b"A2 OK\r\n")
            .build();
        let mut conn = connect(mock).await;

        let err = conn.list("", "*").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
        assert!(!conn.is_poisoned());

        let events = conn.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], UntaggedResponse::List(e) if e.mailbox.is_inbox()));
        assert!(matches!(&events[1], UntaggedResponse::List(e) if e.mailbox.as_str() == "Sent"));
        assert!(matches!(
            &events[2],
            UntaggedResponse::Other { keyword, payload, .. }
                if keyword == "LIST"
                    && payload.last() == Some(&Value::String("Bad&AOk".to_string()))
        ));

        conn.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_lsub() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 LSUB \"\" \"%\"\r\n")
            .read(b"* LSUB () \".\" Sent\r\n")
            .read(b"A1 OK LSUB completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let entries = conn.lsub("", "%").await.unwrap();
        assert_eq!(entries[0].mailbox.as_str(), "Sent");
    }

    #[tokio::test]
    async fn test_status() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 STATUS blurdybloop (MESSAGES UIDNEXT UNSEEN)\r\n")
            .read(b"* STATUS blurdybloop (MESSAGES 231 UIDNEXT 44292 UNSEEN 3)\r\n")
            .read(b"A1 OK STATUS completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let status = conn
            .status(
                "blurdybloop",
                &[
                    StatusAttribute::Messages,
                    StatusAttribute::UidNext,
                    StatusAttribute::Unseen,
                ],
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.exists, 231);
        assert_eq!(status.uid_next.unwrap().get(), 44292);
        assert_eq!(status.unseen, Some(3));
    }

    #[tokio::test]
    async fn test_status_refused() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 STATUS nope (MESSAGES)\r\n")
            .read(b"A1 NO no such mailbox\r\n")
            .build();
        let mut conn = connect(mock).await;

        let status = conn
            .status("nope", &[StatusAttribute::Messages])
            .await
            .unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn test_append_waits_for_continuation() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 APPEND Sent (\\Seen) {11}\r\n")
            .read(b"+ Ready for literal data\r\n")
            .write(b"Hi\r\n\r\nthere\r\n")
            .read(b"A1 OK [APPENDUID 38505 3955] APPEND completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(
            conn.append("Sent", &[Flag::Seen], None, b"Hi\r\n\r\nthere")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_append_refused_before_continuation() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 APPEND Sent {5}\r\n")
            .read(b"A1 NO [TRYCREATE] no such mailbox\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(!conn.append("Sent", &[], None, b"hello").await.unwrap());
        assert!(!conn.is_poisoned());
    }

    #[tokio::test]
    async fn test_append_with_internal_date() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 APPEND Drafts \"17-Jul-1996 02:44:25 -0700\" {2}\r\n")
            .read(b"+ go ahead\r\n")
            .write(b"hi\r\n")
            .read(b"A1 OK APPEND completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(
            conn.append("Drafts", &[], Some("17-Jul-1996 02:44:25 -0700"), b"hi")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_append_rejects_malformed_date() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut conn = connect(mock).await;

        for date in ["1996-07-17 02:44:25", "17-Jly-1996 02:44:25 -0700", ""] {
            let err = conn.append("Drafts", &[], Some(date), b"hi").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{date:?}");
        }
        assert!(!conn.is_poisoned());
    }

    #[test]
    fn test_internal_date_shape() {
        assert!(is_internal_date("17-Jul-1996 02:44:25 -0700"));
        assert!(is_internal_date(" 7-feb-1994 21:52:25 +0100"));
        assert!(!is_internal_date("7-Feb-1994 21:52:25 +0100"));
        assert!(!is_internal_date("17-Jul-1996 02:44:25 0700 "));
    }

    #[tokio::test]
    async fn test_set_quota() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 SETQUOTA \"\" (STORAGE 512)\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 512)\r\n")
            .read(b"A1 OK Setquota completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.set_quota("", &[("STORAGE", 512)]).await.unwrap());
        let events = conn.take_events();
        assert!(matches!(&events[..], [UntaggedResponse::Quota(q)] if q.root.is_empty()));
    }

    #[tokio::test]
    async fn test_acl_operations() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 SETACL INBOX fred +lrs\r\n")
            .read(b"A1 OK Setacl complete\r\n")
            .write(b"A2 GETACL INBOX\r\n")
            .read(b"* ACL INBOX owner lrswipkxtecda fred lrs\r\n")
            .read(b"A2 OK Getacl complete\r\n")
            .write(b"A3 LISTRIGHTS INBOX fred\r\n")
            .read(b"* LISTRIGHTS INBOX fred \"\" l r s w i p k x t e c d a 0 1 2\r\n")
            .read(b"A3 OK Listrights completed\r\n")
            .write(b"A4 MYRIGHTS INBOX\r\n")
            .read(b"* MYRIGHTS INBOX lrswipkxtecda\r\n")
            .read(b"A4 OK Myrights complete\r\n")
            .write(b"A5 DELETEACL INBOX fred\r\n")
            .read(b"A5 NO [NOPERM] not allowed\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.set_acl("INBOX", "fred", "+lrs").await.unwrap());

        let acl = conn.get_acl("INBOX").await.unwrap().unwrap();
        assert_eq!(acl.len(), 2);
        assert_eq!(acl[1].identifier, "fred");
        assert!(acl[1].grants('s'));

        let rights = conn.list_rights("INBOX", "fred").await.unwrap().unwrap();
        assert_eq!(rights.identifier, "fred");
        assert!(rights.required.is_empty());
        assert_eq!(rights.optional.len(), 16);

        assert_eq!(
            conn.my_rights("INBOX").await.unwrap().as_deref(),
            Some("lrswipkxtecda")
        );
        assert!(!conn.delete_acl("INBOX", "fred").await.unwrap());
        assert!(conn.take_events().is_empty());
    }

    #[tokio::test]
    async fn test_get_acl_refused() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 GETACL Archive\r\n")
            .read(b"A1 NO [NOPERM] no admin right\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.get_acl("Archive").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_namespace() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 NAMESPACE\r\n")
            .read(b"* NAMESPACE ((\"\" \"/\")) NIL ((\"Public Folders/\" \"/\"))\r\n")
            .read(b"A1 OK NAMESPACE command completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let ns = conn.namespace().await.unwrap().unwrap();
        assert_eq!(ns.personal[0].prefix, "");
        assert!(ns.other_users.is_empty());
        assert_eq!(ns.shared[0].prefix, "Public Folders/");
    }

    #[tokio::test]
    async fn test_quota_root() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 GETQUOTAROOT INBOX\r\n")
            .read(b"* QUOTAROOT INBOX \"\" backup\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 512)\r\n")
            .read(b"A1 OK Getquota completed\r\n")
            .write(b"A2 GETQUOTA \"\"\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 512 MESSAGE 3 1000)\r\n")
            .read(b"A2 OK Getquota completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let quotas = conn.get_quota_root("INBOX").await.unwrap();
        assert_eq!(quotas.len(), 2);
        assert_eq!(quotas[0].resource("storage").unwrap().limit, 512);
        assert_eq!(quotas[1].root, "backup");
        assert!(quotas[1].resources.is_empty());

        let quotas = conn.get_quota("").await.unwrap();
        assert_eq!(quotas[0].resource("MESSAGE").unwrap().usage, 3);
    }
}
