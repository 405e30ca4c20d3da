//! Message-level operations on the selected mailbox.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Connection;
use crate::command::{Command, FetchItems, SearchCriteria, StoreAction};
use crate::connection::events::EventKind;
use crate::parser::{MessageStatus, UntaggedResponse};
use crate::types::{FlagSnapshot, Mailbox, SeqNum, SequenceSet};
use crate::Result;

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Permanently removes messages flagged `\Deleted`.
    ///
    /// Returns the expunged sequence numbers in the order the server
    /// reported them; each is relative to the mailbox after the previous
    /// expunge.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        self.expunge_with(&Command::Expunge).await
    }

    /// Expunges only the given UIDs (RFC 4315).
    pub async fn uid_expunge(&mut self, uids: &SequenceSet) -> Result<Vec<SeqNum>> {
        self.expunge_with(&Command::UidExpunge { uids: uids.clone() })
            .await
    }

    async fn expunge_with(&mut self, command: &Command) -> Result<Vec<SeqNum>> {
        let done = self.invoke(command, &[EventKind::Expunge]).await?;
        let expunged: Vec<SeqNum> = done
            .responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect();

        if let Some(selected) = self.state.selected_mut() {
            let removed = u32::try_from(expunged.len()).unwrap_or(u32::MAX);
            selected.status.exists = selected.status.exists.saturating_sub(removed);
        }
        Ok(expunged)
    }

    /// Searches the selected mailbox; returns message sequence numbers.
    pub async fn search(
        &mut self,
        charset: Option<&str>,
        criteria: &SearchCriteria,
    ) -> Result<Vec<u32>> {
        self.search_with(charset, criteria, false).await
    }

    /// Searches the selected mailbox; returns UIDs.
    pub async fn uid_search(
        &mut self,
        charset: Option<&str>,
        criteria: &SearchCriteria,
    ) -> Result<Vec<u32>> {
        self.search_with(charset, criteria, true).await
    }

    async fn search_with(
        &mut self,
        charset: Option<&str>,
        criteria: &SearchCriteria,
        uid: bool,
    ) -> Result<Vec<u32>> {
        let command = Command::Search {
            charset: charset.map(str::to_string),
            criteria: criteria.clone(),
            uid,
        };
        let done = self.invoke(&command, &[EventKind::Search]).await?;
        Ok(done
            .responses
            .into_iter()
            .flat_map(|r| match r {
                UntaggedResponse::Search(ids) => ids,
                _ => Vec::new(),
            })
            .collect())
    }

    /// Fetches data items for messages by sequence number.
    pub async fn fetch(
        &mut self,
        set: &SequenceSet,
        items: impl Into<FetchItems>,
    ) -> Result<Vec<MessageStatus>> {
        self.fetch_with(set, items.into(), false).await
    }

    /// Fetches data items for messages by UID.
    pub async fn uid_fetch(
        &mut self,
        set: &SequenceSet,
        items: impl Into<FetchItems>,
    ) -> Result<Vec<MessageStatus>> {
        self.fetch_with(set, items.into(), true).await
    }

    async fn fetch_with(
        &mut self,
        set: &SequenceSet,
        items: FetchItems,
        uid: bool,
    ) -> Result<Vec<MessageStatus>> {
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let command = Command::Fetch {
            sequence: set.clone(),
            items,
            uid,
        };
        let done = self.invoke(&command, &[EventKind::Fetch]).await?;
        Ok(collect_messages(done.responses))
    }

    /// Alters message flags. Without `silent` the server echoes the new
    /// flags, in either FETCH shape; with it, any FETCH that arrives is
    /// unsolicited and goes to the event queue.
    pub async fn store(
        &mut self,
        set: &SequenceSet,
        action: StoreAction,
        silent: bool,
    ) -> Result<Vec<MessageStatus>> {
        self.store_with(set, action, silent, false).await
    }

    /// Alters message flags by UID.
    pub async fn uid_store(
        &mut self,
        set: &SequenceSet,
        action: StoreAction,
        silent: bool,
    ) -> Result<Vec<MessageStatus>> {
        self.store_with(set, action, silent, true).await
    }

    async fn store_with(
        &mut self,
        set: &SequenceSet,
        action: StoreAction,
        silent: bool,
        uid: bool,
    ) -> Result<Vec<MessageStatus>> {
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let command = Command::Store {
            sequence: set.clone(),
            action,
            uid,
            silent,
        };
        let interest: &[EventKind] = if silent { &[] } else { &[EventKind::Fetch] };
        let done = self.invoke(&command, interest).await?;
        Ok(collect_messages(done.responses))
    }

    /// Sends only the flag changes recorded in `snapshot` since its last
    /// checkpoint, as `+FLAGS.SILENT` and `-FLAGS.SILENT`.
    ///
    /// On success the snapshot is checkpointed. Returns false if the server
    /// refused either update; no command is sent when nothing changed.
    pub async fn store_delta(
        &mut self,
        set: &SequenceSet,
        snapshot: &mut FlagSnapshot,
    ) -> Result<bool> {
        let added = snapshot.added();
        let removed = snapshot.removed();

        let mut ok = true;
        if !added.is_empty() {
            let action = StoreAction::AddFlags(added.into_iter().collect());
            ok &= self.store_ok(set, action).await?;
        }
        if ok && !removed.is_empty() {
            let action = StoreAction::RemoveFlags(removed.into_iter().collect());
            ok &= self.store_ok(set, action).await?;
        }
        if ok {
            snapshot.checkpoint();
        }
        Ok(ok)
    }

    async fn store_ok(&mut self, set: &SequenceSet, action: StoreAction) -> Result<bool> {
        let command = Command::Store {
            sequence: set.clone(),
            action,
            uid: false,
            silent: true,
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }

    /// Copies messages to another mailbox. An empty set succeeds without a
    /// round trip.
    pub async fn copy(&mut self, set: &SequenceSet, mailbox: &str) -> Result<bool> {
        self.copy_with(set, mailbox, false).await
    }

    /// Copies messages by UID.
    pub async fn uid_copy(&mut self, set: &SequenceSet, mailbox: &str) -> Result<bool> {
        self.copy_with(set, mailbox, true).await
    }

    async fn copy_with(&mut self, set: &SequenceSet, mailbox: &str, uid: bool) -> Result<bool> {
        if set.is_empty() {
            return Ok(true);
        }
        let command = Command::Copy {
            sequence: set.clone(),
            mailbox: Mailbox::new(mailbox),
            uid,
        };
        Ok(self.invoke(&command, &[]).await?.is_ok())
    }
}

/// Groups FETCH responses by message, keeping first-seen order.
///
/// Servers may split the items for one message across several responses.
fn collect_messages(responses: Vec<UntaggedResponse>) -> Vec<MessageStatus> {
    let mut messages: Vec<MessageStatus> = Vec::new();
    for response in responses {
        if let UntaggedResponse::Fetch { seq, items } = response {
            match messages.iter_mut().find(|m| m.seq == seq) {
                Some(message) => message.merge(items),
                None => messages.push(MessageStatus { seq, items }),
            }
        }
    }
    messages
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
    use crate::command::FetchAttribute;
    use crate::connection::config::Config;
    use crate::types::{Flag, Flags};

    async fn selected(mock: Mock) -> Connection<Mock> {
        Connection::from_stream(mock, Config::new("imap.example.com"))
            .await
            .unwrap()
    }

    fn set(text: &[u32]) -> SequenceSet {
        SequenceSet::from_numbers(text.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_expunge() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"* 5 EXPUNGE\r\n")
            .read(b"* 8 EXPUNGE\r\n")
            .read(b"A1 OK EXPUNGE completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let expunged = conn.expunge().await.unwrap();
        let numbers: Vec<u32> = expunged.iter().map(|s| s.get()).collect();
        assert_eq!(numbers, vec![3, 3, 5, 8]);
    }

    #[tokio::test]
    async fn test_uid_expunge() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 UID EXPUNGE 3000:3002\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"A1 OK UID EXPUNGE completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let expunged = conn.uid_expunge(&set(&[3000, 3001, 3002])).await.unwrap();
        assert_eq!(expunged.len(), 1);
    }

    #[tokio::test]
    async fn test_search() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 SEARCH (FLAGGED SINCE 1-Feb-1994 NOT FROM Smith)\r\n")
            .read(b"* SEARCH 2 84 882\r\n")
            .read(b"A1 OK SEARCH completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let criteria = SearchCriteria::And(vec![
            SearchCriteria::Flagged,
            SearchCriteria::Since("1-Feb-1994".into()),
            SearchCriteria::Not(Box::new(SearchCriteria::From("Smith".into()))),
        ]);
        let ids = conn.search(None, &criteria).await.unwrap();
        assert_eq!(ids, vec![2, 84, 882]);
    }

    #[tokio::test]
    async fn test_search_with_charset_sends_literal() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 SEARCH CHARSET UTF-8 SUBJECT {7}\r\n")
            .read(b"+ go ahead\r\n")
            .write("Grüße\r\n".as_bytes())
            .read(b"* SEARCH 3\r\n")
            .read(b"A1 OK SEARCH completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let ids = conn
            .search(Some("UTF-8"), &SearchCriteria::Subject("Grüße".into()))
            .await
            .unwrap();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_uid_search_with_empty_result() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 UID SEARCH UNSEEN\r\n")
            .read(b"* SEARCH\r\n")
            .read(b"A1 OK SEARCH completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let ids = conn
            .uid_search(None, &SearchCriteria::Unseen)
            .await
            .unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_merges_split_responses() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 FETCH 1:2 (FLAGS UID)\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"* 2 FETCH (FLAGS () UID 11)\r\n")
            .read(b"* 1 FETCH (UID 10)\r\n")
            .read(b"A1 OK FETCH completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let messages = conn
            .fetch(
                &set(&[1, 2]),
                FetchItems::Items(vec![FetchAttribute::Flags, FetchAttribute::Uid]),
            )
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].uid().unwrap().get(), 10);
        assert!(messages[0].flags().unwrap().is_seen());
        assert_eq!(messages[1].uid().unwrap().get(), 11);
    }

    #[tokio::test]
    async fn test_uid_fetch_body_literal() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 UID FETCH 42 BODY.PEEK[]\r\n")
            .read(b"* 7 FETCH (UID 42 BODY[] {13}\r\nline\r\nline\0\r\n)\r\n")
            .read(b"A1 OK FETCH completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let attr = FetchAttribute::Body {
            section: None,
            peek: true,
            partial: None,
        };
        let messages = conn.uid_fetch(&set(&[42]), attr).await.unwrap();
        assert_eq!(messages[0].seq.get(), 7);
        assert_eq!(messages[0].body(None).unwrap(), b"line\r\nline\0\r\n");
    }

    #[tokio::test]
    async fn test_store_accepts_both_fetch_shapes() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 STORE 2:3 +FLAGS (\\Deleted)\r\n")
            .read(b"* 2 FETCH (FLAGS (\\Deleted \\Seen))\r\n")
            .read(b"* 3 FETCH FLAGS (\\Deleted)\r\n")
            .read(b"A1 OK STORE completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let messages = conn
            .store(&set(&[2, 3]), StoreAction::AddFlags(vec![Flag::Deleted]), false)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.flags().unwrap().is_deleted()));
    }

    #[tokio::test]
    async fn test_silent_store_queues_unsolicited_fetch() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 UID STORE 9 FLAGS.SILENT (\\Seen)\r\n")
            .read(b"* 4 FETCH (FLAGS (\\Flagged))\r\n")
            .read(b"A1 OK STORE completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let messages = conn
            .uid_store(&set(&[9]), StoreAction::SetFlags(vec![Flag::Seen]), true)
            .await
            .unwrap();
        assert!(messages.is_empty());
        assert_eq!(conn.take_events().len(), 1);
    }

    #[tokio::test]
    async fn test_store_delta_sends_only_changes() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 STORE 5 +FLAGS.SILENT (\\Flagged)\r\n")
            .read(b"A1 OK STORE completed\r\n")
            .write(b"A2 STORE 5 -FLAGS.SILENT (\\Seen)\r\n")
            .read(b"A2 OK STORE completed\r\n")
            .build();
        let mut conn = selected(mock).await;

        let mut snapshot = FlagSnapshot::new([Flag::Seen, Flag::Draft].into_iter().collect::<Flags>());
        snapshot.checkpoint();
        snapshot.set(Flag::Flagged);
        snapshot.clear(&Flag::Seen);

        assert!(conn.store_delta(&set(&[5]), &mut snapshot).await.unwrap());
        assert!(!snapshot.is_dirty());

        // Nothing changed since the checkpoint: no round trip.
        assert!(conn.store_delta(&set(&[5]), &mut snapshot).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 COPY 2:4 MEETING\r\n")
            .read(b"A1 OK [COPYUID 38505 304,319:320 3956:3958] COPY completed\r\n")
            .write(b"A2 UID COPY 7 Trash\r\n")
            .read(b"A2 NO [TRYCREATE] no such mailbox\r\n")
            .build();
        let mut conn = selected(mock).await;

        assert!(conn.copy(&set(&[2, 3, 4]), "MEETING").await.unwrap());
        assert!(!conn.uid_copy(&set(&[7]), "Trash").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_empty_set_skips_round_trip() {
        let mock = Builder::new().read(b"* PREAUTH ready\r\n").build();
        let mut conn = selected(mock).await;

        assert!(conn.copy(&SequenceSet::Set(Vec::new()), "Trash").await.unwrap());
    }
}
