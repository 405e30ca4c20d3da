//! Integration tests for the IMAP connection.
//!
//! A scripted stream plays the server side: each chunk is delivered by a
//! separate read, the way a server answers only after it has seen the
//! command. Everything the client writes is captured for inspection.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use proptest::prelude::*;
use proptest::sample::{Index, subsequence};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailtrail_imap::connection::Upgrade;
use mailtrail_imap::{
    Capability, Command, Config, Connection, ErrorKind, EventKind, Flag, FlagSnapshot, Flags,
    ProtocolState, Response, ResponseParser, SeqNum, SequenceSet, StoreAction, UntaggedResponse,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server script plus a shared capture of client output.
struct ScriptedStream {
    chunks: VecDeque<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    fn new(chunks: &[&[u8]]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let Some(front) = self.chunks.front_mut() else {
            return Poll::Ready(Ok(()));
        };
        let n = front.len().min(buf.remaining());
        buf.put_slice(&front[..n]);
        front.drain(..n);
        if front.is_empty() {
            self.chunks.pop_front();
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Upgrade for ScriptedStream {
    async fn upgrade(
        self,
        _host: &str,
        _tls: Option<Arc<rustls::ClientConfig>>,
    ) -> mailtrail_imap::Result<Self> {
        Ok(self)
    }
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8_lossy(&sent.lock().unwrap())
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

async fn open(chunks: &[&[u8]]) -> (Connection<ScriptedStream>, Arc<Mutex<Vec<u8>>>) {
    init_tracing();
    let (stream, sent) = ScriptedStream::new(chunks);
    let config = Config::builder("imap.example.com").min_chunk(5).build();
    let conn = Connection::from_stream(stream, config).await.unwrap();
    (conn, sent)
}

const SELECT_INBOX: &[u8] = b"* 172 EXISTS\r\n\
* 1 RECENT\r\n\
* OK [UNSEEN 12] Message 12 is first unseen\r\n\
* OK [UIDVALIDITY 3857529045] UIDs valid\r\n\
* OK [UIDNEXT 4392] Predicted next UID\r\n\
* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n\
A1 OK [READ-WRITE] SELECT completed\r\n";

#[tokio::test]
async fn test_select_status() {
    let (mut conn, sent) = open(&[b"* PREAUTH ready\r\n", SELECT_INBOX]).await;

    let status = conn.select("INBOX").await.unwrap().unwrap();
    assert_eq!(status.exists, 172);
    assert_eq!(status.recent, 1);
    assert_eq!(status.first_unseen.map(SeqNum::get), Some(12));
    assert_eq!(status.uid_validity.map(|v| v.get()), Some(3_857_529_045));
    assert_eq!(status.uid_next.map(|u| u.get()), Some(4392));
    assert!(status.flags.contains(&Flag::Draft));
    assert!(status.permanent_flags.contains(&Flag::Deleted));
    assert!(!status.read_only);
    assert!(conn.state().is_selected());
    assert!(conn.take_events().is_empty());
    assert_eq!(sent_lines(&sent), vec!["A1 SELECT INBOX"]);
}

#[tokio::test]
async fn test_interleaved_events_are_not_lost() {
    let (mut conn, _) = open(&[
        b"* PREAUTH ready\r\n",
        SELECT_INBOX,
        b"* 1 FETCH (FLAGS (\\Seen))\r\n",
        b"* 173 EXISTS\r\n",
        b"* 2 FETCH (FLAGS ())\r\n",
        b"* 40 EXPUNGE\r\n",
        b"A2 OK FETCH completed\r\n",
    ])
    .await;
    conn.select("INBOX").await.unwrap();

    let messages = conn
        .fetch(&SequenceSet::range(1, 2).unwrap(), mailtrail_imap::FetchAttribute::Flags)
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].flags().unwrap().is_seen());
    assert!(messages[1].flags().unwrap().is_empty());

    let events = conn.take_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], UntaggedResponse::Exists(173)));
    assert!(matches!(&events[1], UntaggedResponse::Expunge(seq) if seq.get() == 40));
    assert!(conn.take_events().is_empty());
}

#[tokio::test]
async fn test_tags_advance_across_ok_no_and_bad() {
    let (mut conn, sent) = open(&[
        b"* OK IMAP4rev1 server ready\r\n",
        b"A1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n",
        b"A2 OK LOGIN completed\r\n",
        b"A3 NO Mailbox exists\r\n",
        b"A4 OK NOOP completed\r\n",
        b"A5 BAD Command unknown\r\n",
    ])
    .await;

    assert!(!conn.login("tim", "wrong").await.unwrap());
    assert!(conn.login("tim", "right").await.unwrap());
    assert!(matches!(conn.state(), ProtocolState::Authenticated));
    assert!(!conn.create("Archive").await.unwrap());
    conn.noop().await.unwrap();

    let err = conn.delete("Archive").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(conn.is_poisoned());

    let err = conn.noop().await.unwrap_err();
    assert!(matches!(err, mailtrail_imap::Error::Unusable));

    let tags: Vec<String> = sent_lines(&sent)
        .iter()
        .map(|l| l.split(' ').next().unwrap().to_string())
        .collect();
    assert_eq!(tags, vec!["A1", "A2", "A3", "A4", "A5"]);
}

#[tokio::test]
async fn test_starttls_requeries_capabilities() {
    let (mut conn, sent) = open(&[
        b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n",
        b"A1 OK Begin TLS negotiation now\r\n",
        b"* CAPABILITY IMAP4rev1 AUTH=PLAIN SASL-IR\r\n",
        b"A2 OK CAPABILITY completed\r\n",
        b"A3 OK Success\r\n",
    ])
    .await;
    assert!(conn.has_capability(&Capability::StartTls));
    assert!(conn.has_capability(&Capability::LoginDisabled));

    assert!(conn.starttls().await.unwrap());
    assert!(!conn.has_capability(&Capability::StartTls));
    assert!(!conn.has_capability(&Capability::LoginDisabled));
    assert!(conn.supports_auth("PLAIN"));

    assert!(conn.authenticate_plain("tim", "secret").await.unwrap());
    assert_eq!(
        sent_lines(&sent),
        vec![
            "A1 STARTTLS",
            "A2 CAPABILITY",
            "A3 AUTHENTICATE PLAIN AHRpbQBzZWNyZXQ=",
        ]
    );
}

#[tokio::test]
async fn test_cram_md5_exchange() {
    let (mut conn, sent) = open(&[
        b"* OK [CAPABILITY IMAP4rev1 AUTH=CRAM-MD5] ready\r\n",
        b"+ PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+\r\n",
        b"A1 OK CRAM authentication successful\r\n",
    ])
    .await;
    assert!(conn.supports_auth("CRAM-MD5"));

    assert!(
        conn.authenticate_cram_md5("tim", "tanstaaftanstaaf")
            .await
            .unwrap()
    );
    assert!(conn.state().is_authenticated());
    assert_eq!(
        sent_lines(&sent),
        vec![
            "A1 AUTHENTICATE CRAM-MD5",
            "dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw",
        ]
    );
}

#[tokio::test]
async fn test_partial_fetch_compliant_server() {
    let (mut conn, sent) = open(&[
        b"* PREAUTH ready\r\n",
        b"* 1 FETCH (BODY[]<0> {5}\r\nHello)\r\nA1 OK FETCH completed\r\n",
        b"* 1 FETCH (BODY[]<5> {5}\r\n worl)\r\nA2 OK FETCH completed\r\n",
        b"* 1 FETCH (BODY[]<10> {1}\r\nd)\r\nA3 OK FETCH completed\r\n",
    ])
    .await;

    let mut reader = conn.partial_fetch(SeqNum::new(1).unwrap(), None);
    let mut buf = [0u8; 2];
    assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
    assert_eq!(&buf, b"He");
    assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
    assert_eq!(&buf, b"ll");
    assert_eq!(reader.read(&mut buf).await.unwrap(), 1);
    assert_eq!(&buf[..1], b"o");
    assert_eq!(reader.read_to_end().await.unwrap(), b" world");
    assert!(reader.is_terminal());
    drop(reader);

    assert_eq!(
        sent_lines(&sent),
        vec![
            "A1 FETCH 1 BODY.PEEK[]<0.5>",
            "A2 FETCH 1 BODY.PEEK[]<5.5>",
            "A3 FETCH 1 BODY.PEEK[]<10.5>",
        ]
    );
}

#[tokio::test]
async fn test_partial_fetch_non_compliant_server() {
    let (mut conn, sent) = open(&[
        b"* PREAUTH ready\r\n",
        b"* 4 FETCH (BODY[TEXT] {11}\r\nHello world)\r\nA1 OK FETCH completed\r\n",
    ])
    .await;

    let mut reader = conn.partial_fetch(SeqNum::new(4).unwrap(), Some("TEXT"));
    let mut buf = [0u8; 3];
    assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
    assert!(reader.is_terminal());
    assert_eq!(reader.cached(), 8);
    assert_eq!(reader.read_to_end().await.unwrap(), b"lo world");
    assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    drop(reader);

    assert_eq!(sent_lines(&sent), vec!["A1 FETCH 4 BODY.PEEK[TEXT]<0.5>"]);
}

#[tokio::test]
async fn test_append_waits_for_continuation() {
    let (mut conn, sent) = open(&[
        b"* PREAUTH ready\r\n",
        b"+ Ready for literal data\r\n",
        b"A1 OK [APPENDUID 38505 3955] APPEND completed\r\n",
    ])
    .await;

    let message = b"From: fred\r\n\r\nhi\0";
    assert!(
        conn.append("saved-messages", &[Flag::Seen], None, message)
            .await
            .unwrap()
    );
    assert_eq!(
        String::from_utf8_lossy(&sent.lock().unwrap()),
        "A1 APPEND saved-messages (\\Seen) {17}\r\nFrom: fred\r\n\r\nhi\0\r\n"
    );
}

#[tokio::test]
async fn test_alerts_are_collected() {
    let (mut conn, _) = open(&[
        b"* OK [ALERT] System shutdown in 10 minutes\r\n",
        b"* OK [ALERT] Mailbox is at 95% of quota\r\nA1 OK [ALERT] Password expires soon\r\n",
    ])
    .await;

    conn.noop().await.unwrap();
    assert_eq!(
        conn.take_alerts(),
        vec![
            "System shutdown in 10 minutes",
            "Mailbox is at 95% of quota",
            "Password expires soon",
        ]
    );
    assert!(conn.take_alerts().is_empty());
}

#[tokio::test]
async fn test_store_accepts_both_fetch_shapes() {
    let (mut conn, sent) = open(&[
        b"* PREAUTH ready\r\n",
        b"* 1 FETCH (FLAGS (\\Seen \\Flagged))\r\n* 2 FETCH (UID 8 FLAGS (\\Seen))\r\nA1 OK STORE completed\r\n",
    ])
    .await;

    let messages = conn
        .store(
            &SequenceSet::range(1, 2).unwrap(),
            StoreAction::AddFlags(vec![Flag::Seen]),
            false,
        )
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].flags().unwrap().contains(&Flag::Flagged));
    assert_eq!(messages[1].uid().map(|u| u.get()), Some(8));
    assert!(messages[1].flags().unwrap().is_seen());
    assert_eq!(sent_lines(&sent), vec!["A1 STORE 1:2 +FLAGS (\\Seen)"]);
}

#[tokio::test]
async fn test_store_delta_sends_only_changes() {
    let (mut conn, sent) = open(&[
        b"* PREAUTH ready\r\n",
        b"A1 OK STORE completed\r\n",
        b"A2 OK STORE completed\r\n",
    ])
    .await;

    let mut snapshot = FlagSnapshot::new([Flag::Seen, Flag::Draft].into_iter().collect::<Flags>());
    snapshot.checkpoint();
    snapshot.set(Flag::Answered);
    snapshot.clear(&Flag::Draft);

    let set = SequenceSet::single(3).unwrap();
    assert!(conn.store_delta(&set, &mut snapshot).await.unwrap());
    assert!(!snapshot.is_dirty());
    // Nothing changed since the checkpoint: no round trip.
    assert!(conn.store_delta(&set, &mut snapshot).await.unwrap());

    assert_eq!(
        sent_lines(&sent),
        vec![
            "A1 STORE 3 +FLAGS.SILENT (\\Answered)",
            "A2 STORE 3 -FLAGS.SILENT (\\Draft)",
        ]
    );
}

#[tokio::test]
async fn test_logout() {
    let (mut conn, sent) = open(&[
        b"* PREAUTH ready\r\n",
        b"* BYE IMAP4rev1 Server logging out\r\nA1 OK LOGOUT completed\r\n",
    ])
    .await;

    conn.logout().await.unwrap();
    assert!(matches!(conn.state(), ProtocolState::Logout));
    assert_eq!(sent_lines(&sent), vec!["A1 LOGOUT"]);
}

/// One untagged line a server may slip in before a tagged completion.
#[derive(Debug, Clone)]
enum Unsolicited {
    Exists(u32),
    Expunge(u32),
    Fetch { seq: u32, seen: bool },
    Alert(u8),
    Notice(u8),
}

impl Unsolicited {
    fn wire(&self) -> String {
        match self {
            Self::Exists(n) => format!("* {n} EXISTS\r\n"),
            Self::Expunge(n) => format!("* {n} EXPUNGE\r\n"),
            Self::Fetch { seq, seen: true } => format!("* {seq} FETCH (FLAGS (\\Seen))\r\n"),
            Self::Fetch { seq, seen: false } => format!("* {seq} FETCH (UID {seq} FLAGS ())\r\n"),
            Self::Alert(n) => format!("* OK [ALERT] quota notice {n}\r\n"),
            Self::Notice(n) => format!("* OK checkpoint {n}\r\n"),
        }
    }
}

fn unsolicited() -> impl Strategy<Value = Unsolicited> {
    prop_oneof![
        (0u32..500).prop_map(Unsolicited::Exists),
        (1u32..500).prop_map(Unsolicited::Expunge),
        (1u32..500, any::<bool>()).prop_map(|(seq, seen)| Unsolicited::Fetch { seq, seen }),
        any::<u8>().prop_map(Unsolicited::Alert),
        any::<u8>().prop_map(Unsolicited::Notice),
    ]
}

/// Splits `bytes` at the given cut points into read-sized chunks.
fn chunked(bytes: &[u8], cuts: &[Index]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len())).collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        if point > start {
            chunks.push(bytes[start..point].to_vec());
            start = point;
        }
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_untagged_lines_are_claimed_or_queued_in_order(
        lines in proptest::collection::vec(unsolicited(), 0..24),
        interest in subsequence(
            vec![EventKind::Exists, EventKind::Expunge, EventKind::Fetch, EventKind::Condition],
            0..=4,
        ),
        cuts in proptest::collection::vec(any::<Index>(), 0..8),
    ) {
        let mut script: Vec<u8> = lines.iter().flat_map(|l| l.wire().into_bytes()).collect();
        script.extend_from_slice(b"A1 OK NOOP completed\r\n");
        let chunks = chunked(&script, &cuts);

        let expected: Vec<UntaggedResponse> = lines
            .iter()
            .map(|l| match ResponseParser::parse(l.wire().as_bytes()).unwrap() {
                Response::Untagged(u) => u,
                other => panic!("Expected untagged, got {other:?}"),
            })
            .collect();
        let expected_alerts: Vec<String> = lines
            .iter()
            .filter_map(|l| match l {
                Unsolicited::Alert(n) => Some(format!("quota notice {n}")),
                _ => None,
            })
            .collect();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (claimed, queued, alerts, sent) = runtime.block_on(async {
            let mut script: Vec<&[u8]> = vec![b"* PREAUTH ready\r\n"];
            script.extend(chunks.iter().map(Vec::as_slice));
            let (mut conn, sent) = open(&script).await;
            let done = conn.invoke(&Command::Noop, &interest).await.unwrap();
            assert!(done.is_ok());
            (done.responses, conn.take_events(), conn.take_alerts(), sent_lines(&sent))
        });

        let (want_claimed, want_queued): (Vec<_>, Vec<_>) = expected
            .into_iter()
            .partition(|r| EventKind::of(r).is_some_and(|k| interest.contains(&k)));
        prop_assert_eq!(claimed, want_claimed);
        prop_assert_eq!(queued, want_queued);
        prop_assert_eq!(alerts, expected_alerts);
        prop_assert_eq!(sent, vec!["A1 NOOP".to_string()]);
    }
}
