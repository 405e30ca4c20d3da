//! IMAP client connection.
//!
//! [`Connection`] owns the framed stream, the tag counter and the session
//! event queue. Every operation takes `&mut self`, so exactly one command
//! is in flight at a time. Operations are grouped by the protocol state in
//! which they are normally used:
//!
//! - `not_authenticated`: greeting, STARTTLS, LOGIN, AUTHENTICATE
//! - `authenticated`: mailbox management, APPEND, NAMESPACE, QUOTA, ACL
//! - `selected`: SEARCH, FETCH, STORE, COPY, EXPUNGE, partial fetch

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace, warn};

pub use self::states::{ProtocolState, SelectedState};
use super::config::Config;
use super::events::{EventKind, EventQueue};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, MailboxStatus, ResponseCode, Status, Tag};
use crate::{Error, ErrorKind, Result};

/// Answers a server continuation during AUTHENTICATE.
///
/// Receives the continuation text and returns the line to send, without
/// CRLF.
pub(crate) type Responder<'a> = &'a mut (dyn FnMut(Option<&str>) -> Vec<u8> + Send);

/// Outcome of one tagged command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Tag the command was sent with.
    pub tag: Tag,
    /// Tagged status: OK or NO. BAD is raised as an error.
    pub status: Status,
    /// Response code of the tagged line.
    pub code: Option<ResponseCode>,
    /// Human-readable text of the tagged line.
    pub text: String,
    /// Untagged responses claimed by this command, in arrival order.
    pub responses: Vec<UntaggedResponse>,
}

impl Completion {
    /// Returns true if the command completed with OK.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }
}

/// IMAP client connection.
pub struct Connection<S> {
    stream: Option<FramedStream<S>>,
    tags: TagGenerator,
    capabilities: Vec<Capability>,
    state: ProtocolState,
    events: EventQueue,
    config: Config,
    poisoned: bool,
    bye: Option<String>,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.host)
            .field("tags", &self.tags)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server advertises `AUTH=<mechanism>`.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.capabilities.iter().any(|c| c.is_auth(mechanism))
    }

    /// Returns the current protocol state.
    #[must_use]
    pub const fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Returns the configuration this connection was opened with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true once a protocol or connection error has made the
    /// connection unusable.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Drains untagged responses no command claimed, in arrival order.
    pub fn take_events(&mut self) -> Vec<UntaggedResponse> {
        self.events.take_events()
    }

    /// Drains ALERT texts, in arrival order.
    pub fn take_alerts(&mut self) -> Vec<String> {
        self.events.take_alerts()
    }

    /// Puts a response an operation claimed but did not use back on the
    /// session queue.
    pub(crate) fn requeue(&mut self, response: UntaggedResponse) {
        self.events.push(response);
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let done = self.invoke(&Command::Capability, &[EventKind::Capability]).await?;
        for response in done.responses {
            if let UntaggedResponse::Capability(caps) = response {
                self.capabilities = caps;
            }
        }
        Ok(self.capabilities.clone())
    }

    /// Sends NOOP and returns the selected mailbox's status after folding in
    /// any EXISTS, RECENT or FLAGS the server reported.
    ///
    /// Outside the selected state the returned status only reflects what
    /// this NOOP carried.
    pub async fn noop(&mut self) -> Result<MailboxStatus> {
        let done = self
            .invoke(
                &Command::Noop,
                &[EventKind::Exists, EventKind::Recent, EventKind::Flags],
            )
            .await?;

        let mut status = self
            .state
            .selected()
            .map(|s| s.status.clone())
            .unwrap_or_default();
        for response in &done.responses {
            states::apply(&mut status, response);
        }
        if let Some(selected) = self.state.selected_mut() {
            selected.status = status.clone();
        }
        Ok(status)
    }

    /// Sends LOGOUT. The server answers BYE then OK.
    pub async fn logout(&mut self) -> Result<()> {
        self.invoke(&Command::Logout, &[EventKind::Bye]).await?;
        self.state = ProtocolState::Logout;
        Ok(())
    }

    /// Sends CHECK (request a checkpoint of the selected mailbox).
    pub async fn check(&mut self) -> Result<bool> {
        Ok(self.invoke(&Command::Check, &[]).await?.is_ok())
    }

    /// Sends CLOSE: silently expunges and leaves the selected state.
    pub async fn close(&mut self) -> Result<bool> {
        let ok = self.invoke(&Command::Close, &[]).await?.is_ok();
        if ok {
            self.state = ProtocolState::Authenticated;
        }
        Ok(ok)
    }

    /// Sends `command` and reads until its tagged completion.
    ///
    /// Untagged responses whose kind is in `interest` are returned in the
    /// completion; all others go to the session queue.
    pub async fn invoke(&mut self, command: &Command, interest: &[EventKind]) -> Result<Completion> {
        let done = self.exchange(command, interest, None).await?;
        self.check_bad(done)
    }

    /// Raises a tagged BAD as an error and poisons the connection.
    pub(crate) fn check_bad(&mut self, done: Completion) -> Result<Completion> {
        if done.status == Status::Bad {
            self.poisoned = true;
            return Err(Error::Bad(done.text));
        }
        Ok(done)
    }

    /// Runs one command, returning BAD completions rather than raising them.
    ///
    /// Any error poisons the connection except a decoding error in a
    /// single response, which is reported once the command has completed.
    /// In that case the claimed responses go to the session queue, with the
    /// undecodable one kept as [`UntaggedResponse::Other`].
    pub(crate) async fn exchange(
        &mut self,
        command: &Command,
        interest: &[EventKind],
        responder: Option<Responder<'_>>,
    ) -> Result<Completion> {
        if self.poisoned {
            return Err(Error::Unusable);
        }

        let mut deferred = None;
        match self.run(command, interest, responder, &mut deferred).await {
            Ok(done) => match deferred {
                Some(err) => {
                    // The caller only sees the error; keep what the command claimed.
                    for response in done.responses {
                        self.events.push(response);
                    }
                    Err(err)
                }
                None => Ok(done),
            },
            Err(err) => {
                warn!(command = command.name(), error = %err, "connection unusable");
                self.poisoned = true;
                Err(err)
            }
        }
    }

    async fn run(
        &mut self,
        command: &Command,
        interest: &[EventKind],
        mut responder: Option<Responder<'_>>,
        deferred: &mut Option<Error>,
    ) -> Result<Completion> {
        let tag = self.tags.next_tag()?;
        debug!(tag = tag.as_str(), command = command.name(), "C:");

        let mut segments = command.segments(tag.as_str()).into_iter();
        let first = segments.next().unwrap_or_default();
        self.framed()?.write_command(&first).await?;

        let mut claimed = Vec::new();
        loop {
            let bytes = self.read_next().await?;
            trace!(line = %String::from_utf8_lossy(&bytes).trim_end(), "S:");

            let response = match ResponseParser::parse(&bytes) {
                Ok(response) => response,
                Err(err) if err.kind() == ErrorKind::Decoding => {
                    warn!(error = %err, "keeping undecodable response unparsed");
                    if let Ok(raw) = ResponseParser::parse_unstructured(&bytes) {
                        claimed.push(raw);
                    }
                    deferred.get_or_insert(err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            match response {
                Response::Continuation { text } => {
                    let reply = if let Some(segment) = segments.next() {
                        segment
                    } else if let Some(respond) = responder.as_mut() {
                        let mut line = respond(text.as_deref());
                        line.extend_from_slice(b"\r\n");
                        line
                    } else {
                        return Err(Error::Protocol(format!(
                            "unexpected continuation during {}",
                            command.name()
                        )));
                    };
                    self.framed()?.write_command(&reply).await?;
                }
                Response::Tagged {
                    tag: received,
                    status,
                    code,
                    text,
                } => {
                    if received != tag {
                        return Err(Error::TagMismatch {
                            expected: tag.to_string(),
                            received: received.to_string(),
                        });
                    }
                    if !matches!(status, Status::Ok | Status::No | Status::Bad) {
                        return Err(Error::Protocol(format!(
                            "tagged {status:?} is not a completion"
                        )));
                    }
                    if let Some(code) = &code {
                        self.note_code(code, &text);
                    }
                    return Ok(Completion {
                        tag,
                        status,
                        code,
                        text,
                        responses: claimed,
                    });
                }
                Response::Untagged(untagged) => self.route(untagged, interest, &mut claimed)?,
            }
        }
    }

    /// Sends an untagged response to the command or to the session queue.
    fn route(
        &mut self,
        response: UntaggedResponse,
        interest: &[EventKind],
        claimed: &mut Vec<UntaggedResponse>,
    ) -> Result<()> {
        match &response {
            UntaggedResponse::Bad { text, .. } => return Err(Error::Bad(text.clone())),
            UntaggedResponse::Bye { text, .. } => {
                debug!(text = text.as_str(), "server said BYE");
                self.bye = Some(text.clone());
                self.state = ProtocolState::Logout;
            }
            UntaggedResponse::Capability(caps) => self.capabilities.clone_from(caps),
            UntaggedResponse::Ok {
                code: Some(code),
                text,
            }
            | UntaggedResponse::No {
                code: Some(code),
                text,
            } => self.note_code(code, text),
            _ => {}
        }

        match EventKind::of(&response) {
            Some(kind) if interest.contains(&kind) => claimed.push(response),
            _ => self.events.push(response),
        }
        Ok(())
    }

    /// Applies side effects of a response code seen on any status line.
    fn note_code(&mut self, code: &ResponseCode, text: &str) {
        match code {
            ResponseCode::Alert => {
                warn!(alert = text, "server alert");
                self.events.push_alert(text);
            }
            ResponseCode::Capability(caps) => self.capabilities.clone_from(caps),
            _ => {}
        }
    }

    async fn read_next(&mut self) -> Result<Vec<u8>> {
        let timeout = self.config.read_timeout;
        let framed = self.stream.as_mut().ok_or(Error::Unusable)?;
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, framed.read_response())
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => framed.read_response().await,
        };

        match (result, &self.bye) {
            (Err(Error::Io(e)), Some(text)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(Error::Bye(text.clone()))
            }
            (result, _) => result,
        }
    }

    fn framed(&mut self) -> Result<&mut FramedStream<S>> {
        self.stream.as_mut().ok_or(Error::Unusable)
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
    use tokio_test::io::Builder;

    use super::*;

    async fn connect(mock: tokio_test::io::Mock) -> Connection<tokio_test::io::Mock> {
        Connection::from_stream(mock, Config::new("imap.example.com"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_capability_updates_state() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A1 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 AUTH=CRAM-MD5 IDLE\r\n")
            .read(b"A1 OK done\r\n")
            .build();
        let mut conn = connect(mock).await;
        assert_eq!(conn.capabilities(), &[Capability::Imap4Rev1]);

        let caps = conn.capability().await.unwrap();
        assert_eq!(caps.len(), 3);
        assert!(conn.supports_auth("cram-md5"));
        assert!(conn.has_capability(&Capability::Idle));
    }

    #[tokio::test]
    async fn test_unclaimed_events_are_queued() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 CHECK\r\n")
            .read(b"* 4 EXISTS\r\n")
            .read(b"* 2 EXPUNGE\r\n")
            .read(b"A1 OK CHECK completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.check().await.unwrap());
        let events = conn.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], UntaggedResponse::Exists(4));
        assert!(conn.take_events().is_empty());
    }

    #[tokio::test]
    async fn test_extension_responses_do_not_break_the_command() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 NOOP\r\n")
            .read(b"* ENABLED CONDSTORE\r\n")
            .read(b"* VANISHED (EARLIER) 41:43\r\n")
            .read(b"A1 OK NOOP completed\r\n")
            .write(b"A2 NOOP\r\n")
            .read(b"A2 OK\r\n")
            .build();
        let mut conn = connect(mock).await;

        conn.noop().await.unwrap();
        assert!(!conn.is_poisoned());

        let events = conn.take_events();
        assert_eq!(
            events[0],
            UntaggedResponse::Other {
                keyword: "ENABLED".to_string(),
                number: None,
                payload: vec![crate::parser::Value::Atom("CONDSTORE".to_string())],
            }
        );
        assert!(matches!(
            &events[1],
            UntaggedResponse::Other { keyword, payload, .. }
                if keyword == "VANISHED" && payload.len() == 2
        ));
        conn.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_is_soft_failure_and_tags_advance() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 CHECK\r\n")
            .read(b"A1 NO not now\r\n")
            .write(b"A2 CHECK\r\n")
            .read(b"A2 OK done\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(!conn.check().await.unwrap());
        assert!(conn.check().await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_poisons_connection() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 CHECK\r\n")
            .read(b"A1 BAD unknown command\r\n")
            .build();
        let mut conn = connect(mock).await;

        let err = conn.check().await.unwrap_err();
        assert!(matches!(err, Error::Bad(ref text) if text == "unknown command"));
        assert!(conn.is_poisoned());
        assert!(matches!(conn.noop().await.unwrap_err(), Error::Unusable));
    }

    #[tokio::test]
    async fn test_tag_mismatch_is_protocol_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 NOOP\r\n")
            .read(b"A7 OK stale\r\n")
            .build();
        let mut conn = connect(mock).await;

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::TagMismatch { ref received, .. } if received == "A7"));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_untagged_bad_is_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 NOOP\r\n")
            .read(b"* BAD line too long\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(matches!(conn.noop().await.unwrap_err(), Error::Bad(_)));
    }

    #[tokio::test]
    async fn test_alerts_are_queued_not_raised() {
        let mock = Builder::new()
            .read(b"* OK [ALERT] maintenance at noon\r\n")
            .write(b"A1 NOOP\r\n")
            .read(b"* OK [ALERT] quota at 95%\r\n")
            .read(b"A1 OK [ALERT] really\r\n")
            .build();
        let mut conn = connect(mock).await;

        conn.noop().await.unwrap();
        assert_eq!(
            conn.take_alerts(),
            vec![
                "maintenance at noon".to_string(),
                "quota at 95%".to_string(),
                "really".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_noop_reports_mailbox_changes() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 NOOP\r\n")
            .read(b"* 23 EXISTS\r\n")
            .read(b"* 3 RECENT\r\n")
            .read(b"* 14 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"A1 OK NOOP completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        let status = conn.noop().await.unwrap();
        assert_eq!(status.exists, 23);
        assert_eq!(status.recent, 3);
        let events = conn.take_events();
        assert!(matches!(events[..], [UntaggedResponse::Fetch { .. }]));
    }

    #[tokio::test]
    async fn test_logout_expects_bye() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGOUT\r\n")
            .read(b"* BYE server logging out\r\n")
            .read(b"A1 OK LOGOUT completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        conn.logout().await.unwrap();
        assert_eq!(conn.state(), &ProtocolState::Logout);
        assert!(conn.take_events().is_empty());
    }

    #[tokio::test]
    async fn test_close_after_bye_reports_bye() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 NOOP\r\n")
            .read(b"* BYE idle too long\r\n")
            .build();
        let mut conn = connect(mock).await;

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "idle too long"));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 NOOP\r\n")
            .wait(std::time::Duration::from_secs(5))
            .read(b"A1 OK late\r\n")
            .build();
        let config = Config::builder("imap.example.com")
            .read_timeout(std::time::Duration::from_millis(50))
            .build();
        let mut conn = Connection::from_stream(mock, config).await.unwrap();

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(conn.is_poisoned());
    }
}
