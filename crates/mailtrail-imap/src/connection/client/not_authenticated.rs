//! Greeting, TLS negotiation and authentication.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use super::{Completion, Connection, ProtocolState};
use crate::command::{Command, TagGenerator};
use crate::connection::config::{Config, Security};
use crate::connection::events::{EventKind, EventQueue};
use crate::connection::framed::FramedStream;
use crate::connection::stream::{self, ImapStream, Upgrade};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, Status};
use crate::{Error, Result, sasl};

impl Connection<ImapStream> {
    /// Connects to the server described by `config`.
    ///
    /// With [`Security::StartTls`] the connection is upgraded before this
    /// returns. Capabilities are queried if the greeting did not carry them.
    pub async fn connect(config: Config) -> Result<Self> {
        let stream = stream::open(&config).await?;
        let mut conn = Self::from_stream(stream, config).await?;

        if conn.config.security == Security::StartTls {
            conn.starttls().await?;
        }
        if conn.capabilities.is_empty() {
            conn.capability().await?;
        }
        Ok(conn)
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a connection from a connected stream.
    ///
    /// Reads the server greeting: OK leaves the connection not
    /// authenticated, PREAUTH makes it authenticated, BYE is an error.
    /// Capabilities in the greeting's response code are kept.
    pub async fn from_stream(stream: S, config: Config) -> Result<Self> {
        let framed = FramedStream::with_max_literal_size(stream, config.max_literal_size);
        let mut conn = Self {
            stream: Some(framed),
            tags: TagGenerator::default(),
            capabilities: Vec::new(),
            state: ProtocolState::NotAuthenticated,
            events: EventQueue::default(),
            config,
            poisoned: false,
            bye: None,
        };

        let greeting = conn.read_next().await?;
        match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                if let Some(code) = &code {
                    conn.note_code(code, &text);
                }
            }
            Response::Untagged(UntaggedResponse::PreAuth { code, text }) => {
                if let Some(code) = &code {
                    conn.note_code(code, &text);
                }
                conn.state = ProtocolState::Authenticated;
            }
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        info!(host = %conn.config.host, state = ?conn.state, "greeting received");
        Ok(conn)
    }

    /// Authenticates with LOGIN. Returns false if the server said NO.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let done = self.invoke(&command, &[EventKind::Capability]).await?;
        Ok(self.finish_auth(&done))
    }

    /// Authenticates with SASL PLAIN, sending the credentials as an initial
    /// response when the server advertises `SASL-IR`.
    pub async fn authenticate_plain(&mut self, username: &str, password: &str) -> Result<bool> {
        let payload = sasl::plain_response(username, password);

        let done = if self.has_capability(&Capability::SaslIr) {
            let command = Command::Authenticate {
                mechanism: "PLAIN".to_string(),
                initial_response: Some(payload),
            };
            self.invoke(&command, &[EventKind::Capability]).await?
        } else {
            let command = Command::Authenticate {
                mechanism: "PLAIN".to_string(),
                initial_response: None,
            };
            let mut pending = Some(payload);
            let mut respond = move |_: Option<&str>| {
                pending
                    .take()
                    .map_or_else(|| b"*".to_vec(), String::into_bytes)
            };
            let done = self
                .exchange(&command, &[EventKind::Capability], Some(&mut respond))
                .await?;
            self.check_bad(done)?
        };
        Ok(self.finish_auth(&done))
    }

    /// Authenticates with SASL CRAM-MD5 (RFC 2195).
    ///
    /// A challenge that is not valid base64 cancels the exchange with `*`;
    /// the server's rejection of the cancelled exchange is reported as
    /// `false`.
    pub async fn authenticate_cram_md5(&mut self, username: &str, secret: &str) -> Result<bool> {
        let command = Command::Authenticate {
            mechanism: "CRAM-MD5".to_string(),
            initial_response: None,
        };

        let mut cancelled = false;
        let done = {
            let mut respond = |challenge: Option<&str>| match sasl::decode_challenge(challenge) {
                Some(challenge) => {
                    let reply = sasl::cram_md5_response(username, secret, &challenge);
                    sasl::encode(reply.as_bytes()).into_bytes()
                }
                None => {
                    warn!("undecodable CRAM-MD5 challenge, cancelling");
                    cancelled = true;
                    b"*".to_vec()
                }
            };
            self.exchange(&command, &[EventKind::Capability], Some(&mut respond))
                .await?
        };

        if cancelled && done.status != Status::Ok {
            return Ok(false);
        }
        let done = self.check_bad(done)?;
        Ok(self.finish_auth(&done))
    }

    /// Authenticates with SASL LOGIN, answering the username and password
    /// prompts in turn.
    pub async fn authenticate_login(&mut self, username: &str, password: &str) -> Result<bool> {
        let command = Command::Authenticate {
            mechanism: "LOGIN".to_string(),
            initial_response: None,
        };

        let mut exchange = sasl::LoginExchange::new(username, password);
        let done = {
            let mut respond = |prompt: Option<&str>| {
                let prompt = sasl::decode_challenge(prompt).unwrap_or_default();
                exchange
                    .respond(&prompt)
                    .map_or_else(|| b"*".to_vec(), String::into_bytes)
            };
            self.exchange(&command, &[EventKind::Capability], Some(&mut respond))
                .await?
        };
        let done = self.check_bad(done)?;
        Ok(self.finish_auth(&done))
    }

    /// Authenticates with the named SASL mechanism.
    ///
    /// `LOGIN`, `PLAIN` and `CRAM-MD5` are supported, matched without
    /// regard to case. Any other name fails with
    /// [`Error::Configuration`] before anything is sent.
    pub async fn authenticate(
        &mut self,
        mechanism: &str,
        username: &str,
        password: &str,
    ) -> Result<bool> {
        match mechanism.to_ascii_uppercase().as_str() {
            "LOGIN" => self.authenticate_login(username, password).await,
            "PLAIN" => self.authenticate_plain(username, password).await,
            "CRAM-MD5" => self.authenticate_cram_md5(username, password).await,
            other => Err(Error::Configuration(format!(
                "unsupported authentication mechanism: {other}"
            ))),
        }
    }

    fn finish_auth(&mut self, done: &Completion) -> bool {
        if done.is_ok() {
            self.state = ProtocolState::Authenticated;
        }
        done.is_ok()
    }

    fn tls_unavailable(&self, reason: String) -> Result<bool> {
        warn!(host = %self.config.host, reason = reason.as_str(), "continuing without TLS");
        if self.config.tls_required {
            Err(Error::Configuration(reason))
        } else {
            Ok(false)
        }
    }
}

impl<S: Upgrade> Connection<S> {
    /// Upgrades the connection with STARTTLS.
    ///
    /// On OK the stream is wrapped in TLS, bytes buffered before the
    /// handshake are discarded and capabilities are queried again. A NO or
    /// a failed handshake returns false, or fails with
    /// [`Error::Configuration`] when TLS is required. A failed handshake
    /// consumes the stream, leaving the connection unusable.
    pub async fn starttls(&mut self) -> Result<bool> {
        let done = self.invoke(&Command::StartTls, &[]).await?;
        if !done.is_ok() {
            return self.tls_unavailable(format!("STARTTLS refused: {}", done.text));
        }

        let plain = self.stream.take().ok_or(Error::Unusable)?.into_inner();
        match plain
            .upgrade(&self.config.host, self.config.tls_config.clone())
            .await
        {
            Ok(secured) => {
                self.stream = Some(FramedStream::with_max_literal_size(
                    secured,
                    self.config.max_literal_size,
                ));
            }
            Err(err) => {
                self.poisoned = true;
                return self.tls_unavailable(format!("TLS upgrade failed: {err}"));
            }
        }
        info!(host = %self.config.host, "connection upgraded to TLS");

        self.capabilities.clear();
        self.capability().await?;
        Ok(true)
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::ErrorKind;

    async fn connect(mock: Mock) -> Connection<Mock> {
        Connection::from_stream(mock, Config::new("imap.example.com"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_preauth_greeting() {
        let mock = Builder::new()
            .read(b"* PREAUTH [CAPABILITY IMAP4rev1 NAMESPACE] welcome back\r\n")
            .build();
        let conn = connect(mock).await;
        assert!(conn.state().is_authenticated());
        assert!(conn.has_capability(&Capability::Namespace));
    }

    #[tokio::test]
    async fn test_bye_greeting() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Connection::from_stream(mock, Config::new("h")).await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_garbage_greeting() {
        let mock = Builder::new().read(b"+ hello\r\n").build();
        let err = Connection::from_stream(mock, Config::new("h")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_login() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGIN tim \"pass word\"\r\n")
            .read(b"A1 OK [CAPABILITY IMAP4rev1 QUOTA] logged in\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.login("tim", "pass word").await.unwrap());
        assert!(conn.state().is_authenticated());
        assert!(conn.has_capability(&Capability::Quota));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGIN tim wrong\r\n")
            .read(b"A1 NO [AUTHENTICATIONFAILED] invalid credentials\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(!conn.login("tim", "wrong").await.unwrap());
        assert!(!conn.state().is_authenticated());
        assert!(!conn.is_poisoned());
    }

    #[tokio::test]
    async fn test_authenticate_plain_with_initial_response() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=PLAIN] ready\r\n")
            .write(b"A1 AUTHENTICATE PLAIN AHRpbQBzZWNyZXQ=\r\n")
            .read(b"A1 OK authenticated\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.authenticate_plain("tim", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_plain_after_continuation() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 AUTHENTICATE PLAIN\r\n")
            .read(b"+ \r\n")
            .write(b"AHRpbQBzZWNyZXQ=\r\n")
            .read(b"A1 OK authenticated\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.authenticate_plain("tim", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_cram_md5() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 AUTHENTICATE CRAM-MD5\r\n")
            .read(b"+ PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+\r\n")
            .write(b"dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw\r\n")
            .read(b"A1 OK CRAM authentication successful\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(
            conn.authenticate_cram_md5("tim", "tanstaaftanstaaf")
                .await
                .unwrap()
        );
        assert!(conn.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_cram_md5_undecodable_challenge_cancels() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 AUTHENTICATE CRAM-MD5\r\n")
            .read(b"+ !!!not-base64!!!\r\n")
            .write(b"*\r\n")
            .read(b"A1 BAD AUTHENTICATE cancelled\r\n")
            .write(b"A2 NOOP\r\n")
            .read(b"A2 OK\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(!conn.authenticate_cram_md5("tim", "secret").await.unwrap());
        assert!(!conn.is_poisoned());
        conn.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_login_mechanism() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=LOGIN] ready\r\n")
            .write(b"A1 AUTHENTICATE LOGIN\r\n")
            .read(b"+ VXNlcm5hbWU6\r\n")
            .write(b"dGlt\r\n")
            .read(b"+ UGFzc3dvcmQ6\r\n")
            .write(b"c2VjcmV0\r\n")
            .read(b"A1 OK LOGIN completed\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(conn.authenticate("login", "tim", "secret").await.unwrap());
        assert!(conn.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_dispatches_cram_md5() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 AUTHENTICATE CRAM-MD5\r\n")
            .read(b"+ PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+\r\n")
            .write(b"dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw\r\n")
            .read(b"A1 OK done\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(
            conn.authenticate("CRAM-MD5", "tim", "tanstaaftanstaaf")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_authenticate_unknown_mechanism_sends_nothing() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut conn = connect(mock).await;

        let err = conn.authenticate("GSSAPI", "tim", "secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("GSSAPI"));
        assert!(!conn.is_poisoned());
        assert!(!conn.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_starttls_refused_without_requirement() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 STARTTLS\r\n")
            .read(b"A1 NO TLS not available\r\n")
            .build();
        let mut conn = connect(mock).await;

        assert!(!conn.starttls().await.unwrap());
    }

    #[tokio::test]
    async fn test_starttls_refused_when_required() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 STARTTLS\r\n")
            .read(b"A1 NO TLS not available\r\n")
            .build();
        let config = Config::builder("imap.example.com")
            .security(Security::StartTls)
            .tls_required(true)
            .build();
        let mut conn = Connection::from_stream(mock, config).await.unwrap();

        let err = conn.starttls().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    impl Upgrade for Mock {
        async fn upgrade(
            self,
            _host: &str,
            _tls: Option<std::sync::Arc<rustls::ClientConfig>>,
        ) -> Result<Self> {
            Ok(self)
        }
    }
}
