//! Stream types for IMAP connections.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::info;

use super::config::Config;
use crate::{Error, Result};

/// A transport that can be upgraded to TLS in place.
///
/// The connection calls this after a successful STARTTLS. Test transports
/// implement it as the identity.
pub trait Upgrade: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Performs the TLS handshake over `self` and returns the secured stream.
    fn upgrade(
        self,
        host: &str,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> impl Future<Output = Result<Self>> + Send;
}

/// A stream that can be either plaintext or TLS.
pub enum ImapStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl std::fmt::Debug for ImapStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_tls() {
            "ImapStream::Tls"
        } else {
            "ImapStream::Plain"
        })
    }
}

impl Upgrade for ImapStream {
    async fn upgrade(self, host: &str, tls: Option<Arc<rustls::ClientConfig>>) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let tls = handshake(tcp, host, tls).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(Error::Protocol("stream is already TLS".to_string())),
        }
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Creates a TLS connector, trusting webpki roots unless `config` is given.
#[must_use]
pub fn create_tls_connector(config: Option<Arc<rustls::ClientConfig>>) -> TlsConnector {
    let config = config.unwrap_or_else(|| {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        )
    });
    TlsConnector::from(config)
}

async fn handshake(
    tcp: TcpStream,
    host: &str,
    tls: Option<Arc<rustls::ClientConfig>>,
) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())?;
    Ok(create_tls_connector(tls).connect(server_name, tcp).await?)
}

/// Opens the TCP connection described by `config`.
///
/// Implicit TLS handshakes immediately; `StartTls` and `None` return a
/// plaintext stream (the STARTTLS exchange happens after the greeting).
pub async fn open(config: &Config) -> Result<ImapStream> {
    let addr = format!("{}:{}", config.host, config.port);
    let tcp = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))??;
    info!(%addr, security = ?config.security, "connected");

    match config.security {
        super::Security::Implicit => {
            let tls = handshake(tcp, &config.host, config.tls_config.clone()).await?;
            Ok(ImapStream::Tls(Box::new(tls)))
        }
        super::Security::StartTls | super::Security::None => Ok(ImapStream::Plain(tcp)),
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

    #[test]
    fn test_create_tls_connector_with_default_roots() {
        let _connector = create_tls_connector(None);
    }

    #[test]
    fn test_invalid_server_name_is_configuration_error() {
        let err: Error = ServerName::try_from("not a host!".to_string())
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_open_refused_is_connection_error() {
        // Port 1 on localhost is reserved and closed in test environments.
        let config = Config::builder("127.0.0.1")
            .port(1)
            .security(super::super::Security::None)
            .connect_timeout(std::time::Duration::from_secs(2))
            .build();
        let err = open(&config).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Connection);
    }
}
