//! IMAP connection management.
//!
//! - Configuration (host, port, security mode, chunk and size limits)
//! - TLS/plaintext stream abstraction and in-place STARTTLS upgrade
//! - Framed I/O: CRLF lines with embedded literals
//! - Command/response correlation and the session event queue
//! - Chunked partial fetch over a single body section

mod client;
mod config;
mod events;
mod framed;
mod partial;
mod stream;
mod substream;

pub use client::{Completion, Connection, ProtocolState, SelectedState};
pub use config::{
    Config, ConfigBuilder, DEFAULT_CACHE_CEILING, DEFAULT_MAX_LITERAL_SIZE, DEFAULT_MIN_CHUNK,
    Security,
};
pub use events::{EventKind, EventQueue};
pub use framed::FramedStream;
pub use partial::PartialFetch;
pub use stream::{ImapStream, Upgrade, create_tls_connector, open};
pub use substream::Substream;
