//! # mailtrail-imap
//!
//! Client-side IMAP4rev1 engine (RFC 3501) built on tokio.
//!
//! ## Features
//!
//! - **Literal-aware framing**: responses are read as CRLF lines with
//!   `{n}` byte runs spliced in, bounded by a configurable size limit
//! - **Tag correlation**: one command in flight, tagged `A1`, `A2`, ...;
//!   untagged responses are routed to the running command or queued
//! - **Authentication**: LOGIN, AUTHENTICATE PLAIN (with SASL-IR) and
//!   CRAM-MD5
//! - **STARTTLS via rustls**: the stream is upgraded in place and
//!   capabilities are re-queried
//! - **Partial fetch**: chunked `BODY.PEEK[]<offset.count>` reads that
//!   survive servers ignoring the range
//! - **Flag deltas**: STORE only what changed since the last checkpoint
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailtrail_imap::{Config, Connection, FetchAttribute, SequenceSet};
//!
//! #[tokio::main]
//! async fn main() -> mailtrail_imap::Result<()> {
//!     let mut conn = Connection::connect(Config::new("imap.example.com")).await?;
//!     if !conn.login("user@example.com", "password").await? {
//!         return Ok(());
//!     }
//!
//!     let status = conn.select("INBOX").await?;
//!     println!("{status:?}");
//!
//!     let set = SequenceSet::range(1, 10).unwrap();
//!     for message in conn.fetch(&set, FetchAttribute::Flags).await? {
//!         println!("{}: {:?}", message.seq, message.flags());
//!     }
//!
//!     for alert in conn.take_alerts() {
//!         eprintln!("server alert: {alert}");
//!     }
//!     conn.logout().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command types and serialization
//! - [`connection`]: Streams, framing, correlation and partial fetch
//! - [`parser`]: Response lexer and parser
//! - [`sasl`]: PLAIN and CRAM-MD5
//! - [`mailbox_name`]: Modified UTF-7 mailbox name codec
//! - [`types`]: Core IMAP types (flags, mailboxes, sequences, etc.)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod mailbox_name;
pub mod parser;
pub mod sasl;
pub mod types;

pub use command::{
    Command, FetchAttribute, FetchItems, SearchCriteria, StatusAttribute, StoreAction,
    TagGenerator,
};
pub use connection::{
    Completion, Config, ConfigBuilder, Connection, EventKind, ImapStream, PartialFetch,
    ProtocolState, Security, SelectedState,
};
pub use error::{Error, ErrorKind, Result};
pub use parser::{FetchItem, MessageStatus, Response, ResponseParser, UntaggedResponse, Value};
pub use types::{
    AclEntry, Capability, Flag, FlagSnapshot, Flags, ListEntry, Mailbox, MailboxAttribute,
    MailboxStatus, Namespace, Quota, ResponseCode, RightsList, SeqNum, SequenceSet, Status, Tag,
    Uid, UidValidity,
};

/// IMAP protocol version spoken.
pub const IMAP_VERSION: &str = "IMAP4rev1";
