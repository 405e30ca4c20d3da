//! IMAP protocol parser.
//!
//! This module provides a sans-I/O parser for IMAP server responses. It
//! works on one complete response at a time, as assembled by
//! [`FramedStream`](crate::connection::FramedStream): the text lines plus
//! the literal payloads they announce.
//!
//! # Architecture
//!
//! - **Lexer**: Tokenizes raw bytes into IMAP tokens (atoms, strings, numbers, literals)
//! - **Response Parser**: Builds structured response objects from tokens
//!
//! # Example
//!
//! ```
//! use mailtrail_imap::parser::{ResponseParser, Response, UntaggedResponse};
//!
//! let input = b"* OK IMAP4rev1 server ready\r\n";
//! let response = ResponseParser::parse(input).unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Ok { text, .. }) => {
//!         assert!(text.contains("IMAP4rev1"));
//!     }
//!     _ => panic!("Expected untagged OK"),
//! }
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{
    FetchItem, MessageStatus, Response, ResponseParser, StatusItem, UntaggedResponse, Value,
};
