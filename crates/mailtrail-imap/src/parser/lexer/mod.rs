//! IMAP lexer for tokenizing server responses.
//!
//! The lexer runs over one complete response as assembled by the framing
//! layer: the text lines plus every literal payload they announce. Token
//! boundaries follow the RFC 3501 grammar exactly; there is no
//! resynchronization after an error.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peeks at the byte at offset from current position.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos.checked_add(offset)?).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips n bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.input.len());
    }

    /// Consumes `byte` if it is next; returns whether it did.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.skip(2);
                Ok(Token::Crlf)
            }
            b'\r' => Err(self.error("Expected LF after CR")),
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => Ok(self.read_atom()),
            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    /// Reads a quoted string token.
    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance();

        let mut result = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => result.push(c),
                    Some(c) => {
                        return Err(self.error(&format!("Invalid escape: \\{}", c as char)));
                    }
                    None => return Err(self.error("Unexpected EOF in quoted string")),
                },
                Some(b'\r' | b'\n') => {
                    return Err(self.error("Line break inside quoted string"));
                }
                Some(c) => result.push(c),
                None => return Err(self.error("Unexpected EOF in quoted string")),
            }
        }

        let s =
            String::from_utf8(result).map_err(|_| self.error("Invalid UTF-8 in quoted string"))?;
        Ok(Token::QuotedString(s))
    }

    /// Reads `{n}` CRLF and then exactly n raw bytes.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance();

        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = &self.input[start..self.pos];
        // LITERAL+ echoes are tolerated.
        self.eat(b'+');

        if digits.is_empty() || !self.eat(b'}') {
            return Err(Error::Decoding(format!(
                "malformed literal length at position {start}"
            )));
        }
        let size = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| Error::Decoding(format!("literal length out of range at {start}")))?;

        if !(self.eat(b'\r') && self.eat(b'\n')) {
            return Err(self.error("Expected CRLF after literal length"));
        }

        let Some(data) = self
            .pos
            .checked_add(size)
            .and_then(|end| self.input.get(self.pos..end))
        else {
            return Err(self.error(&format!(
                "Literal announced {size} bytes but only {} remain",
                self.input.len() - self.pos
            )));
        };
        self.pos += size;

        Ok(Token::Literal(data))
    }

    /// Reads an atom, classifying numbers and NIL.
    fn read_atom(&mut self) -> Token<'a> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }
        // `\*` in PERMANENTFLAGS.
        if self.pos - start == 1 && self.input[start] == b'\\' && self.eat(b'*') {
            return Token::Atom("\\*");
        }

        let bytes = &self.input[start..self.pos];
        // Atom chars are ASCII, so this cannot fail.
        let s = std::str::from_utf8(bytes).unwrap_or_default();

        if bytes.iter().all(u8::is_ascii_digit)
            && let Ok(n) = s.parse::<u64>()
        {
            return Token::Number(n);
        }
        if s.eq_ignore_ascii_case("NIL") {
            Token::Nil
        } else {
            Token::Atom(s)
        }
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Expects and consumes a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    /// Expects and consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom, quoted string, literal or number-like atom).
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::Nil => Ok("NIL".to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => String::from_utf8(data.to_vec())
                .map_err(|_| self.error("Invalid UTF-8 in literal")),
            token => Err(self.error(&format!("Expected astring, got {token:?}"))),
        }
    }

    /// Reads an nstring (NIL or string).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => String::from_utf8(data.to_vec())
                .map(Some)
                .map_err(|_| self.error("Invalid UTF-8 in literal")),
            token => Err(self.error(&format!("Expected nstring, got {token:?}"))),
        }
    }

    /// Reads an nstring as raw bytes, for message content.
    pub fn read_nstring_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s.into_bytes())),
            Token::Literal(data) => Ok(Some(data.to_vec())),
            token => Err(self.error(&format!("Expected nstring, got {token:?}"))),
        }
    }

    /// Reads a 32-bit number.
    pub fn read_number(&mut self) -> Result<u32> {
        let n = self.read_number64()?;
        u32::try_from(n).map_err(|_| self.error(&format!("Number {n} exceeds 32 bits")))
    }

    /// Reads a 64-bit number.
    pub fn read_number64(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("Expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("Expected atom, got {token:?}"))),
        }
    }

    /// Skips optional spaces.
    pub fn skip_spaces(&mut self) {
        while self.eat(b' ') {}
    }
}

/// Returns true if the byte is a valid atom character.
///
/// `\` is accepted so that flags like `\Seen` lex as one atom, and `[`
/// is rejected so that `BODY[...]` splits at the section.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b, 0x21..=0x7E)
        && !matches!(
            b,
            b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'[' | b']'
        )
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
    use crate::ErrorKind;

    fn tokens(input: &[u8]) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn test_tagged_response() {
        assert_eq!(
            tokens(b"A1 OK done\r\n"),
            vec![
                Token::Atom("A1"),
                Token::Space,
                Token::Atom("OK"),
                Token::Space,
                Token::Atom("done"),
                Token::Crlf,
            ]
        );
    }

    #[test]
    fn test_numbers_and_nil() {
        assert_eq!(
            tokens(b"12 nil 4294967296"),
            vec![
                Token::Number(12),
                Token::Space,
                Token::Nil,
                Token::Space,
                Token::Number(4_294_967_296),
            ]
        );
    }

    #[test]
    fn test_quoted_string_escaped() {
        let mut lexer = Lexer::new(b"\"say \\\"hi\\\" \\\\ \"");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString("say \"hi\" \\ ".to_string())
        );
    }

    #[test]
    fn test_quoted_string_rejects_line_break() {
        let mut lexer = Lexer::new(b"\"abc\r\n");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_flag_list_with_wildcard() {
        assert_eq!(
            tokens(b"(\\Seen \\*)"),
            vec![
                Token::LParen,
                Token::Atom("\\Seen"),
                Token::Space,
                Token::Atom("\\*"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_body_section_splits() {
        assert_eq!(
            tokens(b"BODY[TEXT]<0>"),
            vec![
                Token::Atom("BODY"),
                Token::LBracket,
                Token::Atom("TEXT"),
                Token::RBracket,
                Token::Atom("<0>"),
            ]
        );
    }

    #[test]
    fn test_literal_preserves_raw_bytes() {
        let mut lexer = Lexer::new(b"{7}\r\na\r\nb\0c)");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"a\r\nb\0c"));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_empty_literal() {
        let mut lexer = Lexer::new(b"{0}\r\n)");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b""));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_truncated_literal_fails() {
        let mut lexer = Lexer::new(b"{10}\r\nshort");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_literal_length_near_usize_max_fails() {
        let input = format!("{{{}}}\r\nabc)", usize::MAX);
        let err = Lexer::new(input.as_bytes()).next_token().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = crate::parser::ResponseParser::parse(
            b"* 1 FETCH (BODY[] {18446744073709551615}\r\nabc)\r\n",
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol | ErrorKind::Decoding
        ));
    }

    #[test]
    fn test_malformed_literal_length_is_decoding_error() {
        for input in [&b"{}\r\n"[..], b"{12a}\r\n", b"{99999999999999999999999}\r\n"] {
            let err = Lexer::new(input).next_token().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decoding, "{input:?}");
        }
    }

    #[test]
    fn test_continuation_prefix() {
        assert_eq!(
            tokens(b"+ Ready\r\n"),
            vec![Token::Plus, Token::Space, Token::Atom("Ready"), Token::Crlf]
        );
    }

    #[test]
    fn test_bare_cr_is_rejected() {
        assert!(Lexer::new(b"\rX").next_token().is_err());
    }

    #[test]
    fn test_is_atom_char() {
        assert!(is_atom_char(b'A'));
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'<'));
        assert!(!is_atom_char(b' '));
        assert!(!is_atom_char(b'('));
        assert!(!is_atom_char(b'['));
        assert!(!is_atom_char(b'{'));
        assert!(!is_atom_char(0x7F));
    }

    mod literal_round_trip {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn announced_bytes_come_back_verbatim(
                data in proptest::collection::vec(any::<u8>(), 0..512)
            ) {
                let mut wire = format!("{{{}}}\r\n", data.len()).into_bytes();
                wire.extend_from_slice(&data);
                wire.extend_from_slice(b" NIL");

                let mut lexer = Lexer::new(&wire);
                prop_assert_eq!(lexer.next_token().unwrap(), Token::Literal(&data));
                prop_assert_eq!(lexer.next_token().unwrap(), Token::Space);
                prop_assert_eq!(lexer.next_token().unwrap(), Token::Nil);
            }
        }
    }
}
