//! FETCH response parsing.
//!
//! Servers answer FETCH with `* n FETCH (item value ...)`. After STORE some
//! servers drop the parentheses around a single item, as in
//! `* n FETCH FLAGS (\Seen)`; both shapes produce the same items.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::helpers::{parse_flag_list, parse_value};
use super::types::FetchItem;

/// Parses the data of a FETCH response, in either shape.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    if !lexer.eat(b'(') {
        let name = lexer.read_atom_string()?;
        return Ok(vec![parse_fetch_item(lexer, name)?]);
    }

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => items.push(parse_fetch_item(lexer, name)?),
            token => {
                return Err(lexer.error(&format!("Unexpected token in FETCH: {token:?}")));
            }
        }
    }

    Ok(items)
}

/// Parses the value following a FETCH item name.
fn parse_fetch_item(lexer: &mut Lexer<'_>, name: &str) -> Result<FetchItem> {
    let upper = name.to_uppercase();
    let has_section = lexer.peek() == Some(b'[');

    let item = match upper.as_str() {
        "FLAGS" => {
            lexer.expect_space()?;
            FetchItem::Flags(parse_flag_list(lexer)?)
        }
        "UID" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let uid = Uid::new(n)
                .ok_or_else(|| lexer.error(&format!("invalid UID value: {n} (UID cannot be 0)")))?;
            FetchItem::Uid(uid)
        }
        "RFC822.SIZE" => {
            lexer.expect_space()?;
            FetchItem::Rfc822Size(lexer.read_number()?)
        }
        "INTERNALDATE" => {
            lexer.expect_space()?;
            match lexer.next_token()? {
                Token::QuotedString(date) => FetchItem::InternalDate(date),
                token => {
                    return Err(lexer.error(&format!("Expected date string, got {token:?}")));
                }
            }
        }
        "BODY" | "BODY.PEEK" if has_section => {
            let (section, origin) = parse_body_section_and_origin(lexer)?;
            lexer.expect_space()?;
            let data = lexer.read_nstring_bytes()?;
            FetchItem::Body {
                section,
                origin,
                data,
            }
        }
        "RFC822" => {
            lexer.expect_space()?;
            FetchItem::Rfc822(lexer.read_nstring_bytes()?)
        }
        "RFC822.HEADER" => {
            lexer.expect_space()?;
            FetchItem::Rfc822Header(lexer.read_nstring_bytes()?)
        }
        "RFC822.TEXT" => {
            lexer.expect_space()?;
            FetchItem::Rfc822Text(lexer.read_nstring_bytes()?)
        }
        _ => {
            let mut name = upper;
            if has_section {
                lexer.advance();
                name.push('[');
                name.push_str(&read_section(lexer)?);
                name.push(']');
            }
            lexer.expect_space()?;
            FetchItem::Other {
                name,
                value: parse_value(lexer)?,
            }
        }
    };

    Ok(item)
}

/// Reads raw section text up to the closing bracket, which is consumed.
fn read_section(lexer: &mut Lexer<'_>) -> Result<String> {
    let rest = lexer.remaining();
    let len = rest
        .iter()
        .position(|&b| b == b']')
        .ok_or_else(|| lexer.error("Unterminated section"))?;
    lexer.skip(len + 1);
    Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
}

/// Parses `[section]` and an optional `<origin>` after BODY.
fn parse_body_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(Option<String>, Option<u64>)> {
    lexer.expect(Token::LBracket)?;
    let section = read_section(lexer)?;

    let mut origin = None;
    if lexer.eat(b'<') {
        let rest = lexer.remaining();
        let len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        let digits = std::str::from_utf8(&rest[..len]).unwrap_or_default();
        let value = digits
            .parse()
            .map_err(|_| lexer.error("Invalid partial origin"))?;
        lexer.skip(len);
        if !lexer.eat(b'>') {
            return Err(lexer.error("Expected > after partial origin"));
        }
        origin = Some(value);
    }

    Ok(((!section.is_empty()).then_some(section), origin))
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
    use crate::parser::response::Value;
    use crate::types::Flag;

    fn parse(input: &[u8]) -> Vec<FetchItem> {
        let mut lexer = Lexer::new(input);
        parse_fetch_response(&mut lexer).unwrap()
    }

    #[test]
    fn parenthesized_items() {
        let items = parse(b"(FLAGS (\\Seen \\Flagged) UID 77 RFC822.SIZE 4021)");
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], FetchItem::Flags(f) if f.contains(&Flag::Flagged)));
        assert!(matches!(items[1], FetchItem::Uid(uid) if uid.get() == 77));
        assert_eq!(items[2], FetchItem::Rfc822Size(4021));
    }

    #[test]
    fn bare_single_item() {
        let items = parse(b"FLAGS (\\Seen)");
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], FetchItem::Flags(f) if f.is_seen()));
    }

    #[test]
    fn body_with_section_and_origin() {
        let items = parse(b"(BODY[TEXT]<5000> {5}\r\nhello)");
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: Some("TEXT".to_string()),
                origin: Some(5000),
                data: Some(b"hello".to_vec()),
            }
        );
    }

    #[test]
    fn empty_section_and_peek_echo() {
        let items = parse(b"(BODY.PEEK[] \"abc\")");
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: None,
                origin: None,
                data: Some(b"abc".to_vec()),
            }
        );
    }

    #[test]
    fn header_fields_section_keeps_parentheses() {
        let items = parse(b"(BODY[HEADER.FIELDS (FROM TO)] NIL)");
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: Some("HEADER.FIELDS (FROM TO)".to_string()),
                origin: None,
                data: None,
            }
        );
    }

    #[test]
    fn rfc822_variants() {
        let items = parse(b"(RFC822.HEADER {4}\r\nA: b RFC822.TEXT NIL)");
        assert_eq!(items[0], FetchItem::Rfc822Header(Some(b"A: b".to_vec())));
        assert_eq!(items[1], FetchItem::Rfc822Text(None));
    }

    #[test]
    fn unknown_items_keep_structure() {
        let items = parse(b"(ENVELOPE (\"date\" NIL ((NIL NIL \"a\" \"b.c\"))) X-GM-MSGID 123)");
        match &items[0] {
            FetchItem::Other { name, value } => {
                assert_eq!(name, "ENVELOPE");
                let list = value.as_list().unwrap();
                assert_eq!(list[0], Value::String("date".to_string()));
                assert_eq!(list[1], Value::Nil);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            items[1],
            FetchItem::Other {
                name: "X-GM-MSGID".to_string(),
                value: Value::Number(123),
            }
        );
    }

    #[test]
    fn body_without_section_is_structure() {
        let items = parse(b"(BODY (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 12 1))");
        assert!(matches!(&items[0], FetchItem::Other { name, .. } if name == "BODY"));
    }

    #[test]
    fn internal_date() {
        let items = parse(b"(INTERNALDATE \"17-Jul-1996 02:44:25 -0700\")");
        assert_eq!(
            items[0],
            FetchItem::InternalDate("17-Jul-1996 02:44:25 -0700".to_string())
        );
    }

    #[test]
    fn zero_uid_is_rejected() {
        let mut lexer = Lexer::new(b"(UID 0)");
        assert!(parse_fetch_response(&mut lexer).is_err());
    }
}
