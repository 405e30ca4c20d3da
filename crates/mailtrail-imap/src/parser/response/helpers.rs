//! Parser helper functions.

use crate::mailbox_name;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    AclEntry, Capability, Flag, Flags, ListEntry, Mailbox, MailboxAttribute, Namespace,
    NamespaceEntry, Quota, QuotaResource, ResponseCode, RightsList, SeqNum, Uid, UidValidity,
};
use crate::{Error, Result};

use super::types::{StatusItem, Value};

fn nonzero<T>(value: Option<T>, lexer: &Lexer<'_>, what: &str) -> Result<T> {
    value.ok_or_else(|| lexer.error(&format!("Invalid {what} 0")))
}

/// Parses a response code.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let upper = atom.to_uppercase();

    let code = match upper.as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(nonzero(Uid::new(n), lexer, "UID")?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidValidity(nonzero(UidValidity::new(n), lexer, "UIDVALIDITY")?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::Unseen(nonzero(SeqNum::new(n), lexer, "sequence number")?)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?)
        }
        "APPENDUID" => {
            lexer.expect_space()?;
            let v = lexer.read_number()?;
            let uid_validity = nonzero(UidValidity::new(v), lexer, "UIDVALIDITY")?;
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let uid = nonzero(Uid::new(n), lexer, "UID")?;
            ResponseCode::AppendUid { uid_validity, uid }
        }
        "COPYUID" => {
            lexer.expect_space()?;
            let v = lexer.read_number()?;
            let uid_validity = nonzero(UidValidity::new(v), lexer, "UIDVALIDITY")?;
            lexer.expect_space()?;
            let source = read_set_text(lexer);
            lexer.expect_space()?;
            let destination = read_set_text(lexer);
            ResponseCode::CopyUid {
                uid_validity,
                source,
                destination,
            }
        }
        _ => {
            let params = if lexer.eat(b' ') {
                Some(read_until_bracket(lexer))
            } else {
                None
            };
            ResponseCode::Other {
                name: upper,
                params,
            }
        }
    };

    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Reads a UID set like `4:7,9` verbatim.
fn read_set_text(lexer: &mut Lexer<'_>) -> String {
    let rest = lexer.remaining();
    let len = rest
        .iter()
        .position(|b| !(b.is_ascii_digit() || matches!(b, b':' | b',' | b'*')))
        .unwrap_or(rest.len());
    lexer.skip(len);
    String::from_utf8_lossy(&rest[..len]).into_owned()
}

fn read_until_bracket(lexer: &mut Lexer<'_>) -> String {
    let rest = lexer.remaining();
    let len = rest
        .iter()
        .position(|&b| b == b']' || b == b'\r')
        .unwrap_or(rest.len());
    lexer.skip(len);
    String::from_utf8_lossy(&rest[..len]).into_owned()
}

/// Parses capability data.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.eat(b' ') {
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("Unexpected token in flag list: {token:?}")));
            }
        }
    }

    Ok(flags)
}

/// Reads a mailbox name and decodes it from modified UTF-7.
pub fn read_mailbox(lexer: &mut Lexer<'_>) -> Result<Mailbox> {
    let wire = lexer.read_astring()?;
    // INBOX is case-insensitive and never encoded.
    if wire.eq_ignore_ascii_case("INBOX") {
        return Ok(Mailbox::inbox());
    }
    Ok(Mailbox::new(mailbox_name::decode(&wire)?))
}

/// Reads a hierarchy delimiter: a quoted character or NIL.
fn read_delimiter(lexer: &mut Lexer<'_>) -> Result<Option<char>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::QuotedString(s) => Ok(s.chars().next()),
        token => Err(lexer.error(&format!("Expected delimiter, got {token:?}"))),
    }
}

/// Parses the body of a LIST or LSUB response.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListEntry> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("Unexpected token in LIST attributes: {token:?}")));
            }
        }
    }

    lexer.expect_space()?;
    let delimiter = read_delimiter(lexer)?;
    lexer.expect_space()?;
    let mailbox = read_mailbox(lexer)?;

    Ok(ListEntry {
        attributes,
        delimiter,
        mailbox,
    })
}

/// Parses a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();

    while lexer.eat(b' ') {
        // Some servers send a trailing space before CRLF.
        if matches!(lexer.peek(), Some(b'\r') | None) {
            break;
        }
        nums.push(lexer.read_number()?);
    }

    Ok(nums)
}

/// Parses a STATUS response.
pub fn parse_status_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<StatusItem>)> {
    let mailbox = read_mailbox(lexer)?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let value = lexer.read_number()?;

                let item = match name.to_uppercase().as_str() {
                    "MESSAGES" => StatusItem::Messages(value),
                    "RECENT" => StatusItem::Recent(value),
                    "UNSEEN" => StatusItem::Unseen(value),
                    "UIDNEXT" => match Uid::new(value) {
                        Some(uid) => StatusItem::UidNext(uid),
                        None => continue,
                    },
                    "UIDVALIDITY" => match UidValidity::new(value) {
                        Some(v) => StatusItem::UidValidity(v),
                        None => continue,
                    },
                    _ => continue,
                };
                items.push(item);
            }
            token => {
                return Err(lexer.error(&format!("Unexpected token in STATUS: {token:?}")));
            }
        }
    }

    Ok((mailbox, items))
}

/// Parses one NAMESPACE group: NIL or a list of (prefix delimiter) pairs.
fn parse_namespace_group(lexer: &mut Lexer<'_>) -> Result<Vec<NamespaceEntry>> {
    let mut entries = Vec::new();
    match lexer.next_token()? {
        Token::Nil => return Ok(entries),
        Token::LParen => {}
        token => return Err(lexer.error(&format!("Expected namespace list, got {token:?}"))),
    }

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::LParen => {
                let prefix = mailbox_name::decode(&lexer.read_astring()?)?;
                lexer.expect_space()?;
                let delimiter = read_delimiter(lexer)?;
                // Namespace response extensions.
                while lexer.peek() != Some(b')') {
                    lexer.skip_spaces();
                    parse_value(lexer)?;
                }
                lexer.expect(Token::RParen)?;
                entries.push(NamespaceEntry { prefix, delimiter });
            }
            token => return Err(lexer.error(&format!("Unexpected token in namespace: {token:?}"))),
        }
    }

    Ok(entries)
}

/// Parses a NAMESPACE response.
pub fn parse_namespace_response(lexer: &mut Lexer<'_>) -> Result<Namespace> {
    let personal = parse_namespace_group(lexer)?;
    lexer.expect_space()?;
    let other_users = parse_namespace_group(lexer)?;
    lexer.expect_space()?;
    let shared = parse_namespace_group(lexer)?;

    Ok(Namespace {
        personal,
        other_users,
        shared,
    })
}

/// Parses a QUOTA response: root and (resource usage limit) triples.
pub fn parse_quota_response(lexer: &mut Lexer<'_>) -> Result<Quota> {
    let root = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut resources = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let usage = lexer.read_number64()?;
                lexer.expect_space()?;
                let limit = lexer.read_number64()?;
                resources.push(QuotaResource {
                    name: name.to_uppercase(),
                    usage,
                    limit,
                });
            }
            token => return Err(lexer.error(&format!("Unexpected token in QUOTA: {token:?}"))),
        }
    }

    Ok(Quota { root, resources })
}

/// Parses a QUOTAROOT response.
pub fn parse_quota_root_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<String>)> {
    let mailbox = read_mailbox(lexer)?;
    let mut roots = Vec::new();
    while lexer.eat(b' ') {
        roots.push(lexer.read_astring()?);
    }
    Ok((mailbox, roots))
}

/// Parses an ACL response: mailbox, then identifier and rights pairs.
pub fn parse_acl_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<AclEntry>)> {
    let mailbox = read_mailbox(lexer)?;
    let mut entries = Vec::new();
    while lexer.eat(b' ') {
        if matches!(lexer.peek(), None | Some(b'\r')) {
            break;
        }
        let identifier = lexer.read_astring()?;
        lexer.expect_space()?;
        let rights = lexer.read_astring()?;
        entries.push(AclEntry { identifier, rights });
    }
    Ok((mailbox, entries))
}

/// Parses a LISTRIGHTS response.
pub fn parse_list_rights_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, RightsList)> {
    let mailbox = read_mailbox(lexer)?;
    lexer.expect_space()?;
    let identifier = lexer.read_astring()?;
    lexer.expect_space()?;
    let required = lexer.read_astring()?;
    let mut optional = Vec::new();
    while lexer.eat(b' ') {
        if matches!(lexer.peek(), None | Some(b'\r')) {
            break;
        }
        optional.push(lexer.read_astring()?);
    }
    Ok((
        mailbox,
        RightsList {
            identifier,
            required,
            optional,
        },
    ))
}

/// Parses a MYRIGHTS response.
pub fn parse_my_rights_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, String)> {
    let mailbox = read_mailbox(lexer)?;
    lexer.expect_space()?;
    Ok((mailbox, lexer.read_astring()?))
}

/// Deepest parenthesized nesting accepted in a value.
pub const MAX_NESTING: usize = 64;

/// Parses any value: atom, number, string, literal, NIL or nested list.
///
/// Lists nested deeper than [`MAX_NESTING`] are a parse error.
pub fn parse_value(lexer: &mut Lexer<'_>) -> Result<Value> {
    parse_value_within(lexer, MAX_NESTING)
}

/// Parses a value allowing at most `depth` more levels of list nesting.
fn parse_value_within(lexer: &mut Lexer<'_>, depth: usize) -> Result<Value> {
    match lexer.next_token()? {
        Token::Nil => Ok(Value::Nil),
        Token::Atom(s) => Ok(Value::Atom(s.to_string())),
        Token::Number(n) => Ok(Value::Number(n)),
        Token::QuotedString(s) => Ok(Value::String(s)),
        Token::Literal(data) => Ok(Value::Literal(data.to_vec())),
        Token::LParen => {
            let Some(inner) = depth.checked_sub(1) else {
                return Err(lexer.error("List nesting too deep"));
            };
            let mut items = Vec::new();
            loop {
                lexer.skip_spaces();
                if lexer.eat(b')') {
                    return Ok(Value::List(items));
                }
                if lexer.is_eof() {
                    return Err(lexer.error("Unterminated list"));
                }
                items.push(parse_value_within(lexer, inner)?);
            }
        }
        token => Err(lexer.error(&format!("Unexpected token in value: {token:?}"))),
    }
}

/// Parses the rest of a response this crate has no structure for.
///
/// Values are kept as parsed; bracket, `*`, `+` and `%` characters that
/// cannot start a value become one-character atoms. If the rest still does
/// not lex, it is kept whole as a single string.
pub fn parse_payload(lexer: &mut Lexer<'_>) -> Vec<Value> {
    let rest = lexer.remaining();
    parse_payload_values(lexer).unwrap_or_else(|_| {
        lexer.skip(rest.len());
        let text = rest.strip_suffix(b"\r\n").unwrap_or(rest).trim_ascii_start();
        vec![Value::String(String::from_utf8_lossy(text).into_owned())]
    })
}

fn parse_payload_values(lexer: &mut Lexer<'_>) -> Result<Vec<Value>> {
    let mut payload = Vec::new();
    loop {
        lexer.skip_spaces();
        match lexer.peek() {
            None => return Ok(payload),
            Some(b'\r') => {
                expect_end(lexer)?;
                return Ok(payload);
            }
            Some(b @ (b'[' | b']' | b'*' | b'+' | b'%' | b')')) => {
                lexer.advance();
                payload.push(Value::Atom(char::from(b).to_string()));
            }
            Some(_) => payload.push(parse_value(lexer)?),
        }
    }
}

/// Reads text until CRLF.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();

    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end + 2);

    String::from_utf8_lossy(&remaining[..end]).to_string()
}

/// Fails unless the lexer sits at CRLF or end of input.
pub fn expect_end(lexer: &mut Lexer<'_>) -> Result<()> {
    match lexer.next_token()? {
        Token::Crlf | Token::Eof => Ok(()),
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("Trailing data: {token:?}"),
        }),
    }
}
