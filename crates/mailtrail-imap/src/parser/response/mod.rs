//! IMAP response parser.
//!
//! Parses server responses according to the RFC 3501 grammar.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::elidable_lifetime_names)]
#![allow(clippy::match_same_arms)]

mod fetch;
mod helpers;
mod types;

pub use types::{FetchItem, MessageStatus, StatusItem, UntaggedResponse, Value};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{
    expect_end, parse_acl_response, parse_capability_data, parse_flag_list,
    parse_list_response, parse_list_rights_response, parse_my_rights_response,
    parse_namespace_response, parse_payload, parse_quota_response, parse_quota_root_response,
    parse_response_code, parse_search_response, parse_status_response, read_text_until_crlf,
};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text/data.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, literals included.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            Token::Number(n) => Self::parse_tagged(&mut lexer, &n.to_string()),
            token => Err(Error::Parse {
                position: 0,
                message: format!("Expected *, +, or tag, got {token:?}"),
            }),
        }
    }

    /// Parses an untagged response as [`UntaggedResponse::Other`], without
    /// interpreting its data.
    ///
    /// Mailbox names stay in their wire form, so this succeeds on responses
    /// whose names cannot be decoded.
    pub fn parse_unstructured(input: &[u8]) -> Result<UntaggedResponse> {
        let mut lexer = Lexer::new(input);
        lexer.expect(Token::Asterisk)?;
        lexer.expect_space()?;

        let number = match lexer.next_token()? {
            Token::Atom(keyword) => return Ok(Self::other(&mut lexer, keyword, None)),
            Token::Number(n) => {
                u32::try_from(n).map_err(|_| lexer.error("Message number exceeds 32 bits"))?
            }
            token => {
                return Err(lexer.error(&format!(
                    "Unexpected token in untagged response: {token:?}"
                )));
            }
        };
        lexer.expect_space()?;
        let keyword = lexer.read_atom_string()?;
        Ok(Self::other(&mut lexer, keyword, Some(number)))
    }

    fn other(lexer: &mut Lexer<'_>, keyword: &str, number: Option<u32>) -> UntaggedResponse {
        UntaggedResponse::Other {
            keyword: keyword.to_uppercase(),
            number,
            payload: parse_payload(lexer),
        }
    }

    /// Parses a tagged response.
    fn parse_tagged(lexer: &mut Lexer<'_>, tag_str: &str) -> Result<Response> {
        lexer.expect_space()?;

        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag_str),
            status,
            code,
            text,
        })
    }

    /// Parses an untagged response.
    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(s) => Self::parse_untagged_keyword(lexer, s)?,
            Token::Number(n) => Self::parse_message_data(lexer, n)?,
            token => {
                return Err(lexer.error(&format!(
                    "Unexpected token in untagged response: {token:?}"
                )));
            }
        };

        Ok(Response::Untagged(untagged))
    }

    fn parse_untagged_keyword(lexer: &mut Lexer<'_>, keyword: &str) -> Result<UntaggedResponse> {
        let upper = keyword.to_uppercase();

        if let Some(status) = Status::parse(&upper) {
            let (code, text) = Self::parse_resp_text(lexer)?;
            return Ok(match status {
                Status::Ok => UntaggedResponse::Ok { code, text },
                Status::No => UntaggedResponse::No { code, text },
                Status::Bad => UntaggedResponse::Bad { code, text },
                Status::PreAuth => UntaggedResponse::PreAuth { code, text },
                Status::Bye => UntaggedResponse::Bye { code, text },
            });
        }

        let response = match upper.as_str() {
            "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
            "SEARCH" => UntaggedResponse::Search(parse_search_response(lexer)?),
            "FLAGS" => {
                lexer.expect_space()?;
                UntaggedResponse::Flags(parse_flag_list(lexer)?)
            }
            "LIST" => {
                lexer.expect_space()?;
                UntaggedResponse::List(parse_list_response(lexer)?)
            }
            "LSUB" => {
                lexer.expect_space()?;
                UntaggedResponse::Lsub(parse_list_response(lexer)?)
            }
            "STATUS" => {
                lexer.expect_space()?;
                let (mailbox, items) = parse_status_response(lexer)?;
                UntaggedResponse::Status { mailbox, items }
            }
            "NAMESPACE" => {
                lexer.expect_space()?;
                UntaggedResponse::Namespace(parse_namespace_response(lexer)?)
            }
            "QUOTA" => {
                lexer.expect_space()?;
                UntaggedResponse::Quota(parse_quota_response(lexer)?)
            }
            "QUOTAROOT" => {
                lexer.expect_space()?;
                let (mailbox, roots) = parse_quota_root_response(lexer)?;
                UntaggedResponse::QuotaRoot { mailbox, roots }
            }
            "ACL" => {
                lexer.expect_space()?;
                let (mailbox, entries) = parse_acl_response(lexer)?;
                UntaggedResponse::Acl { mailbox, entries }
            }
            "LISTRIGHTS" => {
                lexer.expect_space()?;
                let (mailbox, rights) = parse_list_rights_response(lexer)?;
                UntaggedResponse::ListRights { mailbox, rights }
            }
            "MYRIGHTS" => {
                lexer.expect_space()?;
                let (mailbox, rights) = parse_my_rights_response(lexer)?;
                UntaggedResponse::MyRights { mailbox, rights }
            }
            _ => return Ok(Self::other(lexer, keyword, None)),
        };

        lexer.skip_spaces();
        expect_end(lexer)?;
        Ok(response)
    }

    fn parse_message_data(lexer: &mut Lexer<'_>, n: u64) -> Result<UntaggedResponse> {
        let n = u32::try_from(n).map_err(|_| lexer.error("Message number exceeds 32 bits"))?;
        lexer.expect_space()?;
        let keyword = lexer.read_atom_string()?;
        let seq = SeqNum::new(n);
        let zero = || Error::Parse {
            position: 0,
            message: format!("Invalid sequence number 0 for {keyword}"),
        };

        let response = match keyword.to_uppercase().as_str() {
            "EXISTS" => UntaggedResponse::Exists(n),
            "RECENT" => UntaggedResponse::Recent(n),
            "EXPUNGE" => UntaggedResponse::Expunge(seq.ok_or_else(zero)?),
            "FETCH" => {
                let seq = seq.ok_or_else(zero)?;
                lexer.expect_space()?;
                let items = fetch::parse_fetch_response(lexer)?;
                UntaggedResponse::Fetch { seq, items }
            }
            _ => return Ok(Self::other(lexer, keyword, Some(n))),
        };

        expect_end(lexer)?;
        Ok(response)
    }

    /// Parses a continuation response.
    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        lexer.eat(b' ');
        let text = read_text_until_crlf(lexer);

        Response::Continuation {
            text: if text.is_empty() { None } else { Some(text) },
        }
    }

    /// Parses a status keyword.
    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        Status::parse(s).ok_or_else(|| lexer.error(&format!("Invalid status: {s}")))
    }

    /// Parses ` [code] text` after a status keyword.
    ///
    /// Only one bracketed code is recognized; anything after it is text.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        // Some servers omit the text entirely, including the space.
        lexer.eat(b' ');

        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };

        lexer.eat(b' ');
        let text = read_text_until_crlf(lexer);

        Ok((code, text))
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
    use crate::types::{Capability, Flag, MailboxAttribute, ResponseCode};
    use crate::ErrorKind;

    use super::*;

    fn untagged(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("Expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ok_response() {
        match untagged(b"* OK IMAP4rev1 server ready\r\n") {
            UntaggedResponse::Ok { code, text } => {
                assert!(code.is_none());
                assert_eq!(text, "IMAP4rev1 server ready");
            }
            other => panic!("Expected untagged OK, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tagged_ok() {
        let response = ResponseParser::parse(b"A1 OK LOGIN completed\r\n").unwrap();

        match response {
            Response::Tagged {
                tag,
                status,
                code,
                text,
            } => {
                assert_eq!(tag.as_str(), "A1");
                assert_eq!(status, Status::Ok);
                assert!(code.is_none());
                assert_eq!(text, "LOGIN completed");
            }
            _ => panic!("Expected tagged response"),
        }
    }

    #[test]
    fn test_parse_tagged_without_text() {
        let response = ResponseParser::parse(b"A7 NO\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Tagged { status: Status::No, ref text, .. } if text.is_empty()
        ));
    }

    #[test]
    fn test_parse_tagged_alert() {
        let response = ResponseParser::parse(b"A3 NO [ALERT] Quota exceeded\r\n").unwrap();
        match response {
            Response::Tagged { code, text, .. } => {
                assert_eq!(code, Some(ResponseCode::Alert));
                assert_eq!(text, "Quota exceeded");
            }
            _ => panic!("Expected tagged response"),
        }
    }

    #[test]
    fn test_parse_capability() {
        match untagged(b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=CRAM-MD5 QUOTA\r\n") {
            UntaggedResponse::Capability(caps) => {
                assert!(caps.contains(&Capability::Imap4Rev1));
                assert!(caps.contains(&Capability::StartTls));
                assert!(caps.contains(&Capability::Quota));
                assert!(caps.iter().any(|c| c.is_auth("cram-md5")));
            }
            other => panic!("Expected capability response, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_exists_and_recent() {
        assert_eq!(untagged(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
        assert_eq!(untagged(b"* 0 RECENT\r\n"), UntaggedResponse::Recent(0));
    }

    #[test]
    fn test_parse_expunge() {
        match untagged(b"* 4 EXPUNGE\r\n") {
            UntaggedResponse::Expunge(seq) => assert_eq!(seq.get(), 4),
            other => panic!("Expected EXPUNGE, got {other:?}"),
        }
        assert!(ResponseParser::parse(b"* 0 EXPUNGE\r\n").is_err());
    }

    #[test]
    fn test_parse_flags() {
        match untagged(b"* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n") {
            UntaggedResponse::Flags(flags) => {
                assert!(flags.contains(&Flag::Seen));
                assert!(flags.contains(&Flag::Answered));
                assert!(flags.contains(&Flag::Flagged));
                assert_eq!(flags.len(), 5);
            }
            other => panic!("Expected FLAGS, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_decodes_name() {
        match untagged(b"* LIST (\\HasNoChildren) \"/\" \"Entw&APw-rfe\"\r\n") {
            UntaggedResponse::List(list) => {
                assert!(list.attributes.contains(&MailboxAttribute::HasNoChildren));
                assert_eq!(list.delimiter, Some('/'));
                assert_eq!(list.mailbox.as_str(), "Entwürfe");
            }
            other => panic!("Expected LIST, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_lsub_nil_delimiter() {
        match untagged(b"* LSUB (\\Noselect) NIL inbox\r\n") {
            UntaggedResponse::Lsub(list) => {
                assert_eq!(list.delimiter, None);
                assert!(list.mailbox.is_inbox());
                assert!(!list.is_selectable());
            }
            other => panic!("Expected LSUB, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_with_literal_name() {
        match untagged(b"* LIST () \".\" {8}\r\nIN BOX 2\r\n") {
            UntaggedResponse::List(list) => assert_eq!(list.mailbox.as_str(), "IN BOX 2"),
            other => panic!("Expected LIST, got {other:?}"),
        }
    }

    #[test]
    fn test_list_with_bad_encoding_is_decoding_error() {
        let err = ResponseParser::parse(b"* LIST () \"/\" \"Drafts&AOk\"\r\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn test_parse_continuation() {
        match ResponseParser::parse(b"+ Ready for literal\r\n").unwrap() {
            Response::Continuation { text } => {
                assert_eq!(text, Some("Ready for literal".to_string()));
            }
            _ => panic!("Expected continuation"),
        }
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn test_parse_response_code() {
        match untagged(b"* OK [UIDVALIDITY 1234567890] UIDs valid\r\n") {
            UntaggedResponse::Ok { code, text } => {
                match code {
                    Some(ResponseCode::UidValidity(v)) => {
                        assert_eq!(v.get(), 1_234_567_890);
                    }
                    _ => panic!("Expected UIDVALIDITY code"),
                }
                assert_eq!(text, "UIDs valid");
            }
            other => panic!("Expected untagged OK, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_permanentflags_with_wildcard() {
        let response = untagged(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n");
        match response.code() {
            Some(ResponseCode::PermanentFlags(flags)) => {
                assert!(flags.contains(&Flag::MayCreate));
                assert!(flags.contains(&Flag::Deleted));
            }
            other => panic!("Expected PERMANENTFLAGS, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_appenduid_and_copyuid() {
        let response = ResponseParser::parse(b"A4 OK [APPENDUID 38505 3955] APPEND done\r\n");
        match response.unwrap() {
            Response::Tagged {
                code: Some(ResponseCode::AppendUid { uid_validity, uid }),
                ..
            } => {
                assert_eq!(uid_validity.get(), 38505);
                assert_eq!(uid.get(), 3955);
            }
            other => panic!("Expected APPENDUID, got {other:?}"),
        }

        let response = ResponseParser::parse(b"A5 OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n");
        match response.unwrap() {
            Response::Tagged {
                code:
                    Some(ResponseCode::CopyUid {
                        source,
                        destination,
                        ..
                    }),
                ..
            } => {
                assert_eq!(source, "304,319:320");
                assert_eq!(destination, "3956:3958");
            }
            other => panic!("Expected COPYUID, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_code_keeps_params() {
        let response = untagged(b"* NO [OVERQUOTA storage 100%] Over quota\r\n");
        assert_eq!(
            response.code(),
            Some(&ResponseCode::Other {
                name: "OVERQUOTA".to_string(),
                params: Some("storage 100%".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_fetch_both_shapes() {
        match untagged(b"* 1 FETCH (FLAGS (\\Seen) UID 12345)\r\n") {
            UntaggedResponse::Fetch { seq, items } => {
                assert_eq!(seq.get(), 1);
                assert!(
                    items
                        .iter()
                        .any(|i| matches!(i, FetchItem::Uid(uid) if uid.get() == 12345))
                );
            }
            other => panic!("Expected FETCH, got {other:?}"),
        }

        match untagged(b"* 2 FETCH FLAGS (\\Deleted)\r\n") {
            UntaggedResponse::Fetch { seq, items } => {
                assert_eq!(seq.get(), 2);
                assert!(matches!(&items[0], FetchItem::Flags(f) if f.is_deleted()));
            }
            other => panic!("Expected FETCH, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fetch_literal_with_crlf_and_nul() {
        let input = b"* 3 FETCH (BODY[] {9}\r\nab\r\n\0\r\ncd)\r\n";
        match untagged(input) {
            UntaggedResponse::Fetch { items, .. } => {
                assert_eq!(
                    items[0],
                    FetchItem::Body {
                        section: None,
                        origin: None,
                        data: Some(b"ab\r\n\0\r\ncd".to_vec()),
                    }
                );
            }
            other => panic!("Expected FETCH, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            untagged(b"* SEARCH 2 3 5 8 13\r\n"),
            UntaggedResponse::Search(vec![2, 3, 5, 8, 13])
        );
        assert_eq!(untagged(b"* SEARCH\r\n"), UntaggedResponse::Search(vec![]));
        assert_eq!(untagged(b"* SEARCH 1 \r\n"), UntaggedResponse::Search(vec![1]));
    }

    #[test]
    fn test_parse_status() {
        match untagged(b"* STATUS blurdybloop (MESSAGES 231 UIDNEXT 44292 UNSEEN 3)\r\n") {
            UntaggedResponse::Status { mailbox, items } => {
                assert_eq!(mailbox.as_str(), "blurdybloop");
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], StatusItem::Messages(231));
                assert_eq!(items[2], StatusItem::Unseen(3));
            }
            other => panic!("Expected STATUS, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_namespace() {
        let input = b"* NAMESPACE ((\"\" \"/\")) ((\"~\" \"/\")) ((\"#shared/\" \"/\") (\"#public/\" \"/\"))\r\n";
        match untagged(input) {
            UntaggedResponse::Namespace(ns) => {
                assert_eq!(ns.personal.len(), 1);
                assert_eq!(ns.personal[0].prefix, "");
                assert_eq!(ns.personal[0].delimiter, Some('/'));
                assert_eq!(ns.other_users[0].prefix, "~");
                assert_eq!(ns.shared.len(), 2);
            }
            other => panic!("Expected NAMESPACE, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_namespace_with_nil_groups() {
        match untagged(b"* NAMESPACE ((\"INBOX.\" \".\")) NIL NIL\r\n") {
            UntaggedResponse::Namespace(ns) => {
                assert_eq!(ns.personal[0].prefix, "INBOX.");
                assert!(ns.other_users.is_empty());
                assert!(ns.shared.is_empty());
            }
            other => panic!("Expected NAMESPACE, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_quota_and_quotaroot() {
        match untagged(b"* QUOTA \"\" (STORAGE 10 512 MESSAGE 3 1000)\r\n") {
            UntaggedResponse::Quota(quota) => {
                assert_eq!(quota.root, "");
                let storage = quota.resource("STORAGE").unwrap();
                assert_eq!((storage.usage, storage.limit), (10, 512));
                assert_eq!(quota.resources.len(), 2);
            }
            other => panic!("Expected QUOTA, got {other:?}"),
        }

        match untagged(b"* QUOTAROOT INBOX \"\"\r\n") {
            UntaggedResponse::QuotaRoot { mailbox, roots } => {
                assert!(mailbox.is_inbox());
                assert_eq!(roots, vec![String::new()]);
            }
            other => panic!("Expected QUOTAROOT, got {other:?}"),
        }
    }

    #[test]
    fn test_bye_and_preauth() {
        assert!(matches!(
            untagged(b"* BYE Autologout\r\n"),
            UntaggedResponse::Bye { .. }
        ));
        assert!(matches!(
            untagged(b"* PREAUTH [CAPABILITY IMAP4rev1] ready\r\n"),
            UntaggedResponse::PreAuth {
                code: Some(ResponseCode::Capability(_)),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_acl_family() {
        match untagged(b"* ACL INBOX Fred rwipsldexta anyone lr\r\n") {
            UntaggedResponse::Acl { mailbox, entries } => {
                assert!(mailbox.is_inbox());
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].identifier, "Fred");
                assert_eq!(entries[0].rights, "rwipsldexta");
                assert!(entries[1].grants('l'));
            }
            other => panic!("Expected ACL, got {other:?}"),
        }

        match untagged(b"* LISTRIGHTS ~/Mail/saved smith la r swicdkxte\r\n") {
            UntaggedResponse::ListRights { mailbox, rights } => {
                assert_eq!(mailbox.as_str(), "~/Mail/saved");
                assert_eq!(rights.identifier, "smith");
                assert_eq!(rights.required, "la");
                assert_eq!(rights.optional, vec!["r", "swicdkxte"]);
            }
            other => panic!("Expected LISTRIGHTS, got {other:?}"),
        }

        assert_eq!(
            untagged(b"* MYRIGHTS \"Journ&AOk-e\" lrs\r\n"),
            UntaggedResponse::MyRights {
                mailbox: crate::types::Mailbox::new("Journ\u{e9}e"),
                rights: "lrs".to_string(),
            }
        );
    }

    #[test]
    fn test_acl_without_entries() {
        match untagged(b"* ACL Archive\r\n") {
            UntaggedResponse::Acl { mailbox, entries } => {
                assert_eq!(mailbox.as_str(), "Archive");
                assert!(entries.is_empty());
            }
            other => panic!("Expected ACL, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_responses_are_kept() {
        assert_eq!(
            untagged(b"* ENABLED CONDSTORE\r\n"),
            UntaggedResponse::Other {
                keyword: "ENABLED".to_string(),
                number: None,
                payload: vec![Value::Atom("CONDSTORE".to_string())],
            }
        );

        match untagged(b"* ID (\"name\" \"Dovecot\" \"version\" NIL)\r\n") {
            UntaggedResponse::Other { keyword, payload, .. } => {
                assert_eq!(keyword, "ID");
                assert_eq!(payload[0].as_list().unwrap().len(), 4);
            }
            other => panic!("Expected ID data, got {other:?}"),
        }

        match untagged(b"* ESEARCH (TAG \"A2\") UID MIN 2 COUNT 3\r\n") {
            UntaggedResponse::Other { keyword, payload, .. } => {
                assert_eq!(keyword, "ESEARCH");
                assert_eq!(payload.len(), 6);
                assert_eq!(payload[5], Value::Number(3));
            }
            other => panic!("Expected ESEARCH data, got {other:?}"),
        }

        assert_eq!(
            untagged(b"* 3 vanished (EARLIER) 41:43\r\n"),
            UntaggedResponse::Other {
                keyword: "VANISHED".to_string(),
                number: Some(3),
                payload: vec![
                    Value::List(vec![Value::Atom("EARLIER".to_string())]),
                    Value::Atom("41:43".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_unknown_response_that_does_not_lex_is_kept_as_text() {
        match untagged(b"* XWEIRD (a [b] \x01)\r\n") {
            UntaggedResponse::Other { keyword, payload, .. } => {
                assert_eq!(keyword, "XWEIRD");
                assert_eq!(payload, vec![Value::String("(a [b] \u{1})".to_string())]);
            }
            other => panic!("Expected XWEIRD data, got {other:?}"),
        }
    }

    #[test]
    fn test_unstructured_keeps_undecodable_names() {
        assert!(ResponseParser::parse(b"* LIST () \"/\" \"Bad&AOk\"\r\n").is_err());

        let raw = ResponseParser::parse_unstructured(b"* LIST () \"/\" \"Bad&AOk\"\r\n").unwrap();
        assert_eq!(
            raw,
            UntaggedResponse::Other {
                keyword: "LIST".to_string(),
                number: None,
                payload: vec![
                    Value::List(vec![]),
                    Value::String("/".to_string()),
                    Value::String("Bad&AOk".to_string()),
                ],
            }
        );

        let raw = ResponseParser::parse_unstructured(b"* 4 FETCH (UID 9)\r\n").unwrap();
        assert!(matches!(raw, UntaggedResponse::Other { number: Some(4), .. }));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut input = b"* 1 FETCH (BODYSTRUCTURE ".to_vec();
        input.extend(std::iter::repeat_n(b'(', 200_000));
        input.extend_from_slice(b"\r\n");
        let err = ResponseParser::parse(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("nesting"));

        let mut input = b"* XSTRANGE ".to_vec();
        input.extend(std::iter::repeat_n(b'(', 200_000));
        input.extend_from_slice(b"\r\n");
        assert!(matches!(untagged(&input), UntaggedResponse::Other { .. }));
    }

    #[test]
    fn test_nesting_within_limit_parses() {
        let depth = helpers::MAX_NESTING - 2;
        let mut input = b"* 1 FETCH (X-NESTED ".to_vec();
        input.extend(std::iter::repeat_n(b'(', depth));
        input.extend(std::iter::repeat_n(b')', depth));
        input.extend_from_slice(b")\r\n");
        match untagged(&input) {
            UntaggedResponse::Fetch { items, .. } => {
                assert!(matches!(&items[0], FetchItem::Other { name, .. } if name == "X-NESTED"));
            }
            other => panic!("Expected FETCH, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        for input in [&b"* 1\r\n"[..], b"* 1 FETCH (UID)\r\n", b"(\r\n", b"A1 MAYBE\r\n"] {
            let err = ResponseParser::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Protocol, "{input:?}");
        }
    }
}
