//! Command serialization helpers.
//!
//! A command is written as one or more segments. Every segment except the
//! last ends with a synchronizing literal announcement `{n}\r\n`; the
//! connection waits for a continuation before sending the next segment,
//! which starts with the n literal bytes.

use crate::mailbox_name;
use crate::types::{Flag, Mailbox};

use super::types::{FetchAttribute, FetchItems, SearchCriteria};

/// Accumulates command bytes, split at literal boundaries.
#[derive(Debug, Default)]
pub struct Writer {
    segments: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl Writer {
    pub fn raw(&mut self, bytes: &[u8]) {
        self.current.extend_from_slice(bytes);
    }

    pub fn push(&mut self, byte: u8) {
        self.current.push(byte);
    }

    /// Writes a synchronizing literal.
    pub fn literal(&mut self, data: &[u8]) {
        self.raw(format!("{{{}}}\r\n", data.len()).as_bytes());
        self.segments.push(std::mem::take(&mut self.current));
        self.current.extend_from_slice(data);
    }

    /// Writes an astring: atom when possible, else quoted, else literal.
    pub fn astring(&mut self, s: &str) {
        if s.bytes().any(needs_literal) {
            self.literal(s.as_bytes());
        } else if s.is_empty() || s.bytes().any(needs_quoting) {
            self.quoted(s);
        } else {
            self.raw(s.as_bytes());
        }
    }

    /// Writes a quoted string. The caller keeps CR, LF and NUL out.
    pub fn quoted(&mut self, s: &str) {
        self.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                self.push(b'\\');
            }
            self.push(b);
        }
        self.push(b'"');
    }

    /// Writes a mailbox name in modified UTF-7.
    pub fn mailbox(&mut self, mailbox: &Mailbox) {
        self.astring(&mailbox_name::encode(mailbox.as_str()));
    }

    /// Writes a parenthesized flag list.
    pub fn flag_list(&mut self, flags: &[Flag]) {
        self.push(b'(');
        for (i, flag) in flags.iter().enumerate() {
            if i > 0 {
                self.push(b' ');
            }
            self.raw(flag.as_str().as_bytes());
        }
        self.push(b')');
    }

    /// Finishes the command with CRLF and returns its segments.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.raw(b"\r\n");
        self.segments.push(self.current);
        self.segments
    }
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b == 0x7F
}

/// Returns true if the byte cannot appear in a quoted string.
const fn needs_literal(b: u8) -> bool {
    b == b'\r' || b == b'\n' || b == 0 || b >= 0x80
}

/// Writes FETCH items.
pub fn write_fetch_items(w: &mut Writer, items: &FetchItems) {
    match items {
        FetchItems::All => w.raw(b"ALL"),
        FetchItems::Full => w.raw(b"FULL"),
        FetchItems::Fast => w.raw(b"FAST"),
        FetchItems::Items(attrs) => {
            if let [attr] = attrs.as_slice() {
                write_fetch_attribute(w, attr);
            } else {
                w.push(b'(');
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    write_fetch_attribute(w, attr);
                }
                w.push(b')');
            }
        }
    }
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(w: &mut Writer, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => w.raw(b"FLAGS"),
        FetchAttribute::InternalDate => w.raw(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => w.raw(b"RFC822.SIZE"),
        FetchAttribute::Envelope => w.raw(b"ENVELOPE"),
        FetchAttribute::BodyStructure => w.raw(b"BODYSTRUCTURE"),
        FetchAttribute::Uid => w.raw(b"UID"),
        FetchAttribute::Rfc822 => w.raw(b"RFC822"),
        FetchAttribute::Rfc822Header => w.raw(b"RFC822.HEADER"),
        FetchAttribute::Rfc822Text => w.raw(b"RFC822.TEXT"),
        FetchAttribute::Body {
            section,
            peek,
            partial,
        } => {
            w.raw(if *peek { &b"BODY.PEEK["[..] } else { &b"BODY["[..] });
            if let Some(s) = section {
                w.raw(s.as_bytes());
            }
            w.push(b']');
            if let Some((start, len)) = partial {
                w.raw(format!("<{start}.{len}>").as_bytes());
            }
        }
    }
}

/// Writes SEARCH criteria.
pub fn write_search_criteria(w: &mut Writer, criteria: &SearchCriteria) {
    let keyword_arg = |w: &mut Writer, keyword: &[u8], arg: &str| {
        w.raw(keyword);
        w.push(b' ');
        w.astring(arg);
    };

    match criteria {
        SearchCriteria::All => w.raw(b"ALL"),
        SearchCriteria::Answered => w.raw(b"ANSWERED"),
        SearchCriteria::Deleted => w.raw(b"DELETED"),
        SearchCriteria::Draft => w.raw(b"DRAFT"),
        SearchCriteria::Flagged => w.raw(b"FLAGGED"),
        SearchCriteria::New => w.raw(b"NEW"),
        SearchCriteria::Recent => w.raw(b"RECENT"),
        SearchCriteria::Old => w.raw(b"OLD"),
        SearchCriteria::Unanswered => w.raw(b"UNANSWERED"),
        SearchCriteria::Undeleted => w.raw(b"UNDELETED"),
        SearchCriteria::Unflagged => w.raw(b"UNFLAGGED"),
        SearchCriteria::Unseen => w.raw(b"UNSEEN"),
        SearchCriteria::Seen => w.raw(b"SEEN"),
        SearchCriteria::Keyword(k) => keyword_arg(w, b"KEYWORD", k),
        SearchCriteria::Unkeyword(k) => keyword_arg(w, b"UNKEYWORD", k),
        SearchCriteria::SequenceSet(set) => w.raw(set.to_string().as_bytes()),
        SearchCriteria::Uid(set) => {
            w.raw(b"UID ");
            w.raw(set.to_string().as_bytes());
        }
        SearchCriteria::Subject(s) => keyword_arg(w, b"SUBJECT", s),
        SearchCriteria::From(s) => keyword_arg(w, b"FROM", s),
        SearchCriteria::To(s) => keyword_arg(w, b"TO", s),
        SearchCriteria::Cc(s) => keyword_arg(w, b"CC", s),
        SearchCriteria::Bcc(s) => keyword_arg(w, b"BCC", s),
        SearchCriteria::Body(s) => keyword_arg(w, b"BODY", s),
        SearchCriteria::Text(s) => keyword_arg(w, b"TEXT", s),
        SearchCriteria::Since(date) => keyword_arg(w, b"SINCE", date),
        SearchCriteria::Before(date) => keyword_arg(w, b"BEFORE", date),
        SearchCriteria::On(date) => keyword_arg(w, b"ON", date),
        SearchCriteria::Larger(size) => w.raw(format!("LARGER {size}").as_bytes()),
        SearchCriteria::Smaller(size) => w.raw(format!("SMALLER {size}").as_bytes()),
        SearchCriteria::Header(name, value) => {
            keyword_arg(w, b"HEADER", name);
            w.push(b' ');
            w.astring(value);
        }
        SearchCriteria::And(criteria) => {
            w.push(b'(');
            for (i, c) in criteria.iter().enumerate() {
                if i > 0 {
                    w.push(b' ');
                }
                write_search_criteria(w, c);
            }
            w.push(b')');
        }
        SearchCriteria::Or(a, b) => {
            w.raw(b"OR ");
            write_search_criteria(w, a);
            w.push(b' ');
            write_search_criteria(w, b);
        }
        SearchCriteria::Not(c) => {
            w.raw(b"NOT ");
            write_search_criteria(w, c);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn astring(s: &str) -> Vec<Vec<u8>> {
        let mut w = Writer::default();
        w.astring(s);
        w.finish()
    }

    #[test]
    fn atoms_are_bare() {
        assert_eq!(astring("user@example.com"), vec![b"user@example.com\r\n".to_vec()]);
    }

    #[test]
    fn empty_and_spaced_strings_are_quoted() {
        assert_eq!(astring(""), vec![b"\"\"\r\n".to_vec()]);
        assert_eq!(astring("a \"b\""), vec![b"\"a \\\"b\\\"\"\r\n".to_vec()]);
    }

    #[test]
    fn eight_bit_strings_become_literals() {
        assert_eq!(
            astring("größe"),
            vec![b"{7}\r\n".to_vec(), "größe\r\n".as_bytes().to_vec()]
        );
    }

    #[test]
    fn mailbox_is_encoded() {
        let mut w = Writer::default();
        w.mailbox(&Mailbox::new("Entwürfe"));
        assert_eq!(w.finish(), vec![b"Entw&APw-rfe\r\n".to_vec()]);
    }
}
