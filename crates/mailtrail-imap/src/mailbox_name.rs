//! Mailbox name codec (modified UTF-7, RFC 3501 section 5.1.3).
//!
//! Printable US-ASCII represents itself, except `&`, which is written as
//! `&-`. Any other run of characters is converted to UTF-16BE, encoded with
//! the base64 alphabet that uses `,` in place of `/`, and wrapped in `&`
//! ... `-`. Padding is never emitted.
//!
//! ```
//! use mailtrail_imap::mailbox_name;
//!
//! assert_eq!(mailbox_name::encode("Entwürfe"), "Entw&APw-rfe");
//! assert_eq!(mailbox_name::decode("Tom &- Jerry").unwrap(), "Tom & Jerry");
//! ```

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::{Error, Result};

const SHIFT: char = '&';
const UNSHIFT: char = '-';

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

const fn is_direct(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Encodes a mailbox name into the 7-bit wire charset.
#[must_use]
pub fn encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u8> = Vec::new();

    for c in name.chars() {
        if is_direct(c) {
            flush_shifted(&mut out, &mut pending);
            out.push(c);
            if c == SHIFT {
                out.push(UNSHIFT);
            }
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                pending.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }
    flush_shifted(&mut out, &mut pending);

    out
}

fn flush_shifted(out: &mut String, pending: &mut Vec<u8>) {
    if pending.is_empty() {
        return;
    }
    out.push(SHIFT);
    ENGINE.encode_string(pending.as_slice(), out);
    out.push(UNSHIFT);
    pending.clear();
}

/// Decodes a mailbox name from the 7-bit wire charset.
///
/// # Errors
///
/// Returns [`Error::Decoding`] for raw 8-bit or control characters, an
/// unterminated shift sequence, invalid base64, or a shifted run that is
/// not well-formed UTF-16.
pub fn decode(wire: &str) -> Result<String> {
    let mut out = String::with_capacity(wire.len());
    let mut rest = wire;

    while let Some(c) = rest.chars().next() {
        if !is_direct(c) {
            return Err(Error::Decoding(format!(
                "character {c:?} is not allowed in an encoded mailbox name"
            )));
        }
        rest = &rest[c.len_utf8()..];
        if c != SHIFT {
            out.push(c);
            continue;
        }

        let end = rest.find(UNSHIFT).ok_or_else(|| {
            Error::Decoding(format!("unterminated shift sequence in {wire:?}"))
        })?;
        let run = &rest[..end];
        rest = &rest[end + 1..];

        if run.is_empty() {
            out.push(SHIFT);
        } else {
            decode_shifted(run, &mut out)?;
        }
    }

    Ok(out)
}

fn decode_shifted(run: &str, out: &mut String) -> Result<()> {
    let bytes = ENGINE
        .decode(run)
        .map_err(|e| Error::Decoding(format!("invalid base64 run {run:?}: {e}")))?;
    if bytes.len() % 2 != 0 {
        return Err(Error::Decoding(format!(
            "shifted run {run:?} does not hold whole UTF-16 units"
        )));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    for decoded in char::decode_utf16(units) {
        let c = decoded
            .map_err(|e| Error::Decoding(format!("shifted run {run:?}: {e}")))?;
        out.push(c);
    }
    Ok(())
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
    use proptest::prelude::*;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(encode("INBOX/Sent Items"), "INBOX/Sent Items");
        assert_eq!(decode("INBOX/Sent Items").unwrap(), "INBOX/Sent Items");
    }

    #[test]
    fn shift_character_is_escaped() {
        assert_eq!(encode("R&D"), "R&-D");
        assert_eq!(encode("&"), "&-");
        assert_eq!(decode("R&-D").unwrap(), "R&D");
    }

    #[test]
    fn rfc_3501_example() {
        let name = "~peter/mail/\u{53f0}\u{5317}/\u{65e5}\u{672c}\u{8a9e}";
        let wire = "~peter/mail/&U,BTFw-/&ZeVnLIqe-";
        assert_eq!(encode(name), wire);
        assert_eq!(decode(wire).unwrap(), name);
    }

    #[test]
    fn comma_replaces_slash_in_alphabet() {
        // U+53F0 encodes to base64 bits that use index 63.
        assert!(encode("\u{53f0}").contains(','));
        assert!(!encode("\u{53f0}").contains('/'));
    }

    #[test]
    fn astral_characters_use_surrogate_pairs() {
        let name = "mail \u{1F4E7}";
        let wire = encode(name);
        assert_eq!(wire, "mail &2D3c5w-");
        assert_eq!(decode(&wire).unwrap(), name);
    }

    #[test]
    fn adjacent_runs_close_before_ascii() {
        assert_eq!(encode("\u{e9}t\u{e9}"), "&AOk-t&AOk-");
    }

    #[test]
    fn unterminated_shift_is_rejected() {
        let err = decode("Drafts&AOk").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(decode("&A!k-").is_err());
        assert!(decode("&AOk=-").is_err());
    }

    #[test]
    fn odd_byte_count_is_rejected() {
        // "AA" decodes to a single byte.
        assert!(decode("&AA-").is_err());
    }

    #[test]
    fn unpaired_surrogate_is_rejected() {
        // 0xD83D alone.
        assert!(decode("&2D0-").is_err());
    }

    #[test]
    fn raw_eight_bit_is_rejected() {
        assert!(decode("Entwürfe").is_err());
    }

    proptest! {
        #[test]
        fn round_trip(name in any::<String>()) {
            let wire = encode(&name);
            prop_assert!(wire.chars().all(|c| (' '..='~').contains(&c)));
            prop_assert_eq!(decode(&wire).unwrap(), name);
        }

        #[test]
        fn ascii_round_trip_is_identity_without_shift(name in "[ -%'-~]*") {
            prop_assert_eq!(encode(&name), name.clone());
            prop_assert_eq!(decode(&name).unwrap(), name);
        }
    }
}
