//! SASL mechanisms used by AUTHENTICATE.
//!
//! PLAIN (RFC 4616), CRAM-MD5 (RFC 2195) and the legacy LOGIN mechanism.
//! Challenges and responses travel base64-encoded on the wire.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const BLOCK_SIZE: usize = 64;

/// HMAC-MD5 as defined by RFC 2104.
#[must_use]
pub fn hmac_md5(key: &[u8], data: &[u8]) -> [u8; 16] {
    let mut block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        block[..16].copy_from_slice(&md5::compute(key).0);
    } else {
        block[..key.len()].copy_from_slice(key);
    }

    let mut inner = md5::Context::new();
    inner.consume(block.map(|b| b ^ 0x36));
    inner.consume(data);
    let inner = inner.compute();

    let mut outer = md5::Context::new();
    outer.consume(block.map(|b| b ^ 0x5c));
    outer.consume(inner.0);
    outer.compute().0
}

/// Builds the CRAM-MD5 reply `<username> <hex digest>` for a decoded
/// challenge.
#[must_use]
pub fn cram_md5_response(username: &str, secret: &str, challenge: &[u8]) -> String {
    let digest = hmac_md5(secret.as_bytes(), challenge);
    format!("{username} {}", hex::encode(digest))
}

/// Client side of SASL LOGIN: the server prompts for the username, then
/// the password.
///
/// Prompts naming a password get the password. Anything else is answered
/// by position, since servers word the prompts differently.
#[derive(Debug)]
pub struct LoginExchange<'a> {
    username: &'a str,
    password: &'a str,
    step: u8,
}

impl<'a> LoginExchange<'a> {
    /// Starts an exchange for the given credentials.
    #[must_use]
    pub const fn new(username: &'a str, password: &'a str) -> Self {
        Self {
            username,
            password,
            step: 0,
        }
    }

    /// Answers one decoded prompt with a base64 response, or `None` once
    /// both credentials have been sent.
    pub fn respond(&mut self, prompt: &[u8]) -> Option<String> {
        let wants_password = prompt.to_ascii_lowercase().starts_with(b"pass");
        let reply = match self.step {
            0 if !wants_password => self.username,
            0 | 1 => self.password,
            _ => return None,
        };
        self.step = if wants_password { 2 } else { self.step + 1 };
        Some(encode(reply.as_bytes()))
    }
}

/// Builds the PLAIN message `\0<username>\0<password>`, base64-encoded.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let mut message = Vec::with_capacity(username.len() + password.len() + 2);
    message.push(0);
    message.extend_from_slice(username.as_bytes());
    message.push(0);
    message.extend_from_slice(password.as_bytes());
    STANDARD.encode(message)
}

/// Decodes a base64 server challenge. An absent text is an empty challenge.
#[must_use]
pub fn decode_challenge(text: Option<&str>) -> Option<Vec<u8>> {
    STANDARD.decode(text.unwrap_or_default().trim()).ok()
}

/// Base64-encodes a client response.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
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
    fn rfc2104_vectors() {
        assert_eq!(
            hex::encode(hmac_md5(&[0x0b; 16], b"Hi There")),
            "9294727a3638bb1c13f48ef8158bfc9d"
        );
        assert_eq!(
            hex::encode(hmac_md5(b"Jefe", b"what do ya want for nothing?")),
            "750c783e6ab0b503eaa86e310a5db738"
        );
        assert_eq!(
            hex::encode(hmac_md5(&[0xaa; 16], &[0xdd; 50])),
            "56be34521d144c88dbb8c733f0e8b3f6"
        );
    }

    #[test]
    fn long_keys_are_hashed_first() {
        // RFC 2202 test case 6.
        assert_eq!(
            hex::encode(hmac_md5(
                &[0xaa; 80],
                b"Test Using Larger Than Block-Size Key - Hash Key First"
            )),
            "6b1ab7fe4bd7bf8f0b62e6ce61b9d0cd"
        );
    }

    #[test]
    fn rfc2195_example() {
        let challenge = decode_challenge(Some(
            "PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+",
        ))
        .unwrap();
        assert_eq!(challenge, b"<1896.697170952@postoffice.reston.mci.net>");
        let reply = cram_md5_response("tim", "tanstaaftanstaaf", &challenge);
        assert_eq!(reply, "tim b913a602c7eda7a495b4e6e7334d3890");
        assert_eq!(
            encode(reply.as_bytes()),
            "dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw"
        );
    }

    #[test]
    fn undecodable_challenge() {
        assert!(decode_challenge(Some("not base64!")).is_none());
        assert_eq!(decode_challenge(None).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn login_prompts_in_order() {
        let mut login = LoginExchange::new("tim", "secret");
        assert_eq!(login.respond(b"Username:").unwrap(), "dGlt");
        assert_eq!(login.respond(b"Password:").unwrap(), "c2VjcmV0");
        assert!(login.respond(b"Password:").is_none());
    }

    #[test]
    fn login_unrecognised_prompts_go_by_position() {
        let mut login = LoginExchange::new("tim", "secret");
        assert_eq!(login.respond(b"").unwrap(), "dGlt");
        assert_eq!(login.respond(b"").unwrap(), "c2VjcmV0");
        assert!(login.respond(b"").is_none());
    }

    #[test]
    fn plain_message() {
        assert_eq!(plain_response("tim", "secret"), "AHRpbQBzZWNyZXQ=");
    }
}
