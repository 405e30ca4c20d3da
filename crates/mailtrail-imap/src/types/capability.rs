//! Server capabilities and response status.

/// Status keyword of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (expected negative outcome).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Parses a status keyword, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// Server capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// STARTTLS support
    StartTls,
    /// LOGIN disabled until the channel is encrypted
    LoginDisabled,
    /// AUTH mechanism
    Auth(String),
    /// SASL initial response (RFC 4959)
    SaslIr,
    /// NAMESPACE command support (RFC 2342)
    Namespace,
    /// QUOTA extension (RFC 2087)
    Quota,
    /// UIDPLUS extension (RFC 4315)
    UidPlus,
    /// LITERAL+ extension (RFC 7888)
    LiteralPlus,
    /// IDLE command support (RFC 2177)
    Idle,
    /// Unknown capability
    Unknown(String),
}

impl Capability {
    /// Parses a capability string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "SASL-IR" => Self::SaslIr,
            "NAMESPACE" => Self::Namespace,
            "QUOTA" => Self::Quota,
            "UIDPLUS" => Self::UidPlus,
            "LITERAL+" => Self::LiteralPlus,
            "IDLE" => Self::Idle,
            _ if upper.starts_with("AUTH=") => Self::Auth(upper[5..].to_string()),
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// Returns true if this advertises the given SASL mechanism.
    #[must_use]
    pub fn is_auth(&self, mechanism: &str) -> bool {
        matches!(self, Self::Auth(m) if m.eq_ignore_ascii_case(mechanism))
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::SaslIr => write!(f, "SASL-IR"),
            Self::Namespace => write!(f, "NAMESPACE"),
            Self::Quota => write!(f, "QUOTA"),
            Self::UidPlus => write!(f, "UIDPLUS"),
            Self::LiteralPlus => write!(f, "LITERAL+"),
            Self::Idle => write!(f, "IDLE"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(Status::parse("ok"), Some(Status::Ok));
        assert_eq!(Status::parse("No"), Some(Status::No));
        assert_eq!(Status::parse("BAD"), Some(Status::Bad));
        assert_eq!(Status::parse("EXISTS"), None);
    }

    #[test]
    fn status_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bad.is_ok());
    }

    #[test]
    fn parse_auth_mechanisms() {
        assert_eq!(
            Capability::parse("AUTH=cram-md5"),
            Capability::Auth("CRAM-MD5".to_string())
        );
        assert!(Capability::parse("AUTH=PLAIN").is_auth("plain"));
        assert!(!Capability::parse("STARTTLS").is_auth("PLAIN"));
    }

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!(Capability::parse("imap4rev1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("SASL-IR"), Capability::SaslIr);
        assert_eq!(
            Capability::parse("XYZZY"),
            Capability::Unknown("XYZZY".to_string())
        );
    }

    #[test]
    fn display_round_trips() {
        for s in ["IMAP4rev1", "STARTTLS", "AUTH=CRAM-MD5", "QUOTA", "X-EXT"] {
            assert_eq!(Capability::parse(s).to_string(), s);
        }
    }
}
