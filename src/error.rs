//! Error type for the PackStream codec.

/// Every failure the codec can raise, on either the encode or decode path.
///
/// PackStream recognizes exactly one error kind; this type keeps that shape,
/// carrying a descriptive message rather than a zoo of variants so that
/// callers can match on "it failed" without depending on codec internals.
#[derive(Debug, thiserror::Error)]
pub enum PackStreamError {
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl PackStreamError {
    pub fn unknown_marker(marker: u8) -> Self {
        Self::Protocol(format!("unknown PackStream marker: 0x{marker:02X}"))
    }

    pub fn unexpected_end(needed: usize, remaining: usize) -> Self {
        Self::Protocol(format!(
            "need {needed} bytes but only {remaining} remaining"
        ))
    }

    pub fn size_exceeded(kind: &'static str, size: usize) -> Self {
        Self::Protocol(format!("{kind} size {size} exceeds the maximum of 2^32 - 1"))
    }

    pub fn struct_size_exceeded(size: usize) -> Self {
        Self::Protocol(format!(
            "structure field count {size} exceeds the maximum of 65535"
        ))
    }

    pub fn bytes_disabled() -> Self {
        Self::Protocol("byte arrays are not supported by the peer".into())
    }

    pub fn unencodable(what: impl std::fmt::Display) -> Self {
        Self::Protocol(format!("value cannot be encoded: {what}"))
    }

    pub fn hook_failed(what: impl std::fmt::Display) -> Self {
        Self::Protocol(format!("hook failed: {what}"))
    }

    pub fn invalid_utf8(err: std::string::FromUtf8Error) -> Self {
        Self::Protocol(format!("invalid UTF-8 string: {err}"))
    }
}
