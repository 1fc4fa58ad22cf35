//! Decode error type shared by both wire formats.

use thiserror::Error;

/// Stable error codes (used as structured log fields and by test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeCode {
    /// `Content-Type` header could not be parsed.
    BadMediaType,
    /// Stream ended inside a length-delimited record.
    Truncated,
    /// Record bytes are not a valid MetricFamily message.
    Malformed,
    /// Record length prefix exceeds the configured limit.
    RecordTooLarge,
    /// Structurally valid record that violates a model invariant.
    InvalidFamily,
    /// Text exposition syntax error.
    TextSyntax,
}

impl DecodeCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DecodeCode::BadMediaType => "BAD_MEDIA_TYPE",
            DecodeCode::Truncated => "TRUNCATED",
            DecodeCode::Malformed => "MALFORMED",
            DecodeCode::RecordTooLarge => "RECORD_TOO_LARGE",
            DecodeCode::InvalidFamily => "INVALID_FAMILY",
            DecodeCode::TextSyntax => "TEXT_SYNTAX",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors produced while decoding a metrics response.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bad media type: {0}")]
    BadMediaType(String),
    #[error("stream ended inside a record ({pending} bytes pending)")]
    Truncated { pending: usize },
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("record of {len} bytes exceeds limit of {limit} bytes")]
    RecordTooLarge { len: u64, limit: usize },
    #[error("invalid metric family: {0}")]
    InvalidFamily(String),
    #[error("text format error in line {line}: {msg}")]
    Text { line: usize, msg: String },
}

impl DecodeError {
    /// Map the error to its stable code.
    pub fn code(&self) -> DecodeCode {
        match self {
            DecodeError::BadMediaType(_) => DecodeCode::BadMediaType,
            DecodeError::Truncated { .. } => DecodeCode::Truncated,
            DecodeError::Malformed(_) => DecodeCode::Malformed,
            DecodeError::RecordTooLarge { .. } => DecodeCode::RecordTooLarge,
            DecodeError::InvalidFamily(_) => DecodeCode::InvalidFamily,
            DecodeError::Text { .. } => DecodeCode::TextSyntax,
        }
    }

    pub(crate) fn text(line: usize, msg: impl Into<String>) -> Self {
        DecodeError::Text {
            line,
            msg: msg.into(),
        }
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(e: prost::DecodeError) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}
