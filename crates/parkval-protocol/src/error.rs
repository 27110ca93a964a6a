//! Codec error types.

use thiserror::Error;

/// Result type alias using [`CodecError`].
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while building a request or decoding a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A required text field is empty or blank.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A numeric field that must be positive is zero.
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    /// A text field does not fit its fixed wire width.
    #[error("{field} is {len} bytes, the field holds at most {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A text field contains a character with no single-byte encoding.
    #[error("{field} contains {ch:?}, which has no single-byte encoding")]
    Unencodable { field: &'static str, ch: char },

    /// The fiscal signature failed the CNPJ check-digit test.
    #[error("fiscal signature {0:?} is not a valid CNPJ")]
    InvalidCnpj(String),

    /// The response payload does not have the fixed protocol size.
    #[error("response payload is {actual} bytes, expected {expected}")]
    ResponseSize { actual: usize, expected: usize },

    /// Structural unpack failure.
    #[error("malformed frame: {0}")]
    Malformed(String),
}

impl CodecError {
    /// Whether this error describes bad business input rather than a bad frame.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::NotPositive { .. }
                | Self::FieldTooLong { .. }
                | Self::Unencodable { .. }
                | Self::InvalidCnpj(_)
        )
    }
}
