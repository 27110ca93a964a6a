//! Command types understood by the terminal server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Request command. Selects the `cmd_type` header field; framing is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Query the ticket without validating it.
    Consult,
    /// Apply the purchase to the ticket.
    Validation,
}

impl Command {
    pub const CONSULT_TAG: u32 = 0x0000_000F;
    pub const VALIDATION_TAG: u32 = 0x0000_0010;

    /// Numeric wire tag.
    pub const fn tag(self) -> u32 {
        match self {
            Self::Consult => Self::CONSULT_TAG,
            Self::Validation => Self::VALIDATION_TAG,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            Self::CONSULT_TAG => Some(Self::Consult),
            Self::VALIDATION_TAG => Some(Self::Validation),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consult => "consult",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
