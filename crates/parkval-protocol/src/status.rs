//! Status code table.
//!
//! Maps the numeric status the terminal returns to a business outcome. The
//! table is total: codes outside it map to [`ResponseStatus::Unknown`].
//!
//! One override applies. The vendor reuses code 7 ("terminal not
//! registered") for "invalid card type"; the two are told apart by
//! [`INVALID_CARD_TYPE_MARKER`] appearing in the printer-line text.

use std::fmt;

use serde::Serialize;

/// Printer-line text that turns status 7 into [`ResponseStatus::InvalidCardType`].
pub const INVALID_CARD_TYPE_MARKER: &str = "Tipo de cartao invalido";

const UNREGISTERED_TERMINAL_CODE: u32 = 7;

/// Interpreted terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Validated,
    NotValidated,
    AlreadyValidated,
    InsufficientValue,
    InvalidCard,
    InvalidCommand,
    InvalidOperation,
    UnregisteredTerminal,
    DiscountTimeExceeded,
    /// Code 7 with the invalid-card-type marker in the printer line.
    InvalidCardType,
    /// Code outside the table; carries the raw value.
    Unknown(u32),
}

/// (code, status, success, default message)
const STATUS_TABLE: [(u32, ResponseStatus, bool, &str); 9] = [
    (0, ResponseStatus::Validated, true, "validated"),
    (1, ResponseStatus::NotValidated, false, "not validated"),
    (2, ResponseStatus::AlreadyValidated, false, "already validated"),
    (3, ResponseStatus::InsufficientValue, false, "insufficient purchase value"),
    (4, ResponseStatus::InvalidCard, false, "invalid card"),
    (5, ResponseStatus::InvalidCommand, false, "invalid command"),
    (6, ResponseStatus::InvalidOperation, false, "invalid operation"),
    (7, ResponseStatus::UnregisteredTerminal, false, "terminal not registered"),
    (8, ResponseStatus::DiscountTimeExceeded, false, "discount time exceeded"),
];

/// Result of a table lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusOutcome {
    pub status: ResponseStatus,
    pub success: bool,
    /// Default message for the status.
    pub message: String,
}

impl ResponseStatus {
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Validated)
    }

    pub fn default_message(self) -> String {
        match self {
            Self::InvalidCardType => "invalid card type".to_string(),
            Self::Unknown(code) => format!("unknown status: {code}"),
            known => STATUS_TABLE
                .iter()
                .find(|(_, status, _, _)| *status == known)
                .map_or_else(String::new, |(_, _, _, msg)| (*msg).to_string()),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            other => write!(f, "{}", other.default_message().replace(' ', "_")),
        }
    }
}

/// Look a status code up in the table, without the printer-line override.
pub fn lookup(code: u32) -> StatusOutcome {
    STATUS_TABLE
        .iter()
        .find(|(c, _, _, _)| *c == code)
        .map_or_else(
            || {
                let status = ResponseStatus::Unknown(code);
                StatusOutcome {
                    status,
                    success: false,
                    message: status.default_message(),
                }
            },
            |(_, status, success, message)| StatusOutcome {
                status: *status,
                success: *success,
                message: (*message).to_string(),
            },
        )
}

/// Interpret a status code together with the decoded printer-line text.
pub fn interpret(code: u32, printer_line: &str) -> StatusOutcome {
    if code == UNREGISTERED_TERMINAL_CODE && printer_line.contains(INVALID_CARD_TYPE_MARKER) {
        let status = ResponseStatus::InvalidCardType;
        return StatusOutcome {
            status,
            success: false,
            message: status.default_message(),
        };
    }
    lookup(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_documented_code_maps_to_its_pair() {
        let expected = [
            (0, true, "validated"),
            (1, false, "not validated"),
            (2, false, "already validated"),
            (3, false, "insufficient purchase value"),
            (4, false, "invalid card"),
            (5, false, "invalid command"),
            (6, false, "invalid operation"),
            (7, false, "terminal not registered"),
            (8, false, "discount time exceeded"),
        ];
        for (code, success, message) in expected {
            let outcome = lookup(code);
            assert_eq!(outcome.success, success, "code {code}");
            assert_eq!(outcome.message, message, "code {code}");
        }
    }

    #[test]
    fn unknown_code_is_failure_with_raw_value() {
        let outcome = lookup(42);
        assert_eq!(outcome.status, ResponseStatus::Unknown(42));
        assert!(!outcome.success);
        assert!(outcome.message.contains("42"));
    }

    #[test]
    fn code_seven_with_marker_is_invalid_card_type() {
        let outcome = interpret(7, "Tipo de cartao invalido");
        assert_eq!(outcome.status, ResponseStatus::InvalidCardType);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "invalid card type");
    }

    #[test]
    fn code_seven_without_marker_stays_unregistered_terminal() {
        let outcome = interpret(7, "Terminal nao cadastrado");
        assert_eq!(outcome.status, ResponseStatus::UnregisteredTerminal);
    }

    #[test]
    fn marker_only_overrides_code_seven() {
        let outcome = interpret(4, "Tipo de cartao invalido");
        assert_eq!(outcome.status, ResponseStatus::InvalidCard);
    }

    #[test]
    fn only_validated_is_success() {
        for code in 0..=8 {
            assert_eq!(lookup(code).status.is_success(), code == 0);
        }
    }
}
