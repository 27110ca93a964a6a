//! Money amounts typed on the command line.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("{0:?} is not a number")]
    NotANumber(String),

    #[error("{0:?} has more than two decimal places")]
    TooPrecise(String),

    #[error("{0:?} is too large")]
    TooLarge(String),
}

/// Parse a decimal amount ("12.69", "12,69", "12") into cents.
pub fn parse_amount(text: &str) -> Result<u32, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let (units, fraction) = match text.find(['.', ',']) {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => (text, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if units.is_empty() || !all_digits(units) || !all_digits(fraction) {
        return Err(AmountError::NotANumber(text.to_string()));
    }
    if fraction.len() > 2 {
        return Err(AmountError::TooPrecise(text.to_string()));
    }

    let too_large = || AmountError::TooLarge(text.to_string());
    let units: u32 = units.parse().map_err(|_| too_large())?;
    let mut cents: u32 = if fraction.is_empty() { 0 } else { fraction.parse().map_err(|_| too_large())? };
    if fraction.len() == 1 {
        cents *= 10;
    }

    units
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(too_large)
}

/// Parse an amount already given in cents.
pub fn parse_cents(text: &str) -> Result<u32, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotANumber(text.to_string()));
    }
    text.parse().map_err(|_| AmountError::TooLarge(text.to_string()))
}
