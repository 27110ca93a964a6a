//! Brazilian company registry number (CNPJ) check digits.

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Whether `text` is a CNPJ with valid check digits.
///
/// Punctuation (`.`, `-`, `/`) and surrounding whitespace are ignored;
/// what remains must be exactly 14 ASCII digits.
pub fn is_valid(text: &str) -> bool {
    let digits: Vec<u32> = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '/'))
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    if digits.len() != 14 {
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_WEIGHTS);
    let second = check_digit(&digits[..13], &SECOND_WEIGHTS);
    digits[12] == first && digits[13] == second
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        rest => 11 - rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_numbers_with_or_without_punctuation() {
        assert!(is_valid("11222333000181"));
        assert!(is_valid("11.222.333/0001-81"));
        assert!(is_valid(" 11222333000181 "));
    }

    #[test]
    fn rejects_wrong_check_digits() {
        assert!(!is_valid("11222333000182"));
        assert!(!is_valid("04558054000173"));
    }

    #[test]
    fn rejects_wrong_length_or_letters() {
        assert!(!is_valid(""));
        assert!(!is_valid("1122233300018"));
        assert!(!is_valid("112223330001811"));
        assert!(!is_valid("1122233300018A"));
    }
}
