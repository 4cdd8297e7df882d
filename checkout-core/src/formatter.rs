//! Input masks for card form fields
//!
//! Every keystroke re-formats the full accumulated input, so each mask only
//! has to produce the right shape for a given digit sequence:
//!
//! | Field       | Max digits | Shape                 |
//! |-------------|-----------:|-----------------------|
//! | card number | 16         | `4111 1111 1111 1111` |
//! | expiry      | 4          | `MM/YY`               |
//! | cvv         | 4          | `1234`                |
//! | tax id      | 11         | `123.456.789-01`      |
//!
//! Separators are only inserted when a digit follows them, so partial input
//! never ends with a dangling separator.

use crate::types::FieldKind;

/// Card number length
pub const CARD_NUMBER_DIGITS: usize = 16;
/// Expiry length (MMYY)
pub const EXPIRY_DIGITS: usize = 4;
/// Maximum CVV length
pub const CVV_MAX_DIGITS: usize = 4;
/// CPF length
pub const TAX_ID_DIGITS: usize = 11;

/// Format raw input for a field into its display string
pub fn format(kind: FieldKind, raw: &str) -> String {
    match kind {
        FieldKind::HolderName => raw.to_string(),
        FieldKind::CardNumber => card_number(raw),
        FieldKind::Expiry => expiry(raw),
        FieldKind::Cvv => cvv(raw),
        FieldKind::TaxId => tax_id(raw),
    }
}

/// Keep ASCII digits only
pub fn digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn truncated_digits(input: &str, max: usize) -> Vec<char> {
    input.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Insert `separator` before each digit whose index is in `breaks`
fn mask(digits: &[char], breaks: &[(usize, char)]) -> String {
    let mut out = String::with_capacity(digits.len() + breaks.len());
    for (i, d) in digits.iter().enumerate() {
        if let Some((_, sep)) = breaks.iter().find(|(at, _)| *at == i) {
            out.push(*sep);
        }
        out.push(*d);
    }
    out
}

fn card_number(raw: &str) -> String {
    let d = truncated_digits(raw, CARD_NUMBER_DIGITS);
    mask(&d, &[(4, ' '), (8, ' '), (12, ' ')])
}

fn expiry(raw: &str) -> String {
    let d = truncated_digits(raw, EXPIRY_DIGITS);
    mask(&d, &[(2, '/')])
}

fn cvv(raw: &str) -> String {
    truncated_digits(raw, CVV_MAX_DIGITS).into_iter().collect()
}

fn tax_id(raw: &str) -> String {
    let d = truncated_digits(raw, TAX_ID_DIGITS);
    mask(&d, &[(3, '.'), (6, '.'), (9, '-')])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_number_grouping() {
        assert_eq!(format(FieldKind::CardNumber, ""), "");
        assert_eq!(format(FieldKind::CardNumber, "4111"), "4111");
        assert_eq!(format(FieldKind::CardNumber, "41111"), "4111 1");
        assert_eq!(
            format(FieldKind::CardNumber, "4111-1111-1111-1111-999"),
            "4111 1111 1111 1111"
        );
    }

    #[test]
    fn test_expiry_slash() {
        assert_eq!(format(FieldKind::Expiry, "1"), "1");
        assert_eq!(format(FieldKind::Expiry, "12"), "12");
        assert_eq!(format(FieldKind::Expiry, "123"), "12/3");
        assert_eq!(format(FieldKind::Expiry, "12/345"), "12/34");
    }

    #[test]
    fn test_cvv_digits_only() {
        assert_eq!(format(FieldKind::Cvv, "1a2b3"), "123");
        assert_eq!(format(FieldKind::Cvv, "12345"), "1234");
    }

    #[test]
    fn test_tax_id_progressive_pattern() {
        assert_eq!(format(FieldKind::TaxId, "123"), "123");
        assert_eq!(format(FieldKind::TaxId, "1234"), "123.4");
        assert_eq!(format(FieldKind::TaxId, "123456"), "123.456");
        assert_eq!(format(FieldKind::TaxId, "1234567"), "123.456.7");
        assert_eq!(format(FieldKind::TaxId, "123456789"), "123.456.789");
        assert_eq!(format(FieldKind::TaxId, "1234567890"), "123.456.789-0");
        assert_eq!(format(FieldKind::TaxId, "123456789012345"), "123.456.789-01");
    }

    #[test]
    fn test_holder_name_untouched() {
        assert_eq!(format(FieldKind::HolderName, " Ana  Souza "), " Ana  Souza ");
    }

    #[test]
    fn test_reformat_is_stable() {
        let once = format(FieldKind::TaxId, "98765432100");
        assert_eq!(format(FieldKind::TaxId, &once), once);
    }
}
