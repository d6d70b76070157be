//! VAT / business identification number validation.
//!
//! Swiss UID numbers (`CHE-123.456.789`) carry nine digits; the ninth is a
//! check digit computed from a weighted positional sum modulo 11.

use super::{length_guard, ValidatorConfidence, ValidatorReport};

/// Positional weights over the first eight digits.
const WEIGHTS: [u32; 8] = [5, 4, 3, 2, 7, 6, 5, 4];

/// Validates a VAT/UID number such as `CHE-116.281.710 MWST`.
#[must_use]
pub fn validate_vat_id(text: &str) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 9 {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("expected 9 digits, got {}", digits.len()),
        );
    }

    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = values[..8].iter().zip(WEIGHTS.iter()).map(|(d, w)| d * w).sum();

    let check = match 11 - (sum % 11) {
        // Remainder 11 maps to check digit 0.
        11 => 0,
        // A computed check digit of 10 cannot occur in a valid number.
        10 => {
            return ValidatorReport::invalid(
                ValidatorConfidence::InvalidFormat,
                "check digit position is undefined for this digit sequence",
            )
        }
        c => c,
    };

    if values[8] == check {
        ValidatorReport::valid(ValidatorConfidence::ChecksumValid)
    } else {
        ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("check digit mismatch: expected {check}, got {}", values[8]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uid() {
        // Sum 132 is divisible by 11, exercising the remainder-11 -> 0 rule.
        let report = validate_vat_id("CHE-116.281.710");
        assert!(report.is_valid);
        assert_eq!(report.confidence, ValidatorConfidence::ChecksumValid);
    }

    #[test]
    fn test_valid_with_suffix() {
        assert!(validate_vat_id("CHE-116.281.710 MWST").is_valid);
    }

    #[test]
    fn test_plain_digit_groups() {
        // 12345678 -> weighted sum 168, 168 mod 11 = 3, check 8.
        assert!(validate_vat_id("123.456.788").is_valid);
        assert!(!validate_vat_id("123.456.789").is_valid);
    }

    #[test]
    fn test_check_digit_mismatch() {
        let report = validate_vat_id("CHE-116.281.711");
        assert!(!report.is_valid);
        assert!(report.reason.unwrap().contains("mismatch"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(!validate_vat_id("CHE-116.281.71").is_valid);
    }
}
