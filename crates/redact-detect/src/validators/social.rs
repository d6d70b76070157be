//! Social-insurance number validation: 13 digits, fixed country prefix,
//! EAN-13 check digit.

use super::{length_guard, ValidatorConfidence, ValidatorReport};

/// Country prefix of Swiss social-insurance (AHV) numbers.
const COUNTRY_PREFIX: &str = "756";

/// Validates a social-insurance number (e.g. `756.1234.5678.97`).
#[must_use]
pub fn validate_social_insurance(text: &str) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 13 {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("expected 13 digits, got {}", digits.len()),
        );
    }
    if !digits.starts_with(COUNTRY_PREFIX) {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("missing {COUNTRY_PREFIX} country prefix"),
        );
    }

    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    let expected = ean13_check_digit(&values[..12]);
    if values[12] == expected {
        ValidatorReport::valid(ValidatorConfidence::ChecksumValid)
    } else {
        ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("EAN-13 check digit mismatch: expected {expected}, got {}", values[12]),
        )
    }
}

/// EAN-13 check digit: alternating x1/x3 weighted sum over the first 12
/// digits, check = (10 - sum mod 10) mod 10.
fn ean13_check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_number() {
        // 756.9217.0769.85 is the official AHV example number.
        let report = validate_social_insurance("756.9217.0769.85");
        assert!(report.is_valid);
        assert_eq!(report.confidence, ValidatorConfidence::ChecksumValid);
    }

    #[test]
    fn test_unformatted_digits_accepted() {
        assert!(validate_social_insurance("7569217076985").is_valid);
    }

    #[test]
    fn test_last_digit_mutation_rejected() {
        let report = validate_social_insurance("756.9217.0769.84");
        assert!(!report.is_valid);
    }

    #[test]
    fn test_wrong_prefix() {
        let report = validate_social_insurance("757.9217.0769.85");
        assert!(!report.is_valid);
        assert!(report.reason.unwrap().contains("756"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(!validate_social_insurance("756.9217.0769").is_valid);
    }

    #[test]
    fn test_check_digit_formula() {
        // Recomputing the check digit over the first 12 digits must
        // reproduce the 13th for any accepted number.
        let digits: Vec<u32> = "756921707698"
            .chars()
            .filter_map(|c| c.to_digit(10))
            .collect();
        assert_eq!(ean13_check_digit(&digits), 5);
    }
}
