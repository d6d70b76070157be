//! Bank account (IBAN) validation: country length table + ISO 7064 Mod-97-10.

use super::{length_guard, ValidatorConfidence, ValidatorReport};

/// Expected IBAN length per country prefix.
const COUNTRY_LENGTHS: &[(&str, usize)] = &[
    ("AT", 20),
    ("BE", 16),
    ("CH", 21),
    ("DE", 22),
    ("ES", 24),
    ("FR", 27),
    ("GB", 22),
    ("IT", 27),
    ("LI", 21),
    ("LU", 20),
    ("NL", 18),
    ("PT", 25),
];

/// Validates an IBAN: country prefix, length table, then Mod-97-10 checksum.
#[must_use]
pub fn validate_iban(text: &str) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if cleaned.len() < 15 || cleaned.len() > 34 {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("length {} outside 15-34", cleaned.len()),
        );
    }
    if !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            "non-alphanumeric characters",
        );
    }
    let prefix = &cleaned[..2];
    if !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            "missing country prefix",
        );
    }

    if let Some(&(_, expected)) = COUNTRY_LENGTHS.iter().find(|(p, _)| *p == prefix) {
        if cleaned.len() != expected {
            return ValidatorReport::invalid(
                ValidatorConfidence::InvalidFormat,
                format!("{prefix} IBAN must be {expected} characters, got {}", cleaned.len()),
            );
        }
    }

    if mod97(&cleaned) == Some(1) {
        ValidatorReport::valid(ValidatorConfidence::ChecksumValid)
    } else {
        ValidatorReport::invalid(ValidatorConfidence::InvalidFormat, "Mod-97 checksum failed")
    }
}

/// ISO 7064 Mod-97-10: move the first four characters to the end, map
/// letters A-Z to 10-35, and reduce modulo 97 in chunks of at most seven
/// digits so intermediate values stay within u64.
fn mod97(iban: &str) -> Option<u64> {
    let rearranged = format!("{}{}", &iban[4..], &iban[..4]);

    let mut numeric = String::with_capacity(rearranged.len() * 2);
    for c in rearranged.chars() {
        if c.is_ascii_digit() {
            numeric.push(c);
        } else if c.is_ascii_uppercase() {
            numeric.push_str(&(c as u32 - 'A' as u32 + 10).to_string());
        } else {
            return None;
        }
    }

    let mut remainder: u64 = 0;
    let digits: Vec<char> = numeric.chars().collect();
    for chunk in digits.chunks(7) {
        let chunk_str: String = chunk.iter().collect();
        let combined = format!("{remainder}{chunk_str}");
        remainder = combined.parse::<u64>().ok()? % 97;
    }
    Some(remainder)
}
