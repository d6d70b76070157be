//! Postal address validation.
//!
//! Four-digit postal codes collide with calendar years in the 1900-2099
//! window. Disambiguation is driven by tunable word tables (known cities,
//! known non-city words, date keywords), not hardcoded logic, so operators
//! can extend them without code changes.

use super::date::is_month_name;
use super::{length_guard, ValidatorConfidence, ValidatorReport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Postal validator configuration, including the disambiguation tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostalValidatorConfig {
    /// Lowest valid postal code.
    pub min_code: u32,
    /// Highest valid postal code.
    pub max_code: u32,
    /// Year window that collides with postal codes.
    pub year_overlap: (u32, u32),
    /// City names accepting a code in the overlap window (lowercase).
    pub known_cities: Vec<String>,
    /// Words rejecting a code in the overlap window (lowercase).
    pub non_city_words: Vec<String>,
    /// Keywords marking preceding date context (lowercase).
    pub date_keywords: Vec<String>,
}

impl Default for PostalValidatorConfig {
    fn default() -> Self {
        Self {
            min_code: 1000,
            max_code: 9999,
            year_overlap: (1900, 2099),
            known_cities: [
                "zürich", "zurich", "genève", "geneve", "basel", "bern", "lausanne", "winterthur",
                "luzern", "lugano", "biel", "thun", "schaffhausen", "chur", "sion", "fribourg",
                "neuchâtel", "neuchatel",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            non_city_words: [
                "attestation", "bescheinigung", "certificat", "certificato", "jahresrechnung",
                "rapport", "bericht", "bilanz", "budget", "edition", "ausgabe", "version",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            date_keywords: [
                "datum", "date", "data", "am", "le", "il", "per", "bis", "vom", "du", "dal",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

static DAY_MONTH_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}\.\s?\d{1,2}\.\s*$").unwrap());

static POSTAL_IN_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Validates a standalone postal code with its surrounding text.
///
/// `before` is the text immediately preceding the code, `following_word`
/// the first word after it. This validator is invoked directly by the
/// address passes; it is deliberately not registered under
/// `EntityType::Address`, which the composite address validator owns.
#[must_use]
pub fn validate_postal_code(
    code: &str,
    before: &str,
    following_word: Option<&str>,
    config: &PostalValidatorConfig,
) -> ValidatorReport {
    if let Some(report) = length_guard(code) {
        return report;
    }

    let Ok(value) = code.trim().parse::<u32>() else {
        return ValidatorReport::invalid(ValidatorConfidence::InvalidFormat, "not numeric");
    };
    if value < config.min_code || value > config.max_code {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("{value} outside {}-{}", config.min_code, config.max_code),
        );
    }

    let (year_lo, year_hi) = config.year_overlap;
    if value < year_lo || value > year_hi {
        return ValidatorReport::valid(ValidatorConfidence::FormatValid);
    }

    // Code collides with a plausible year; disambiguate on the word that
    // follows, then on preceding date context.
    if let Some(word) = following_word {
        let lower = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if config.known_cities.contains(&lower) {
            return ValidatorReport::valid(ValidatorConfidence::KnownValid);
        }
        if is_month_name(&lower) || config.non_city_words.contains(&lower) {
            return ValidatorReport::invalid(
                ValidatorConfidence::FalsePositive,
                format!("'{word}' after the code marks a year, not an address"),
            );
        }
    }

    if DAY_MONTH_PREFIX_RE.is_match(before)
        || config
            .date_keywords
            .iter()
            .any(|kw| ends_with_word(before, kw))
    {
        return ValidatorReport::invalid(
            ValidatorConfidence::FalsePositive,
            "preceding date context marks a year",
        );
    }

    // No decisive signal either way: accept, but lowered.
    ValidatorReport::valid(ValidatorConfidence::Moderate)
}

/// Validates a composite address candidate: it must contain an in-range
/// postal code and at least one alphabetic component.
#[must_use]
pub fn validate_address(text: &str, config: &PostalValidatorConfig) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }

    let Some(caps) = POSTAL_IN_ADDRESS_RE.captures(text) else {
        return ValidatorReport::invalid(ValidatorConfidence::Weak, "no postal code found");
    };
    let code: u32 = caps[1].parse().unwrap_or(0);
    if code < config.min_code || code > config.max_code {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("postal code {code} out of range"),
        );
    }
    let has_letters = text.chars().filter(|c| c.is_alphabetic()).count() >= 3;
    if has_letters {
        ValidatorReport::valid(ValidatorConfidence::FormatValid)
    } else {
        ValidatorReport::invalid(ValidatorConfidence::Weak, "no street or city component")
    }
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text.trim_end()
        .to_lowercase()
        .split_whitespace()
        .last()
        .is_some_and(|last| last == word)
}
