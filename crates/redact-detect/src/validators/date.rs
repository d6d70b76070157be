//! Date validation: numeric and month-name forms across several locales,
//! with calendar-aware day checks and a plausible-year window.

use super::{length_guard, ValidatorConfidence, ValidatorReport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Date validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateValidatorConfig {
    /// Earliest plausible year.
    pub min_year: i32,
    /// Latest plausible year.
    pub max_year: i32,
}

impl Default for DateValidatorConfig {
    fn default() -> Self {
        Self {
            min_year: 1900,
            max_year: 2100,
        }
    }
}

static NUMERIC_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{4})$").unwrap());

static MONTH_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d{1,2})\.?\s+(\p{L}+)\s+(\d{4})|(\p{L}+)\s+(\d{1,2}),?\s+(\d{4}))$")
        .unwrap()
});

/// Month names for the supported locales (de, fr, it, en), lowercased.
pub const MONTH_NAMES: [&[&str]; 12] = [
    &["januar", "janvier", "gennaio", "january", "jan"],
    &["februar", "février", "febbraio", "february", "feb"],
    &["märz", "maerz", "mars", "marzo", "march"],
    &["april", "avril", "aprile", "apr"],
    &["mai", "maggio", "may"],
    &["juni", "juin", "giugno", "june", "jun"],
    &["juli", "juillet", "luglio", "july", "jul"],
    &["august", "août", "aout", "agosto", "aug"],
    &["september", "septembre", "settembre", "sep", "sept"],
    &["oktober", "octobre", "ottobre", "october", "oct", "okt"],
    &["november", "novembre", "nov"],
    &["dezember", "décembre", "dicembre", "december", "dec", "dez"],
];

/// Resolves a month name (any supported locale) to its 1-based number.
#[must_use]
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|names| names.contains(&lower.as_str()))
        .map(|i| i as u32 + 1)
}

/// Returns true if the word is a month name in any supported locale.
#[must_use]
pub fn is_month_name(word: &str) -> bool {
    month_from_name(word).is_some()
}

/// Validates a date string in numeric (`DD[./-]MM[./-]YYYY`) or
/// month-name form.
#[must_use]
pub fn validate_date(text: &str, config: &DateValidatorConfig) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }
    let trimmed = text.trim();

    if let Some(caps) = NUMERIC_DATE_RE.captures(trimmed) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        return check_calendar(day, month, year, config);
    }

    if let Some(caps) = MONTH_NAME_RE.captures(trimmed) {
        let (day_str, month_str, year_str) = if caps.get(1).is_some() {
            (&caps[1], &caps[2], &caps[3])
        } else {
            (&caps[5], &caps[4], &caps[6])
        };
        let Some(month) = month_from_name(month_str) else {
            return ValidatorReport::invalid(
                ValidatorConfidence::InvalidFormat,
                format!("unknown month name '{month_str}'"),
            );
        };
        let day: u32 = day_str.parse().unwrap_or(0);
        let year: i32 = year_str.parse().unwrap_or(0);
        return check_calendar(day, month, year, config);
    }

    ValidatorReport::invalid(ValidatorConfidence::InvalidFormat, "unrecognized date form")
}

fn check_calendar(day: u32, month: u32, year: i32, config: &DateValidatorConfig) -> ValidatorReport {
    if year < config.min_year || year > config.max_year {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("year {year} outside {}-{}", config.min_year, config.max_year),
        );
    }
    if !(1..=12).contains(&month) {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("month {month} out of range"),
        );
    }
    let max_day = days_in_month(month, year);
    if day == 0 || day > max_day {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("day {day} out of range for month {month}"),
        );
    }
    ValidatorReport::valid(ValidatorConfidence::FormatValid)
}

fn days_in_month(month: u32, year: i32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}
