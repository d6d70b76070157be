//! Format validators.
//!
//! Each validator is a pure function checking a candidate string against a
//! checksum or structural rule for one entity type. Validators report a
//! graduated confidence drawn from a fixed ordered scale so downstream
//! scoring can compare outputs consistently.

pub mod bank;
pub mod date;
pub mod postal;
pub mod social;
pub mod vat;

use crate::error::{DetectError, DetectResult};
use once_cell::sync::Lazy;
use redact_core::EntityType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input-length ceiling enforced before any pattern match runs.
/// Exceeding it is a validation failure, not an exception.
pub const MAX_VALIDATOR_INPUT_LEN: usize = 256;

/// Fixed ordered confidence scale for validator outputs.
/// Variants are declared worst-to-best so the derived ordering compares
/// `ChecksumValid` greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorConfidence {
    /// Known false positive.
    FalsePositive,
    /// Validation could not run (e.g. input too long).
    Failed,
    /// Structurally plausible but failed the format rule.
    InvalidFormat,
    /// Weak structural evidence only.
    Weak,
    /// Moderate evidence (e.g. lowered-confidence fallback acceptance).
    Moderate,
    /// Matches a known-valid table entry.
    KnownValid,
    /// Standard acceptance without a dedicated rule.
    Standard,
    /// Format rule satisfied, no checksum available.
    FormatValid,
    /// Checksum verified.
    ChecksumValid,
}

impl ValidatorConfidence {
    /// Maps the scale onto a 0.0 - 1.0 score.
    #[must_use]
    pub const fn score(&self) -> f64 {
        match self {
            Self::ChecksumValid => 0.95,
            Self::FormatValid => 0.85,
            Self::Standard => 0.75,
            Self::KnownValid => 0.70,
            Self::Moderate => 0.60,
            Self::Weak => 0.40,
            Self::InvalidFormat => 0.20,
            Self::Failed => 0.10,
            Self::FalsePositive => 0.0,
        }
    }
}

/// Outcome of a validator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorReport {
    /// Whether the candidate is accepted.
    pub is_valid: bool,
    /// Graduated confidence.
    pub confidence: ValidatorConfidence,
    /// Reason for the outcome, when informative.
    pub reason: Option<String>,
}

impl ValidatorReport {
    /// Accepts with the given confidence.
    #[must_use]
    pub fn valid(confidence: ValidatorConfidence) -> Self {
        Self {
            is_valid: true,
            confidence,
            reason: None,
        }
    }

    /// Rejects with a reason.
    pub fn invalid(confidence: ValidatorConfidence, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            confidence,
            reason: Some(reason.into()),
        }
    }

    /// Rejection for over-long input, shared by all validators.
    #[must_use]
    pub fn too_long(len: usize) -> Self {
        Self::invalid(
            ValidatorConfidence::Failed,
            format!("input length {len} exceeds validator ceiling {MAX_VALIDATOR_INPUT_LEN}"),
        )
    }
}

/// Guard applied by every validator before running patterns.
/// Returns a failure report for over-long input.
#[must_use]
pub fn length_guard(text: &str) -> Option<ValidatorReport> {
    (text.len() > MAX_VALIDATOR_INPUT_LEN).then(|| ValidatorReport::too_long(text.len()))
}

/// A format validator function.
pub type ValidatorFn = Box<dyn Fn(&str) -> ValidatorReport + Send + Sync>;

/// Registry holding one validator per entity type.
///
/// Duplicate registrations for the same type are rejected at load time;
/// a secondary validator for an already-claimed type must be invoked
/// directly, never through the type-keyed lookup.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<EntityType, ValidatorFn>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the registry with all built-in validators.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        // Registration of the built-in set cannot collide.
        let _ = registry.register(EntityType::BankAccount, Box::new(|s| bank::validate_iban(s)));
        let _ = registry.register(
            EntityType::SocialInsuranceNumber,
            Box::new(|s| social::validate_social_insurance(s)),
        );
        let _ = registry.register(EntityType::VatId, Box::new(|s| vat::validate_vat_id(s)));
        let _ = registry.register(EntityType::Date, Box::new(|s| {
            date::validate_date(s, &date::DateValidatorConfig::default())
        }));
        let _ = registry.register(EntityType::Address, Box::new(|s| {
            postal::validate_address(s, &postal::PostalValidatorConfig::default())
        }));
        let _ = registry.register(EntityType::Email, Box::new(validate_email));
        let _ = registry.register(EntityType::Phone, Box::new(validate_phone));
        registry
    }

    /// Registers a validator for an entity type.
    ///
    /// # Errors
    /// Fails if the entity type already has a validator.
    pub fn register(&mut self, entity_type: EntityType, validator: ValidatorFn) -> DetectResult<()> {
        if self.validators.contains_key(&entity_type) {
            return Err(DetectError::DuplicateValidator(entity_type.to_string()));
        }
        self.validators.insert(entity_type, validator);
        Ok(())
    }

    /// Runs the validator for an entity type, if one is registered.
    #[must_use]
    pub fn validate(&self, entity_type: EntityType, text: &str) -> Option<ValidatorReport> {
        self.validators.get(&entity_type).map(|v| v(text))
    }

    /// Returns true if a validator is registered for the type.
    #[must_use]
    pub fn has(&self, entity_type: EntityType) -> bool {
        self.validators.contains_key(&entity_type)
    }

    /// Clears all registrations. Test harness use only.
    pub fn reset(&mut self) {
        self.validators.clear();
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+|00)?[1-9][0-9 .\-/()]{6,18}[0-9]$").unwrap());

/// Validates an email address format.
#[must_use]
pub fn validate_email(text: &str) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }
    if EMAIL_RE.is_match(text.trim()) {
        ValidatorReport::valid(ValidatorConfidence::FormatValid)
    } else {
        ValidatorReport::invalid(ValidatorConfidence::InvalidFormat, "not an email address")
    }
}

/// Validates a phone number format (international or national notation).
#[must_use]
pub fn validate_phone(text: &str) -> ValidatorReport {
    if let Some(report) = length_guard(text) {
        return report;
    }
    let trimmed = text.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if !(7..=15).contains(&digits) {
        return ValidatorReport::invalid(
            ValidatorConfidence::InvalidFormat,
            format!("{digits} digits outside 7-15"),
        );
    }
    if PHONE_RE.is_match(trimmed) {
        ValidatorReport::valid(ValidatorConfidence::FormatValid)
    } else {
        ValidatorReport::invalid(ValidatorConfidence::InvalidFormat, "not a phone number")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_scale_ordering() {
        assert!(ValidatorConfidence::ChecksumValid > ValidatorConfidence::FormatValid);
        assert!(ValidatorConfidence::FormatValid > ValidatorConfidence::Standard);
        assert!(ValidatorConfidence::Standard > ValidatorConfidence::KnownValid);
        assert!(ValidatorConfidence::KnownValid > ValidatorConfidence::Moderate);
        assert!(ValidatorConfidence::Moderate > ValidatorConfidence::Weak);
        assert!(ValidatorConfidence::Weak > ValidatorConfidence::InvalidFormat);
        assert!(ValidatorConfidence::InvalidFormat > ValidatorConfidence::Failed);
        assert!(ValidatorConfidence::Failed > ValidatorConfidence::FalsePositive);
    }

    #[test]
    fn test_duplicate_validator_rejected() {
        let mut registry = ValidatorRegistry::builtin();
        let result = registry.register(EntityType::Email, Box::new(validate_email));
        assert!(matches!(result, Err(DetectError::DuplicateValidator(_))));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ValidatorRegistry::builtin();
        let report = registry.validate(EntityType::Email, "jane@example.ch").unwrap();
        assert!(report.is_valid);
        assert!(registry.validate(EntityType::Custom, "anything").is_none());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("jane.doe@example.ch").is_valid);
        assert!(!validate_email("not-an-email").is_valid);
    }

    #[test]
    fn test_phone() {
        assert!(validate_phone("+41 79 123 45 67").is_valid);
        assert!(validate_phone("044 123 45 67").is_valid);
        assert!(!validate_phone("12").is_valid);
    }

    #[test]
    fn test_length_ceiling_is_failure_not_panic() {
        let huge = "9".repeat(MAX_VALIDATOR_INPUT_LEN + 1);
        let report = validate_phone(&huge);
        assert!(!report.is_valid);
        assert_eq!(report.confidence, ValidatorConfidence::Failed);
    }
}
