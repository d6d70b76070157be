//! Built-in recognizer set.
//!
//! Covers the identifiers seen in Swiss business documents: IBAN,
//! social-insurance number, VAT/UID number, phone, email, dates, amounts,
//! and address components. Custom recognizers loaded from configuration
//! sit alongside these in the same registry.

use crate::error::DetectResult;
use crate::recognizer::{PatternDefinition, PatternRecognizer, Specificity};
use crate::registry::RecognizerRegistry;
use crate::validators::bank::validate_iban;
use crate::validators::social::validate_social_insurance;
use redact_core::EntityType;

/// Registers the built-in recognizers. Returns how many were added.
///
/// # Errors
/// Fails on a name collision with an already-registered recognizer.
pub fn register_builtin(registry: &mut RecognizerRegistry) -> DetectResult<usize> {
    let recognizers = vec![
        iban_recognizer()?,
        social_insurance_recognizer()?,
        vat_recognizer()?,
        phone_recognizer()?,
        email_recognizer()?,
        date_recognizer()?,
        amount_recognizer()?,
        address_component_recognizer()?,
    ];
    let count = recognizers.len();
    for recognizer in recognizers {
        registry.register(recognizer)?;
    }
    Ok(count)
}

fn iban_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("ch-iban")
        .country("ch")
        .country("li")
        .specificity(Specificity::Country)
        .priority(10)
        .pattern(PatternDefinition::new(
            r"\b(?:CH|LI)\d{2}(?:\s?[0-9A-Za-z]{4}){4}\s?[0-9A-Za-z]\b",
            0.85,
            EntityType::BankAccount,
        ))
        // The checksum gate keeps random 21-character strings out early;
        // the validation pass re-checks and records the outcome.
        .validator(|s| validate_iban(s).is_valid)
        .build()
}

fn social_insurance_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("ch-ahv")
        .country("ch")
        .specificity(Specificity::Country)
        .priority(10)
        .pattern(PatternDefinition::new(
            r"\b756\.\d{4}\.\d{4}\.\d{2}\b",
            0.9,
            EntityType::SocialInsuranceNumber,
        ))
        .pattern(
            PatternDefinition::new(r"\b756\d{10}\b", 0.7, EntityType::SocialInsuranceNumber)
                .named("unformatted"),
        )
        .validator(|s| validate_social_insurance(s).is_valid)
        .build()
}

fn vat_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("ch-vat")
        .country("ch")
        .specificity(Specificity::Country)
        .priority(10)
        .pattern(PatternDefinition::new(
            r"\bCHE-?\d{3}\.\d{3}\.\d{3}(?:\s?(?:MWST|TVA|IVA))?\b",
            0.9,
            EntityType::VatId,
        ))
        .build()
}

fn phone_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("ch-phone")
        .country("ch")
        .specificity(Specificity::Country)
        .priority(5)
        .pattern(PatternDefinition::new(
            r"(?:\+41|0041|\b0)\s?\d{2}\s?\d{3}\s?\d{2}\s?\d{2}\b",
            0.75,
            EntityType::Phone,
        ))
        .build()
}

fn email_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("email")
        .specificity(Specificity::Global)
        .priority(5)
        .pattern(PatternDefinition::new(
            r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b",
            0.95,
            EntityType::Email,
        ))
        .build()
}

fn date_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("numeric-date")
        .specificity(Specificity::Global)
        .priority(1)
        .pattern(PatternDefinition::new(
            r"\b\d{1,2}[./-]\d{1,2}[./-]\d{4}\b",
            0.6,
            EntityType::Date,
        ))
        .build()
}

fn amount_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("chf-amount")
        .country("ch")
        .specificity(Specificity::Country)
        .priority(1)
        .pattern(PatternDefinition::new(
            r"\b(?:CHF|Fr\.|EUR)\s?\d[\d']*(?:\.\d{2})?\b",
            0.7,
            EntityType::Amount,
        ))
        .build()
}

/// Street names and postal codes. Both weak; the address linker and the
/// postal disambiguation tables decide what survives.
fn address_component_recognizer() -> DetectResult<PatternRecognizer> {
    PatternRecognizer::builder("ch-address-components")
        .country("ch")
        .specificity(Specificity::Country)
        .priority(2)
        .pattern(PatternDefinition::new(
            r"\b[A-ZÄÖÜ][a-zäöüé]+(?:strasse|gasse|weg|platz|allee|rain|halde)\b",
            0.7,
            EntityType::StreetName,
        ))
        .pattern(
            PatternDefinition::new(r"\b[1-9]\d{3}\b", 0.5, EntityType::PostalCode).weak(),
        )
        .build()
}
