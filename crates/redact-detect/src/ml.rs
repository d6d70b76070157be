//! ML collaborator contract.
//!
//! The token-classification model is a black box behind this trait:
//! text in, scored token spans out. The pipeline tolerates empty or
//! failed results by proceeding with rule-based detections only.

use redact_core::EntityType;
use serde::{Deserialize, Serialize};

/// A scored token span produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSpan {
    /// Model label (e.g. `PER`, `ORG`, `LOC`).
    pub label: String,
    /// Token text.
    pub text: String,
    /// Start character offset.
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// Model score (0.0 - 1.0).
    pub score: f64,
}

/// Token-classification collaborator.
pub trait TokenClassifier: Send + Sync {
    /// Returns the classifier name, for diagnostics.
    fn name(&self) -> &str;

    /// Classifies the text into scored token spans.
    ///
    /// # Errors
    /// Implementations may fail; the pipeline degrades to rule-only
    /// detection and records the error in pass metadata.
    fn classify(&self, text: &str) -> Result<Vec<TokenSpan>, String>;
}

/// Classifier that produces no spans. Used when no model is configured
/// and by the test harness.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClassifier;

impl TokenClassifier for NullClassifier {
    fn name(&self) -> &str {
        "null"
    }

    fn classify(&self, _text: &str) -> Result<Vec<TokenSpan>, String> {
        Ok(Vec::new())
    }
}

/// Maps a model label onto an entity type. Unknown labels fall back to
/// `Custom` so they stay visible for review rather than vanishing.
#[must_use]
pub fn entity_type_for_label(label: &str) -> EntityType {
    match label.to_ascii_uppercase().as_str() {
        "PER" | "PERSON" | "B-PER" | "I-PER" => EntityType::PersonName,
        "ORG" | "ORGANIZATION" | "B-ORG" | "I-ORG" => EntityType::Organization,
        "LOC" | "LOCATION" | "B-LOC" | "I-LOC" => EntityType::City,
        "ADDRESS" => EntityType::Address,
        "DATE" => EntityType::Date,
        "PHONE" => EntityType::Phone,
        "EMAIL" => EntityType::Email,
        "IBAN" | "BANK_ACCOUNT" => EntityType::BankAccount,
        _ => EntityType::Custom,
    }
}
