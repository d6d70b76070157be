//! Document-type classification and confidence boosting.
//!
//! The document class is derived from document-level keyword signals; a
//! per-type boost table then raises confidence for the entity types that
//! class typically carries. Classification below the threshold falls back
//! to `Unknown`, which applies no boosts and never blocks the pipeline.

use once_cell::sync::Lazy;
use redact_core::{DocumentType, Entity, EntityType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum classification score; below it the type is `Unknown`.
    pub threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { threshold: 0.25 }
    }
}

/// Keyword signals per document type, lowercase.
static SIGNALS: Lazy<Vec<(DocumentType, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            DocumentType::Invoice,
            vec![
                "rechnung", "facture", "fattura", "invoice", "mwst", "tva", "zahlbar bis",
                "betrag", "montant", "total", "zahlungsfrist", "rechnungsnummer",
            ],
        ),
        (
            DocumentType::Letter,
            vec![
                "sehr geehrte", "sehr geehrter", "madame", "monsieur", "dear",
                "freundliche grüsse", "meilleures salutations", "mit freundlichen",
                "cordialement",
            ],
        ),
        (
            DocumentType::Contract,
            vec![
                "vertrag", "contrat", "contract", "contratto", "parteien", "parties",
                "vereinbarung", "unterzeichnet", "kündigungsfrist", "artikel",
            ],
        ),
        (
            DocumentType::Form,
            vec![
                "formular", "formulaire", "modulo", "bitte ausfüllen", "zutreffendes",
                "ankreuzen", "antragsteller",
            ],
        ),
        (
            DocumentType::Report,
            vec![
                "bericht", "rapport", "report", "zusammenfassung", "auswertung",
                "jahresbericht", "quartal",
            ],
        ),
    ]
});

/// Per-document-type confidence boosts by entity type.
static BOOSTS: Lazy<HashMap<DocumentType, HashMap<EntityType, f64>>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        DocumentType::Invoice,
        HashMap::from([
            (EntityType::BankAccount, 0.10),
            (EntityType::VatId, 0.10),
            (EntityType::PaymentReference, 0.10),
            (EntityType::InvoiceNumber, 0.10),
            (EntityType::Amount, 0.05),
        ]),
    );
    table.insert(
        DocumentType::Letter,
        HashMap::from([
            (EntityType::PersonName, 0.10),
            (EntityType::Address, 0.10),
            (EntityType::Date, 0.05),
        ]),
    );
    table.insert(
        DocumentType::Contract,
        HashMap::from([
            (EntityType::PersonName, 0.10),
            (EntityType::Organization, 0.10),
            (EntityType::Date, 0.05),
            (EntityType::ContractNumber, 0.10),
        ]),
    );
    table.insert(
        DocumentType::Form,
        HashMap::from([
            (EntityType::PersonName, 0.05),
            (EntityType::SocialInsuranceNumber, 0.10),
            (EntityType::DateOfBirth, 0.10),
        ]),
    );
    table.insert(
        DocumentType::Report,
        HashMap::from([(EntityType::Organization, 0.05), (EntityType::Amount, 0.05)]),
    );
    table
});

/// Classification outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Document type, `Unknown` when below the threshold.
    pub document_type: DocumentType,
    /// Normalized signal score (0.0 - 1.0).
    pub score: f64,
}

/// Keyword-signal document classifier.
#[derive(Debug, Clone, Default)]
pub struct DocumentClassifier {
    config: ClassifierConfig,
}

impl DocumentClassifier {
    /// Creates a classifier with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates with custom configuration.
    #[must_use]
    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classifies the document from keyword signals.
    #[must_use]
    pub fn classify(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        let mut best = (DocumentType::Unknown, 0usize);
        for (doc_type, keywords) in SIGNALS.iter() {
            let hits = keywords.iter().filter(|kw| lower.contains(*kw)).count();
            if hits > best.1 {
                best = (*doc_type, hits);
            }
        }

        // Two keyword families saturate the score; one hit alone sits at 0.33.
        let score = best.1 as f64 / (best.1 as f64 + 2.0);
        if score < self.config.threshold {
            return Classification {
                document_type: DocumentType::Unknown,
                score,
            };
        }
        Classification {
            document_type: best.0,
            score,
        }
    }

    /// Applies the boost table for the document type to the entity list.
    /// Returns the number of entities boosted.
    pub fn apply_boosts(&self, entities: &mut [Entity], document_type: DocumentType) -> usize {
        let Some(boosts) = BOOSTS.get(&document_type) else {
            return 0;
        };
        let mut boosted = 0;
        for entity in entities.iter_mut() {
            if let Some(&delta) = boosts.get(&entity.entity_type) {
                entity.adjust_confidence(delta);
                boosted += 1;
            }
        }
        boosted
    }
}
