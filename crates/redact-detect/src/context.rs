//! Context-driven confidence adjustment.
//!
//! Words found near a candidate span raise or lower its confidence.
//! Labels usually precede values ("Name: John"), so preceding-context
//! matches are weighted higher than following-context matches.

use redact_core::{ContextScore, Entity, EntityType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Polarity of a context word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Raises confidence.
    Positive,
    /// Suppresses confidence (e.g. a company-legal-suffix near a person name).
    Negative,
}

/// A weighted, polarity-tagged context word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWord {
    /// Word or phrase, matched case-insensitively.
    pub word: String,
    /// Weight (0.0 - 1.0).
    pub weight: f64,
    /// Polarity.
    pub polarity: Polarity,
}

impl ContextWord {
    /// Creates a positive context word.
    pub fn positive(word: impl Into<String>, weight: f64) -> Self {
        Self {
            word: word.into(),
            weight: weight.clamp(0.0, 1.0),
            polarity: Polarity::Positive,
        }
    }

    /// Creates a negative context word.
    pub fn negative(word: impl Into<String>, weight: f64) -> Self {
        Self {
            word: word.into(),
            weight: weight.clamp(0.0, 1.0),
            polarity: Polarity::Negative,
        }
    }
}

/// Context word database, organized by entity type then language.
#[derive(Debug, Clone, Default)]
pub struct ContextWordDb {
    words: HashMap<EntityType, HashMap<String, Vec<ContextWord>>>,
}

impl ContextWordDb {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in vocabulary for the supported languages.
    #[must_use]
    pub fn builtin() -> Self {
        let mut db = Self::new();

        // Person names
        for (lang, words) in [
            ("de", vec!["name", "herr", "frau", "vorname", "nachname"]),
            ("fr", vec!["nom", "prénom", "monsieur", "madame"]),
            ("en", vec!["name", "mr", "mrs", "ms", "dear"]),
            ("it", vec!["nome", "cognome", "signor", "signora"]),
        ] {
            for w in words {
                db.add(EntityType::PersonName, lang, ContextWord::positive(w, 0.8));
            }
        }
        // Legal suffixes near a "person name" usually mean an organization.
        for lang in ["de", "fr", "en", "it"] {
            for suffix in ["ag", "gmbh", "sa", "sàrl", "ltd", "inc"] {
                db.add(EntityType::PersonName, lang, ContextWord::negative(suffix, 0.7));
            }
        }

        // Bank accounts
        for (lang, words) in [
            ("de", vec!["iban", "konto", "kontonummer", "bank", "zahlung"]),
            ("fr", vec!["iban", "compte", "banque", "paiement", "versement"]),
            ("en", vec!["iban", "account", "bank", "payment"]),
            ("it", vec!["iban", "conto", "banca", "pagamento"]),
        ] {
            for w in words {
                db.add(EntityType::BankAccount, lang, ContextWord::positive(w, 0.9));
            }
        }

        // Social insurance numbers
        for (lang, words) in [
            ("de", vec!["ahv", "versichertennummer", "sozialversicherung"]),
            ("fr", vec!["avs", "assurance", "numéro d'assuré"]),
            ("en", vec!["social insurance", "insurance number"]),
            ("it", vec!["avs", "assicurazione"]),
        ] {
            for w in words {
                db.add(
                    EntityType::SocialInsuranceNumber,
                    lang,
                    ContextWord::positive(w, 0.9),
                );
            }
        }

        // VAT ids
        for (lang, words) in [
            ("de", vec!["mwst", "uid", "mehrwertsteuer"]),
            ("fr", vec!["tva", "ide"]),
            ("en", vec!["vat", "uid"]),
            ("it", vec!["iva", "idi"]),
        ] {
            for w in words {
                db.add(EntityType::VatId, lang, ContextWord::positive(w, 0.85));
            }
        }

        // Phones
        for (lang, words) in [
            ("de", vec!["tel", "telefon", "mobile", "natel", "fax"]),
            ("fr", vec!["tél", "téléphone", "portable", "fax"]),
            ("en", vec!["tel", "phone", "mobile", "fax"]),
            ("it", vec!["tel", "telefono", "cellulare", "fax"]),
        ] {
            for w in words {
                db.add(EntityType::Phone, lang, ContextWord::positive(w, 0.8));
            }
        }

        // Dates
        for (lang, words) in [
            ("de", vec!["datum", "geboren", "geburtsdatum", "am"]),
            ("fr", vec!["date", "né le", "née le"]),
            ("en", vec!["date", "born", "dated"]),
            ("it", vec!["data", "nato il", "nata il"]),
        ] {
            for w in words {
                db.add(EntityType::Date, lang, ContextWord::positive(w, 0.6));
            }
        }

        // Addresses
        for (lang, words) in [
            ("de", vec!["adresse", "wohnhaft", "strasse"]),
            ("fr", vec!["adresse", "domicilié", "rue"]),
            ("en", vec!["address", "street", "residing"]),
            ("it", vec!["indirizzo", "via", "residente"]),
        ] {
            for w in words {
                db.add(EntityType::Address, lang, ContextWord::positive(w, 0.7));
            }
        }

        db
    }

    /// Adds a context word for a type and language.
    pub fn add(&mut self, entity_type: EntityType, language: impl Into<String>, word: ContextWord) {
        self.words
            .entry(entity_type)
            .or_default()
            .entry(language.into().to_lowercase())
            .or_default()
            .push(word);
    }

    /// Returns the words for a type and language (case-insensitive language).
    #[must_use]
    pub fn words_for(&self, entity_type: EntityType, language: &str) -> &[ContextWord] {
        self.words
            .get(&entity_type)
            .and_then(|by_lang| by_lang.get(&language.to_lowercase()))
            .map_or(&[], Vec::as_slice)
    }

    /// Clears all words. Test harness use only.
    pub fn reset(&mut self) {
        self.words.clear();
    }
}

/// Context enhancer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancerConfig {
    /// Default window size in characters, each side of the span.
    pub default_window: usize,
    /// Type-specific window overrides.
    pub window_overrides: HashMap<EntityType, usize>,
    /// Weight multiplier for context found before the span.
    pub preceding_multiplier: f64,
    /// Weight multiplier for context found after the span.
    pub following_multiplier: f64,
    /// Maximum confidence gain from positive context.
    pub similarity_factor: f64,
    /// Confidence floor applied when any positive context is found.
    pub min_score_with_context: f64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        let mut window_overrides = HashMap::new();
        // Names carry wider labels ("Sehr geehrter Herr ..."); bank codes sit
        // right next to their labels.
        window_overrides.insert(EntityType::PersonName, 60);
        window_overrides.insert(EntityType::Organization, 60);
        window_overrides.insert(EntityType::BankAccount, 25);
        window_overrides.insert(EntityType::VatId, 25);
        window_overrides.insert(EntityType::SocialInsuranceNumber, 30);
        Self {
            default_window: 40,
            window_overrides,
            preceding_multiplier: 1.2,
            following_multiplier: 0.8,
            similarity_factor: 0.35,
            min_score_with_context: 0.4,
        }
    }
}

/// Adjusts candidate confidence using nearby vocabulary.
#[derive(Debug, Clone, Default)]
pub struct ContextEnhancer {
    config: EnhancerConfig,
}

impl ContextEnhancer {
    /// Creates an enhancer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EnhancerConfig::default(),
        }
    }

    /// Creates with custom configuration.
    #[must_use]
    pub fn with_config(config: EnhancerConfig) -> Self {
        Self { config }
    }

    /// Adjusts the entity's confidence in place using the supplied word
    /// list. No match leaves the confidence unchanged; this component only
    /// adjusts, never rejects.
    pub fn enhance(&self, entity: &mut Entity, text: &str, words: &[ContextWord]) {
        if words.is_empty() {
            return;
        }

        let window = self
            .config
            .window_overrides
            .get(&entity.entity_type)
            .copied()
            .unwrap_or(self.config.default_window);

        let before = window_before(text, entity.start, window).to_lowercase();
        let after = window_after(text, entity.end, window).to_lowercase();

        let mut positive = 0.0_f64;
        let mut negative = 0.0_f64;
        let mut factors = Vec::new();

        for word in words {
            let needle = word.word.to_lowercase();
            let directional = if before.contains(&needle) {
                Some(word.weight * self.config.preceding_multiplier)
            } else if after.contains(&needle) {
                Some(word.weight * self.config.following_multiplier)
            } else {
                None
            };
            let Some(weight) = directional else { continue };
            factors.push(word.word.clone());
            match word.polarity {
                Polarity::Positive => positive = positive.max(weight),
                Polarity::Negative => negative = negative.max(weight),
            }
        }

        if factors.is_empty() {
            return;
        }

        let before_confidence = entity.confidence;
        if positive > 0.0 {
            let gain = (positive.min(1.0)) * self.config.similarity_factor;
            entity.adjust_confidence(gain);
            if entity.confidence < self.config.min_score_with_context {
                entity.confidence = self.config.min_score_with_context;
            }
        }
        if negative > 0.0 {
            let loss = (negative.min(1.0)) * self.config.similarity_factor;
            entity.adjust_confidence(-loss);
        }

        entity.context = Some(ContextScore {
            adjustment: entity.confidence - before_confidence,
            factors,
        });
    }
}

fn window_before(text: &str, start: usize, window: usize) -> &str {
    let mut from = start.saturating_sub(window);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    &text[from..start]
}

fn window_after(text: &str, end: usize, window: usize) -> &str {
    let mut to = (end + window).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    &text[end..to]
}
