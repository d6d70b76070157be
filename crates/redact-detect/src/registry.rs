//! Recognizer registry: the central catalogue of pattern recognizers.
//!
//! One broken pattern must never suppress detections from the others, so
//! `analyze` isolates every recognizer failure, records it, and carries on.

use crate::denylist::DenyList;
use crate::recognizer::{PatternRecognizer, RecognizerMatch};
use redact_core::EntityType;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{DetectError, DetectResult};

/// Default multiplier applied to weak-pattern and low-score-type matches.
pub const DEFAULT_LOW_CONFIDENCE_MULTIPLIER: f64 = 0.4;

/// A recorded failure from one recognizer during `analyze`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerError {
    /// Recognizer name.
    pub recognizer: String,
    /// Failure description.
    pub message: String,
}

/// Output of a registry analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    /// Accepted matches, ordered by recognizer priority then specificity.
    pub matches: Vec<RecognizerMatch>,
    /// Per-recognizer failures (the batch continued past them).
    pub errors: Vec<RecognizerError>,
    /// Total analysis duration in milliseconds.
    pub duration_ms: u64,
}

/// Central catalogue of all pattern recognizers.
pub struct RecognizerRegistry {
    recognizers: Vec<PatternRecognizer>,
    names: HashSet<String>,
    /// Multiplier for matches from weak patterns or de-rated entity types.
    pub low_confidence_multiplier: f64,
    /// Entity types whose matches are globally de-rated.
    pub low_score_entity_types: HashSet<EntityType>,
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognizerRegistry {
    /// Creates an empty registry with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            recognizers: Vec::new(),
            names: HashSet::new(),
            low_confidence_multiplier: DEFAULT_LOW_CONFIDENCE_MULTIPLIER,
            low_score_entity_types: HashSet::new(),
        }
    }

    /// Registers a recognizer.
    ///
    /// # Errors
    /// Fails if a recognizer with the same name is already registered.
    pub fn register(&mut self, recognizer: PatternRecognizer) -> DetectResult<()> {
        if !self.names.insert(recognizer.name.clone()) {
            return Err(DetectError::DuplicateName(recognizer.name.clone()));
        }
        self.recognizers.push(recognizer);
        Ok(())
    }

    /// Number of registered recognizers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recognizers.len()
    }

    /// Returns true if no recognizer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    fn guard_initialized(&self) -> DetectResult<()> {
        if self.recognizers.is_empty() {
            return Err(DetectError::NotInitialized);
        }
        Ok(())
    }

    /// All recognizers, sorted by priority descending, then specificity
    /// (country > region > global), then registration order.
    ///
    /// # Errors
    /// Fails with `NotInitialized` if no recognizer has been registered.
    pub fn get_all(&self) -> DetectResult<Vec<&PatternRecognizer>> {
        self.guard_initialized()?;
        let mut all: Vec<&PatternRecognizer> = self.recognizers.iter().collect();
        // Stable sort keeps registration order for residual ties.
        all.sort_by_key(|r| (Reverse(r.priority), Reverse(r.specificity)));
        Ok(all)
    }

    /// Recognizers supporting a country (case-insensitive).
    ///
    /// # Errors
    /// Fails with `NotInitialized` if no recognizer has been registered.
    pub fn get_by_country(&self, country: &str) -> DetectResult<Vec<&PatternRecognizer>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.supports_country(country))
            .collect())
    }

    /// Recognizers supporting a language (case-insensitive).
    ///
    /// # Errors
    /// Fails with `NotInitialized` if no recognizer has been registered.
    pub fn get_by_language(&self, language: &str) -> DetectResult<Vec<&PatternRecognizer>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.supports_language(language))
            .collect())
    }

    /// Recognizers producing a given entity type.
    ///
    /// # Errors
    /// Fails with `NotInitialized` if no recognizer has been registered.
    pub fn get_by_entity_type(&self, entity_type: EntityType) -> DetectResult<Vec<&PatternRecognizer>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.entity_types().contains(&entity_type))
            .collect())
    }

    /// Runs every recognizer applicable to the language and country.
    ///
    /// Individual recognizer failures are recorded in the output and do
    /// not abort the batch. When a deny-list is supplied, matches from
    /// recognizers that opted into the global deny-list are filtered.
    ///
    /// # Errors
    /// Fails with `NotInitialized` if no recognizer has been registered.
    pub fn analyze(
        &self,
        text: &str,
        language: &str,
        country: &str,
        denylist: Option<&DenyList>,
    ) -> DetectResult<AnalysisOutput> {
        self.guard_initialized()?;
        let started = Instant::now();
        let mut output = AnalysisOutput::default();

        for recognizer in self.get_all()? {
            if !recognizer.supports_language(language) || !recognizer.supports_country(country) {
                continue;
            }
            match recognizer.run(text) {
                Ok(matches) => {
                    for mut m in matches {
                        if recognizer.use_global_denylist {
                            if let Some(list) = denylist {
                                if list.is_denied(&m.text, m.entity_type, language) {
                                    continue;
                                }
                            }
                        }
                        if m.is_weak || self.low_score_entity_types.contains(&m.entity_type) {
                            m.score *= self.low_confidence_multiplier;
                        }
                        output.matches.push(m);
                    }
                }
                Err(e) => {
                    warn!(recognizer = %recognizer.name, error = %e, "recognizer failed");
                    output.errors.push(RecognizerError {
                        recognizer: recognizer.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        output.duration_ms = started.elapsed().as_millis() as u64;
        debug!(
            matches = output.matches.len(),
            errors = output.errors.len(),
            "registry analysis complete"
        );
        Ok(output)
    }

    /// Looks up a recognizer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PatternRecognizer> {
        self.recognizers.iter().find(|r| r.name == name)
    }

    /// Restores default configuration and clears all registrations.
    /// Test harness use only.
    pub fn reset(&mut self) {
        self.recognizers.clear();
        self.names.clear();
        self.low_confidence_multiplier = DEFAULT_LOW_CONFIDENCE_MULTIPLIER;
        self.low_score_entity_types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{PatternDefinition, Specificity};

    fn recognizer(name: &str, priority: i32, specificity: Specificity) -> PatternRecognizer {
        PatternRecognizer::builder(name)
            .priority(priority)
            .specificity(specificity)
            .pattern(PatternDefinition::new(r"\b\d{4}\b", 0.5, EntityType::Custom))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = RecognizerRegistry::new();
        registry.register(recognizer("a", 0, Specificity::Global)).unwrap();
        let err = registry.register(recognizer("a", 1, Specificity::Country)).unwrap_err();
        assert!(matches!(err, DetectError::DuplicateName(_)));
    }

    #[test]
    fn test_not_initialized_guard() {
        let registry = RecognizerRegistry::new();
        assert!(matches!(registry.get_all(), Err(DetectError::NotInitialized)));
        assert!(matches!(
            registry.get_by_country("ch"),
            Err(DetectError::NotInitialized)
        ));
        assert!(matches!(
            registry.analyze("text", "de", "ch", None),
            Err(DetectError::NotInitialized)
        ));
    }

    #[test]
    fn test_ordering_deterministic() {
        // Register in scrambled order; get_all must sort by priority desc,
        // then specificity country > region > global.
        let mut registry = RecognizerRegistry::new();
        registry.register(recognizer("global-low", 1, Specificity::Global)).unwrap();
        registry.register(recognizer("country-high", 5, Specificity::Country)).unwrap();
        registry.register(recognizer("global-high", 5, Specificity::Global)).unwrap();
        registry.register(recognizer("region-high", 5, Specificity::Region)).unwrap();

        let names: Vec<&str> = registry.get_all().unwrap().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["country-high", "region-high", "global-high", "global-low"]);
    }

    #[test]
    fn test_registration_order_breaks_residual_ties() {
        let mut registry = RecognizerRegistry::new();
        registry.register(recognizer("first", 3, Specificity::Global)).unwrap();
        registry.register(recognizer("second", 3, Specificity::Global)).unwrap();
        let names: Vec<&str> = registry.get_all().unwrap().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_country_beats_global_in_match_order() {
        let mut registry = RecognizerRegistry::new();
        let global = PatternRecognizer::builder("global-zip")
            .priority(2)
            .specificity(Specificity::Global)
            .pattern(PatternDefinition::new(r"\b\d{4}\b", 0.5, EntityType::PostalCode))
            .build()
            .unwrap();
        let country = PatternRecognizer::builder("swiss-zip")
            .priority(2)
            .specificity(Specificity::Country)
            .country("ch")
            .pattern(PatternDefinition::new(r"\b\d{4}\b", 0.7, EntityType::PostalCode))
            .build()
            .unwrap();
        registry.register(global).unwrap();
        registry.register(country).unwrap();

        let output = registry.analyze("8004 Zürich", "de", "ch", None).unwrap();
        assert_eq!(output.matches.len(), 2);
        assert_eq!(output.matches[0].recognizer, "swiss-zip");
        assert_eq!(output.matches[1].recognizer, "global-zip");
    }

    #[test]
    fn test_failure_isolation() {
        let mut registry = RecognizerRegistry::new();
        registry.register(recognizer("fine", 1, Specificity::Global)).unwrap();
        registry.register(recognizer("fine-too", 0, Specificity::Global)).unwrap();

        // Over-long input makes every recognizer fail individually; the
        // batch still completes and records each failure.
        let huge = "x".repeat(crate::recognizer::MAX_PATTERN_INPUT_LEN + 1);
        let output = registry.analyze(&huge, "de", "ch", None).unwrap();
        assert!(output.matches.is_empty());
        assert_eq!(output.errors.len(), 2);
    }

    #[test]
    fn test_weak_pattern_derated() {
        let mut registry = RecognizerRegistry::new();
        let weak = PatternRecognizer::builder("weak")
            .pattern(PatternDefinition::new(r"\b\d{4}\b", 0.8, EntityType::Custom).weak())
            .build()
            .unwrap();
        registry.register(weak).unwrap();

        let output = registry.analyze("1234", "de", "ch", None).unwrap();
        assert!((output.matches[0].score - 0.8 * DEFAULT_LOW_CONFIDENCE_MULTIPLIER).abs() < 1e-9);
    }

    #[test]
    fn test_low_score_entity_types() {
        let mut registry = RecognizerRegistry::new();
        registry.register(recognizer("custom", 0, Specificity::Global)).unwrap();
        registry.low_score_entity_types.insert(EntityType::Custom);

        let output = registry.analyze("1234", "de", "ch", None).unwrap();
        assert!((output.matches[0].score - 0.5 * DEFAULT_LOW_CONFIDENCE_MULTIPLIER).abs() < 1e-9);
    }

    #[test]
    fn test_global_denylist_hook() {
        use crate::denylist::{DenyList, DenyScope};

        let mut registry = RecognizerRegistry::new();
        let names = PatternRecognizer::builder("fr-names")
            .pattern(PatternDefinition::new(r"\b[A-Z][a-z]+\b", 0.6, EntityType::PersonName))
            .build()
            .unwrap();
        registry.register(names).unwrap();

        let mut denylist = DenyList::new();
        denylist.add_literal("Montant", DenyScope::EntityType(EntityType::PersonName));

        let output = registry
            .analyze("Montant: 1'234.50 pour Dupont", "fr", "ch", Some(&denylist))
            .unwrap();
        assert!(output.matches.iter().all(|m| m.text != "Montant"));
        assert!(output.matches.iter().any(|m| m.text == "Dupont"));
    }

    #[test]
    fn test_denylist_opt_out() {
        use crate::denylist::{DenyList, DenyScope};

        let mut registry = RecognizerRegistry::new();
        let names = PatternRecognizer::builder("raw-names")
            .without_global_denylist()
            .pattern(PatternDefinition::new(r"\b[A-Z][a-z]+\b", 0.6, EntityType::PersonName))
            .build()
            .unwrap();
        registry.register(names).unwrap();

        let mut denylist = DenyList::new();
        denylist.add_literal("Montant", DenyScope::EntityType(EntityType::PersonName));

        let output = registry
            .analyze("Montant dû", "fr", "ch", Some(&denylist))
            .unwrap();
        assert!(output.matches.iter().any(|m| m.text == "Montant"));
    }

    #[test]
    fn test_reset() {
        let mut registry = RecognizerRegistry::new();
        registry.register(recognizer("a", 0, Specificity::Global)).unwrap();
        registry.low_confidence_multiplier = 0.9;
        registry.reset();
        assert!(registry.is_empty());
        assert!((registry.low_confidence_multiplier - DEFAULT_LOW_CONFIDENCE_MULTIPLIER).abs() < 1e-9);
    }
}
