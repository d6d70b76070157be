//! Pattern recognizer framework.
//!
//! A recognizer bundles compiled patterns with the metadata the registry
//! needs to order and filter them: supported languages and countries, a
//! priority, a specificity tier, local deny patterns, local context words,
//! and an optional validator callback that re-checks raw matches.

use crate::context::ContextWord;
use crate::error::{DetectError, DetectResult};
use redact_core::EntityType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hard ceiling on the text length a single pattern is run against.
/// Longer inputs are rejected before any regex executes.
pub const MAX_PATTERN_INPUT_LEN: usize = 1_000_000;

/// Specificity tier, used only to break priority ties between recognizers.
/// `Country` beats `Region` beats `Global`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specificity {
    /// Applies everywhere.
    #[default]
    Global,
    /// Applies to a group of countries.
    Region,
    /// Applies to a single country.
    Country,
}

/// A single pattern owned by a recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Regular expression source.
    pub regex: String,
    /// Base confidence score for a raw match (0.0 - 1.0).
    pub score: f64,
    /// Entity type this pattern detects.
    pub entity_type: EntityType,
    /// Weak patterns are globally de-rated by the registry.
    #[serde(default)]
    pub is_weak: bool,
    /// Free-text name for diagnostics.
    #[serde(default)]
    pub name: Option<String>,
}

impl PatternDefinition {
    /// Creates a new pattern definition.
    pub fn new(regex: impl Into<String>, score: f64, entity_type: EntityType) -> Self {
        Self {
            regex: regex.into(),
            score: score.clamp(0.0, 1.0),
            entity_type,
            is_weak: false,
            name: None,
        }
    }

    /// Marks the pattern as weak.
    #[must_use]
    pub fn weak(mut self) -> Self {
        self.is_weak = true;
        self
    }

    /// Sets a diagnostic name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A compiled pattern ready for matching.
struct CompiledPattern {
    definition: PatternDefinition,
    regex: Regex,
}

/// Validator callback re-checking a raw match before it is accepted.
pub type MatchValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A raw match proposed by a recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerMatch {
    /// Recognizer that produced the match.
    pub recognizer: String,
    /// Entity type detected.
    pub entity_type: EntityType,
    /// Start offset in the analyzed text.
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Matched text.
    pub text: String,
    /// Base score from the pattern definition.
    pub score: f64,
    /// Carried over from the pattern's weak flag.
    pub is_weak: bool,
}

/// A named bundle of compiled patterns plus matching metadata.
pub struct PatternRecognizer {
    /// Unique recognizer name.
    pub name: String,
    /// Supported languages (lowercase; empty = all).
    pub languages: Vec<String>,
    /// Supported countries (lowercase; empty = all).
    pub countries: Vec<String>,
    /// Priority (higher wins ties between overlapping recognizers).
    pub priority: i32,
    /// Specificity tier, breaking priority ties.
    pub specificity: Specificity,
    /// Recognizer-local deny literals, matched case-insensitively.
    pub deny_patterns: Vec<String>,
    /// Recognizer-local deny regexes, matched against the whole candidate.
    deny_regexes: Vec<Regex>,
    /// Recognizer-local context words.
    pub context_words: Vec<ContextWord>,
    /// Whether the global deny-list is consulted for this recognizer.
    pub use_global_denylist: bool,
    /// Whether the global context-word database is consulted.
    pub use_global_context: bool,
    patterns: Vec<CompiledPattern>,
    validator: Option<MatchValidator>,
}

impl fmt::Debug for PatternRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRecognizer")
            .field("name", &self.name)
            .field("languages", &self.languages)
            .field("countries", &self.countries)
            .field("priority", &self.priority)
            .field("specificity", &self.specificity)
            .field("patterns", &self.patterns.len())
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl PatternRecognizer {
    /// Creates a recognizer builder.
    pub fn builder(name: impl Into<String>) -> RecognizerBuilder {
        RecognizerBuilder::new(name)
    }

    /// Returns true if the recognizer supports the language
    /// (case-insensitive; an empty list supports every language).
    #[must_use]
    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.is_empty()
            || self
                .languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(language))
    }

    /// Returns true if the recognizer supports the country.
    #[must_use]
    pub fn supports_country(&self, country: &str) -> bool {
        self.countries.is_empty()
            || self
                .countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(country))
    }

    /// Returns the entity types this recognizer can produce.
    #[must_use]
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self
            .patterns
            .iter()
            .map(|p| p.definition.entity_type)
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Runs all patterns against the text and returns accepted matches.
    ///
    /// Local deny patterns and the validator callback are applied here;
    /// global deny-list and context hooks are the registry's concern.
    ///
    /// # Errors
    /// Fails when the input exceeds the pattern input ceiling.
    pub fn run(&self, text: &str) -> DetectResult<Vec<RecognizerMatch>> {
        if text.len() > MAX_PATTERN_INPUT_LEN {
            return Err(DetectError::RecognizerFailed {
                name: self.name.clone(),
                message: format!(
                    "input length {} exceeds ceiling {}",
                    text.len(),
                    MAX_PATTERN_INPUT_LEN
                ),
            });
        }

        let mut matches = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                let matched = m.as_str();
                if self.is_locally_denied(matched) {
                    continue;
                }
                if let Some(validator) = &self.validator {
                    if !validator(matched) {
                        continue;
                    }
                }
                matches.push(RecognizerMatch {
                    recognizer: self.name.clone(),
                    entity_type: pattern.definition.entity_type,
                    start: m.start(),
                    end: m.end(),
                    text: matched.to_string(),
                    score: pattern.definition.score,
                    is_weak: pattern.definition.is_weak,
                });
            }
        }
        Ok(matches)
    }

    fn is_locally_denied(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.deny_patterns
            .iter()
            .any(|d| d.eq_ignore_ascii_case(trimmed))
            || self.deny_regexes.iter().any(|r| r.is_match(trimmed))
    }
}

/// Builder for `PatternRecognizer`.
pub struct RecognizerBuilder {
    name: String,
    languages: Vec<String>,
    countries: Vec<String>,
    priority: i32,
    specificity: Specificity,
    deny_patterns: Vec<String>,
    deny_regex_sources: Vec<String>,
    context_words: Vec<ContextWord>,
    use_global_denylist: bool,
    use_global_context: bool,
    definitions: Vec<PatternDefinition>,
    validator: Option<MatchValidator>,
}

impl RecognizerBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            languages: Vec::new(),
            countries: Vec::new(),
            priority: 0,
            specificity: Specificity::Global,
            deny_patterns: Vec::new(),
            deny_regex_sources: Vec::new(),
            context_words: Vec::new(),
            use_global_denylist: true,
            use_global_context: true,
            definitions: Vec::new(),
            validator: None,
        }
    }

    /// Adds a supported language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into().to_lowercase());
        self
    }

    /// Adds a supported country.
    #[must_use]
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.countries.push(country.into().to_lowercase());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the specificity tier.
    #[must_use]
    pub fn specificity(mut self, specificity: Specificity) -> Self {
        self.specificity = specificity;
        self
    }

    /// Adds a pattern definition.
    #[must_use]
    pub fn pattern(mut self, definition: PatternDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Adds a local deny literal.
    #[must_use]
    pub fn deny(mut self, literal: impl Into<String>) -> Self {
        self.deny_patterns.push(literal.into());
        self
    }

    /// Adds a local deny regex. The pattern is anchored to the whole
    /// candidate and made case-insensitive.
    #[must_use]
    pub fn deny_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.deny_regex_sources.push(pattern.into());
        self
    }

    /// Adds a local context word.
    #[must_use]
    pub fn context_word(mut self, word: ContextWord) -> Self {
        self.context_words.push(word);
        self
    }

    /// Opts out of the global deny-list.
    #[must_use]
    pub fn without_global_denylist(mut self) -> Self {
        self.use_global_denylist = false;
        self
    }

    /// Opts out of the global context-word database.
    #[must_use]
    pub fn without_global_context(mut self) -> Self {
        self.use_global_context = false;
        self
    }

    /// Sets the validator callback.
    #[must_use]
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Compiles all patterns and builds the recognizer.
    ///
    /// # Errors
    /// Fails if any pattern does not compile.
    pub fn build(self) -> DetectResult<PatternRecognizer> {
        let mut patterns = Vec::with_capacity(self.definitions.len());
        for definition in self.definitions {
            let regex = Regex::new(&definition.regex).map_err(|e| {
                DetectError::PatternCompilation(format!(
                    "recognizer '{}', pattern '{}': {e}",
                    self.name,
                    definition.name.as_deref().unwrap_or(&definition.regex),
                ))
            })?;
            patterns.push(CompiledPattern { definition, regex });
        }
        let mut deny_regexes = Vec::with_capacity(self.deny_regex_sources.len());
        for source in &self.deny_regex_sources {
            let regex = Regex::new(&format!("(?i)^{source}$")).map_err(|e| {
                DetectError::PatternCompilation(format!(
                    "recognizer '{}', deny pattern '{source}': {e}",
                    self.name,
                ))
            })?;
            deny_regexes.push(regex);
        }
        Ok(PatternRecognizer {
            name: self.name,
            languages: self.languages,
            countries: self.countries,
            priority: self.priority,
            specificity: self.specificity,
            deny_patterns: self.deny_patterns,
            deny_regexes,
            context_words: self.context_words,
            use_global_denylist: self.use_global_denylist,
            use_global_context: self.use_global_context,
            patterns,
            validator: self.validator,
        })
    }
}
