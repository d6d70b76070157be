//! Detection configuration.
//!
//! Two layers: [`DetectionConfig`] carries the runtime tunables for one
//! pipeline instance, and [`RecognizerConfigFile`] is the versioned,
//! serializable format for loading custom recognizers. Loading validates
//! every definition and reports all violations at once instead of failing
//! on the first.

use crate::context::{ContextWord, Polarity};
use crate::error::{ConfigViolation, DetectError, DetectResult};
use crate::recognizer::{PatternDefinition, PatternRecognizer, Specificity};
use crate::registry::{RecognizerRegistry, DEFAULT_LOW_CONFIDENCE_MULTIPLIER};
use redact_core::{DocumentType, EntityType};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Config format versions this build can load.
pub const SUPPORTED_CONFIG_VERSIONS: &[u32] = &[1];

/// Runtime tunables for a detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Language hint (ISO 639-1) for context words and recognizers.
    pub language: String,
    /// Country hint (ISO 3166-1 alpha-2) for recognizer selection.
    pub country: String,
    /// Minimum model score for a token span to become an entity.
    pub ml_score_threshold: f64,
    /// Entities below this confidence are flagged for human review.
    pub review_threshold: f64,
    /// Multiplier for weak patterns and low-score entity types.
    pub low_confidence_multiplier: f64,
    /// Overrides document classification when set.
    pub document_type_override: Option<DocumentType>,
    /// Entity types expected in this document, from upstream hints
    /// (e.g. spreadsheet column headers). Boosts matching detections.
    pub expected_entity_types: Vec<EntityType>,
    /// Per-pass enable flags.
    pub passes: PassToggles,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            language: "de".to_string(),
            country: "CH".to_string(),
            ml_score_threshold: 0.5,
            review_threshold: 0.75,
            low_confidence_multiplier: DEFAULT_LOW_CONFIDENCE_MULTIPLIER,
            document_type_override: None,
            expected_entity_types: Vec::new(),
            passes: PassToggles::default(),
        }
    }
}

/// Enable flags for the optional pipeline passes. The high-recall and
/// consolidation passes always run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassToggles {
    /// Deny-list suppression.
    pub denylist: bool,
    /// Format and checksum validation.
    pub validation: bool,
    /// Context-word confidence scoring.
    pub context: bool,
    /// Address-component linking.
    pub address: bool,
    /// Document-type classification and boosting.
    pub doctype: bool,
}

impl Default for PassToggles {
    fn default() -> Self {
        Self {
            denylist: true,
            validation: true,
            context: true,
            address: true,
            doctype: true,
        }
    }
}

/// Versioned recognizer configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfigFile {
    /// Format version; must be one of [`SUPPORTED_CONFIG_VERSIONS`].
    pub version: u32,
    /// Recognizer definitions.
    pub recognizers: Vec<RecognizerDefinition>,
}

/// One recognizer definition in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerDefinition {
    /// Unique recognizer name.
    pub name: String,
    /// Pattern definitions.
    pub patterns: Vec<PatternEntry>,
    /// Supported languages; empty means all.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Supported countries; empty means all.
    #[serde(default)]
    pub countries: Vec<String>,
    /// Ordering priority.
    #[serde(default)]
    pub priority: i32,
    /// Geographic specificity.
    #[serde(default)]
    pub specificity: Specificity,
    /// Literal deny terms local to this recognizer.
    #[serde(default)]
    pub deny: Vec<String>,
    /// Regex deny terms local to this recognizer, anchored to the whole
    /// candidate.
    #[serde(default)]
    pub deny_patterns: Vec<String>,
    /// Context words local to this recognizer.
    #[serde(default)]
    pub context_words: Vec<ContextWordEntry>,
    /// Whether the global deny-list applies to this recognizer's matches.
    #[serde(default = "default_true")]
    pub use_global_denylist: bool,
    /// Whether the global context-word database applies.
    #[serde(default = "default_true")]
    pub use_global_context: bool,
}

/// One context word in a recognizer definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextWordEntry {
    /// Word or phrase, matched case-insensitively.
    pub word: String,
    /// Weight (0.0 - 1.0).
    #[serde(default = "default_context_weight")]
    pub weight: f64,
    /// Positive words raise confidence, negative words suppress it.
    #[serde(default = "default_polarity")]
    pub polarity: Polarity,
}

const fn default_true() -> bool {
    true
}

const fn default_context_weight() -> f64 {
    0.8
}

const fn default_polarity() -> Polarity {
    Polarity::Positive
}

/// One pattern inside a recognizer definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Regex source.
    pub regex: String,
    /// Base confidence score (0.0 - 1.0).
    pub score: f64,
    /// Entity type this pattern detects.
    pub entity_type: EntityType,
    /// Weak patterns need context support to keep their score.
    #[serde(default)]
    pub is_weak: bool,
}

impl RecognizerConfigFile {
    /// Parses a config file from JSON.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when the JSON is malformed.
    pub fn from_json(json: &str) -> DetectResult<Self> {
        serde_json::from_str(json).map_err(|e| DetectError::InvalidConfig(e.to_string()))
    }

    /// Validates every definition, collecting all violations.
    #[must_use]
    pub fn violations(&self) -> Vec<ConfigViolation> {
        let mut violations = Vec::new();
        if !SUPPORTED_CONFIG_VERSIONS.contains(&self.version) {
            violations.push(ConfigViolation {
                index: 0,
                field: "version".to_string(),
                message: format!(
                    "unsupported version {}, supported: {SUPPORTED_CONFIG_VERSIONS:?}",
                    self.version
                ),
            });
        }
        for (index, def) in self.recognizers.iter().enumerate() {
            if def.name.trim().is_empty() {
                violations.push(ConfigViolation {
                    index,
                    field: "name".to_string(),
                    message: "recognizer name must not be empty".to_string(),
                });
            }
            if def.patterns.is_empty() {
                violations.push(ConfigViolation {
                    index,
                    field: "patterns".to_string(),
                    message: "recognizer must define at least one pattern".to_string(),
                });
            }
            for (p, pattern) in def.patterns.iter().enumerate() {
                if let Err(e) = regex::Regex::new(&pattern.regex) {
                    violations.push(ConfigViolation {
                        index,
                        field: format!("patterns[{p}].regex"),
                        message: e.to_string(),
                    });
                }
                if !(0.0..=1.0).contains(&pattern.score) {
                    violations.push(ConfigViolation {
                        index,
                        field: format!("patterns[{p}].score"),
                        message: format!("score {} outside 0.0-1.0", pattern.score),
                    });
                }
            }
            for (d, pattern) in def.deny_patterns.iter().enumerate() {
                if let Err(e) = regex::Regex::new(pattern) {
                    violations.push(ConfigViolation {
                        index,
                        field: format!("deny_patterns[{d}]"),
                        message: e.to_string(),
                    });
                }
            }
            for (w, entry) in def.context_words.iter().enumerate() {
                if !(0.0..=1.0).contains(&entry.weight) {
                    violations.push(ConfigViolation {
                        index,
                        field: format!("context_words[{w}].weight"),
                        message: format!("weight {} outside 0.0-1.0", entry.weight),
                    });
                }
            }
        }
        violations
    }

    /// Builds and registers every recognizer in the file. Validation runs
    /// first; nothing is registered unless the whole file is clean.
    /// Returns the number of recognizers registered.
    ///
    /// # Errors
    /// `ConfigViolations` carrying every violation found, or a registry
    /// error (e.g. a duplicate name).
    pub fn load_into(&self, registry: &mut RecognizerRegistry) -> DetectResult<usize> {
        let violations = self.violations();
        if !violations.is_empty() {
            return Err(DetectError::ConfigViolations { violations });
        }

        for def in &self.recognizers {
            let mut builder = PatternRecognizer::builder(&def.name)
                .priority(def.priority)
                .specificity(def.specificity);
            for lang in &def.languages {
                builder = builder.language(lang);
            }
            for country in &def.countries {
                builder = builder.country(country);
            }
            for pattern in &def.patterns {
                let mut definition =
                    PatternDefinition::new(&pattern.regex, pattern.score, pattern.entity_type);
                definition.is_weak = pattern.is_weak;
                builder = builder.pattern(definition);
            }
            for term in &def.deny {
                builder = builder.deny(term);
            }
            for pattern in &def.deny_patterns {
                builder = builder.deny_pattern(pattern);
            }
            for entry in &def.context_words {
                builder = builder.context_word(ContextWord {
                    word: entry.word.clone(),
                    weight: entry.weight,
                    polarity: entry.polarity,
                });
            }
            if !def.use_global_denylist {
                builder = builder.without_global_denylist();
            }
            if !def.use_global_context {
                builder = builder.without_global_context();
            }
            registry.register(builder.build()?)?;
        }
        info!(count = self.recognizers.len(), version = self.version, "recognizer config loaded");
        Ok(self.recognizers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> String {
        r#"{
            "version": 1,
            "recognizers": [
                {
                    "name": "policy-number",
                    "countries": ["CH"],
                    "specificity": "country",
                    "patterns": [
                        {"regex": "\\bPOL-\\d{8}\\b", "score": 0.85, "entity_type": "insurance_policy"}
                    ]
                }
            ]
        }"#
        .to_string()
    }

    #[test]
    fn test_load_valid_config() {
        let file = RecognizerConfigFile::from_json(&valid_json()).unwrap();
        let mut registry = RecognizerRegistry::new();
        let count = file.load_into(&mut registry).unwrap();
        assert_eq!(count, 1);
        assert!(registry.get("policy-number").is_some());
    }

    #[test]
    fn test_all_violations_collected() {
        let file = RecognizerConfigFile {
            version: 99,
            recognizers: vec![RecognizerDefinition {
                name: "  ".to_string(),
                patterns: vec![PatternEntry {
                    regex: "([unclosed".to_string(),
                    score: 1.5,
                    entity_type: EntityType::Custom,
                    is_weak: false,
                }],
                languages: vec![],
                countries: vec![],
                priority: 0,
                specificity: Specificity::Global,
                deny: vec![],
                deny_patterns: vec![],
                context_words: vec![],
                use_global_denylist: true,
                use_global_context: true,
            }],
        };

        let violations = file.violations();
        // Version, empty name, bad regex, and out-of-range score all reported.
        assert_eq!(violations.len(), 4);

        let mut registry = RecognizerRegistry::new();
        let err = file.load_into(&mut registry).unwrap_err();
        assert!(matches!(err, DetectError::ConfigViolations { ref violations } if violations.len() == 4));
        assert!(registry.get("policy-number").is_none());
    }

    #[test]
    fn test_nothing_registered_on_violation() {
        let mut bad = RecognizerConfigFile::from_json(&valid_json()).unwrap();
        bad.recognizers.push(RecognizerDefinition {
            name: "broken".to_string(),
            patterns: vec![],
            languages: vec![],
            countries: vec![],
            priority: 0,
            specificity: Specificity::Global,
            deny: vec![],
            deny_patterns: vec![],
            context_words: vec![],
            use_global_denylist: true,
            use_global_context: true,
        });

        let mut registry = RecognizerRegistry::new();
        assert!(bad.load_into(&mut registry).is_err());
        // The valid first entry must not have been registered either.
        assert!(registry.get("policy-number").is_none());
    }

    #[test]
    fn test_opt_outs_and_weighted_context_words() {
        let json = r#"{
            "version": 1,
            "recognizers": [
                {
                    "name": "policy-number",
                    "use_global_denylist": false,
                    "use_global_context": false,
                    "deny_patterns": ["POL-0{8}"],
                    "context_words": [
                        {"word": "police", "weight": 0.9},
                        {"word": "ag", "weight": 0.6, "polarity": "negative"},
                        {"word": "versicherung"}
                    ],
                    "patterns": [
                        {"regex": "\\bPOL-\\d{8}\\b", "score": 0.85, "entity_type": "insurance_policy"}
                    ]
                }
            ]
        }"#;

        let file = RecognizerConfigFile::from_json(json).unwrap();
        let mut registry = RecognizerRegistry::new();
        file.load_into(&mut registry).unwrap();

        let recognizer = registry.get("policy-number").unwrap();
        assert!(!recognizer.use_global_denylist);
        assert!(!recognizer.use_global_context);
        assert_eq!(recognizer.context_words.len(), 3);
        assert!((recognizer.context_words[0].weight - 0.9).abs() < 1e-9);
        assert_eq!(recognizer.context_words[1].polarity, Polarity::Negative);
        // Unspecified fields take the defaults.
        assert!((recognizer.context_words[2].weight - 0.8).abs() < 1e-9);
        assert_eq!(recognizer.context_words[2].polarity, Polarity::Positive);
    }

    #[test]
    fn test_opt_ins_default_to_true() {
        let file = RecognizerConfigFile::from_json(&valid_json()).unwrap();
        assert!(file.recognizers[0].use_global_denylist);
        assert!(file.recognizers[0].use_global_context);
    }

    #[test]
    fn test_context_word_weight_and_deny_pattern_validated() {
        let mut file = RecognizerConfigFile::from_json(&valid_json()).unwrap();
        file.recognizers[0].deny_patterns.push("([unclosed".to_string());
        file.recognizers[0].context_words.push(ContextWordEntry {
            word: "police".to_string(),
            weight: 1.5,
            polarity: Polarity::Positive,
        });

        let violations = file.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.field == "deny_patterns[0]"));
        assert!(violations.iter().any(|v| v.field == "context_words[0].weight"));
    }

    #[test]
    fn test_malformed_json() {
        let err = RecognizerConfigFile::from_json("{not json").unwrap_err();
        assert!(matches!(err, DetectError::InvalidConfig { .. }));
    }

    #[test]
    fn test_detection_config_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.language, "de");
        assert!(config.passes.validation);
        assert!((config.low_confidence_multiplier - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let file = RecognizerConfigFile::from_json(&valid_json()).unwrap();
        let json = serde_json::to_string(&file).unwrap();
        let again = RecognizerConfigFile::from_json(&json).unwrap();
        assert_eq!(again.recognizers[0].name, "policy-number");
    }
}
