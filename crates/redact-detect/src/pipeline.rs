//! Detection pipeline.
//!
//! Runs the passes in a fixed order: high recall, deny-list, validation,
//! context scoring, address linking, document-type boosting, and
//! consolidation. Every pass is isolated; a failing pass records its
//! error in the pass outcome and the pipeline carries on with the
//! entities it has. Only a missing recognizer registry aborts the run.

use crate::address::AddressLinker;
use crate::config::DetectionConfig;
use crate::consolidate::{Consolidator, OffsetMap};
use crate::context::{ContextEnhancer, ContextWord, ContextWordDb};
use crate::denylist::DenyList;
use crate::doctype::DocumentClassifier;
use crate::error::{DetectError, DetectResult};
use crate::ml::{entity_type_for_label, TokenClassifier};
use crate::registry::RecognizerRegistry;
use crate::validators::ValidatorRegistry;
use chrono::Utc;
use redact_core::{
    DetectionResult, DetectionStats, DocumentId, Entity, EntitySource, GroupedAddress, PassOutcome,
    Validation,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Mutable state threaded through the passes.
pub struct PassContext<'a> {
    /// Document text being analyzed.
    pub text: &'a str,
    /// Pipeline configuration.
    pub config: &'a DetectionConfig,
    /// Working entity list.
    pub entities: Vec<Entity>,
    /// Document type, set by the document-type pass.
    pub document_type: redact_core::DocumentType,
    /// Address groups formed by the address pass.
    pub groups: Vec<GroupedAddress>,
    /// Free-form pass diagnostics (recognizer errors, classifier score).
    pub metadata: HashMap<String, serde_json::Value>,
    /// Outcomes of the passes that have already run.
    pub outcomes: Vec<PassOutcome>,
}

/// Entity-count changes reported by one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassDelta {
    /// Entities added.
    pub added: usize,
    /// Entities modified in place.
    pub modified: usize,
    /// Entities removed.
    pub removed: usize,
}

/// One stage of the detection pipeline.
pub trait DetectionPass: Send + Sync {
    /// Pass name, recorded in the result.
    fn name(&self) -> &'static str;

    /// Returns true when the pass should run under this configuration.
    fn enabled(&self, _config: &DetectionConfig) -> bool {
        true
    }

    /// Runs the pass over the context.
    ///
    /// # Errors
    /// A pass error is recorded in the pass outcome; it does not abort
    /// the pipeline.
    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta>;
}

/// High-recall pass: every applicable recognizer plus the optional model.
struct HighRecallPass {
    registry: Arc<RecognizerRegistry>,
    denylist: Arc<DenyList>,
    classifier: Option<Arc<dyn TokenClassifier>>,
}

impl DetectionPass for HighRecallPass {
    fn name(&self) -> &'static str {
        "high-recall"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        let denylist = ctx.config.passes.denylist.then(|| self.denylist.as_ref());
        let output = self.registry.analyze(
            ctx.text,
            &ctx.config.language,
            &ctx.config.country,
            denylist,
        )?;
        if !output.errors.is_empty() {
            ctx.metadata.insert(
                "recognizer_errors".to_string(),
                serde_json::json!(output
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.recognizer, e.message))
                    .collect::<Vec<_>>()),
            );
        }
        let mut delta = PassDelta::default();

        for m in output.matches {
            ctx.entities.push(
                Entity::new(
                    m.entity_type,
                    m.text,
                    m.start,
                    m.end,
                    m.score,
                    EntitySource::Rule,
                )
                .with_recognizer(m.recognizer),
            );
            delta.added += 1;
        }

        if let Some(classifier) = &self.classifier {
            match classifier.classify(ctx.text) {
                Ok(spans) => {
                    for span in spans {
                        if span.score < ctx.config.ml_score_threshold || span.start >= span.end {
                            continue;
                        }
                        ctx.entities.push(Entity::new(
                            entity_type_for_label(&span.label),
                            span.text,
                            span.start,
                            span.end,
                            span.score,
                            EntitySource::Ml,
                        ));
                        delta.added += 1;
                    }
                }
                // Model failures degrade to rule-only detection.
                Err(e) => warn!(classifier = classifier.name(), error = %e, "model failed"),
            }
        }
        Ok(delta)
    }
}

/// Deny-list pass: drops entities whose text is a known non-PII term.
/// Catches model detections the registry hook never saw.
struct DenyListPass {
    denylist: Arc<DenyList>,
}

impl DetectionPass for DenyListPass {
    fn name(&self) -> &'static str {
        "deny-list"
    }

    fn enabled(&self, config: &DetectionConfig) -> bool {
        config.passes.denylist
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        let before = ctx.entities.len();
        let language = ctx.config.language.clone();
        ctx.entities
            .retain(|e| !self.denylist.is_denied(&e.text, e.entity_type, &language));
        Ok(PassDelta {
            removed: before - ctx.entities.len(),
            ..PassDelta::default()
        })
    }
}

/// Validation pass: runs the type-keyed validator, records the outcome,
/// and realigns confidence with the graduated validator scale.
struct ValidationPass {
    validators: ValidatorRegistry,
}

impl DetectionPass for ValidationPass {
    fn name(&self) -> &'static str {
        "format-validation"
    }

    fn enabled(&self, config: &DetectionConfig) -> bool {
        config.passes.validation
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        let mut delta = PassDelta::default();
        for entity in &mut ctx.entities {
            let Some(report) = self.validators.validate(entity.entity_type, &entity.text) else {
                continue;
            };
            let score = report.confidence.score();
            if report.is_valid {
                entity.validation = Some(Validation::valid());
                if score > entity.confidence {
                    entity.confidence = score;
                }
            } else {
                entity.validation = Some(Validation::invalid(
                    report.reason.unwrap_or_else(|| "validation failed".to_string()),
                ));
                if score < entity.confidence {
                    entity.confidence = score;
                }
            }
            delta.modified += 1;
        }
        Ok(delta)
    }
}

/// Context pass: adjusts confidence from surrounding words. Each entity
/// is scored against its recognizer's local vocabulary plus the global
/// database, unless the recognizer opted out of the global words.
struct ContextPass {
    db: ContextWordDb,
    enhancer: ContextEnhancer,
    registry: Arc<RecognizerRegistry>,
}

impl DetectionPass for ContextPass {
    fn name(&self) -> &'static str {
        "context-scoring"
    }

    fn enabled(&self, config: &DetectionConfig) -> bool {
        config.passes.context
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        let mut delta = PassDelta::default();
        for entity in &mut ctx.entities {
            let recognizer = entity
                .recognizer
                .as_deref()
                .and_then(|name| self.registry.get(name));
            let global: &[ContextWord] = if recognizer.map_or(true, |r| r.use_global_context) {
                self.db.words_for(entity.entity_type, &ctx.config.language)
            } else {
                &[]
            };
            let local = recognizer.map_or(&[][..], |r| r.context_words.as_slice());
            if local.is_empty() {
                self.enhancer.enhance(entity, ctx.text, global);
            } else {
                let mut words = local.to_vec();
                words.extend_from_slice(global);
                self.enhancer.enhance(entity, ctx.text, &words);
            }
            if entity.context.as_ref().is_some_and(|c| !c.factors.is_empty()) {
                delta.modified += 1;
            }
        }
        Ok(delta)
    }
}

/// Address pass: folds proximate components into composite addresses.
struct AddressPass {
    linker: AddressLinker,
}

impl DetectionPass for AddressPass {
    fn name(&self) -> &'static str {
        "address-linking"
    }

    fn enabled(&self, config: &DetectionConfig) -> bool {
        config.passes.address
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        let before = ctx.entities.len();
        let (entities, groups) = self.linker.link(std::mem::take(&mut ctx.entities), ctx.text);
        ctx.entities = entities;
        let after = ctx.entities.len();
        let delta = PassDelta {
            added: groups.len(),
            removed: (before + groups.len()).saturating_sub(after),
            ..PassDelta::default()
        };
        ctx.groups.extend(groups);
        Ok(delta)
    }
}

/// Document-type pass: classifies the document and boosts the entity
/// types that class typically carries, plus any upstream type hints.
struct DocTypePass {
    classifier: DocumentClassifier,
}

impl DetectionPass for DocTypePass {
    fn name(&self) -> &'static str {
        "document-type"
    }

    fn enabled(&self, config: &DetectionConfig) -> bool {
        config.passes.doctype
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        ctx.document_type = match ctx.config.document_type_override {
            Some(doc_type) => doc_type,
            None => {
                let classification = self.classifier.classify(ctx.text);
                ctx.metadata.insert(
                    "doctype_score".to_string(),
                    serde_json::json!(classification.score),
                );
                classification.document_type
            }
        };
        let mut modified = self.classifier.apply_boosts(&mut ctx.entities, ctx.document_type);

        if !ctx.config.expected_entity_types.is_empty() {
            for entity in &mut ctx.entities {
                if ctx.config.expected_entity_types.contains(&entity.entity_type) {
                    entity.adjust_confidence(0.05);
                    modified += 1;
                }
            }
        }
        Ok(PassDelta {
            modified,
            ..PassDelta::default()
        })
    }
}

/// Consolidation pass: final overlap resolution, logical IDs, offset
/// repair, and review flagging.
struct ConsolidationPass {
    consolidator: Consolidator,
}

impl DetectionPass for ConsolidationPass {
    fn name(&self) -> &'static str {
        "consolidation"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
        let before = ctx.entities.len();
        let offset_map = ctx
            .metadata
            .get("offset_map")
            .and_then(|v| serde_json::from_value::<OffsetMap>(v.clone()).ok());
        ctx.entities = self.consolidator.consolidate_with_map(
            std::mem::take(&mut ctx.entities),
            ctx.text,
            offset_map.as_ref(),
        );

        let mut modified = 0;
        for entity in &mut ctx.entities {
            if entity.confidence < ctx.config.review_threshold && !entity.flagged_for_review {
                entity.flagged_for_review = true;
                modified += 1;
            }
        }
        Ok(PassDelta {
            modified,
            removed: before.saturating_sub(ctx.entities.len()),
            ..PassDelta::default()
        })
    }
}

/// The multi-pass detection pipeline.
pub struct DetectionPipeline {
    config: DetectionConfig,
    registry: Arc<RecognizerRegistry>,
    passes: Vec<Box<dyn DetectionPass>>,
}

impl DetectionPipeline {
    /// Creates a pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Runs all passes over the text.
    ///
    /// # Errors
    /// `NotInitialized` when no recognizer has been registered. Pass
    /// failures never surface here; they are recorded per pass.
    pub fn detect(&self, text: &str) -> DetectResult<DetectionResult> {
        self.run_passes(text, HashMap::new())
    }

    /// Runs all passes over the text, translating spans recorded against
    /// a normalized view of it (e.g. by an upstream model stage) back
    /// onto the source text during consolidation.
    ///
    /// # Errors
    /// Same failure modes as [`DetectionPipeline::detect`].
    pub fn detect_with_offset_map(
        &self,
        text: &str,
        offset_map: &OffsetMap,
    ) -> DetectResult<DetectionResult> {
        let mut metadata = HashMap::new();
        let value = serde_json::to_value(offset_map)
            .map_err(|e| DetectError::Internal(e.to_string()))?;
        metadata.insert("offset_map".to_string(), value);
        self.run_passes(text, metadata)
    }

    fn run_passes(
        &self,
        text: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> DetectResult<DetectionResult> {
        if self.registry.is_empty() {
            return Err(DetectError::NotInitialized);
        }
        let started = Instant::now();
        let mut ctx = PassContext {
            text,
            config: &self.config,
            entities: Vec::new(),
            document_type: redact_core::DocumentType::Unknown,
            groups: Vec::new(),
            metadata,
            outcomes: Vec::with_capacity(self.passes.len()),
        };

        for pass in &self.passes {
            if !pass.enabled(&self.config) {
                continue;
            }
            let pass_started = Instant::now();
            match pass.run(&mut ctx) {
                Ok(delta) => ctx.outcomes.push(PassOutcome {
                    name: pass.name().to_string(),
                    added: delta.added,
                    modified: delta.modified,
                    removed: delta.removed,
                    duration_ms: pass_started.elapsed().as_millis() as u64,
                    error: None,
                }),
                Err(e) => {
                    warn!(pass = pass.name(), error = %e, "pass failed, continuing");
                    ctx.outcomes.push(PassOutcome::failed(
                        pass.name(),
                        e.to_string(),
                        pass_started.elapsed().as_millis() as u64,
                    ));
                }
            }
        }

        let stats = DetectionStats::from_entities(&ctx.entities);
        if !ctx.metadata.is_empty() {
            tracing::debug!(metadata = ?ctx.metadata, "pass diagnostics");
        }
        info!(
            entities = stats.total,
            flagged = stats.flagged,
            document_type = ?ctx.document_type,
            "detection complete"
        );
        Ok(DetectionResult {
            document_id: DocumentId::new(),
            entities: ctx.entities,
            document_type: ctx.document_type,
            passes: ctx.outcomes,
            stats,
            duration_ms: started.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
        })
    }
}

/// Builder assembling a pipeline from its components. Every component
/// defaults to the built-in variant.
pub struct PipelineBuilder {
    config: DetectionConfig,
    registry: Option<RecognizerRegistry>,
    validators: Option<ValidatorRegistry>,
    denylist: Option<DenyList>,
    context_db: Option<ContextWordDb>,
    enhancer: ContextEnhancer,
    linker: AddressLinker,
    doc_classifier: DocumentClassifier,
    consolidator: Consolidator,
    token_classifier: Option<Arc<dyn TokenClassifier>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            config: DetectionConfig::default(),
            registry: None,
            validators: None,
            denylist: None,
            context_db: None,
            enhancer: ContextEnhancer::default(),
            linker: AddressLinker::default(),
            doc_classifier: DocumentClassifier::default(),
            consolidator: Consolidator::default(),
            token_classifier: None,
        }
    }
}

impl PipelineBuilder {
    /// Sets the detection configuration.
    #[must_use]
    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the recognizer registry. Without this, the built-in set is
    /// used.
    #[must_use]
    pub fn registry(mut self, registry: RecognizerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the validator registry.
    #[must_use]
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = Some(validators);
        self
    }

    /// Sets the deny-list.
    #[must_use]
    pub fn denylist(mut self, denylist: DenyList) -> Self {
        self.denylist = Some(denylist);
        self
    }

    /// Sets the context-word database.
    #[must_use]
    pub fn context_words(mut self, db: ContextWordDb) -> Self {
        self.context_db = Some(db);
        self
    }

    /// Sets the context enhancer.
    #[must_use]
    pub fn enhancer(mut self, enhancer: ContextEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// Sets the address linker.
    #[must_use]
    pub fn address_linker(mut self, linker: AddressLinker) -> Self {
        self.linker = linker;
        self
    }

    /// Sets the token-classification model.
    #[must_use]
    pub fn token_classifier(mut self, classifier: Arc<dyn TokenClassifier>) -> Self {
        self.token_classifier = Some(classifier);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    /// Fails if the built-in recognizer set cannot be registered.
    pub fn build(self) -> DetectResult<DetectionPipeline> {
        let mut registry = match self.registry {
            Some(registry) => registry,
            None => {
                let mut registry = RecognizerRegistry::new();
                crate::recognizers::register_builtin(&mut registry)?;
                registry
            }
        };
        registry.low_confidence_multiplier = self.config.low_confidence_multiplier;
        let registry = Arc::new(registry);
        let denylist = Arc::new(self.denylist.unwrap_or_else(DenyList::builtin));
        let validators = self.validators.unwrap_or_else(ValidatorRegistry::builtin);
        let context_db = self.context_db.unwrap_or_else(ContextWordDb::builtin);

        let passes: Vec<Box<dyn DetectionPass>> = vec![
            Box::new(HighRecallPass {
                registry: Arc::clone(&registry),
                denylist: Arc::clone(&denylist),
                classifier: self.token_classifier,
            }),
            Box::new(DenyListPass {
                denylist: Arc::clone(&denylist),
            }),
            Box::new(ValidationPass { validators }),
            Box::new(ContextPass {
                db: context_db,
                enhancer: self.enhancer,
                registry: Arc::clone(&registry),
            }),
            Box::new(AddressPass {
                linker: self.linker,
            }),
            Box::new(DocTypePass {
                classifier: self.doc_classifier,
            }),
            Box::new(ConsolidationPass {
                consolidator: self.consolidator,
            }),
        ];
        Ok(DetectionPipeline {
            config: self.config,
            registry,
            passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::TokenSpan;
    use crate::recognizer::{PatternDefinition, PatternRecognizer};
    use redact_core::{DocumentType, EntityType, ValidationStatus};

    fn pipeline() -> DetectionPipeline {
        DetectionPipeline::builder().build().unwrap()
    }

    #[test]
    fn test_empty_registry_is_not_initialized() {
        let result = DetectionPipeline::builder()
            .registry(RecognizerRegistry::new())
            .build()
            .unwrap()
            .detect("text");
        assert!(matches!(result, Err(DetectError::NotInitialized)));
    }

    #[test]
    fn test_invoice_end_to_end() {
        let text = "Rechnung Nr. 2024-001\n\
                    Anna Muster, Seestrasse 12, 8004 Zürich\n\
                    IBAN: CH93 0076 2011 6238 5295 7\n\
                    Total CHF 1'234.50 zahlbar bis 30.04.2024";
        let result = pipeline().detect(text).unwrap();

        assert_eq!(result.document_type, DocumentType::Invoice);
        assert!(result
            .entities
            .iter()
            .any(|e| e.entity_type == EntityType::BankAccount));
        assert!(result
            .entities
            .iter()
            .any(|e| e.entity_type == EntityType::Address));
        assert!(result.passes.iter().all(|p| p.error.is_none()));
        assert_eq!(result.stats.total, result.entities.len());
    }

    #[test]
    fn test_iban_validated_and_boosted() {
        let text = "Rechnung: IBAN CH93 0076 2011 6238 5295 7, Total CHF 50.00";
        let result = pipeline().detect(text).unwrap();
        let iban = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::BankAccount)
            .unwrap();
        assert_eq!(
            iban.validation.as_ref().unwrap().status,
            ValidationStatus::Valid
        );
        assert!(iban.confidence >= 0.95);
        assert!(!iban.flagged_for_review);
    }

    #[test]
    fn test_low_confidence_flagged_for_review() {
        // A bare postal code in a non-address context stays weak.
        let result = pipeline().detect("Referenz 8004 verarbeitet").unwrap();
        let weak = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::PostalCode);
        if let Some(weak) = weak {
            assert!(weak.flagged_for_review);
        }
    }

    #[test]
    fn test_ml_spans_merge_with_rules() {
        struct FixedModel;
        impl TokenClassifier for FixedModel {
            fn name(&self) -> &str {
                "fixed"
            }
            fn classify(&self, text: &str) -> Result<Vec<TokenSpan>, String> {
                let start = text.find("Anna Muster").ok_or("missing")?;
                Ok(vec![TokenSpan {
                    label: "PER".to_string(),
                    text: "Anna Muster".to_string(),
                    start,
                    end: start + "Anna Muster".len(),
                    score: 0.92,
                }])
            }
        }

        let pipeline = DetectionPipeline::builder()
            .token_classifier(Arc::new(FixedModel))
            .build()
            .unwrap();
        let result = pipeline.detect("Kundin: Anna Muster").unwrap();
        let person = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::PersonName)
            .unwrap();
        assert_eq!(person.source, EntitySource::Ml);
        assert!((person.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_model_failure_degrades_to_rules() {
        struct BrokenModel;
        impl TokenClassifier for BrokenModel {
            fn name(&self) -> &str {
                "broken"
            }
            fn classify(&self, _text: &str) -> Result<Vec<TokenSpan>, String> {
                Err("model unavailable".to_string())
            }
        }

        let pipeline = DetectionPipeline::builder()
            .token_classifier(Arc::new(BrokenModel))
            .build()
            .unwrap();
        let result = pipeline
            .detect("Kontakt: jane@example.ch")
            .unwrap();
        assert!(result
            .entities
            .iter()
            .any(|e| e.entity_type == EntityType::Email));
    }

    #[test]
    fn test_pass_toggles() {
        let mut config = DetectionConfig::default();
        config.passes.validation = false;
        let pipeline = DetectionPipeline::builder().config(config).build().unwrap();
        let result = pipeline
            .detect("IBAN CH93 0076 2011 6238 5295 7")
            .unwrap();
        assert!(!result.passes.iter().any(|p| p.name == "format-validation"));
        let iban = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::BankAccount)
            .unwrap();
        assert!(iban.validation.is_none());
    }

    #[test]
    fn test_document_type_override() {
        let config = DetectionConfig {
            document_type_override: Some(DocumentType::Contract),
            ..DetectionConfig::default()
        };
        let pipeline = DetectionPipeline::builder().config(config).build().unwrap();
        let result = pipeline.detect("lorem ipsum 30.04.2024").unwrap();
        assert_eq!(result.document_type, DocumentType::Contract);
    }

    #[test]
    fn test_global_context_opt_out_respected() {
        let mut registry = RecognizerRegistry::new();
        let iban = PatternRecognizer::builder("raw-iban")
            .without_global_context()
            .pattern(PatternDefinition::new(
                r"\bCH\d{2}(?:\s?\d{4}){4}\s?\d\b",
                0.5,
                EntityType::BankAccount,
            ))
            .build()
            .unwrap();
        registry.register(iban).unwrap();

        let mut config = DetectionConfig::default();
        config.passes.validation = false;
        config.passes.doctype = false;
        let pipeline = DetectionPipeline::builder()
            .registry(registry)
            .config(config)
            .build()
            .unwrap();

        // The preceding "IBAN:" label is in the global vocabulary, but the
        // recognizer opted out of it.
        let result = pipeline
            .detect("IBAN: CH93 0076 2011 6238 5295 7")
            .unwrap();
        let account = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::BankAccount)
            .unwrap();
        assert!((account.confidence - 0.5).abs() < 1e-9);
        assert!(account.context.is_none());
    }

    #[test]
    fn test_local_context_words_applied() {
        let mut registry = RecognizerRegistry::new();
        let reference = PatternRecognizer::builder("ref-number")
            .without_global_context()
            .context_word(ContextWord::positive("referenz", 0.9))
            .pattern(PatternDefinition::new(r"\b\d{6}\b", 0.5, EntityType::Custom))
            .build()
            .unwrap();
        registry.register(reference).unwrap();

        let mut config = DetectionConfig::default();
        config.passes.doctype = false;
        let pipeline = DetectionPipeline::builder()
            .registry(registry)
            .config(config)
            .build()
            .unwrap();

        let result = pipeline.detect("Referenz 123456 bezahlt").unwrap();
        let entity = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::Custom)
            .unwrap();
        assert!((entity.confidence - 0.85).abs() < 1e-9);
        assert!(entity
            .context
            .as_ref()
            .unwrap()
            .factors
            .contains(&"referenz".to_string()));
    }

    #[test]
    fn test_config_multiplier_reaches_registry() {
        fn registry_with_weak_pattern() -> RecognizerRegistry {
            let mut registry = RecognizerRegistry::new();
            let weak = PatternRecognizer::builder("weak-ref")
                .pattern(
                    PatternDefinition::new(r"\b\d{6}\b", 0.8, EntityType::Custom).weak(),
                )
                .build()
                .unwrap();
            registry.register(weak).unwrap();
            registry
        }

        let mut config = DetectionConfig::default();
        config.low_confidence_multiplier = 1.0;
        let undamped = DetectionPipeline::builder()
            .registry(registry_with_weak_pattern())
            .config(config)
            .build()
            .unwrap();
        let result = undamped.detect("Code 123456").unwrap();
        assert!((result.entities[0].confidence - 0.8).abs() < 1e-9);

        let default = DetectionPipeline::builder()
            .registry(registry_with_weak_pattern())
            .build()
            .unwrap();
        let result = default.detect("Code 123456").unwrap();
        assert!((result.entities[0].confidence - 0.8 * 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_offset_map_repairs_normalized_spans() {
        struct NormalizedModel;
        impl TokenClassifier for NormalizedModel {
            fn name(&self) -> &str {
                "normalized"
            }
            fn classify(&self, _text: &str) -> Result<Vec<TokenSpan>, String> {
                // Offsets recorded against "Kundin: Anna Muster", the
                // whitespace-collapsed view of the source text.
                Ok(vec![TokenSpan {
                    label: "PER".to_string(),
                    text: "Anna Muster".to_string(),
                    start: 8,
                    end: 19,
                    score: 0.92,
                }])
            }
        }

        let text = "Kundin:  Anna  Muster";
        let map = OffsetMap::new(vec![(0, 0), (8, 9), (13, 15)]);
        let pipeline = DetectionPipeline::builder()
            .token_classifier(Arc::new(NormalizedModel))
            .build()
            .unwrap();

        let result = pipeline.detect_with_offset_map(text, &map).unwrap();
        let person = result
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::PersonName)
            .unwrap();
        assert_eq!(person.start, 9);
        assert_eq!(person.end, 21);
        assert_eq!(&text[person.start..person.end], person.text);
    }

    #[test]
    fn test_passes_can_inspect_earlier_outcomes() {
        struct Inspecting;
        impl DetectionPass for Inspecting {
            fn name(&self) -> &'static str {
                "inspecting"
            }
            fn run(&self, ctx: &mut PassContext<'_>) -> DetectResult<PassDelta> {
                assert!(ctx.outcomes.iter().any(|o| o.name == "high-recall"));
                Ok(PassDelta::default())
            }
        }

        let config = DetectionConfig::default();
        let mut ctx = PassContext {
            text: "x",
            config: &config,
            entities: Vec::new(),
            document_type: DocumentType::Unknown,
            groups: Vec::new(),
            metadata: HashMap::new(),
            outcomes: vec![PassOutcome {
                name: "high-recall".to_string(),
                added: 0,
                modified: 0,
                removed: 0,
                duration_ms: 0,
                error: None,
            }],
        };
        Inspecting.run(&mut ctx).unwrap();
    }

    #[test]
    fn test_pass_order_recorded() {
        let result = pipeline().detect("jane@example.ch").unwrap();
        let names: Vec<&str> = result.passes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "high-recall",
                "deny-list",
                "format-validation",
                "context-scoring",
                "address-linking",
                "document-type",
                "consolidation"
            ]
        );
    }
}
