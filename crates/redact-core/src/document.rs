//! Document-level types: document classification, pass metadata, and the
//! final detection result handed to downstream consumers.

use crate::{AddressComponent, DocumentId, Entity, EntitySource, EntityType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Overall document classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Invoice or billing document.
    Invoice,
    /// Correspondence letter.
    Letter,
    /// Form with labeled fields.
    Form,
    /// Legal contract.
    Contract,
    /// Report or statement.
    Report,
    /// Classification was below the confidence threshold.
    Unknown,
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Outcome of a single pipeline pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Pass name.
    pub name: String,
    /// Entities added by the pass.
    pub added: usize,
    /// Entities modified by the pass.
    pub modified: usize,
    /// Entities removed by the pass.
    pub removed: usize,
    /// Pass duration in milliseconds.
    pub duration_ms: u64,
    /// Error recorded if the pass failed (the pipeline continued).
    pub error: Option<String>,
}

impl PassOutcome {
    /// Creates an outcome for a pass that failed.
    pub fn failed(name: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            added: 0,
            modified: 0,
            removed: 0,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// Per-document detection statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionStats {
    /// Total entities detected.
    pub total: usize,
    /// Entities by type.
    pub by_type: HashMap<EntityType, usize>,
    /// Entities by source.
    pub by_source: HashMap<EntitySource, usize>,
    /// Entities flagged for review.
    pub flagged: usize,
    /// Average confidence across all entities.
    pub avg_confidence: f64,
}

impl DetectionStats {
    /// Computes statistics for a list of entities.
    #[must_use]
    pub fn from_entities(entities: &[Entity]) -> Self {
        let mut stats = Self::default();
        for e in entities {
            stats.total += 1;
            *stats.by_type.entry(e.entity_type).or_insert(0) += 1;
            *stats.by_source.entry(e.source).or_insert(0) += 1;
            if e.flagged_for_review {
                stats.flagged += 1;
            }
            stats.avg_confidence = (stats.avg_confidence * (stats.total - 1) as f64
                + e.confidence)
                / stats.total as f64;
        }
        stats
    }
}

/// Final output of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Document identifier.
    pub document_id: DocumentId,
    /// Detected entities after consolidation.
    pub entities: Vec<Entity>,
    /// Classified document type.
    pub document_type: DocumentType,
    /// Per-pass outcomes, in execution order.
    pub passes: Vec<PassOutcome>,
    /// Per-type statistics.
    pub stats: DetectionStats,
    /// Total pipeline duration in milliseconds.
    pub duration_ms: u64,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
}

/// One anonymization mapping entry, consumed by the export stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Placeholder substituted into the redacted document.
    pub placeholder: String,
    /// Original text.
    pub original: String,
    /// Entity type.
    pub entity_type: EntityType,
    /// Confidence at consolidation time.
    pub confidence: f64,
    /// Detection source.
    pub source: EntitySource,
    /// Address components, when the entity is a composite address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AddressComponent>>,
}

/// All mapping entries for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMapping {
    /// Document identifier.
    pub document_id: DocumentId,
    /// Processing timestamp.
    pub processed_at: DateTime<Utc>,
    /// Mapping entries, in document order.
    pub entries: Vec<MappingEntry>,
}
