//! Entity consolidation.
//!
//! The final pass folds the raw detections into a clean, non-overlapping
//! list: overlap resolution by entity-type priority, merging of rule and
//! model detections of the same span, logical-ID assignment for repeated
//! mentions, and offset repair against the original text. Running the
//! consolidator twice over its own output is a no-op.

use redact_core::{Entity, EntitySource, LogicalId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Maps offsets recorded against a normalized view of the text back to
/// the source text. Anchor points are `(normalized, source)` pairs;
/// positions between anchors are projected from the preceding anchor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetMap {
    anchors: Vec<(usize, usize)>,
}

impl OffsetMap {
    /// Creates a map from anchor pairs.
    #[must_use]
    pub fn new(mut anchors: Vec<(usize, usize)>) -> Self {
        anchors.sort_unstable();
        Self { anchors }
    }

    /// Projects a normalized-view offset onto the source text.
    #[must_use]
    pub fn project(&self, pos: usize) -> usize {
        match self.anchors.binary_search_by_key(&pos, |a| a.0) {
            Ok(i) => self.anchors[i].1,
            Err(0) => pos,
            Err(i) => {
                let (normalized, source) = self.anchors[i - 1];
                source + (pos - normalized)
            }
        }
    }
}

/// Consolidator configuration.
#[derive(Debug, Clone)]
pub struct ConsolidatorConfig {
    /// When true, offsets are re-anchored against the source text if the
    /// recorded span no longer matches the entity text.
    pub repair_offsets: bool,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self { repair_offsets: true }
    }
}

/// Folds overlapping and duplicate detections into a final entity list.
#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    config: ConsolidatorConfig,
}

impl Consolidator {
    /// Creates a consolidator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates with custom configuration.
    #[must_use]
    pub fn with_config(config: ConsolidatorConfig) -> Self {
        Self { config }
    }

    /// Consolidates the entity list against the source text.
    #[must_use]
    pub fn consolidate(&self, entities: Vec<Entity>, text: &str) -> Vec<Entity> {
        self.consolidate_with_map(entities, text, None)
    }

    /// Consolidates with an offset map translating normalized-view spans
    /// back onto the source text. Spans the map cannot place fall back to
    /// a substring search.
    #[must_use]
    pub fn consolidate_with_map(
        &self,
        entities: Vec<Entity>,
        text: &str,
        offset_map: Option<&OffsetMap>,
    ) -> Vec<Entity> {
        let mut entities = entities;
        if self.config.repair_offsets {
            repair_offsets(&mut entities, text, offset_map);
        }
        let mut entities = resolve_overlaps(entities);
        assign_logical_ids(&mut entities);
        entities.sort_by_key(|e| (e.start, e.end));
        entities
    }
}

/// Resolves overlapping spans, keeping one winner per overlap group.
///
/// Same-span detections from rule and model sources merge into one entity
/// with `EntitySource::Both` and the higher confidence. Otherwise the
/// higher type priority wins; ties go to the higher confidence, then to
/// the longer span.
fn resolve_overlaps(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by_key(|e| (e.start, e.end));

    let mut kept: Vec<Entity> = Vec::with_capacity(entities.len());
    for candidate in entities {
        let Some(last) = kept.last_mut() else {
            kept.push(candidate);
            continue;
        };
        if !last.overlaps(&candidate) {
            kept.push(candidate);
            continue;
        }

        // Same span and type from different sources: one mention, two
        // detectors agreeing.
        if last.start == candidate.start
            && last.end == candidate.end
            && last.entity_type == candidate.entity_type
        {
            if last.source != candidate.source {
                last.source = EntitySource::Both;
            }
            if candidate.confidence > last.confidence {
                last.confidence = candidate.confidence;
            }
            if last.validation.is_none() {
                last.validation = candidate.validation;
            }
            continue;
        }

        if wins_over(&candidate, last) {
            debug!(
                kept = ?candidate.entity_type,
                dropped = ?last.entity_type,
                "overlap resolved"
            );
            *last = candidate;
        }
    }
    kept
}

/// Ranks `a` against `b` for overlap resolution.
fn wins_over(a: &Entity, b: &Entity) -> bool {
    let pa = a.entity_type.overlap_priority();
    let pb = b.entity_type.overlap_priority();
    if pa != pb {
        return pa > pb;
    }
    if (a.confidence - b.confidence).abs() > f64::EPSILON {
        return a.confidence > b.confidence;
    }
    (a.end - a.start) > (b.end - b.start)
}

/// Assigns one logical ID per distinct (type, normalized text) so repeated
/// mentions of the same value share it. Existing IDs (address groups) are
/// preserved.
fn assign_logical_ids(entities: &mut [Entity]) {
    let mut seen: HashMap<(redact_core::EntityType, String), LogicalId> = HashMap::new();

    // First pass: adopt IDs already present so later mentions reuse them.
    for entity in entities.iter() {
        if let Some(id) = entity.logical_id {
            seen.entry((entity.entity_type, normalize_mention(&entity.text)))
                .or_insert(id);
        }
    }

    for entity in entities.iter_mut() {
        if entity.logical_id.is_some() {
            continue;
        }
        let key = (entity.entity_type, normalize_mention(&entity.text));
        let id = *seen.entry(key).or_insert_with(LogicalId::new);
        entity.logical_id = Some(id);
    }
}

fn normalize_mention(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Re-anchors entities whose recorded span does not match the source text.
/// The offset map, when supplied, is consulted first; otherwise the entity
/// text is searched near the recorded offset, then anywhere in the text.
/// Entities that cannot be re-anchored keep their offsets.
fn repair_offsets(entities: &mut [Entity], text: &str, offset_map: Option<&OffsetMap>) {
    for entity in entities.iter_mut() {
        if text.get(entity.start..entity.end) == Some(entity.text.as_str()) {
            continue;
        }
        if let Some(map) = offset_map {
            let start = map.project(entity.start);
            let end = map.project(entity.end).min(text.len());
            if let Some(slice) = text.get(start..end) {
                // Normalization may have altered interior whitespace, so
                // the projected slice replaces the recorded text.
                if normalize_mention(slice) == normalize_mention(&entity.text) {
                    debug!(from = entity.start, to = start, "offset projected");
                    entity.start = start;
                    entity.end = end;
                    entity.text = slice.to_string();
                    continue;
                }
            }
        }
        let window_start = entity.start.saturating_sub(32).min(text.len());
        let anchored = text
            .get(window_start..)
            .and_then(|tail| tail.find(&entity.text).map(|i| window_start + i))
            .or_else(|| text.find(&entity.text));
        if let Some(start) = anchored {
            debug!(from = entity.start, to = start, "offset repaired");
            entity.start = start;
            entity.end = start + entity.text.len();
        }
    }
}
