//! Placeholder mapping and text anonymization.
//!
//! Every logical entity gets one stable placeholder, so repeated mentions
//! of the same value redact to the same token and the mapping can be
//! reversed by the export stage.

use redact_core::{DetectionResult, DocumentMapping, Entity, LogicalId, MappingEntry};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Generates stable placeholders keyed by logical ID.
#[derive(Debug, Default)]
pub struct PlaceholderGenerator {
    by_logical_id: HashMap<LogicalId, String>,
    type_counters: HashMap<String, usize>,
}

impl PlaceholderGenerator {
    /// Creates an empty generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the placeholder for an entity, creating it on first use.
    /// Entities sharing a logical ID share the placeholder.
    pub fn placeholder_for(&mut self, entity: &Entity) -> String {
        let tag = entity.entity_type.to_string().to_uppercase();
        if let Some(id) = entity.logical_id {
            if let Some(existing) = self.by_logical_id.get(&id) {
                return existing.clone();
            }
            let placeholder = self.next_placeholder(&tag);
            self.by_logical_id.insert(id, placeholder.clone());
            return placeholder;
        }
        self.next_placeholder(&tag)
    }

    fn next_placeholder(&mut self, tag: &str) -> String {
        let counter = self.type_counters.entry(tag.to_string()).or_insert(0);
        *counter += 1;
        format!("[{tag}_{counter}]")
    }
}

/// Builds the document mapping from a detection result, one entry per
/// placeholder, in document order.
#[must_use]
pub fn build_mapping(result: &DetectionResult) -> DocumentMapping {
    let mut generator = PlaceholderGenerator::new();
    let mut entries: Vec<MappingEntry> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for entity in &result.entities {
        let placeholder = generator.placeholder_for(entity);
        if !seen.insert(placeholder.clone()) {
            continue;
        }
        entries.push(MappingEntry {
            placeholder,
            original: entity.text.clone(),
            entity_type: entity.entity_type,
            confidence: entity.confidence,
            source: entity.source,
            components: entity.components.clone(),
        });
    }
    debug!(entries = entries.len(), "mapping built");
    DocumentMapping {
        document_id: result.document_id,
        processed_at: result.completed_at,
        entries,
    }
}

/// Replaces every detected span with its placeholder and returns the
/// redacted text alongside the mapping.
#[must_use]
pub fn anonymize(text: &str, result: &DetectionResult) -> (String, DocumentMapping) {
    let mapping = build_mapping(result);
    let mut by_original: HashMap<&str, &str> = HashMap::new();
    for entry in &mapping.entries {
        by_original.insert(entry.original.as_str(), entry.placeholder.as_str());
    }

    // Replace back-to-front so earlier offsets stay valid.
    let mut redacted = text.to_string();
    let mut spans: Vec<&Entity> = result.entities.iter().collect();
    spans.sort_by_key(|e| std::cmp::Reverse(e.start));
    for entity in spans {
        let Some(placeholder) = by_original.get(entity.text.as_str()) else {
            continue;
        };
        if redacted.get(entity.start..entity.end) == Some(entity.text.as_str()) {
            redacted.replace_range(entity.start..entity.end, placeholder);
        }
    }
    (redacted, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redact_core::{
        DetectionStats, DocumentId, DocumentType, EntitySource, EntityType,
    };

    fn result_with(entities: Vec<Entity>) -> DetectionResult {
        let stats = DetectionStats::from_entities(&entities);
        DetectionResult {
            document_id: DocumentId::new(),
            entities,
            document_type: DocumentType::Unknown,
            passes: Vec::new(),
            stats,
            duration_ms: 0,
            completed_at: Utc::now(),
        }
    }

    fn entity(t: EntityType, text: &str, start: usize, logical_id: Option<LogicalId>) -> Entity {
        let mut e = Entity::new(t, text, start, start + text.len(), 0.9, EntitySource::Rule);
        e.logical_id = logical_id;
        e
    }

    #[test]
    fn test_repeated_mentions_share_placeholder() {
        let id = LogicalId::new();
        let text = "Anna Muster traf Anna Muster";
        let result = result_with(vec![
            entity(EntityType::PersonName, "Anna Muster", 0, Some(id)),
            entity(EntityType::PersonName, "Anna Muster", 17, Some(id)),
        ]);

        let (redacted, mapping) = anonymize(text, &result);
        assert_eq!(mapping.entries.len(), 1);
        assert_eq!(redacted, "[PERSON_NAME_1] traf [PERSON_NAME_1]");
    }

    #[test]
    fn test_distinct_values_numbered() {
        let text = "Anna und Beat";
        let result = result_with(vec![
            entity(EntityType::PersonName, "Anna", 0, Some(LogicalId::new())),
            entity(EntityType::PersonName, "Beat", 9, Some(LogicalId::new())),
        ]);

        let (redacted, mapping) = anonymize(text, &result);
        assert_eq!(mapping.entries.len(), 2);
        assert_eq!(redacted, "[PERSON_NAME_1] und [PERSON_NAME_2]");
    }

    #[test]
    fn test_counters_are_per_type() {
        let text = "Anna, a@b.ch";
        let result = result_with(vec![
            entity(EntityType::PersonName, "Anna", 0, Some(LogicalId::new())),
            entity(EntityType::Email, "a@b.ch", 6, Some(LogicalId::new())),
        ]);

        let (_, mapping) = anonymize(text, &result);
        assert_eq!(mapping.entries[0].placeholder, "[PERSON_NAME_1]");
        assert_eq!(mapping.entries[1].placeholder, "[EMAIL_1]");
    }

    #[test]
    fn test_mapping_preserves_original() {
        let text = "IBAN CH93 0076 2011 6238 5295 7";
        let result = result_with(vec![entity(
            EntityType::BankAccount,
            "CH93 0076 2011 6238 5295 7",
            5,
            Some(LogicalId::new()),
        )]);

        let (redacted, mapping) = anonymize(text, &result);
        assert_eq!(mapping.entries[0].original, "CH93 0076 2011 6238 5295 7");
        assert!(!redacted.contains("CH93"));
    }
}
