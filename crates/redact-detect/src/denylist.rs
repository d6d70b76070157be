//! Known false-positive suppression.
//!
//! The deny-list is consulted as a global pass after high-recall detection
//! and as an optional per-recognizer pre-filter. Literal lookups are
//! O(1)-amortized against lowercased hash sets; regex entries are scanned.

use redact_core::EntityType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Scope of a deny-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyScope {
    /// Applies to every entity type and language.
    Global,
    /// Applies to one entity type.
    EntityType(EntityType),
    /// Applies to one language (lowercase ISO code).
    Language(String),
}

/// False-positive suppression list.
#[derive(Debug, Default)]
pub struct DenyList {
    literals: HashMap<DenyScope, HashSet<String>>,
    patterns: HashMap<DenyScope, Vec<Regex>>,
}

impl DenyList {
    /// Creates an empty deny-list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in list for business documents.
    #[must_use]
    pub fn builtin() -> Self {
        let mut list = Self::new();

        // Document labels commonly misread as person names.
        for word in [
            "Montant", "Total", "Betrag", "Rechnung", "Facture", "Fattura", "Invoice", "Datum",
            "Date", "Seite", "Page", "Referenz", "Référence",
        ] {
            list.add_literal(word, DenyScope::EntityType(EntityType::PersonName));
        }

        // Salutation-adjacent words that are not organizations.
        for word in ["Abteilung", "Département", "Department"] {
            list.add_literal(word, DenyScope::EntityType(EntityType::Organization));
        }

        // Obvious non-values in any scope.
        for word in ["N/A", "XXX", "TBD", "unbekannt", "inconnu"] {
            list.add_literal(word, DenyScope::Global);
        }

        list
    }

    /// Adds a literal entry, stored lowercased.
    pub fn add_literal(&mut self, literal: impl Into<String>, scope: DenyScope) {
        self.literals
            .entry(scope)
            .or_default()
            .insert(literal.into().trim().to_lowercase());
    }

    /// Adds a regex entry. The pattern is made case-insensitive.
    /// Invalid patterns are logged and skipped.
    pub fn add_pattern(&mut self, pattern: &str, scope: DenyScope) {
        match Regex::new(&format!("(?i)^{pattern}$")) {
            Ok(regex) => self.patterns.entry(scope).or_default().push(regex),
            Err(e) => warn!("failed to compile deny pattern '{pattern}': {e}"),
        }
    }

    /// Returns true if the text is denied for the entity type and language.
    /// Matching is case-insensitive in every scope.
    #[must_use]
    pub fn is_denied(&self, text: &str, entity_type: EntityType, language: &str) -> bool {
        let scopes = [
            DenyScope::Global,
            DenyScope::EntityType(entity_type),
            DenyScope::Language(language.to_lowercase()),
        ];
        let needle = text.trim().to_lowercase();
        for scope in &scopes {
            if self
                .literals
                .get(scope)
                .is_some_and(|set| set.contains(&needle))
            {
                return true;
            }
            if self
                .patterns
                .get(scope)
                .is_some_and(|regexes| regexes.iter().any(|r| r.is_match(text.trim())))
            {
                return true;
            }
        }
        false
    }

    /// Clears all entries. Test harness use only.
    pub fn reset(&mut self) {
        self.literals.clear();
        self.patterns.clear();
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.values().map(HashSet::len).sum::<usize>()
            + self.patterns.values().map(Vec::len).sum::<usize>()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_and_idempotent() {
        let list = DenyList::builtin();
        let s = "Montant";
        let denied = list.is_denied(s, EntityType::PersonName, "fr");
        assert!(denied);
        assert_eq!(
            denied,
            list.is_denied(&s.to_uppercase(), EntityType::PersonName, "fr")
        );
        assert_eq!(
            denied,
            list.is_denied(&s.to_lowercase(), EntityType::PersonName, "fr")
        );
        // Idempotent: repeated queries agree.
        assert_eq!(denied, list.is_denied(s, EntityType::PersonName, "fr"));
    }

    #[test]
    fn test_scoping() {
        let list = DenyList::builtin();
        // "Montant" is denied for person names, not for amounts.
        assert!(list.is_denied("Montant", EntityType::PersonName, "fr"));
        assert!(!list.is_denied("Montant", EntityType::Amount, "fr"));
        // Global entries are denied everywhere.
        assert!(list.is_denied("N/A", EntityType::Amount, "de"));
    }

    #[test]
    fn test_language_scope() {
        let mut list = DenyList::new();
        list.add_literal("lieu", DenyScope::Language("fr".into()));
        assert!(list.is_denied("Lieu", EntityType::City, "FR"));
        assert!(!list.is_denied("Lieu", EntityType::City, "de"));
    }

    #[test]
    fn test_runtime_pattern() {
        let mut list = DenyList::new();
        list.add_pattern(r"page \d+", DenyScope::Global);
        assert!(list.is_denied("Page 3", EntityType::PersonName, "en"));
        assert!(!list.is_denied("Page trois", EntityType::PersonName, "en"));
    }

    #[test]
    fn test_reset() {
        let mut list = DenyList::builtin();
        assert!(!list.is_empty());
        list.reset();
        assert!(list.is_empty());
        assert!(!list.is_denied("Montant", EntityType::PersonName, "fr"));
    }
}
