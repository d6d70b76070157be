//! Address relationship linking.
//!
//! Separately detected address fragments (street, number, postal code,
//! city, country) are folded into one composite address entity when they
//! sit within a bounded proximity window and match a known
//! component-ordering pattern.

use crate::validators::postal::{validate_postal_code, PostalValidatorConfig};
use redact_core::{
    AddressComponent, AddressPattern, AddressStatus, Entity, EntitySource, EntityType,
    GroupedAddress, LogicalId,
};
use serde::{Deserialize, Serialize};

/// Address linker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressLinkerConfig {
    /// Maximum gap in characters between consecutive components of one
    /// address group.
    pub proximity_window: usize,
    /// Minimum number of components to form a group.
    pub min_components: usize,
    /// Postal-code disambiguation tables.
    pub postal: PostalValidatorConfig,
}

impl Default for AddressLinkerConfig {
    fn default() -> Self {
        Self {
            proximity_window: 60,
            min_components: 2,
            postal: PostalValidatorConfig::default(),
        }
    }
}

/// How a postal-code candidate fares before clustering.
enum PostalScreen {
    /// Eligible to join an address group.
    Component,
    /// Plausible code but nothing address-like follows; stays standalone.
    Standalone,
    /// A year or other non-address number; dropped.
    Reject,
}

/// Folds proximate address components into composite address entities.
#[derive(Debug, Clone, Default)]
pub struct AddressLinker {
    config: AddressLinkerConfig,
}

impl AddressLinker {
    /// Creates a linker with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates with custom configuration.
    #[must_use]
    pub fn with_config(config: AddressLinkerConfig) -> Self {
        Self { config }
    }

    /// Links address components in the entity list.
    ///
    /// Component entities folded into a group are removed from the list
    /// and replaced by one composite `Address` entity per group; all other
    /// entities pass through untouched. Returns the new list and the
    /// grouped addresses that were formed.
    #[must_use]
    pub fn link(&self, entities: Vec<Entity>, text: &str) -> (Vec<Entity>, Vec<GroupedAddress>) {
        let mut components: Vec<Entity> = Vec::new();
        let mut rest: Vec<Entity> = Vec::new();
        for e in entities {
            if e.entity_type == EntityType::PostalCode {
                match self.screen_postal(&e, text) {
                    PostalScreen::Component => components.push(e),
                    PostalScreen::Standalone => rest.push(e),
                    PostalScreen::Reject => {}
                }
            } else if e.entity_type.is_address_component() {
                components.push(e);
            } else {
                rest.push(e);
            }
        }
        components.sort_by_key(|e| e.start);

        let mut groups: Vec<GroupedAddress> = Vec::new();
        let mut ungrouped: Vec<Entity> = Vec::new();

        for cluster in cluster_by_proximity(components, self.config.proximity_window) {
            if cluster.len() < self.config.min_components {
                ungrouped.extend(cluster);
                continue;
            }
            let (pattern, status) = classify_ordering(&cluster);
            let group_id = LogicalId::new();
            let start = cluster.first().map(|e| e.start).unwrap_or(0);
            let end = cluster.last().map(|e| e.end).unwrap_or(0);

            let address_components: Vec<AddressComponent> = cluster
                .iter()
                .map(|e| AddressComponent {
                    component_type: e.entity_type,
                    text: e.text.clone(),
                    start: e.start,
                    end: e.end,
                    linked: true,
                    group: Some(group_id),
                })
                .collect();

            let confidence = composite_confidence(&cluster, status);
            let span_text = text
                .get(start..end)
                .map_or_else(|| cluster_text(&cluster), ToString::to_string);

            let mut composite = Entity::new(
                EntityType::Address,
                span_text,
                start,
                end,
                confidence,
                EntitySource::Rule,
            )
            .with_components(address_components.clone());
            composite.logical_id = Some(group_id);

            groups.push(GroupedAddress {
                group_id,
                components: address_components,
                pattern,
                status,
            });
            rest.push(composite);
        }

        rest.extend(ungrouped);
        rest.sort_by_key(|e| e.start);
        (rest, groups)
    }

    /// Screens a postal-code candidate through the year disambiguation
    /// tables and checks that something city-like follows it.
    fn screen_postal(&self, entity: &Entity, text: &str) -> PostalScreen {
        let before = text.get(..entity.start).unwrap_or("");
        let after = text.get(entity.end..).unwrap_or("");
        let following_word = after.split_whitespace().next();

        let report = validate_postal_code(&entity.text, before, following_word, &self.config.postal);
        if !report.is_valid {
            return PostalScreen::Reject;
        }
        let followed_by_word = after
            .trim_start()
            .chars()
            .next()
            .is_some_and(char::is_alphabetic);
        if followed_by_word {
            PostalScreen::Component
        } else {
            PostalScreen::Standalone
        }
    }
}

/// Splits position-sorted components into clusters whose consecutive gaps
/// stay within the window.
fn cluster_by_proximity(components: Vec<Entity>, window: usize) -> Vec<Vec<Entity>> {
    let mut clusters: Vec<Vec<Entity>> = Vec::new();
    for component in components {
        match clusters.last_mut() {
            Some(cluster)
                if component.start
                    <= cluster.last().map(|e| e.end).unwrap_or(0) + window =>
            {
                cluster.push(component);
            }
            _ => clusters.push(vec![component]),
        }
    }
    clusters
}

/// Classifies the component ordering against the known pattern families.
fn classify_ordering(cluster: &[Entity]) -> (AddressPattern, AddressStatus) {
    let order: Vec<EntityType> = cluster.iter().map(|e| e.entity_type).collect();

    let pos = |t: EntityType| order.iter().position(|&o| o == t);
    let street = pos(EntityType::StreetName);
    let postal = pos(EntityType::PostalCode);
    let city = pos(EntityType::City);

    match (street, postal, city) {
        (Some(s), Some(p), Some(c)) => {
            if s < p && p < c {
                // Street [number], postal code, city.
                (AddressPattern::Swiss, AddressStatus::Valid)
            } else if s < c && c < p {
                (AddressPattern::EuGeneric, AddressStatus::Valid)
            } else if p < c && c < s {
                (AddressPattern::Alternative, AddressStatus::Valid)
            } else {
                (AddressPattern::Partial, AddressStatus::Uncertain)
            }
        }
        // Postal code + city alone is the most common partial form.
        (None, Some(p), Some(c)) if p < c => (AddressPattern::Partial, AddressStatus::Partial),
        (Some(_), _, _) | (_, Some(_), _) | (_, _, Some(_)) => {
            (AddressPattern::Partial, AddressStatus::Partial)
        }
        _ => (AddressPattern::Partial, AddressStatus::Uncertain),
    }
}

fn composite_confidence(cluster: &[Entity], status: AddressStatus) -> f64 {
    let mean: f64 =
        cluster.iter().map(|e| e.confidence).sum::<f64>() / cluster.len().max(1) as f64;
    let bonus = match status {
        AddressStatus::Valid => 0.15,
        AddressStatus::Partial => 0.05,
        AddressStatus::Uncertain => 0.0,
    };
    (mean + bonus).clamp(0.0, 1.0)
}

fn cluster_text(cluster: &[Entity]) -> String {
    cluster
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
