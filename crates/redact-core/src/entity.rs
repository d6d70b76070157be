//! Entity types — the central unit of PII detection.

use crate::{EntityId, LogicalId};
use serde::{Deserialize, Serialize};

/// Types of personally identifiable information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Person's name.
    PersonName,
    /// Organization or company name.
    Organization,
    /// Composite postal address.
    Address,
    /// Street name (address component).
    StreetName,
    /// Street number (address component).
    StreetNumber,
    /// Postal code (address component).
    PostalCode,
    /// City (address component).
    City,
    /// Country (address component).
    Country,
    /// Region, canton, or state (address component).
    Region,
    /// National social-insurance number.
    SocialInsuranceNumber,
    /// Generic national ID.
    NationalId,
    /// Bank account number (IBAN).
    BankAccount,
    /// Credit card number.
    CreditCard,
    /// Payment reference number.
    PaymentReference,
    /// VAT / business identification number.
    VatId,
    /// Tax identification number.
    TaxId,
    /// Phone number.
    Phone,
    /// Email address.
    Email,
    /// Web URL.
    Url,
    /// IP address.
    IpAddress,
    /// Calendar date.
    Date,
    /// Date of birth.
    DateOfBirth,
    /// Monetary amount.
    Amount,
    /// Currency code or symbol.
    Currency,
    /// Passport number.
    PassportNumber,
    /// Driver's license number.
    DriversLicense,
    /// Insurance policy number.
    InsurancePolicy,
    /// Customer or client number.
    CustomerNumber,
    /// Invoice number.
    InvoiceNumber,
    /// Contract number.
    ContractNumber,
    /// Salary or compensation figure.
    Salary,
    /// Custom entity type.
    Custom,
}

impl EntityType {
    /// Returns the category of this entity type.
    #[must_use]
    pub const fn category(&self) -> EntityCategory {
        match self {
            Self::PersonName | Self::Organization => EntityCategory::Identity,
            Self::Address
            | Self::StreetName
            | Self::StreetNumber
            | Self::PostalCode
            | Self::City
            | Self::Country
            | Self::Region => EntityCategory::Location,
            Self::SocialInsuranceNumber
            | Self::NationalId
            | Self::PassportNumber
            | Self::DriversLicense => EntityCategory::GovernmentId,
            Self::BankAccount
            | Self::CreditCard
            | Self::PaymentReference
            | Self::VatId
            | Self::TaxId
            | Self::Amount
            | Self::Currency
            | Self::Salary => EntityCategory::Financial,
            Self::Phone | Self::Email | Self::Url | Self::IpAddress => EntityCategory::Contact,
            Self::Date | Self::DateOfBirth => EntityCategory::Temporal,
            Self::InsurancePolicy
            | Self::CustomerNumber
            | Self::InvoiceNumber
            | Self::ContractNumber => EntityCategory::Reference,
            Self::Custom => EntityCategory::Other,
        }
    }

    /// Returns true if this type is a component of a composite address.
    #[must_use]
    pub const fn is_address_component(&self) -> bool {
        matches!(
            self,
            Self::StreetName
                | Self::StreetNumber
                | Self::PostalCode
                | Self::City
                | Self::Country
                | Self::Region
        )
    }

    /// Consolidation priority when spans of different types overlap.
    /// Higher values win the overlap.
    #[must_use]
    pub const fn overlap_priority(&self) -> u8 {
        match self {
            Self::SocialInsuranceNumber | Self::BankAccount | Self::CreditCard => 100,
            Self::VatId | Self::TaxId | Self::PassportNumber | Self::DriversLicense => 90,
            Self::Email | Self::Phone | Self::IpAddress | Self::Url => 80,
            Self::Address => 75,
            Self::PersonName | Self::Organization => 70,
            Self::PaymentReference
            | Self::InsurancePolicy
            | Self::CustomerNumber
            | Self::InvoiceNumber
            | Self::ContractNumber => 60,
            Self::PostalCode | Self::City | Self::StreetName | Self::StreetNumber => 50,
            Self::Country | Self::Region => 45,
            Self::DateOfBirth => 40,
            Self::Date => 35,
            Self::Amount | Self::Salary | Self::Currency => 30,
            Self::NationalId => 85,
            Self::Custom => 10,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// Category of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Names of people and organizations.
    Identity,
    /// Addresses and address components.
    Location,
    /// Government-issued identifiers.
    GovernmentId,
    /// Financial identifiers and figures.
    Financial,
    /// Contact channels.
    Contact,
    /// Dates.
    Temporal,
    /// Business reference numbers.
    Reference,
    /// Other/custom.
    Other,
}

/// Where a detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitySource {
    /// ML token-classification model.
    Ml,
    /// Pattern recognizer.
    Rule,
    /// Both ML and rule agreed on the span.
    Both,
    /// Manually added by a reviewer.
    Manual,
}

/// Outcome of a format/checksum validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    /// Validation status.
    pub status: ValidationStatus,
    /// Human-readable reason for the outcome.
    pub reason: Option<String>,
}

impl Validation {
    /// Creates a valid outcome.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            status: ValidationStatus::Valid,
            reason: None,
        }
    }

    /// Creates an invalid outcome with a reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Invalid,
            reason: Some(reason.into()),
        }
    }
}

/// Validation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// Passed a checksum or format check.
    Valid,
    /// Failed a checksum or format check.
    Invalid,
    /// No validator ran for this entity.
    Unchecked,
}

/// Confidence adjustment produced by the context enhancer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextScore {
    /// Net confidence delta applied (may be negative).
    pub adjustment: f64,
    /// Context words that contributed, in match order.
    pub factors: Vec<String>,
}

/// A typed sub-span of a composite address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    /// Component type (must be an address component type).
    pub component_type: EntityType,
    /// Component text.
    pub text: String,
    /// Start offset in the document.
    pub start: usize,
    /// End offset in the document (exclusive).
    pub end: usize,
    /// Whether this component was folded into a grouped address.
    pub linked: bool,
    /// Logical ID of the address group it was folded into.
    pub group: Option<LogicalId>,
}

/// Component-ordering pattern family a grouped address matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPattern {
    /// Street [number], postal code, city (national convention).
    Swiss,
    /// Street [number], city, postal code orderings seen in EU documents.
    EuGeneric,
    /// Postal code and city preceding the street.
    Alternative,
    /// Only a subset of components present.
    Partial,
}

/// Validation status of a grouped address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressStatus {
    /// All required components matched a known pattern.
    Valid,
    /// A subset of components matched.
    Partial,
    /// Components are proximate but ordering is ambiguous.
    Uncertain,
}

/// A composite address assembled from proximate components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedAddress {
    /// Group identifier shared with the folded components.
    pub group_id: LogicalId,
    /// Components folded into this address, in document order.
    pub components: Vec<AddressComponent>,
    /// Pattern family that matched.
    pub pattern: AddressPattern,
    /// Validation status.
    pub status: AddressStatus,
}

/// A detected PII span with type, confidence, and source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier.
    pub id: EntityId,
    /// Entity type.
    pub entity_type: EntityType,
    /// Matched text.
    pub text: String,
    /// Start character offset into the (normalized) text.
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f64,
    /// Detection source.
    pub source: EntitySource,
    /// Name of the recognizer that produced the match (rule sources).
    #[serde(default)]
    pub recognizer: Option<String>,
    /// Format/checksum validation outcome.
    pub validation: Option<Validation>,
    /// Context-scoring outcome.
    pub context: Option<ContextScore>,
    /// Address components, for composite address entities.
    pub components: Option<Vec<AddressComponent>>,
    /// Groups repeated mentions of the same real-world entity.
    pub logical_id: Option<LogicalId>,
    /// Flagged for human review (low confidence).
    pub flagged_for_review: bool,
}

impl Entity {
    /// Creates a new entity. Confidence is clamped to 0.0 - 1.0.
    pub fn new(
        entity_type: EntityType,
        text: impl Into<String>,
        start: usize,
        end: usize,
        confidence: f64,
        source: EntitySource,
    ) -> Self {
        debug_assert!(start < end, "entity span must be non-empty");
        Self {
            id: EntityId::new(),
            entity_type,
            text: text.into(),
            start,
            end,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            recognizer: None,
            validation: None,
            context: None,
            components: None,
            logical_id: None,
            flagged_for_review: false,
        }
    }

    /// Sets the producing recognizer name.
    #[must_use]
    pub fn with_recognizer(mut self, name: impl Into<String>) -> Self {
        self.recognizer = Some(name.into());
        self
    }

    /// Sets the validation outcome.
    #[must_use]
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Sets address components. Only meaningful for `EntityType::Address`.
    #[must_use]
    pub fn with_components(mut self, components: Vec<AddressComponent>) -> Self {
        self.components = Some(components);
        self
    }

    /// Adjusts confidence, keeping it within 0.0 - 1.0.
    pub fn adjust_confidence(&mut self, delta: f64) {
        self.confidence = (self.confidence + delta).clamp(0.0, 1.0);
    }

    /// Returns the span length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the span is empty (invalid state).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns true if this entity's span overlaps another's.
    #[must_use]
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Checks the structural invariants: non-empty span, confidence in
    /// range, and components only on composite address entities.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.start >= self.end {
            return false;
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return false;
        }
        if let Some(components) = &self.components {
            if self.entity_type != EntityType::Address {
                return false;
            }
            if components
                .iter()
                .any(|c| !c.component_type.is_address_component())
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let e = Entity::new(EntityType::Email, "a@b.ch", 0, 6, 1.7, EntitySource::Rule);
        assert!((e.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overlap() {
        let a = Entity::new(EntityType::Email, "a@b.ch", 5, 11, 0.9, EntitySource::Rule);
        let b = Entity::new(EntityType::Url, "b.ch", 7, 11, 0.5, EntitySource::Rule);
        let c = Entity::new(EntityType::Phone, "0791234567", 20, 30, 0.8, EntitySource::Rule);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_components_require_address_type() {
        let component = AddressComponent {
            component_type: EntityType::PostalCode,
            text: "8004".to_string(),
            start: 10,
            end: 14,
            linked: true,
            group: None,
        };
        let mut e = Entity::new(
            EntityType::Address,
            "Seestrasse 12, 8004 Zürich",
            0,
            26,
            0.9,
            EntitySource::Rule,
        )
        .with_components(vec![component.clone()]);
        assert!(e.is_consistent());

        e.entity_type = EntityType::PersonName;
        assert!(!e.is_consistent());
    }

    #[test]
    fn test_component_type_check() {
        let bogus = AddressComponent {
            component_type: EntityType::Email,
            text: "a@b.ch".to_string(),
            start: 0,
            end: 6,
            linked: false,
            group: None,
        };
        let e = Entity::new(EntityType::Address, "a@b.ch", 0, 6, 0.9, EntitySource::Rule)
            .with_components(vec![bogus]);
        assert!(!e.is_consistent());
    }

    #[test]
    fn test_overlap_priority_ordering() {
        assert!(EntityType::BankAccount.overlap_priority() > EntityType::Date.overlap_priority());
        assert!(EntityType::Email.overlap_priority() > EntityType::PostalCode.overlap_priority());
    }

    #[test]
    fn test_category() {
        assert_eq!(EntityType::BankAccount.category(), EntityCategory::Financial);
        assert_eq!(EntityType::PostalCode.category(), EntityCategory::Location);
        assert!(EntityType::PostalCode.is_address_component());
        assert!(!EntityType::Email.is_address_component());
    }
}
