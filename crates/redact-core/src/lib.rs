//! Shared data model for the redact PII detection pipeline.
//!
//! This crate holds the vocabulary used by every pipeline component:
//! entities, typed identifiers, document classification, pass metadata,
//! and the anonymization mapping contract.

pub mod document;
pub mod entity;
pub mod id;

pub use document::{
    DetectionResult, DetectionStats, DocumentMapping, DocumentType, MappingEntry, PassOutcome,
};
pub use entity::{
    AddressComponent, AddressPattern, AddressStatus, ContextScore, Entity, EntityCategory,
    EntitySource, EntityType, GroupedAddress, Validation, ValidationStatus,
};
pub use id::{DocumentId, EntityId, LogicalId};
