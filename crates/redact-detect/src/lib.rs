//! Multi-pass PII detection engine.
//!
//! Detection runs as a fixed pipeline: a high-recall pass collects
//! candidates from pattern recognizers and an optional token-classification
//! model, then successive passes suppress deny-listed terms, verify
//! checksums and formats, adjust confidence from surrounding context, fold
//! address fragments into composite addresses, apply document-type boosts,
//! and consolidate everything into a non-overlapping entity list with
//! stable logical IDs.
//!
//! ```no_run
//! use redact_detect::DetectionPipeline;
//!
//! # fn main() -> Result<(), redact_detect::DetectError> {
//! let pipeline = DetectionPipeline::builder().build()?;
//! let result = pipeline.detect("IBAN: CH93 0076 2011 6238 5295 7")?;
//! for entity in &result.entities {
//!     println!("{} {:.2} {}", entity.entity_type, entity.confidence, entity.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod consolidate;
pub mod context;
pub mod denylist;
pub mod doctype;
pub mod error;
pub mod mapping;
pub mod ml;
pub mod pipeline;
pub mod recognizer;
pub mod recognizers;
pub mod registry;
pub mod validators;

pub use address::{AddressLinker, AddressLinkerConfig};
pub use config::{
    ContextWordEntry, DetectionConfig, PassToggles, PatternEntry, RecognizerConfigFile,
    RecognizerDefinition,
};
pub use consolidate::{Consolidator, ConsolidatorConfig, OffsetMap};
pub use context::{ContextEnhancer, ContextWord, ContextWordDb, EnhancerConfig, Polarity};
pub use denylist::{DenyList, DenyScope};
pub use doctype::{Classification, ClassifierConfig, DocumentClassifier};
pub use error::{ConfigViolation, DetectError, DetectResult};
pub use mapping::{anonymize, build_mapping, PlaceholderGenerator};
pub use ml::{NullClassifier, TokenClassifier, TokenSpan};
pub use pipeline::{DetectionPass, DetectionPipeline, PassContext, PassDelta, PipelineBuilder};
pub use recognizer::{
    PatternDefinition, PatternRecognizer, RecognizerBuilder, RecognizerMatch, Specificity,
};
pub use recognizers::register_builtin;
pub use registry::{AnalysisOutput, RecognizerRegistry, DEFAULT_LOW_CONFIDENCE_MULTIPLIER};
pub use validators::{ValidatorConfidence, ValidatorRegistry, ValidatorReport};
