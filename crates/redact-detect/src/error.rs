//! Detection error types.

use thiserror::Error;

/// Detection result type.
pub type DetectResult<T> = Result<T, DetectError>;

/// Detection errors.
#[derive(Error, Debug)]
pub enum DetectError {
    /// A recognizer with the same name is already registered.
    #[error("recognizer '{0}' is already registered")]
    DuplicateName(String),

    /// The registry was queried before any recognizer was loaded.
    #[error("recognizer registry is not initialized: no recognizers loaded")]
    NotInitialized,

    /// A validator is already registered for the entity type.
    #[error("validator for entity type '{0}' is already registered")]
    DuplicateValidator(String),

    /// Pattern compilation error.
    #[error("pattern compilation error: {0}")]
    PatternCompilation(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Recognizer configuration failed schema validation.
    #[error("recognizer config rejected: {} violation(s)", violations.len())]
    ConfigViolations {
        /// All schema violations found, not just the first.
        violations: Vec<ConfigViolation>,
    },

    /// A single recognizer failed during analysis (isolated, recorded).
    #[error("recognizer '{name}' failed: {message}")]
    RecognizerFailed {
        /// Recognizer name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DetectError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "DETECT_DUPLICATE_NAME",
            Self::NotInitialized => "DETECT_NOT_INITIALIZED",
            Self::DuplicateValidator(_) => "DETECT_DUPLICATE_VALIDATOR",
            Self::PatternCompilation(_) => "DETECT_PATTERN_COMPILATION",
            Self::InvalidConfig(_) => "DETECT_INVALID_CONFIG",
            Self::ConfigViolations { .. } => "DETECT_CONFIG_VIOLATIONS",
            Self::RecognizerFailed { .. } => "DETECT_RECOGNIZER_FAILED",
            Self::Internal(_) => "DETECT_INTERNAL_ERROR",
        }
    }

    /// Returns true if the error degrades gracefully inside the pipeline
    /// rather than being surfaced to the integrator.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RecognizerFailed { .. })
    }
}

impl From<regex::Error> for DetectError {
    fn from(e: regex::Error) -> Self {
        Self::PatternCompilation(e.to_string())
    }
}

/// One schema violation found while loading recognizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigViolation {
    /// Index of the offending recognizer definition.
    pub index: usize,
    /// Field that failed validation.
    pub field: String,
    /// Violation message.
    pub message: String,
}

impl std::fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.index, self.field, self.message)
    }
}
