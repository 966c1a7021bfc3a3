use thiserror::Error;

/// Result type for calculator profile operations
pub type Result<T> = std::result::Result<T, CalculatorError>;

/// Errors raised while loading or validating a calculator profile.
///
/// Computations themselves never fail; every check lives here and runs once, when a
/// profile is loaded.
#[derive(Error, Debug)]
pub enum CalculatorError {
    /// The profile could not be parsed as JSON or TOML
    #[error("Profile parse error: {0}")]
    Parse(String),

    /// IO error occurred while reading a profile
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bracket list does not cover [0, ∞) exactly once
    #[error("Invalid budget brackets: {0}")]
    InvalidBrackets(String),

    /// Rate table shape or values are wrong
    #[error("Invalid rate table: {0}")]
    InvalidRates(String),

    /// Workflow phase weights are out of range or do not sum to 1
    #[error("Invalid workflow phases: {0}")]
    InvalidPhases(String),

    /// Client tier definition is unusable
    #[error("Invalid client tier '{id}': {reason}")]
    InvalidTier { id: String, reason: String },

    /// Earnings variant constants are unusable
    #[error("Invalid earnings variant '{id}': {reason}")]
    InvalidEarnings { id: String, reason: String },

    /// The same id appears twice in one list
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
}

impl CalculatorError {
    pub fn brackets(msg: impl Into<String>) -> Self {
        Self::InvalidBrackets(msg.into())
    }

    pub fn rates(msg: impl Into<String>) -> Self {
        Self::InvalidRates(msg.into())
    }

    pub fn phases(msg: impl Into<String>) -> Self {
        Self::InvalidPhases(msg.into())
    }
}
