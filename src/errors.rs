//! Error taxonomy for flow-log parsing and validation.

use std::fmt;

use thiserror::Error;

/// Structural parsing failure (wrong field count, malformed line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// A field-contract violation in a structurally valid record.
///
/// `field` carries the provider's kebab-case field name so errors read
/// the way the flow-log documentation spells them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub expected: Option<String>,
    pub actual: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected {
            Some(expected) => write!(
                f,
                "{}: expected '{}', got '{}'",
                self.message, expected, self.actual
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Sum of the two record-local failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowLogError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl FlowLogError {
    /// The kebab-case field name, when the failure is field-scoped.
    pub fn field(&self) -> Option<&str> {
        match self {
            FlowLogError::Parse(_) => None,
            FlowLogError::Validation(err) => Some(&err.field),
        }
    }
}
