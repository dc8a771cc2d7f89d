//! Error types.
//!
//! Stat evaluation itself never fails: cycles become `NaN` and unresolvable
//! formulas become text. The errors here belong to the plumbing around the
//! engine (authorization, loading, configuration) and to the formula parser,
//! whose errors are caught inside [`crate::formula::evaluate`].

use crate::record::CharacterId;
use thiserror::Error;

/// Errors raised around a recompute.
///
/// # Examples
///
/// ```rust
/// use statsheet::{CharacterId, StatError};
///
/// let err = StatError::CharacterNotFound(CharacterId::new("c-42"));
/// assert_eq!(err.to_string(), "Character not found: c-42");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatError {
    /// The caller may not edit this character. Raised before the engine runs.
    #[error("Permission denied: cannot recompute character {character}")]
    PermissionDenied { character: CharacterId },

    /// The loader has no records for this character.
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// The loader failed to produce records.
    #[error("Failed to load records: {0}")]
    Load(String),

    /// The engine configuration could not be read.
    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}

/// Errors from parsing or evaluating a substituted formula.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Empty expression")]
    Empty,

    /// An identifier survived substitution.
    #[error("Unresolved identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("Unexpected '{token}' at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
}
