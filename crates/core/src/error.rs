//! Aggregated validation errors.
//!
//! Validation never stops at the first problem: every check appends to a
//! [`Problems`] list and the caller turns a non-empty list into one error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered list of human-readable problems found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problems(Vec<String>);

impl Problems {
    pub fn new() -> Self { Self(Vec::new()) }

    pub fn push(&mut self, problem: impl Into<String>) { self.0.push(problem.into()); }

    /// Append all problems of `other`, each prefixed with `prefix: `.
    pub fn extend_prefixed(&mut self, prefix: &str, other: Problems) {
        self.0.extend(other.0.into_iter().map(|p| format!("{}: {}", prefix, p)));
    }

    pub fn extend(&mut self, other: Problems) { self.0.extend(other.0); }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(|s| s.as_str()) }

    /// `Ok(())` when empty, otherwise the problems wrapped by `wrap`.
    pub fn into_result<E>(self, wrap: impl FnOnce(Problems) -> E) -> Result<(), E> {
        if self.is_empty() { Ok(()) } else { Err(wrap(self)) }
    }
}

impl fmt::Display for Problems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 { f.write_str("\n")?; }
            write!(f, "- {}", p)?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for Problems {
    fn from(v: Vec<String>) -> Self { Self(v) }
}

/// Structural or policy problems of a blueprint, a mask or their combination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("blueprint is invalid:\n{0}")]
    Blueprint(Problems),
    #[error("blueprint mask is invalid:\n{0}")]
    Mask(Problems),
    #[error("blueprint mask does not match the blueprint:\n{0}")]
    MaskMismatch(Problems),
    #[error("could not calculate effective blueprint:\n{0}")]
    EffectiveBlueprint(Problems),
}

impl ValidationError {
    pub fn problems(&self) -> &Problems {
        match self {
            Self::Blueprint(p) | Self::Mask(p) | Self::MaskMismatch(p) | Self::EffectiveBlueprint(p) => p,
        }
    }
}

/// Several validation errors reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_all(.0))]
pub struct AggregateError(pub Vec<ValidationError>);

impl AggregateError {
    /// `Ok(())` if no error was collected.
    pub fn from_errors(errors: Vec<ValidationError>) -> Result<(), AggregateError> {
        if errors.is_empty() { Ok(()) } else { Err(AggregateError(errors)) }
    }

    pub fn errors(&self) -> &[ValidationError] { &self.0 }
}

fn render_all(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n")
}
