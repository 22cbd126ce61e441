//! Blueprint lifecycle: the blueprint spec aggregate, its status conditions,
//! the event log and the evaluation cycle that drives them.

#![forbid(unsafe_code)]

pub mod condition;
pub mod cycle;
pub mod event;
pub mod spec;

pub use condition::{reason, Condition, ConditionStatus, ConditionType, Conditions};
pub use cycle::{evaluate, CycleInput, CycleOutcome, CycleResult};
pub use event::Event;
pub use spec::{BlueprintSpec, SpecConfig};

use blueprint_diff::DiffError;

/// Why a lifecycle step stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("blueprint spec is invalid: {0}")]
    InvalidBlueprint(String),
    #[error("blueprint spec violates policy: {0}")]
    PolicyViolation(String),
    #[error(transparent)]
    MissingConfigReferences(#[from] DiffError),
    #[error("ecosystem health is unknown: {0}")]
    HealthUnknown(String),
    #[error("blueprint spec is not executable: {0}")]
    NotExecutable(String),
    /// A step was called before the step it depends on.
    #[error("blueprint spec step out of order: {0}")]
    OutOfOrder(String),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
