//! One evaluation cycle over a blueprint spec.

use blueprint_core::SimpleName;
use blueprint_ecosystem::{EcosystemState, HealthResult, ResolvedReferences};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::event::Event;
use crate::spec::BlueprintSpec;
use crate::LifecycleError;

/// External inputs gathered by the caller before a cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleInput {
    #[serde(default)]
    pub ecosystem: EcosystemState,
    #[serde(default)]
    pub references: ResolvedReferences,
    /// Components that must be installed for the ecosystem to count as healthy.
    #[serde(default)]
    pub required_components: Vec<SimpleName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_error: Option<String>,
    /// Set when the health collaborator itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CycleOutcome {
    Invalid,
    Unhealthy,
    NotExecutable,
    MissingReferences,
    Ready { should_apply: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleResult {
    pub spec: BlueprintSpec,
    pub events: Vec<Event>,
    pub outcome: CycleOutcome,
}

impl From<&LifecycleError> for CycleOutcome {
    fn from(e: &LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidBlueprint(_) | LifecycleError::PolicyViolation(_) => Self::Invalid,
            LifecycleError::HealthUnknown(_) => Self::Unhealthy,
            LifecycleError::NotExecutable(_) | LifecycleError::OutOfOrder(_) => Self::NotExecutable,
            LifecycleError::MissingConfigReferences(_) => Self::MissingReferences,
        }
    }
}

/// Static validation, effective blueprint, dynamic validation, health gate and
/// state diff, stopping at the first step that fails. The spec is consumed and
/// handed back together with the events of this cycle.
pub fn evaluate(mut spec: BlueprintSpec, input: CycleInput) -> CycleResult {
    let outcome = match run(&mut spec, &input) {
        Ok(outcome) => outcome,
        Err(e) => {
            info!(blueprint = %spec.id, error = %e, "evaluation cycle stopped");
            CycleOutcome::from(&e)
        }
    };
    let events = spec.drain_events();
    CycleResult { spec, events, outcome }
}

fn run(spec: &mut BlueprintSpec, input: &CycleInput) -> Result<CycleOutcome, LifecycleError> {
    spec.validate_statically()?;
    spec.calculate_effective_blueprint()?;
    spec.validate_dynamically(input.dependency_error.clone())?;

    let health = match &input.health_error {
        Some(e) => Err(e.clone()),
        None => Ok(HealthResult::calculate(&input.ecosystem, &input.required_components)),
    };
    if !spec.check_ecosystem_health(health)? {
        return Ok(CycleOutcome::Unhealthy);
    }

    spec.determine_state_diff(&input.ecosystem, &input.references)?;
    Ok(CycleOutcome::Ready { should_apply: spec.should_be_applied() })
}
