//! The blueprint spec aggregate and its state transitions.
//!
//! Every transition updates conditions in place and appends to the event log
//! only when a condition (or a derived result) actually changed, so running the
//! same transition twice is harmless.

use blueprint_core::{validate_statically, Blueprint, BlueprintMask, EffectiveBlueprint};
use blueprint_diff::{determine_state_diff, Action, DiffError, StateDiff};
use blueprint_ecosystem::{EcosystemState, HealthResult, ResolvedReferences};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::condition::{reason, ConditionStatus, ConditionType, Conditions};
use crate::event::Event;
use crate::{LifecycleError, LifecycleResult};

/// Flags controlling how a blueprint spec is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecConfig {
    pub allow_dogu_namespace_switch: bool,
    /// Evaluate but never apply.
    pub stopped: bool,
    pub ignore_dogu_health: bool,
    pub ignore_component_health: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintSpec {
    pub id: String,
    pub blueprint: Blueprint,
    #[serde(default)]
    pub mask: BlueprintMask,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_blueprint: Option<EffectiveBlueprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_diff: Option<StateDiff>,
    #[serde(default)]
    pub config: SpecConfig,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(skip)]
    events: Vec<Event>,
}

impl BlueprintSpec {
    pub fn new(id: impl Into<String>, blueprint: Blueprint, mask: BlueprintMask, config: SpecConfig) -> Self {
        Self { id: id.into(), blueprint, mask, config, ..Default::default() }
    }

    pub fn events(&self) -> &[Event] { &self.events }

    pub fn drain_events(&mut self) -> Vec<Event> { std::mem::take(&mut self.events) }

    /// Set a condition; on change log it, count it and append `event` if given.
    fn transition(&mut self, ty: ConditionType, status: ConditionStatus, why: &str, message: impl Into<String>, event: Option<Event>) -> bool {
        let changed = self.conditions.set(ty, status, why, message);
        if changed {
            counter!("blueprint_condition_transitions_total", 1u64, "condition" => ty.as_str());
            info!(blueprint = %self.id, condition = %ty, status = %status, reason = why, "condition changed");
            if let Some(e) = event { self.events.push(e); }
        }
        changed
    }

    /// Only a failure touches `Valid`; it becomes true in
    /// [`validate_dynamically`](Self::validate_dynamically), the last validity
    /// step of a cycle. A failing later step then never flips it back and forth.
    pub fn validate_statically(&mut self) -> LifecycleResult<()> {
        match validate_statically(&self.blueprint, &self.mask, self.config.allow_dogu_namespace_switch) {
            Ok(()) => Ok(()),
            Err(e) => {
                let error = e.to_string();
                self.transition(ConditionType::Valid, ConditionStatus::False, reason::INVALID, error.clone(), Some(Event::BlueprintSpecInvalid { error: error.clone() }));
                Err(LifecycleError::InvalidBlueprint(error))
            }
        }
    }

    /// Record the result of external dependency resolution (e.g. dogu
    /// dependencies checked against a registry).
    pub fn validate_dynamically(&mut self, dependency_error: Option<String>) -> LifecycleResult<()> {
        match dependency_error {
            None => {
                self.transition(ConditionType::Valid, ConditionStatus::True, reason::VALID, "", None);
                Ok(())
            }
            Some(error) => {
                self.transition(ConditionType::Valid, ConditionStatus::False, reason::INVALID_DEPENDENCIES, error.clone(), Some(Event::BlueprintSpecInvalid { error: error.clone() }));
                Err(LifecycleError::InvalidBlueprint(error))
            }
        }
    }

    pub fn calculate_effective_blueprint(&mut self) -> LifecycleResult<&EffectiveBlueprint> {
        let effective = match EffectiveBlueprint::calculate(&self.blueprint, &self.mask, self.config.allow_dogu_namespace_switch) {
            Ok(eff) => eff,
            Err(e) => {
                let error = e.to_string();
                self.transition(ConditionType::Valid, ConditionStatus::False, reason::INVALID_EFFECTIVE_BLUEPRINT, error.clone(), Some(Event::BlueprintSpecInvalid { error: error.clone() }));
                return Err(LifecycleError::PolicyViolation(error));
            }
        };
        if self.effective_blueprint.as_ref() != Some(&effective) {
            debug!(blueprint = %self.id, dogus = effective.dogus.len(), "effective blueprint changed");
            self.events.push(Event::EffectiveBlueprintCalculated);
        }
        Ok(self.effective_blueprint.insert(effective))
    }

    /// Apply the ignore flags to `health` and record the verdict. `Ok(false)`
    /// means known unhealthy; a collaborator error leaves the condition unknown.
    pub fn check_ecosystem_health(&mut self, health: Result<HealthResult, String>) -> LifecycleResult<bool> {
        let mut health = match health {
            Ok(h) => h,
            Err(error) => {
                self.transition(ConditionType::EcosystemHealthy, ConditionStatus::Unknown, reason::CANNOT_CHECK_HEALTH, error.clone(), Some(Event::EcosystemHealthUnknown { error: error.clone() }));
                return Err(LifecycleError::HealthUnknown(error));
            }
        };
        if self.config.ignore_dogu_health { health = health.without_dogus(); }
        if self.config.ignore_component_health { health = health.without_components(); }

        if health.all_healthy() {
            self.transition(ConditionType::EcosystemHealthy, ConditionStatus::True, reason::HEALTHY, "", Some(Event::EcosystemHealthy));
            Ok(true)
        } else {
            let summary = health.to_string();
            warn!(blueprint = %self.id, "ecosystem is unhealthy");
            self.transition(ConditionType::EcosystemHealthy, ConditionStatus::False, reason::UNHEALTHY, summary.clone(), Some(Event::EcosystemUnhealthy { summary }));
            Ok(false)
        }
    }

    /// Compute the state diff against `state` and decide whether it may be executed.
    pub fn determine_state_diff(&mut self, state: &EcosystemState, references: &ResolvedReferences) -> LifecycleResult<&StateDiff> {
        let Some(effective) = self.effective_blueprint.as_ref() else {
            return Err(LifecycleError::OutOfOrder("state diff requested before the effective blueprint was calculated".into()));
        };
        let diff = match determine_state_diff(effective, state, references) {
            Ok(d) => d,
            Err(e @ DiffError::MissingConfigReferences(_)) => {
                self.state_diff = None;
                let error = e.to_string();
                self.transition(ConditionType::Executable, ConditionStatus::Unknown, reason::MISSING_CONFIG_REFERENCES, error.clone(), Some(Event::MissingConfigReferences { error }));
                return Err(LifecycleError::MissingConfigReferences(e));
            }
        };

        if !self.config.allow_dogu_namespace_switch {
            let switching: Vec<String> = diff.dogus_needing(Action::SwitchDoguNamespace).iter().map(|d| d.dogu_name.to_string()).collect();
            if !switching.is_empty() {
                let why = format!("dogu namespace switch is not allowed but needed for: {}", switching.join(", "));
                self.state_diff = None;
                self.transition(ConditionType::Executable, ConditionStatus::False, reason::NAMESPACE_SWITCH_NOT_ALLOWED, why.clone(), Some(Event::ExecutionNotAllowed { reason: why.clone() }));
                return Err(LifecycleError::NotExecutable(why));
            }
        }

        self.transition(ConditionType::Executable, ConditionStatus::True, reason::EXECUTABLE, "", None);
        if self.state_diff.as_ref() != Some(&diff) {
            self.events.extend([
                Event::DoguStateDiffDetermined { counts: diff.dogu_action_counts() },
                Event::ComponentStateDiffDetermined { counts: diff.component_action_counts() },
                Event::DoguConfigDiffDetermined { counts: diff.dogu_config_action_counts() },
                Event::SensitiveDoguConfigDiffDetermined { counts: diff.sensitive_dogu_config_action_counts() },
                Event::GlobalConfigDiffDetermined { counts: diff.global_config_action_counts() },
            ]);
        }
        Ok(self.state_diff.insert(diff))
    }

    pub fn should_be_applied(&self) -> bool {
        if self.config.stopped {
            return false;
        }
        if !self.conditions.is_true(ConditionType::Completed) {
            return true;
        }
        self.state_diff.as_ref().is_some_and(StateDiff::has_actions)
    }

    pub fn complete(&mut self) {
        self.transition(ConditionType::Completed, ConditionStatus::True, reason::COMPLETED, "", Some(Event::Completed));
    }

    pub fn wait_for_self_upgrade(&mut self) {
        self.transition(ConditionType::SelfUpgradeCompleted, ConditionStatus::False, reason::AWAITING_SELF_UPGRADE, "", Some(Event::AwaitSelfUpgrade));
    }

    pub fn complete_self_upgrade(&mut self) {
        self.transition(ConditionType::SelfUpgradeCompleted, ConditionStatus::True, reason::SELF_UPGRADE_COMPLETED, "", Some(Event::SelfUpgradeCompleted));
    }
}
