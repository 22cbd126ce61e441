//! State diff engine: what has to change in the ecosystem to reach the
//! effective blueprint.
//!
//! The diff is recomputed wholesale on every cycle. Installed dogus and
//! components the blueprint does not mention are carried with an empty action
//! list; config keys are only diffed when the blueprint names them.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use blueprint_core::{EffectiveBlueprint, SimpleName};
use blueprint_ecosystem::{ConfigLookup, EcosystemState, ResolvedReferences};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub mod action;
pub mod component;
pub mod config;
pub mod dogu;

pub use action::{Action, NeededActions};
pub use component::{determine_component_diffs, ComponentDiff, ComponentDiffState};
pub use config::{config_action, determine_config_diffs, ConfigAction, ConfigEntryDiff, ConfigValueState, MissingReference, CENSOR_MARKER};
pub use dogu::{determine_dogu_diffs, mounts_differ, DoguDiff, DoguDiffState};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    #[error("{} config reference(s) could not be resolved:\n{}", .0.len(), render_missing(.0))]
    MissingConfigReferences(Vec<MissingReference>),
}

fn render_missing(missing: &[MissingReference]) -> String {
    missing.iter().map(|m| format!("- {}", m)).collect::<Vec<_>>().join("\n")
}

/// Number of entries per action name. Ordered so rendering is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCounts(BTreeMap<String, usize>);

impl ActionCounts {
    fn add(&mut self, action: impl fmt::Display) { *self.0.entry(action.to_string()).or_default() += 1; }

    pub fn total(&self) -> usize { self.0.values().sum() }

    pub fn get(&self, action: &str) -> usize { self.0.get(action).copied().unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for ActionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        write!(f, "{} action{}", total, if total == 1 { "" } else { "s" })?;
        if !self.0.is_empty() {
            let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// Reconciliation plan for one cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDiff {
    #[serde(default)]
    pub dogu_diffs: Vec<DoguDiff>,
    #[serde(default)]
    pub component_diffs: Vec<ComponentDiff>,
    #[serde(default)]
    pub dogu_config_diffs: BTreeMap<SimpleName, Vec<ConfigEntryDiff>>,
    /// Values are censored.
    #[serde(default)]
    pub sensitive_dogu_config_diffs: BTreeMap<SimpleName, Vec<ConfigEntryDiff>>,
    #[serde(default)]
    pub global_config_diffs: Vec<ConfigEntryDiff>,
}

impl StateDiff {
    pub fn has_actions(&self) -> bool {
        self.dogu_diffs.iter().any(|d| !d.needed_actions.is_empty())
            || self.component_diffs.iter().any(|c| !c.needed_actions.is_empty())
            || self.config_diffs().any(|c| c.needed_action != ConfigAction::None)
    }

    fn config_diffs(&self) -> impl Iterator<Item = &ConfigEntryDiff> {
        self.dogu_config_diffs
            .values()
            .flatten()
            .chain(self.sensitive_dogu_config_diffs.values().flatten())
            .chain(self.global_config_diffs.iter())
    }

    pub fn dogu_action_counts(&self) -> ActionCounts {
        let mut c = ActionCounts::default();
        self.dogu_diffs.iter().flat_map(|d| d.needed_actions.iter()).for_each(|a| c.add(a));
        c
    }

    pub fn component_action_counts(&self) -> ActionCounts {
        let mut c = ActionCounts::default();
        self.component_diffs.iter().flat_map(|d| d.needed_actions.iter()).for_each(|a| c.add(a));
        c
    }

    pub fn dogu_config_action_counts(&self) -> ActionCounts { count_config(self.dogu_config_diffs.values().flatten()) }

    pub fn sensitive_dogu_config_action_counts(&self) -> ActionCounts {
        count_config(self.sensitive_dogu_config_diffs.values().flatten())
    }

    pub fn global_config_action_counts(&self) -> ActionCounts { count_config(self.global_config_diffs.iter()) }

    pub fn total_actions(&self) -> usize {
        self.dogu_action_counts().total()
            + self.component_action_counts().total()
            + self.config_diffs().filter(|c| c.needed_action != ConfigAction::None).count()
    }

    /// Dogus whose diff contains `action`, in name order.
    pub fn dogus_needing(&self, action: Action) -> Vec<&DoguDiff> {
        self.dogu_diffs.iter().filter(|d| d.needs(action)).collect()
    }
}

fn count_config<'a>(diffs: impl Iterator<Item = &'a ConfigEntryDiff>) -> ActionCounts {
    let mut c = ActionCounts::default();
    diffs.filter(|d| d.needed_action != ConfigAction::None).for_each(|d| c.add(d.needed_action));
    c
}

/// Compute the full diff. Fails only when referenced config values are missing
/// from `references`; all such references are reported together.
pub fn determine_state_diff(
    effective: &EffectiveBlueprint,
    state: &EcosystemState,
    references: &ResolvedReferences,
) -> Result<StateDiff, DiffError> {
    let t0 = Instant::now();
    let mut missing = Vec::new();

    let dogu_diffs = determine_dogu_diffs(&effective.dogus, &state.installed_dogus);
    let component_diffs = determine_component_diffs(&effective.components, &state.installed_components);

    let mut dogu_config_diffs = BTreeMap::new();
    let mut sensitive_dogu_config_diffs = BTreeMap::new();
    for dogu in effective.config.dogus.keys() {
        let normal = determine_config_diffs(
            effective.config.dogu_entries(dogu),
            Some(dogu),
            state.dogu_config(dogu).map(|c| c as &dyn ConfigLookup),
            |key| references.dogu_value(dogu, key),
            &mut missing,
        );
        if !normal.is_empty() {
            dogu_config_diffs.insert(dogu.clone(), normal);
        }
        let sensitive: Vec<ConfigEntryDiff> = determine_config_diffs(
            effective.config.sensitive_dogu_entries(dogu),
            Some(dogu),
            state.sensitive_dogu_config(dogu).map(|c| c as &dyn ConfigLookup),
            |key| references.dogu_value(dogu, key),
            &mut missing,
        )
        .into_iter()
        .map(ConfigEntryDiff::censored)
        .collect();
        if !sensitive.is_empty() {
            sensitive_dogu_config_diffs.insert(dogu.clone(), sensitive);
        }
    }
    let global_config_diffs = determine_config_diffs(
        &effective.config.global,
        None,
        Some(&state.global_config as &dyn ConfigLookup),
        |key| references.global_value(key),
        &mut missing,
    );

    if !missing.is_empty() {
        debug!(missing = missing.len(), "config references unresolved");
        return Err(DiffError::MissingConfigReferences(missing));
    }

    let diff = StateDiff { dogu_diffs, component_diffs, dogu_config_diffs, sensitive_dogu_config_diffs, global_config_diffs };
    let actions = diff.total_actions();
    counter!("blueprint_diff_actions_total", actions as u64);
    histogram!("blueprint_diff_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    info!(actions, dogus = diff.dogu_diffs.len(), components = diff.component_diffs.len(), "state diff determined");
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_render_with_breakdown() {
        let mut c = ActionCounts::default();
        assert_eq!(c.to_string(), "0 actions");
        c.add(Action::Upgrade);
        assert_eq!(c.to_string(), "1 action (upgrade: 1)");
        c.add(Action::Install);
        assert_eq!(c.to_string(), "2 actions (install: 1, upgrade: 1)");
        assert_eq!(c.get("install"), 1);
        assert_eq!(c.get("uninstall"), 0);
    }

    #[test]
    fn empty_diff_has_no_actions() {
        let d = StateDiff::default();
        assert!(!d.has_actions());
        assert_eq!(d.total_actions(), 0);
    }

    #[test]
    fn missing_references_error_lists_every_reference() {
        let e = DiffError::MissingConfigReferences(vec![
            MissingReference { dogu: Some("ldap".into()), key: "pw".into(), reference: "secret s/k".into() },
            MissingReference { dogu: None, key: "fqdn".into(), reference: "configmap c/k".into() },
        ]);
        let s = e.to_string();
        assert!(s.starts_with("2 config reference(s) could not be resolved:\n- "), "{}", s);
        assert!(s.contains("global config key \"fqdn\""), "{}", s);
    }
}
