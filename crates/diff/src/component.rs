//! Component diff: blueprint components vs installed components.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use blueprint_core::{Component, ComponentVersion, DeployConfig, Namespace, SimpleName};
use blueprint_ecosystem::ComponentInstallation;
use serde::{Deserialize, Serialize};

use crate::action::{Action, NeededActions};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDiffState {
    pub namespace: Namespace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ComponentVersion>,
    pub absent: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deploy_config: DeployConfig,
}

impl From<&Component> for ComponentDiffState {
    fn from(c: &Component) -> Self {
        Self { namespace: c.name.namespace.clone(), version: c.version.clone(), absent: c.absent, deploy_config: c.deploy_config.clone() }
    }
}

impl From<&ComponentInstallation> for ComponentDiffState {
    fn from(c: &ComponentInstallation) -> Self {
        Self { namespace: c.name.namespace.clone(), version: c.version.clone(), absent: false, deploy_config: c.deploy_config.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDiff {
    pub name: SimpleName,
    pub actual: ComponentDiffState,
    pub expected: ComponentDiffState,
    pub needed_actions: NeededActions,
}

impl ComponentDiff {
    pub fn new(name: SimpleName, actual: ComponentDiffState, expected: ComponentDiffState) -> Self {
        let needed_actions = needed_actions(&expected, &actual);
        Self { name, actual, expected, needed_actions }
    }
}

fn needed_actions(expected: &ComponentDiffState, actual: &ComponentDiffState) -> NeededActions {
    let mut out = NeededActions::new();
    match (expected.absent, actual.absent) {
        (true, true) => return out,
        (false, true) => { out.push(Action::Install); return out; }
        (true, false) => { out.push(Action::Uninstall); return out; }
        (false, false) => {}
    }
    if expected.namespace != actual.namespace {
        out.push(Action::SwitchComponentNamespace);
    }
    if deploy_config_changed(&expected.deploy_config, &actual.deploy_config) {
        out.push(Action::UpdateDeployConfig);
    }
    if let (Some(e), Some(a)) = (&expected.version, &actual.version) {
        match e.cmp(a) {
            Ordering::Greater => out.push(Action::Upgrade),
            Ordering::Less => out.push(Action::Downgrade),
            Ordering::Equal => {}
        }
    }
    out
}

/// Deep comparison. Two empty configs never need an update; empty vs non-empty does.
fn deploy_config_changed(expected: &DeployConfig, actual: &DeployConfig) -> bool {
    if expected.is_empty() && actual.is_empty() { return false; }
    expected != actual
}

pub fn determine_component_diffs(wanted: &[Component], installed: &BTreeMap<SimpleName, ComponentInstallation>) -> Vec<ComponentDiff> {
    let by_name: BTreeMap<&SimpleName, &Component> = wanted.iter().map(|c| (&c.name.simple_name, c)).collect();
    let names: BTreeSet<&SimpleName> = by_name.keys().copied().chain(installed.keys()).collect();
    names
        .into_iter()
        .map(|name| {
            let actual = installed
                .get(name)
                .map(ComponentDiffState::from)
                .unwrap_or_else(|| ComponentDiffState { absent: true, ..Default::default() });
            let expected = match by_name.get(name) {
                Some(c) => ComponentDiffState::from(*c),
                None => actual.clone(),
            };
            ComponentDiff::new(name.clone(), actual, expected)
        })
        .collect()
}
