//! Config diffs (global, per dogu, sensitive per dogu).
//!
//! All three use the same per-key comparison. Sensitive diffs are compared on
//! plaintext and censored afterwards.

use std::fmt;

use blueprint_core::{ConfigEntry, SimpleName};
use blueprint_ecosystem::ConfigLookup;
use serde::{Deserialize, Serialize};

pub const CENSOR_MARKER: &str = "*****";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigAction {
    None,
    Set,
    Remove,
}

impl fmt::Display for ConfigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Set => "set",
            Self::Remove => "remove",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValueState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub exists: bool,
}

impl ConfigValueState {
    pub fn missing() -> Self { Self { value: None, exists: false } }

    pub fn existing(value: Option<String>) -> Self { Self { value, exists: true } }

    /// Same existence and, when both exist, the same value.
    pub fn same_as(&self, other: &Self) -> bool {
        self.exists == other.exists && (!self.exists || self.value == other.value)
    }

    fn censored(self) -> Self {
        Self { value: self.value.map(|_| CENSOR_MARKER.to_string()), exists: self.exists }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntryDiff {
    pub key: String,
    pub actual: ConfigValueState,
    pub expected: ConfigValueState,
    pub needed_action: ConfigAction,
}

impl ConfigEntryDiff {
    pub fn new(key: impl Into<String>, actual: ConfigValueState, expected: ConfigValueState) -> Self {
        let needed_action = config_action(&expected, &actual);
        Self { key: key.into(), actual, expected, needed_action }
    }

    pub fn censored(self) -> Self {
        Self { key: self.key, actual: self.actual.censored(), expected: self.expected.censored(), needed_action: self.needed_action }
    }
}

pub fn config_action(expected: &ConfigValueState, actual: &ConfigValueState) -> ConfigAction {
    if expected.same_as(actual) {
        ConfigAction::None
    } else if !expected.exists {
        ConfigAction::Remove
    } else {
        ConfigAction::Set
    }
}

/// A referenced config value the resolver could not provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingReference {
    /// `None` for global config.
    pub dogu: Option<SimpleName>,
    pub key: String,
    pub reference: String,
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dogu {
            Some(d) => write!(f, "config key {:?} of dogu {:?} references {} which could not be resolved", self.key, d.as_str(), self.reference),
            None => write!(f, "global config key {:?} references {} which could not be resolved", self.key, self.reference),
        }
    }
}

fn describe_reference(entry: &ConfigEntry) -> String {
    match (&entry.secret_ref, &entry.config_ref) {
        (Some(s), _) => format!("secret {}/{}", s.secret_name, s.secret_key),
        (None, Some(c)) => format!("configmap {}/{}", c.name, c.key),
        (None, None) => "nothing".to_string(),
    }
}

/// Expected state of one entry. Referenced values come from `resolve`; when it
/// yields nothing the reference is reported in `missing` and `None` is returned.
/// Entries without any source are rejected by validation and skipped here.
fn expected_state<'a>(
    entry: &ConfigEntry,
    dogu: Option<&SimpleName>,
    resolve: impl Fn(&str) -> Option<&'a str>,
    missing: &mut Vec<MissingReference>,
) -> Option<ConfigValueState> {
    if entry.absent {
        return Some(ConfigValueState::missing());
    }
    if let Some(v) = &entry.value {
        return Some(ConfigValueState::existing(Some(v.clone())));
    }
    if entry.has_reference() {
        return match resolve(&entry.key) {
            Some(v) => Some(ConfigValueState::existing(Some(v.to_string()))),
            None => {
                missing.push(MissingReference { dogu: dogu.cloned(), key: entry.key.clone(), reference: describe_reference(entry) });
                None
            }
        };
    }
    None
}

fn actual_state(actual: Option<&dyn ConfigLookup>, key: &str) -> ConfigValueState {
    match actual.and_then(|a| a.lookup(key)) {
        Some(v) => ConfigValueState::existing(Some(v.to_string())),
        None => ConfigValueState::missing(),
    }
}

/// Diff a list of entries against one config store; only entries whose action
/// is not [`ConfigAction::None`] are returned.
pub fn determine_config_diffs<'a, 'e>(
    entries: impl IntoIterator<Item = &'e ConfigEntry>,
    dogu: Option<&SimpleName>,
    actual: Option<&dyn ConfigLookup>,
    resolve: impl Fn(&str) -> Option<&'a str>,
    missing: &mut Vec<MissingReference>,
) -> Vec<ConfigEntryDiff> {
    let mut out = Vec::new();
    for entry in entries {
        let Some(expected) = expected_state(entry, dogu, &resolve, missing) else { continue };
        let diff = ConfigEntryDiff::new(entry.key.clone(), actual_state(actual, &entry.key), expected);
        if diff.needed_action != ConfigAction::None {
            out.push(diff);
        }
    }
    out
}
