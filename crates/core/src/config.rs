//! Blueprint configuration: global entries and per-dogu entries.
//!
//! Each entry either sets a key (inline value, secret reference or configmap
//! reference) or declares it absent.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Problems;
use crate::name::SimpleName;

/// Reference to a key inside a Kubernetes secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub secret_name: String,
    pub secret_key: String,
}

/// Reference to a key inside a Kubernetes configmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapRef {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub key: String,
    #[serde(default)]
    pub absent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_ref: Option<ConfigMapRef>,
}

impl ConfigEntry {
    pub fn present(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: Some(value.into()), ..Default::default() }
    }

    pub fn absent(key: impl Into<String>) -> Self {
        Self { key: key.into(), absent: true, ..Default::default() }
    }

    pub fn sensitive_from_secret(key: impl Into<String>, secret_name: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sensitive: true,
            secret_ref: Some(SecretRef { secret_name: secret_name.into(), secret_key: secret_key.into() }),
            ..Default::default()
        }
    }

    pub fn from_config_map(key: impl Into<String>, name: impl Into<String>, map_key: impl Into<String>) -> Self {
        Self { key: key.into(), config_ref: Some(ConfigMapRef { name: name.into(), key: map_key.into() }), ..Default::default() }
    }

    /// Whether the value has to be resolved by an external collaborator before diffing.
    pub fn has_reference(&self) -> bool { self.secret_ref.is_some() || self.config_ref.is_some() }

    pub fn problems(&self) -> Problems {
        let mut p = Problems::new();
        if self.key.is_empty() { p.push("config key must not be empty"); }
        let sources = [self.value.is_some(), self.secret_ref.is_some(), self.config_ref.is_some()]
            .iter()
            .filter(|b| **b)
            .count();
        if self.absent && sources > 0 {
            p.push(format!("absent config entry {:?} must not have a value or reference", self.key));
        }
        if !self.absent && sources == 0 {
            p.push(format!("config entry {:?} needs a value, secretRef or configRef unless it is absent", self.key));
        }
        if sources > 1 {
            p.push(format!("config entry {:?} may only have one of value, secretRef or configRef", self.key));
        }
        if self.secret_ref.is_some() && !self.sensitive {
            p.push(format!("config entry {:?} with a secretRef must be sensitive", self.key));
        }
        if let Some(r) = &self.secret_ref {
            if r.secret_name.is_empty() || r.secret_key.is_empty() {
                p.push(format!("secretRef of config entry {:?} needs a secret name and key", self.key));
            }
        }
        if let Some(r) = &self.config_ref {
            if r.name.is_empty() || r.key.is_empty() {
                p.push(format!("configRef of config entry {:?} needs a configmap name and key", self.key));
            }
        }
        p
    }
}

fn duplicate_keys(entries: &[ConfigEntry]) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    let mut dups = BTreeSet::new();
    for e in entries {
        if !seen.insert(e.key.as_str()) { dups.insert(e.key.as_str()); }
    }
    dups.into_iter().collect()
}

fn entry_list_problems(entries: &[ConfigEntry]) -> Problems {
    let mut p = Problems::new();
    for e in entries { p.extend(e.problems()); }
    for k in duplicate_keys(entries) {
        p.push(format!("duplicate config key {:?}", k));
    }
    p
}

/// Config of one dogu. Sensitive and normal entries share one list; the
/// `sensitive` flag decides which config store they end up in.
pub type DoguConfigEntries = Vec<ConfigEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub dogus: BTreeMap<SimpleName, DoguConfigEntries>,
    #[serde(default)]
    pub global: Vec<ConfigEntry>,
}

impl Config {
    pub fn is_empty(&self) -> bool { self.dogus.values().all(|v| v.is_empty()) && self.global.is_empty() }

    pub fn problems(&self) -> Problems {
        let mut p = Problems::new();
        for (dogu, entries) in &self.dogus {
            if dogu.is_empty() { p.push("dogu config needs a dogu name"); }
            p.extend_prefixed(&format!("config of dogu {:?}", dogu.as_str()), entry_list_problems(entries));
        }
        let mut global = entry_list_problems(&self.global);
        for e in self.global.iter().filter(|e| e.sensitive) {
            global.push(format!("config entry {:?} cannot be sensitive", e.key));
        }
        p.extend_prefixed("global config", global);
        p
    }

    /// Normal (non-sensitive) entries of a dogu.
    pub fn dogu_entries(&self, dogu: &SimpleName) -> impl Iterator<Item = &ConfigEntry> {
        self.dogus.get(dogu).into_iter().flatten().filter(|e| !e.sensitive)
    }

    pub fn sensitive_dogu_entries(&self, dogu: &SimpleName) -> impl Iterator<Item = &ConfigEntry> {
        self.dogus.get(dogu).into_iter().flatten().filter(|e| e.sensitive)
    }
}
