//! Observed ecosystem state: what is installed in the cluster right now.
//!
//! Snapshots are produced by external collaborators (registry, secret store);
//! this crate only defines their shape, the lookup seam used by the diff engine
//! and the health aggregation.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use blueprint_core::{AdditionalMount, ComponentVersion, DeployConfig, DoguVersion, QualifiedName, Quantity, ReverseProxyConfig, SimpleName};
use serde::{Deserialize, Serialize};

pub mod health;

pub use health::{EntityKind, HealthReport, HealthResult, HealthStatus};

/// Key/value lookup with existence testing.
pub trait ConfigLookup {
    fn lookup(&self, key: &str) -> Option<&str>;

    fn contains(&self, key: &str) -> bool { self.lookup(key).is_some() }
}

/// Flat snapshot of one config store (global, or one dogu's normal/sensitive config).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSnapshot(BTreeMap<String, String>);

impl ConfigSnapshot {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl ConfigLookup for ConfigSnapshot {
    fn lookup(&self, key: &str) -> Option<&str> { self.0.get(key).map(|s| s.as_str()) }
}

impl ConfigLookup for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> { self.get(key).map(|s| s.as_str()) }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoguInstallation {
    pub name: QualifiedName,
    pub version: DoguVersion,
    pub health: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_volume_size: Option<Quantity>,
    #[serde(default)]
    pub reverse_proxy_config: ReverseProxyConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_mounts: Vec<AdditionalMount>,
}

impl DoguInstallation {
    pub fn new(name: QualifiedName, version: DoguVersion) -> Self {
        Self {
            name,
            version,
            health: HealthStatus::Available,
            min_volume_size: None,
            reverse_proxy_config: ReverseProxyConfig::default(),
            additional_mounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstallation {
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ComponentVersion>,
    pub health: HealthStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deploy_config: DeployConfig,
}

impl ComponentInstallation {
    pub fn new(name: QualifiedName, version: ComponentVersion) -> Self {
        Self { name, version: Some(version), health: HealthStatus::Available, deploy_config: DeployConfig::new() }
    }
}

/// Snapshot of the running ecosystem, keyed by simple name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosystemState {
    #[serde(default)]
    pub installed_dogus: BTreeMap<SimpleName, DoguInstallation>,
    #[serde(default)]
    pub installed_components: BTreeMap<SimpleName, ComponentInstallation>,
    #[serde(default)]
    pub global_config: ConfigSnapshot,
    #[serde(default)]
    pub dogu_configs: BTreeMap<SimpleName, ConfigSnapshot>,
    #[serde(default)]
    pub sensitive_dogu_configs: BTreeMap<SimpleName, ConfigSnapshot>,
}

impl EcosystemState {
    pub fn with_dogu(mut self, d: DoguInstallation) -> Self {
        self.installed_dogus.insert(d.name.simple_name.clone(), d);
        self
    }

    pub fn with_component(mut self, c: ComponentInstallation) -> Self {
        self.installed_components.insert(c.name.simple_name.clone(), c);
        self
    }

    pub fn with_global_config(mut self, cfg: ConfigSnapshot) -> Self {
        self.global_config = cfg;
        self
    }

    pub fn with_dogu_config(mut self, dogu: impl Into<SimpleName>, cfg: ConfigSnapshot) -> Self {
        self.dogu_configs.insert(dogu.into(), cfg);
        self
    }

    pub fn with_sensitive_dogu_config(mut self, dogu: impl Into<SimpleName>, cfg: ConfigSnapshot) -> Self {
        self.sensitive_dogu_configs.insert(dogu.into(), cfg);
        self
    }

    pub fn dogu_config(&self, dogu: &SimpleName) -> Option<&ConfigSnapshot> { self.dogu_configs.get(dogu) }
    pub fn sensitive_dogu_config(&self, dogu: &SimpleName) -> Option<&ConfigSnapshot> { self.sensitive_dogu_configs.get(dogu) }
}

/// Plaintext values of every referenced config entry (secretRef / configRef),
/// resolved before the diff is computed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReferences {
    #[serde(default)]
    pub dogus: BTreeMap<SimpleName, BTreeMap<String, String>>,
    #[serde(default)]
    pub global: BTreeMap<String, String>,
}

impl ResolvedReferences {
    pub fn with_dogu_value(mut self, dogu: impl Into<SimpleName>, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dogus.entry(dogu.into()).or_default().insert(key.into(), value.into());
        self
    }

    pub fn with_global_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global.insert(key.into(), value.into());
        self
    }

    pub fn dogu_value(&self, dogu: &SimpleName, key: &str) -> Option<&str> {
        self.dogus.get(dogu).and_then(|m| m.lookup(key))
    }

    pub fn global_value(&self, key: &str) -> Option<&str> { self.global.lookup(key) }
}
