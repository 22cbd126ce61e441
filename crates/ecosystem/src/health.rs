//! Health aggregation over installed dogus and components.

use std::collections::BTreeMap;
use std::fmt;

use blueprint_core::SimpleName;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::EcosystemState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthStatus {
    Available,
    Unavailable,
    Pending,
    NotInstalled,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool { self == Self::Available }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Pending => "pending",
            Self::NotInstalled => "not installed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Dogu,
    Component,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dogu => "dogu",
            Self::Component => "component",
        })
    }
}

/// Health status per dogu or per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub kind: EntityKind,
    pub statuses: BTreeMap<SimpleName, HealthStatus>,
}

impl HealthReport {
    pub fn new(kind: EntityKind) -> Self { Self { kind, statuses: BTreeMap::new() } }

    pub fn with(mut self, name: impl Into<SimpleName>, status: HealthStatus) -> Self {
        self.statuses.insert(name.into(), status);
        self
    }

    pub fn all_healthy(&self) -> bool { self.statuses.values().all(|s| s.is_healthy()) }

    /// Unhealthy entity names in sorted order.
    pub fn unhealthy(&self) -> Vec<&SimpleName> {
        self.statuses.iter().filter(|(_, s)| !s.is_healthy()).map(|(n, _)| n).collect()
    }

    pub fn counts(&self) -> BTreeMap<HealthStatus, usize> {
        let mut out = BTreeMap::new();
        for s in self.statuses.values() { *out.entry(*s).or_insert(0) += 1; }
        out
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bad = self.unhealthy();
        if bad.is_empty() {
            return write!(f, "all {}s are healthy", self.kind);
        }
        let names: Vec<&str> = bad.iter().map(|n| n.as_str()).collect();
        write!(f, "{} {}(s) are unhealthy: {}", bad.len(), self.kind, names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResult {
    pub dogu_health: HealthReport,
    pub component_health: HealthReport,
}

impl Default for HealthResult {
    fn default() -> Self {
        Self { dogu_health: HealthReport::new(EntityKind::Dogu), component_health: HealthReport::new(EntityKind::Component) }
    }
}

impl HealthResult {
    /// Statuses of everything installed; required components that are missing
    /// count as [`HealthStatus::NotInstalled`].
    pub fn calculate(state: &EcosystemState, required_components: &[SimpleName]) -> Self {
        let mut out = Self::default();
        for (name, d) in &state.installed_dogus {
            out.dogu_health.statuses.insert(name.clone(), d.health);
        }
        for (name, c) in &state.installed_components {
            out.component_health.statuses.insert(name.clone(), c.health);
        }
        for name in required_components {
            out.component_health.statuses.entry(name.clone()).or_insert(HealthStatus::NotInstalled);
        }
        debug!(
            dogus = out.dogu_health.statuses.len(),
            components = out.component_health.statuses.len(),
            healthy = out.all_healthy(),
            "ecosystem health calculated"
        );
        out
    }

    pub fn all_healthy(&self) -> bool { self.dogu_health.all_healthy() && self.component_health.all_healthy() }

    /// Drop the dogu half, e.g. when dogu health is ignored.
    pub fn without_dogus(mut self) -> Self {
        self.dogu_health.statuses.clear();
        self
    }

    pub fn without_components(mut self) -> Self {
        self.component_health.statuses.clear();
        self
    }
}

impl fmt::Display for HealthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ecosystem health:\n  {}\n  {}", self.dogu_health, self.component_health)
    }
}
