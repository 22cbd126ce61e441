//! Named tri-state status conditions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Valid,
    Executable,
    EcosystemHealthy,
    Completed,
    SelfUpgradeCompleted,
}

impl ConditionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Executable => "Executable",
            Self::EcosystemHealthy => "EcosystemHealthy",
            Self::Completed => "Completed",
            Self::SelfUpgradeCompleted => "SelfUpgradeCompleted",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(b: bool) -> Self { if b { Self::True } else { Self::False } }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        })
    }
}

/// Machine-readable reasons attached to conditions.
pub mod reason {
    pub const VALID: &str = "Valid";
    pub const INVALID: &str = "Invalid";
    pub const INVALID_DEPENDENCIES: &str = "InvalidDependencies";
    pub const INVALID_EFFECTIVE_BLUEPRINT: &str = "InvalidEffectiveBlueprint";
    pub const EXECUTABLE: &str = "Executable";
    pub const NAMESPACE_SWITCH_NOT_ALLOWED: &str = "DoguNamespaceSwitchNotAllowed";
    pub const MISSING_CONFIG_REFERENCES: &str = "MissingConfigReferences";
    pub const HEALTHY: &str = "Healthy";
    pub const UNHEALTHY: &str = "Unhealthy";
    pub const CANNOT_CHECK_HEALTH: &str = "CannotCheckHealth";
    pub const COMPLETED: &str = "Completed";
    pub const AWAITING_SELF_UPGRADE: &str = "AwaitingSelfUpgrade";
    pub const SELF_UPGRADE_COMPLETED: &str = "SelfUpgradeCompleted";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub status: ConditionStatus,
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

/// Current value per condition type. A missing entry means the condition was never set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(BTreeMap<ConditionType, Condition>);

impl Conditions {
    /// Set `ty`. Returns `true` only if status or reason changed; the message
    /// is always replaced.
    pub fn set(&mut self, ty: ConditionType, status: ConditionStatus, reason: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        match self.0.get_mut(&ty) {
            Some(c) if c.status == status && c.reason == reason => {
                c.message = message;
                false
            }
            _ => {
                self.0.insert(ty, Condition { status, reason: reason.to_string(), message });
                true
            }
        }
    }

    pub fn get(&self, ty: ConditionType) -> Option<&Condition> { self.0.get(&ty) }

    pub fn status(&self, ty: ConditionType) -> Option<ConditionStatus> { self.0.get(&ty).map(|c| c.status) }

    pub fn is_true(&self, ty: ConditionType) -> bool { self.status(ty) == Some(ConditionStatus::True) }

    pub fn is_false(&self, ty: ConditionType) -> bool { self.status(ty) == Some(ConditionStatus::False) }

    pub fn iter(&self) -> impl Iterator<Item = (ConditionType, &Condition)> { self.0.iter().map(|(t, c)| (*t, c)) }
}
