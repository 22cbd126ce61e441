use std::fmt;

use blueprint_diff::ActionCounts;
use serde::{Deserialize, Serialize};

/// Entry of the blueprint spec's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Event {
    BlueprintSpecInvalid { error: String },
    EffectiveBlueprintCalculated,
    EcosystemHealthy,
    EcosystemUnhealthy { summary: String },
    EcosystemHealthUnknown { error: String },
    DoguStateDiffDetermined { counts: ActionCounts },
    ComponentStateDiffDetermined { counts: ActionCounts },
    DoguConfigDiffDetermined { counts: ActionCounts },
    SensitiveDoguConfigDiffDetermined { counts: ActionCounts },
    GlobalConfigDiffDetermined { counts: ActionCounts },
    ExecutionNotAllowed { reason: String },
    MissingConfigReferences { error: String },
    Completed,
    AwaitSelfUpgrade,
    SelfUpgradeCompleted,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlueprintSpecInvalid { .. } => "BlueprintSpecInvalid",
            Self::EffectiveBlueprintCalculated => "EffectiveBlueprintCalculated",
            Self::EcosystemHealthy => "EcosystemHealthy",
            Self::EcosystemUnhealthy { .. } => "EcosystemUnhealthy",
            Self::EcosystemHealthUnknown { .. } => "EcosystemHealthUnknown",
            Self::DoguStateDiffDetermined { .. } => "DoguStateDiffDetermined",
            Self::ComponentStateDiffDetermined { .. } => "ComponentStateDiffDetermined",
            Self::DoguConfigDiffDetermined { .. } => "DoguConfigDiffDetermined",
            Self::SensitiveDoguConfigDiffDetermined { .. } => "SensitiveDoguConfigDiffDetermined",
            Self::GlobalConfigDiffDetermined { .. } => "GlobalConfigDiffDetermined",
            Self::ExecutionNotAllowed { .. } => "ExecutionNotAllowed",
            Self::MissingConfigReferences { .. } => "MissingConfigReferences",
            Self::Completed => "Completed",
            Self::AwaitSelfUpgrade => "AwaitSelfUpgrade",
            Self::SelfUpgradeCompleted => "SelfUpgradeCompleted",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::BlueprintSpecInvalid { error } => error.clone(),
            Self::EffectiveBlueprintCalculated => "effective blueprint calculated".into(),
            Self::EcosystemHealthy => "ecosystem is healthy".into(),
            Self::EcosystemUnhealthy { summary } => format!("ecosystem is unhealthy: {}", summary),
            Self::EcosystemHealthUnknown { error } => format!("cannot check ecosystem health: {}", error),
            Self::DoguStateDiffDetermined { counts } => format!("dogu state diff determined: {}", counts),
            Self::ComponentStateDiffDetermined { counts } => format!("component state diff determined: {}", counts),
            Self::DoguConfigDiffDetermined { counts } => format!("dogu config diff determined: {}", counts),
            Self::SensitiveDoguConfigDiffDetermined { counts } => format!("sensitive dogu config diff determined: {}", counts),
            Self::GlobalConfigDiffDetermined { counts } => format!("global config diff determined: {}", counts),
            Self::ExecutionNotAllowed { reason } => format!("blueprint cannot be executed: {}", reason),
            Self::MissingConfigReferences { error } => error.clone(),
            Self::Completed => "blueprint was applied to the ecosystem".into(),
            Self::AwaitSelfUpgrade => "waiting for the blueprint operator to upgrade itself".into(),
            Self::SelfUpgradeCompleted => "blueprint operator self upgrade completed".into(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.name(), self.message()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_name() {
        let events = [
            Event::BlueprintSpecInvalid { error: "dogu official/nexus needs official/postgresql".into() },
            Event::EffectiveBlueprintCalculated,
            Event::DoguStateDiffDetermined { counts: ActionCounts::default() },
            Event::MissingConfigReferences { error: "secret ldap-secrets/password".into() },
            Event::SelfUpgradeCompleted,
        ];
        for e in events {
            let json = serde_json::to_value(&e).unwrap();
            assert_eq!(json["name"], e.name());
            let back: Event = serde_json::from_value(json).unwrap();
            assert_eq!(back, e);
        }
    }
}
