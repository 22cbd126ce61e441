use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Action needed to bring one dogu or component from its actual to its expected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Install,
    Uninstall,
    Upgrade,
    Downgrade,
    SwitchDoguNamespace,
    UpdateMinVolumeSize,
    UpdateProxyBodySize,
    UpdateProxyRewriteTarget,
    UpdateProxyAdditionalConfig,
    UpdateAdditionalMounts,
    SwitchComponentNamespace,
    UpdateDeployConfig,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
            Self::SwitchDoguNamespace => "dogu namespace switch",
            Self::UpdateMinVolumeSize => "update minimum volume size",
            Self::UpdateProxyBodySize => "update proxy body size",
            Self::UpdateProxyRewriteTarget => "update proxy rewrite target",
            Self::UpdateProxyAdditionalConfig => "update proxy additional config",
            Self::UpdateAdditionalMounts => "update additional mounts",
            Self::SwitchComponentNamespace => "component namespace switch",
            Self::UpdateDeployConfig => "update deploy config",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Most entries need zero or one action; a few need several at once.
pub type NeededActions = SmallVec<[Action; 4]>;
