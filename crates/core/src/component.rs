//! Target state of a platform component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Problems;
use crate::name::QualifiedName;
use crate::version::ComponentVersion;

/// Opaque deploy configuration handed to the component's installer.
pub type DeployConfig = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ComponentVersion>,
    #[serde(default)]
    pub absent: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deploy_config: DeployConfig,
}

impl Component {
    pub fn new(name: QualifiedName, version: ComponentVersion) -> Self {
        Self { name, version: Some(version), ..Default::default() }
    }

    pub fn absent(name: QualifiedName) -> Self {
        Self { name, absent: true, ..Default::default() }
    }

    pub fn problems(&self) -> Problems {
        let mut p = Problems::new();
        for np in self.name.problems() { p.push(np); }
        if !self.absent && self.version.is_none() {
            p.push("component version must not be empty");
        }
        p
    }
}
