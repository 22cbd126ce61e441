//! Blueprint (desired state) and blueprint mask (sparse override).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::config::Config;
use crate::dogu::Dogu;
use crate::error::{Problems, ValidationError};
use crate::name::{QualifiedName, SimpleName};
use crate::version::DoguVersion;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default)]
    pub dogus: Vec<Dogu>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub config: Config,
}

/// Report every simple name that appears more than once, in first-seen order.
fn duplicates<'a>(names: impl Iterator<Item = &'a SimpleName>) -> Vec<&'a SimpleName> {
    let mut counts: BTreeMap<&SimpleName, usize> = BTreeMap::new();
    let mut order = Vec::new();
    for n in names {
        let c = counts.entry(n).or_insert(0);
        *c += 1;
        if *c == 2 { order.push(n); }
    }
    order
}

impl Blueprint {
    pub fn dogu(&self, name: &SimpleName) -> Option<&Dogu> {
        self.dogus.iter().find(|d| &d.name.simple_name == name)
    }

    pub fn component(&self, name: &SimpleName) -> Option<&Component> {
        self.components.iter().find(|c| &c.name.simple_name == name)
    }

    /// Dogus that should be installed (not absent).
    pub fn wanted_dogus(&self) -> impl Iterator<Item = &Dogu> {
        self.dogus.iter().filter(|d| !d.absent)
    }

    /// Structural validation. All problems are collected before returning.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut p = Problems::new();
        for d in &self.dogus {
            p.extend_prefixed(&format!("dogu {}", d.name), d.problems());
        }
        for n in duplicates(self.dogus.iter().map(|d| &d.name.simple_name)) {
            p.push(format!("dogu {:?} is listed more than once", n.as_str()));
        }
        for c in &self.components {
            p.extend_prefixed(&format!("component {}", c.name), c.problems());
        }
        for n in duplicates(self.components.iter().map(|c| &c.name.simple_name)) {
            p.push(format!("component {:?} is listed more than once", n.as_str()));
        }
        p.extend(self.config.problems());
        p.into_result(ValidationError::Blueprint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskDogu {
    pub name: QualifiedName,
    /// `None` keeps the blueprint's version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<DoguVersion>,
    #[serde(default)]
    pub absent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintMask {
    #[serde(default)]
    pub dogus: Vec<MaskDogu>,
}

impl BlueprintMask {
    pub fn is_empty(&self) -> bool { self.dogus.is_empty() }

    pub fn dogu(&self, name: &SimpleName) -> Option<&MaskDogu> {
        self.dogus.iter().find(|d| &d.name.simple_name == name)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut p = Problems::new();
        for d in &self.dogus {
            let mut dp = Problems::new();
            for np in d.name.problems() { dp.push(np); }
            p.extend_prefixed(&format!("dogu {}", d.name), dp);
        }
        for n in duplicates(self.dogus.iter().map(|d| &d.name.simple_name)) {
            p.push(format!("dogu {:?} is masked more than once", n.as_str()));
        }
        p.into_result(ValidationError::Mask)
    }

    /// Cross-check the mask against the blueprint it overrides.
    pub fn validate_against(&self, blueprint: &Blueprint, allow_namespace_switch: bool) -> Result<(), ValidationError> {
        let mut p = Problems::new();
        for m in &self.dogus {
            let Some(d) = blueprint.dogu(&m.name.simple_name) else {
                p.push(format!("dogu {} is masked but missing in the blueprint", m.name));
                continue;
            };
            if d.name.namespace != m.name.namespace && !allow_namespace_switch {
                p.push(format!(
                    "namespace switch from {} to {} is not allowed for dogu {:?}",
                    d.name.namespace, m.name.namespace, m.name.simple_name.as_str()
                ));
            }
            if d.absent && !m.absent {
                p.push(format!("absent dogu {} cannot be made present by the mask", d.name));
            }
        }
        p.into_result(ValidationError::MaskMismatch)
    }
}
