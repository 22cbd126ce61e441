//! Target state of a single dogu.

use std::fmt;
use std::path::{Component as PathComponent, Path};

use serde::{Deserialize, Serialize};

use crate::error::Problems;
use crate::name::QualifiedName;
use crate::quantity::Quantity;
use crate::version::DoguVersion;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseProxyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_size: Option<Quantity>,
    #[serde(default)]
    pub rewrite_target: String,
    #[serde(default)]
    pub additional_config: String,
}

impl ReverseProxyConfig {
    pub fn is_empty(&self) -> bool {
        self.max_body_size.is_none() && self.rewrite_target.is_empty() && self.additional_config.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MountSourceType {
    ConfigMap,
    Secret,
}

impl fmt::Display for MountSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMap => f.write_str("ConfigMap"),
            Self::Secret => f.write_str("Secret"),
        }
    }
}

/// Extra volume content mounted into a dogu from a configmap or secret.
/// Ordered field by field, so mount lists can be sorted before comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMount {
    pub source_type: MountSourceType,
    pub name: String,
    pub volume: String,
    #[serde(default)]
    pub subfolder: String,
}

impl AdditionalMount {
    pub fn problems(&self) -> Problems {
        let mut p = Problems::new();
        if self.name.is_empty() { p.push("additional mount needs a source name"); }
        if self.volume.is_empty() { p.push(format!("additional mount {:?} needs a volume", self.name)); }
        if !is_relative_subfolder(&self.subfolder) {
            p.push(format!("subfolder {:?} of additional mount {:?} must be a relative path", self.subfolder, self.name));
        }
        p
    }
}

fn is_relative_subfolder(s: &str) -> bool {
    if s.is_empty() { return true; }
    let path = Path::new(s);
    !path.has_root()
        && path.components().all(|c| matches!(c, PathComponent::Normal(_) | PathComponent::CurDir))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dogu {
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<DoguVersion>,
    #[serde(default)]
    pub absent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_volume_size: Option<Quantity>,
    #[serde(default)]
    pub reverse_proxy_config: ReverseProxyConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_mounts: Vec<AdditionalMount>,
}

impl Dogu {
    pub fn new(name: QualifiedName, version: DoguVersion) -> Self {
        Self { name, version: Some(version), ..Default::default() }
    }

    pub fn absent(name: QualifiedName) -> Self {
        Self { name, absent: true, ..Default::default() }
    }

    pub fn problems(&self) -> Problems {
        let mut p = Problems::new();
        for np in self.name.problems() { p.push(np); }
        if !self.absent && self.version.is_none() {
            p.push("dogu version must not be empty");
        }
        if let Some(size) = &self.min_volume_size {
            if !size.is_binary() {
                p.push(format!("minimum volume size {} must use a binary unit (e.g. 2Gi), got {} unit", size, size.family()));
            }
        }
        if let Some(size) = &self.reverse_proxy_config.max_body_size {
            if !size.is_decimal() {
                p.push(format!("proxy body size {} must use a decimal unit (e.g. 100M), got {} unit", size, size.family()));
            }
        }
        for m in &self.additional_mounts { p.extend(m.problems()); }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ldap() -> Dogu { Dogu::new("official/ldap".parse().unwrap(), "1.2.3-1".parse().unwrap()) }

    fn mount(subfolder: &str) -> AdditionalMount {
        AdditionalMount { source_type: MountSourceType::ConfigMap, name: "cm".into(), volume: "data".into(), subfolder: subfolder.into() }
    }

    #[test]
    fn present_dogu_needs_version() {
        assert!(ldap().problems().is_empty());
        let mut d = ldap();
        d.version = None;
        assert!(d.problems().to_string().contains("version must not be empty"));
        assert!(Dogu::absent("official/ldap".parse().unwrap()).problems().is_empty());
    }

    #[test]
    fn unit_families_are_checked() {
        let mut d = ldap();
        d.min_volume_size = Some("2G".parse().unwrap());
        d.reverse_proxy_config.max_body_size = Some("1Mi".parse().unwrap());
        let s = d.problems().to_string();
        assert!(s.contains("must use a binary unit"), "{}", s);
        assert!(s.contains("must use a decimal unit"), "{}", s);

        d.min_volume_size = Some("2Gi".parse().unwrap());
        d.reverse_proxy_config.max_body_size = Some("100M".parse().unwrap());
        assert!(d.problems().is_empty());
    }

    #[test]
    fn mount_subfolder_must_be_relative() {
        assert!(mount("").problems().is_empty());
        assert!(mount("conf/sub").problems().is_empty());
        assert!(!mount("/etc").problems().is_empty());
        assert!(!mount("../escape").problems().is_empty());
    }

    #[test]
    fn mount_order_uses_every_field() {
        let a = mount("x");
        let mut b = mount("x");
        b.source_type = MountSourceType::Secret;
        assert_ne!(a.cmp(&b), std::cmp::Ordering::Equal);

        let mut c = mount("x");
        c.name = "cm|data".into();
        c.volume = "x".into();
        let mut d = mount("x");
        d.name = "cm".into();
        d.volume = "data|x".into();
        assert_ne!(c, d);
        assert_ne!(c.cmp(&d), std::cmp::Ordering::Equal);
    }
}
