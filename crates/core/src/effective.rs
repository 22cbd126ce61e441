//! Effective blueprint: the blueprint with its mask applied.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blueprint::{Blueprint, BlueprintMask};
use crate::component::Component;
use crate::config::Config;
use crate::dogu::Dogu;
use crate::error::{Problems, ValidationError};
use crate::name::SimpleName;

/// Fully resolved desired state. Same shape as [`Blueprint`], no overrides pending.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBlueprint {
    #[serde(default)]
    pub dogus: Vec<Dogu>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub config: Config,
}

impl EffectiveBlueprint {
    pub fn dogu(&self, name: &SimpleName) -> Option<&Dogu> {
        self.dogus.iter().find(|d| &d.name.simple_name == name)
    }

    pub fn component(&self, name: &SimpleName) -> Option<&Component> {
        self.components.iter().find(|c| &c.name.simple_name == name)
    }

    pub fn wanted_dogus(&self) -> impl Iterator<Item = &Dogu> {
        self.dogus.iter().filter(|d| !d.absent)
    }

    /// Merge `mask` into `blueprint`. Every per-dogu problem is collected.
    pub fn calculate(blueprint: &Blueprint, mask: &BlueprintMask, allow_namespace_switch: bool) -> Result<Self, ValidationError> {
        let mut problems = Problems::new();
        let mut dogus = Vec::with_capacity(blueprint.dogus.len());
        for d in &blueprint.dogus {
            let Some(m) = mask.dogu(&d.name.simple_name) else {
                dogus.push(d.clone());
                continue;
            };
            let mut eff = d.clone();
            if m.name.namespace != d.name.namespace {
                if allow_namespace_switch {
                    eff.name.namespace = m.name.namespace.clone();
                } else {
                    problems.push(format!(
                        "cannot switch namespace of dogu {:?} from {} to {}: dogu namespace switch is not allowed",
                        d.name.simple_name.as_str(), d.name.namespace, m.name.namespace
                    ));
                }
            }
            if let Some(v) = &m.version { eff.version = Some(v.clone()); }
            eff.absent = m.absent;
            dogus.push(eff);
        }

        let wanted: BTreeSet<&SimpleName> = dogus.iter().filter(|d| !d.absent).map(|d| &d.name.simple_name).collect();
        let wanted_before_mask: BTreeSet<&SimpleName> = blueprint.wanted_dogus().map(|d| &d.name.simple_name).collect();
        let mut config = Config { global: blueprint.config.global.clone(), ..Default::default() };
        for (dogu, entries) in &blueprint.config.dogus {
            if wanted.contains(dogu) {
                config.dogus.insert(dogu.clone(), entries.clone());
            } else if wanted_before_mask.contains(dogu) {
                debug!(dogu = %dogu, "dropping config of dogu made absent by the mask");
            } else {
                problems.push(format!("config for dogu {:?} is only allowed if the dogu is wanted in the blueprint", dogu.as_str()));
            }
        }

        problems.into_result(ValidationError::EffectiveBlueprint)?;
        Ok(Self { dogus, components: blueprint.components.clone(), config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::MaskDogu;
    use crate::config::ConfigEntry;
    use std::collections::BTreeMap;

    fn bp() -> Blueprint {
        Blueprint {
            dogus: vec![
                Dogu::new("official/nexus".parse().unwrap(), "3.0.0-1".parse().unwrap()),
                Dogu::new("official/ldap".parse().unwrap(), "2.0.0-1".parse().unwrap()),
            ],
            config: Config {
                dogus: BTreeMap::from([("ldap".into(), vec![ConfigEntry::present("a", "1")])]),
                global: vec![ConfigEntry::present("fqdn", "ces.example.com")],
            },
            ..Default::default()
        }
    }

    fn mask(name: &str, version: Option<&str>, absent: bool) -> BlueprintMask {
        BlueprintMask { dogus: vec![MaskDogu { name: name.parse().unwrap(), version: version.map(|v| v.parse().unwrap()), absent }] }
    }

    #[test]
    fn empty_mask_passes_blueprint_through() {
        let eff = EffectiveBlueprint::calculate(&bp(), &BlueprintMask::default(), false).unwrap();
        assert_eq!(eff.dogus, bp().dogus);
        assert_eq!(eff.config, bp().config);
    }

    #[test]
    fn mask_overrides_version() {
        let eff = EffectiveBlueprint::calculate(&bp(), &mask("official/nexus", Some("3.1.0-1"), false), false).unwrap();
        assert_eq!(eff.dogu(&"nexus".into()).unwrap().version.as_ref().unwrap().to_string(), "3.1.0-1");
    }

    #[test]
    fn namespace_switch_needs_permission() {
        let err = EffectiveBlueprint::calculate(&bp(), &mask("premium/nexus", None, false), false).unwrap_err();
        let s = err.to_string();
        assert!(s.contains("from official to premium"), "{}", s);

        let eff = EffectiveBlueprint::calculate(&bp(), &mask("premium/nexus", None, false), true).unwrap();
        assert_eq!(eff.dogu(&"nexus".into()).unwrap().name.to_string(), "premium/nexus");
    }

    #[test]
    fn config_of_masked_out_dogu_is_dropped() {
        let eff = EffectiveBlueprint::calculate(&bp(), &mask("official/ldap", None, true), false).unwrap();
        assert!(eff.dogu(&"ldap".into()).unwrap().absent);
        assert!(!eff.config.dogus.contains_key(&SimpleName::from("ldap")));
        assert_eq!(eff.config.global.len(), 1);
    }

    #[test]
    fn config_for_unknown_or_absent_dogu_is_rejected() {
        let mut b = bp();
        b.dogus.push(Dogu::absent("official/redmine".parse().unwrap()));
        b.config.dogus.insert("redmine".into(), vec![ConfigEntry::present("x", "y")]);
        b.config.dogus.insert("jenkins".into(), vec![ConfigEntry::present("x", "y")]);
        let err = EffectiveBlueprint::calculate(&b, &BlueprintMask::default(), false).unwrap_err();
        assert_eq!(err.problems().len(), 2, "{}", err);
    }
}
