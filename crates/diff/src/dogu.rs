//! Dogu diff: blueprint dogus vs installed dogus.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use blueprint_core::{AdditionalMount, Dogu, DoguVersion, Namespace, Quantity, ReverseProxyConfig, SimpleName};
use blueprint_ecosystem::DoguInstallation;
use serde::{Deserialize, Serialize};

use crate::action::{Action, NeededActions};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoguDiffState {
    pub namespace: Namespace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<DoguVersion>,
    pub absent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_volume_size: Option<Quantity>,
    #[serde(default)]
    pub reverse_proxy_config: ReverseProxyConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_mounts: Vec<AdditionalMount>,
}

impl DoguDiffState {
    fn not_installed() -> Self { Self { absent: true, ..Default::default() } }
}

impl From<&Dogu> for DoguDiffState {
    fn from(d: &Dogu) -> Self {
        Self {
            namespace: d.name.namespace.clone(),
            version: d.version.clone(),
            absent: d.absent,
            min_volume_size: d.min_volume_size.clone(),
            reverse_proxy_config: d.reverse_proxy_config.clone(),
            additional_mounts: d.additional_mounts.clone(),
        }
    }
}

impl From<&DoguInstallation> for DoguDiffState {
    fn from(d: &DoguInstallation) -> Self {
        Self {
            namespace: d.name.namespace.clone(),
            version: Some(d.version.clone()),
            absent: false,
            min_volume_size: d.min_volume_size.clone(),
            reverse_proxy_config: d.reverse_proxy_config.clone(),
            additional_mounts: d.additional_mounts.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoguDiff {
    pub dogu_name: SimpleName,
    pub actual: DoguDiffState,
    pub expected: DoguDiffState,
    pub needed_actions: NeededActions,
}

impl DoguDiff {
    pub fn new(dogu_name: SimpleName, actual: DoguDiffState, expected: DoguDiffState) -> Self {
        let needed_actions = needed_actions(&expected, &actual);
        Self { dogu_name, actual, expected, needed_actions }
    }

    pub fn needs(&self, action: Action) -> bool { self.needed_actions.contains(&action) }
}

fn needed_actions(expected: &DoguDiffState, actual: &DoguDiffState) -> NeededActions {
    let mut out = NeededActions::new();
    match (expected.absent, actual.absent) {
        (true, true) => return out,
        (false, true) => { out.push(Action::Install); return out; }
        (true, false) => { out.push(Action::Uninstall); return out; }
        (false, false) => {}
    }

    if expected.namespace != actual.namespace {
        out.push(Action::SwitchDoguNamespace);
    }
    if volume_needs_growth(expected.min_volume_size.as_ref(), actual.min_volume_size.as_ref()) {
        out.push(Action::UpdateMinVolumeSize);
    }
    let (ep, ap) = (&expected.reverse_proxy_config, &actual.reverse_proxy_config);
    if ep.max_body_size != ap.max_body_size {
        out.push(Action::UpdateProxyBodySize);
    }
    if ep.rewrite_target != ap.rewrite_target {
        out.push(Action::UpdateProxyRewriteTarget);
    }
    if ep.additional_config != ap.additional_config {
        out.push(Action::UpdateProxyAdditionalConfig);
    }
    if mounts_differ(&expected.additional_mounts, &actual.additional_mounts) {
        out.push(Action::UpdateAdditionalMounts);
    }
    if let (Some(e), Some(a)) = (&expected.version, &actual.version) {
        match e.cmp(a) {
            Ordering::Greater => out.push(Action::Upgrade),
            Ordering::Less => out.push(Action::Downgrade),
            Ordering::Equal => {}
        }
    }
    out
}

/// Volumes only ever grow. A missing actual size counts as zero.
fn volume_needs_growth(expected: Option<&Quantity>, actual: Option<&Quantity>) -> bool {
    match (expected, actual) {
        (Some(e), Some(a)) => e > a,
        (Some(e), None) => e.nanos() > 0,
        (None, _) => false,
    }
}

/// Mount lists are compared as unordered sets.
pub fn mounts_differ(expected: &[AdditionalMount], actual: &[AdditionalMount]) -> bool {
    if expected.len() != actual.len() { return true; }
    let mut e: Vec<&AdditionalMount> = expected.iter().collect();
    let mut a: Vec<&AdditionalMount> = actual.iter().collect();
    e.sort_unstable();
    a.sort_unstable();
    e != a
}

/// One diff per dogu named in the blueprint or installed, sorted by name.
/// Installed dogus the blueprint does not mention keep their actual state.
pub fn determine_dogu_diffs(wanted: &[Dogu], installed: &BTreeMap<SimpleName, DoguInstallation>) -> Vec<DoguDiff> {
    let by_name: BTreeMap<&SimpleName, &Dogu> = wanted.iter().map(|d| (&d.name.simple_name, d)).collect();
    let names: BTreeSet<&SimpleName> = by_name.keys().copied().chain(installed.keys()).collect();
    names
        .into_iter()
        .map(|name| {
            let actual = installed.get(name).map(DoguDiffState::from).unwrap_or_else(DoguDiffState::not_installed);
            let expected = match by_name.get(name) {
                Some(d) => DoguDiffState::from(*d),
                None => actual.clone(),
            };
            DoguDiff::new(name.clone(), actual, expected)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::MountSourceType;

    fn dogu(name: &str, version: &str) -> Dogu { Dogu::new(name.parse().unwrap(), version.parse().unwrap()) }
    fn installed(name: &str, version: &str) -> DoguInstallation { DoguInstallation::new(name.parse().unwrap(), version.parse().unwrap()) }

    fn single(wanted: Dogu, inst: Option<DoguInstallation>) -> DoguDiff {
        let mut map = BTreeMap::new();
        if let Some(i) = inst { map.insert(i.name.simple_name.clone(), i); }
        let mut diffs = determine_dogu_diffs(&[wanted], &map);
        assert_eq!(diffs.len(), 1);
        diffs.remove(0)
    }

    fn actions(d: &DoguDiff) -> Vec<Action> { d.needed_actions.to_vec() }

    #[test]
    fn install_and_uninstall() {
        let d = single(dogu("official/ldap", "1.0.0-1"), None);
        assert_eq!(actions(&d), vec![Action::Install]);
        assert!(d.actual.absent);

        let d = single(Dogu::absent("official/ldap".parse().unwrap()), Some(installed("official/ldap", "1.0.0-1")));
        assert_eq!(actions(&d), vec![Action::Uninstall]);

        let d = single(Dogu::absent("official/ldap".parse().unwrap()), None);
        assert!(actions(&d).is_empty());
    }

    #[test]
    fn install_ignores_other_fields() {
        let mut want = dogu("official/ldap", "1.0.0-1");
        want.min_volume_size = Some("5Gi".parse().unwrap());
        want.reverse_proxy_config.rewrite_target = "/".into();
        assert_eq!(actions(&single(want, None)), vec![Action::Install]);
    }

    #[test]
    fn upgrade_and_downgrade() {
        let d = single(dogu("official/ldap", "1.2.3-1"), Some(installed("official/ldap", "1.1.1-1")));
        assert_eq!(actions(&d), vec![Action::Upgrade]);
        let d = single(dogu("official/ldap", "1.1.1-1"), Some(installed("official/ldap", "1.2.3-1")));
        assert_eq!(actions(&d), vec![Action::Downgrade]);
        let d = single(dogu("official/ldap", "1.1.1-1"), Some(installed("official/ldap", "1.1.1-1")));
        assert!(actions(&d).is_empty());
    }

    #[test]
    fn volume_only_grows() {
        let mut want = dogu("official/nexus", "3.0.0-1");
        let mut inst = installed("official/nexus", "3.0.0-1");
        want.min_volume_size = Some("10Gi".parse().unwrap());
        inst.min_volume_size = Some("5Gi".parse().unwrap());
        assert_eq!(actions(&single(want.clone(), Some(inst.clone()))), vec![Action::UpdateMinVolumeSize]);

        inst.min_volume_size = Some("20Gi".parse().unwrap());
        assert!(actions(&single(want.clone(), Some(inst.clone()))).is_empty());

        inst.min_volume_size = Some("10240Mi".parse().unwrap());
        assert!(actions(&single(want.clone(), Some(inst.clone()))).is_empty());

        inst.min_volume_size = None;
        assert_eq!(actions(&single(want, Some(inst))), vec![Action::UpdateMinVolumeSize]);
    }

    #[test]
    fn proxy_settings() {
        let mut want = dogu("official/nexus", "3.0.0-1");
        let mut inst = installed("official/nexus", "3.0.0-1");
        want.reverse_proxy_config.max_body_size = Some("100M".parse().unwrap());
        assert_eq!(actions(&single(want.clone(), Some(inst.clone()))), vec![Action::UpdateProxyBodySize]);

        inst.reverse_proxy_config.max_body_size = Some("100000k".parse().unwrap());
        assert!(actions(&single(want.clone(), Some(inst.clone()))).is_empty());

        want.reverse_proxy_config.max_body_size = None;
        want.reverse_proxy_config.rewrite_target = "/nexus".into();
        want.reverse_proxy_config.additional_config = "proxy_buffering off;".into();
        assert_eq!(
            actions(&single(want, Some(inst))),
            vec![Action::UpdateProxyBodySize, Action::UpdateProxyRewriteTarget, Action::UpdateProxyAdditionalConfig]
        );
    }

    #[test]
    fn namespace_switch_and_upgrade_fire_together() {
        let d = single(dogu("premium/nexus", "3.1.0-1"), Some(installed("official/nexus", "3.0.0-1")));
        assert_eq!(actions(&d), vec![Action::SwitchDoguNamespace, Action::Upgrade]);
    }

    #[test]
    fn mounts_are_compared_as_sets() {
        let m = |name: &str| AdditionalMount { source_type: MountSourceType::Secret, name: name.into(), volume: "v".into(), subfolder: String::new() };
        assert!(!mounts_differ(&[m("a"), m("b")], &[m("b"), m("a")]));
        assert!(mounts_differ(&[m("a")], &[m("a"), m("b")]));
        assert!(mounts_differ(&[m("a"), m("a")], &[m("a"), m("b")]));
    }

    #[test]
    fn separator_characters_in_mount_fields_do_not_collide() {
        let m = |name: &str, volume: &str| AdditionalMount { source_type: MountSourceType::ConfigMap, name: name.into(), volume: volume.into(), subfolder: String::new() };
        assert!(mounts_differ(&[m("a|b", "c")], &[m("a", "b|c")]));
        assert!(!mounts_differ(&[m("a|b", "c"), m("a", "b|c")], &[m("a", "b|c"), m("a|b", "c")]));
    }

    #[test]
    fn unmanaged_installed_dogus_are_left_alone() {
        let mut map = BTreeMap::new();
        let inst = installed("official/redmine", "5.0.0-1");
        map.insert(inst.name.simple_name.clone(), inst);
        let diffs = determine_dogu_diffs(&[dogu("official/ldap", "1.0.0-1")], &map);
        let names: Vec<&str> = diffs.iter().map(|d| d.dogu_name.as_str()).collect();
        assert_eq!(names, vec!["ldap", "redmine"]);
        assert!(diffs[1].needed_actions.is_empty());
        assert_eq!(diffs[1].expected, diffs[1].actual);
    }
}
