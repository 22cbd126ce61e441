use blueprint_core::{Blueprint, BlueprintMask};
use blueprint_ecosystem::{DoguInstallation, EcosystemState, HealthStatus, ResolvedReferences};
use blueprint_lifecycle::{evaluate, BlueprintSpec, ConditionStatus, ConditionType, CycleInput, CycleOutcome, Event, SpecConfig};

const BLUEPRINT: &str = r#"
dogus:
  - name: official/ldap
    version: 1.2.3-1
  - name: official/nexus
    version: 3.68.1-2
config:
  global:
    - key: fqdn
      value: ces2.example.com
  dogus:
    ldap:
      - key: admin_password
        sensitive: true
        secretRef:
          secretName: ldap-secrets
          secretKey: password
"#;

fn spec(mask: &str, config: SpecConfig) -> BlueprintSpec {
    let bp: Blueprint = serde_yaml::from_str(BLUEPRINT).unwrap();
    let mask: BlueprintMask = serde_yaml::from_str(mask).unwrap();
    BlueprintSpec::new("blueprint-sample", bp, mask, config)
}

fn input() -> CycleInput {
    CycleInput {
        ecosystem: EcosystemState::default()
            .with_dogu(DoguInstallation::new("official/ldap".parse().unwrap(), "1.1.1-1".parse().unwrap()))
            .with_global_config([("fqdn", "ces1.example.com")].into_iter().collect()),
        references: ResolvedReferences::default().with_dogu_value("ldap", "admin_password", "s3cret"),
        ..Default::default()
    }
}

fn names(events: &[Event]) -> Vec<&'static str> { events.iter().map(Event::name).collect() }

#[test]
fn happy_cycle_is_ready_and_rerun_is_silent() {
    let res = evaluate(spec("dogus: []", SpecConfig::default()), input());
    assert_eq!(res.outcome, CycleOutcome::Ready { should_apply: true });
    assert_eq!(
        names(&res.events),
        vec![
            "EffectiveBlueprintCalculated",
            "EcosystemHealthy",
            "DoguStateDiffDetermined",
            "ComponentStateDiffDetermined",
            "DoguConfigDiffDetermined",
            "SensitiveDoguConfigDiffDetermined",
            "GlobalConfigDiffDetermined",
        ]
    );
    assert_eq!(res.events[2].message(), "dogu state diff determined: 2 actions (install: 1, upgrade: 1)");
    assert_eq!(res.events[6].message(), "global config diff determined: 1 action (set: 1)");
    assert!(res.spec.conditions.is_true(ConditionType::Valid));
    assert!(res.spec.conditions.is_true(ConditionType::Executable));
    assert!(res.spec.events().is_empty());

    let again = evaluate(res.spec, input());
    assert_eq!(again.outcome, CycleOutcome::Ready { should_apply: true });
    assert!(again.events.is_empty(), "{:?}", again.events);
}

#[test]
fn premium_mask_without_namespace_switch_is_invalid() {
    let res = evaluate(spec("dogus:\n  - name: premium/nexus\n", SpecConfig::default()), input());
    assert_eq!(res.outcome, CycleOutcome::Invalid);
    assert_eq!(names(&res.events), vec!["BlueprintSpecInvalid"]);
    let msg = res.events[0].message();
    assert!(msg.contains("official") && msg.contains("premium"), "{}", msg);
    assert!(res.spec.state_diff.is_none());
    assert!(res.spec.effective_blueprint.is_none());
    assert_eq!(res.spec.conditions.status(ConditionType::Valid), Some(ConditionStatus::False));

    let allowed = SpecConfig { allow_dogu_namespace_switch: true, ..Default::default() };
    let res = evaluate(spec("dogus:\n  - name: premium/nexus\n", allowed), input());
    assert_eq!(res.outcome, CycleOutcome::Ready { should_apply: true });
    let nexus = res.spec.effective_blueprint.as_ref().unwrap().dogu(&"nexus".into()).unwrap();
    assert_eq!(nexus.name.to_string(), "premium/nexus");
}

#[test]
fn unhealthy_ecosystem_stops_before_the_diff() {
    let mut inp = input();
    inp.ecosystem.installed_dogus.values_mut().for_each(|d| d.health = HealthStatus::Unavailable);
    let res = evaluate(spec("dogus: []", SpecConfig::default()), inp.clone());
    assert_eq!(res.outcome, CycleOutcome::Unhealthy);
    assert!(res.spec.state_diff.is_none());
    assert_eq!(names(&res.events), vec!["EffectiveBlueprintCalculated", "EcosystemUnhealthy"]);

    let ignoring = SpecConfig { ignore_dogu_health: true, ..Default::default() };
    let res = evaluate(spec("dogus: []", ignoring), inp);
    assert!(matches!(res.outcome, CycleOutcome::Ready { .. }));
}

#[test]
fn health_collaborator_error_leaves_health_unknown() {
    let mut inp = input();
    inp.health_error = Some("dogu registry unreachable".into());
    let res = evaluate(spec("dogus: []", SpecConfig::default()), inp);
    assert_eq!(res.outcome, CycleOutcome::Unhealthy);
    assert_eq!(res.spec.conditions.status(ConditionType::EcosystemHealthy), Some(ConditionStatus::Unknown));
    assert_eq!(res.events.last().unwrap().message(), "cannot check ecosystem health: dogu registry unreachable");
}

#[test]
fn missing_secret_is_reported_separately_from_invalidity() {
    let mut inp = input();
    inp.references = ResolvedReferences::default();
    let res = evaluate(spec("dogus: []", SpecConfig::default()), inp);
    assert_eq!(res.outcome, CycleOutcome::MissingReferences);
    assert!(res.spec.conditions.is_true(ConditionType::Valid));
    assert_eq!(res.spec.conditions.status(ConditionType::Executable), Some(ConditionStatus::Unknown));
    assert_eq!(res.events.last().unwrap().name(), "MissingConfigReferences");
}

#[test]
fn dependency_error_invalidates() {
    let mut inp = input();
    inp.dependency_error = Some("dogu official/nexus needs official/postgresql".into());
    let res = evaluate(spec("dogus: []", SpecConfig::default()), inp);
    assert_eq!(res.outcome, CycleOutcome::Invalid);
    assert_eq!(res.spec.conditions.get(ConditionType::Valid).unwrap().reason, "InvalidDependencies");
}

#[test]
fn rerunning_an_invalid_cycle_is_silent() {
    let mut inp = input();
    inp.dependency_error = Some("dogu official/nexus needs official/postgresql".into());
    let first = evaluate(spec("dogus: []", SpecConfig::default()), inp.clone());
    assert_eq!(names(&first.events), vec!["EffectiveBlueprintCalculated", "BlueprintSpecInvalid"]);
    let second = evaluate(first.spec, inp.clone());
    assert_eq!(second.outcome, CycleOutcome::Invalid);
    assert!(second.events.is_empty(), "{:?}", second.events);
    let third = evaluate(second.spec, inp);
    assert!(third.events.is_empty(), "{:?}", third.events);
    assert_eq!(third.spec.conditions.get(ConditionType::Valid).unwrap().reason, "InvalidDependencies");
}

#[test]
fn rerunning_with_config_for_an_absent_dogu_is_silent() {
    let mut bp: Blueprint = serde_yaml::from_str(BLUEPRINT).unwrap();
    bp.dogus.push(blueprint_core::Dogu::absent("official/redmine".parse().unwrap()));
    bp.config.dogus.insert("redmine".into(), vec![blueprint_core::ConfigEntry::present("logging/root", "DEBUG")]);
    let s = BlueprintSpec::new("blueprint-sample", bp, BlueprintMask::default(), SpecConfig::default());

    let first = evaluate(s, input());
    assert_eq!(first.outcome, CycleOutcome::Invalid);
    assert_eq!(names(&first.events), vec!["BlueprintSpecInvalid"]);
    let second = evaluate(first.spec, input());
    assert!(second.events.is_empty(), "{:?}", second.events);
    assert_eq!(second.spec.conditions.status(ConditionType::Valid), Some(ConditionStatus::False));
}

#[test]
fn config_entry_without_source_is_invalid() {
    let mut bp: Blueprint = serde_yaml::from_str(BLUEPRINT).unwrap();
    bp.config.global.push(serde_yaml::from_str("key: admin_group").unwrap());
    let s = BlueprintSpec::new("blueprint-sample", bp, BlueprintMask::default(), SpecConfig::default());

    let res = evaluate(s, input());
    assert_eq!(res.outcome, CycleOutcome::Invalid);
    assert_eq!(names(&res.events), vec!["BlueprintSpecInvalid"]);
    assert!(res.events[0].message().contains("\"admin_group\" needs a value"), "{}", res.events[0].message());
}

#[test]
fn fixed_blueprint_becomes_valid_again() {
    let mut inp = input();
    inp.dependency_error = Some("dogu official/nexus needs official/postgresql".into());
    let broken = evaluate(spec("dogus: []", SpecConfig::default()), inp);
    let fixed = evaluate(broken.spec, input());
    assert!(matches!(fixed.outcome, CycleOutcome::Ready { .. }));
    assert!(fixed.spec.conditions.is_true(ConditionType::Valid));
}

#[test]
fn stopped_spec_is_never_applied() {
    let res = evaluate(spec("dogus: []", SpecConfig { stopped: true, ..Default::default() }), input());
    assert_eq!(res.outcome, CycleOutcome::Ready { should_apply: false });
}

#[test]
fn completed_spec_is_reapplied_only_when_something_changed() {
    let mut res = evaluate(spec("dogus: []", SpecConfig::default()), input());
    res.spec.complete();
    assert!(res.spec.should_be_applied(), "diff still has actions");

    let converged = CycleInput {
        ecosystem: EcosystemState::default()
            .with_dogu(DoguInstallation::new("official/ldap".parse().unwrap(), "1.2.3-1".parse().unwrap()))
            .with_dogu(DoguInstallation::new("official/nexus".parse().unwrap(), "3.68.1-2".parse().unwrap()))
            .with_global_config([("fqdn", "ces2.example.com")].into_iter().collect())
            .with_sensitive_dogu_config("ldap", [("admin_password", "s3cret")].into_iter().collect()),
        ..input()
    };
    let res = evaluate(res.spec, converged);
    assert_eq!(res.outcome, CycleOutcome::Ready { should_apply: false });
}

#[test]
fn cycle_result_serializes_events_by_name() {
    let res = evaluate(spec("dogus: []", SpecConfig::default()), input());
    let json = serde_json::to_value(&res).unwrap();
    assert_eq!(json["outcome"]["outcome"], "ready");
    assert_eq!(json["events"][0]["name"], "EffectiveBlueprintCalculated");
}
