use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use blueprint_core::{validate_statically, Blueprint, BlueprintMask, EffectiveBlueprint, SimpleName};
use blueprint_diff::{determine_state_diff, ConfigEntryDiff, StateDiff};
use blueprint_ecosystem::{EcosystemState, ResolvedReferences};
use blueprint_lifecycle::{evaluate, BlueprintSpec, CycleInput, CycleResult, SpecConfig};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "blueprintctl", version, about = "Evaluate blueprints against an ecosystem snapshot")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Allow masks and blueprints to move dogus to another namespace
    #[arg(long = "allow-dogu-namespace-switch", env = "BLUEPRINT_ALLOW_NAMESPACE_SWITCH", global = true, action = ArgAction::SetTrue)]
    allow_dogu_namespace_switch: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Args, Debug)]
struct BlueprintArgs {
    /// Blueprint YAML file
    #[arg(short = 'b', long = "blueprint")]
    blueprint: PathBuf,
    /// Blueprint mask YAML file
    #[arg(short = 'm', long = "mask")]
    mask: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EcosystemArgs {
    /// Observed ecosystem state YAML file
    #[arg(short = 's', long = "state")]
    state: PathBuf,
    /// Resolved secret/configmap values YAML file
    #[arg(short = 'r', long = "references")]
    references: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate blueprint and mask
    Validate {
        #[command(flatten)]
        input: BlueprintArgs,
    },
    /// Print the blueprint with the mask applied
    Effective {
        #[command(flatten)]
        input: BlueprintArgs,
    },
    /// Print the actions needed to reach the effective blueprint
    Diff {
        #[command(flatten)]
        input: BlueprintArgs,
        #[command(flatten)]
        ecosystem: EcosystemArgs,
    },
    /// Run one full evaluation cycle and print outcome, events and conditions
    Evaluate {
        #[command(flatten)]
        input: BlueprintArgs,
        #[command(flatten)]
        ecosystem: EcosystemArgs,
        /// Component that must be installed (repeatable)
        #[arg(long = "require-component")]
        required_components: Vec<String>,
        #[arg(long = "stopped", env = "BLUEPRINT_STOPPED", action = ArgAction::SetTrue)]
        stopped: bool,
        #[arg(long = "ignore-dogu-health", env = "BLUEPRINT_IGNORE_DOGU_HEALTH", action = ArgAction::SetTrue)]
        ignore_dogu_health: bool,
        #[arg(long = "ignore-component-health", env = "BLUEPRINT_IGNORE_COMPONENT_HEALTH", action = ArgAction::SetTrue)]
        ignore_component_health: bool,
    },
}

fn init_tracing() {
    let env = std::env::var("BLUEPRINT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("BLUEPRINT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid BLUEPRINT_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn load_blueprint(args: &BlueprintArgs) -> Result<(Blueprint, BlueprintMask)> {
    let blueprint = load_yaml(&args.blueprint)?;
    let mask = match &args.mask {
        Some(p) => load_yaml(p)?,
        None => BlueprintMask::default(),
    };
    Ok((blueprint, mask))
}

fn load_ecosystem(args: &EcosystemArgs) -> Result<(EcosystemState, ResolvedReferences)> {
    let state = load_yaml(&args.state)?;
    let references = match &args.references {
        Some(p) => load_yaml(p)?,
        None => ResolvedReferences::default(),
    };
    Ok((state, references))
}

fn print_config_diffs(scope: &str, diffs: &[ConfigEntryDiff]) {
    for d in diffs {
        let value = d.expected.value.as_deref().unwrap_or("");
        println!("  {} {} • {} {}", scope, d.key, d.needed_action, value);
    }
}

fn print_diff(diff: &StateDiff) {
    println!("dogus: {}", diff.dogu_action_counts());
    for d in diff.dogu_diffs.iter().filter(|d| !d.needed_actions.is_empty()) {
        let actions: Vec<&str> = d.needed_actions.iter().map(|a| a.as_str()).collect();
        println!("  {} • {}", d.dogu_name, actions.join(", "));
    }
    println!("components: {}", diff.component_action_counts());
    for c in diff.component_diffs.iter().filter(|c| !c.needed_actions.is_empty()) {
        let actions: Vec<&str> = c.needed_actions.iter().map(|a| a.as_str()).collect();
        println!("  {} • {}", c.name, actions.join(", "));
    }
    println!("dogu config: {}", diff.dogu_config_action_counts());
    for (dogu, diffs) in &diff.dogu_config_diffs {
        print_config_diffs(dogu.as_str(), diffs);
    }
    println!("sensitive dogu config: {}", diff.sensitive_dogu_config_action_counts());
    for (dogu, diffs) in &diff.sensitive_dogu_config_diffs {
        print_config_diffs(dogu.as_str(), diffs);
    }
    println!("global config: {}", diff.global_config_action_counts());
    print_config_diffs("global", &diff.global_config_diffs);
}

fn print_cycle(res: &CycleResult) {
    println!("outcome: {:?}", res.outcome);
    for e in &res.events {
        println!("event {}: {}", e.name(), e.message());
    }
    for (ty, c) in res.spec.conditions.iter() {
        if c.message.is_empty() {
            println!("condition {} = {} ({})", ty, c.status, c.reason);
        } else {
            println!("condition {} = {} ({}): {}", ty, c.status, c.reason, c.message);
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let allow_switch = cli.allow_dogu_namespace_switch;

    match cli.command {
        Commands::Validate { input } => {
            let (bp, mask) = load_blueprint(&input)?;
            validate_statically(&bp, &mask, allow_switch).context("static validation failed")?;
            match cli.output {
                Output::Human => println!("blueprint is valid"),
                Output::Json => println!("{}", serde_json::json!({ "valid": true })),
            }
        }
        Commands::Effective { input } => {
            let (bp, mask) = load_blueprint(&input)?;
            let eff = EffectiveBlueprint::calculate(&bp, &mask, allow_switch).context("calculating effective blueprint")?;
            match cli.output {
                Output::Human => print!("{}", serde_yaml::to_string(&eff)?),
                Output::Json => println!("{}", serde_json::to_string_pretty(&eff)?),
            }
        }
        Commands::Diff { input, ecosystem } => {
            let (bp, mask) = load_blueprint(&input)?;
            let (state, references) = load_ecosystem(&ecosystem)?;
            let eff = EffectiveBlueprint::calculate(&bp, &mask, allow_switch).context("calculating effective blueprint")?;
            let diff = determine_state_diff(&eff, &state, &references).context("determining state diff")?;
            match cli.output {
                Output::Human => print_diff(&diff),
                Output::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
            }
        }
        Commands::Evaluate { input, ecosystem, required_components, stopped, ignore_dogu_health, ignore_component_health } => {
            let (bp, mask) = load_blueprint(&input)?;
            let (state, references) = load_ecosystem(&ecosystem)?;
            let config = SpecConfig { allow_dogu_namespace_switch: allow_switch, stopped, ignore_dogu_health, ignore_component_health };
            let id = input.blueprint.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let spec = BlueprintSpec::new(id, bp, mask, config);
            let cycle = CycleInput {
                ecosystem: state,
                references,
                required_components: required_components.into_iter().map(SimpleName::from).collect(),
                ..Default::default()
            };
            let res = evaluate(spec, cycle);
            info!(outcome = ?res.outcome, events = res.events.len(), "evaluation finished");
            match cli.output {
                Output::Human => print_cycle(&res),
                Output::Json => println!("{}", serde_json::to_string_pretty(&res)?),
            }
        }
    }
    Ok(())
}
