mod telemetry;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oncall::aws::AwsIncidentApi;
use oncall::config::{validate_deletion_list, DEFAULT_CONFIG_FILE};
use oncall::provision::preview_plan;
use oncall::{confirm_deletion, run_delete, run_provision, AdminConfig, EngagementPlan, RunReport, Session, Settings};
use tracing::{info, warn};

/// Provision and delete on-call contacts in AWS Systems Manager Incident Manager.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file [default: $ONCALL_CONFIG or ./oncall.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log intended changes without making them
    #[arg(long, global = true, conflicts_with = "live")]
    dry_run: bool,

    /// Apply changes, overriding `dry_run = true` in the configuration
    #[arg(long, global = true)]
    live: bool,

    /// AWS region, overriding the configuration and the SDK default chain
    #[arg(long, global = true)]
    region: Option<String>,

    /// Debug-level progress output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Info-level progress output only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write the run summary as JSON to this path
    #[arg(long, global = true)]
    summary_json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update contacts, channels, engagement plans and response plans
    Provision,
    /// Delete contacts; defaults to the [deletion] list
    Delete {
        /// Aliases to delete instead of the configured list
        aliases: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Leave response plans that engage the contacts untouched
        #[arg(long)]
        keep_response_plans: bool,
    },
    /// Check the configuration file and exit
    Validate,
    /// Print the engagement plan of every configured contact without calling AWS
    Plan {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every work item succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let path = config_path(cli.config.as_deref(), std::env::var("ONCALL_CONFIG").ok());
    let mut config =
        AdminConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    config
        .apply_env()
        .context("Failed to apply ONCALL_* environment overrides")?;
    apply_cli(&mut config.settings, &cli);

    telemetry::init(config.settings.verbose);
    info!(
        config = %path.display(),
        dry_run = config.settings.dry_run,
        contacts = config.contacts.len(),
        response_plans = config.response_plans.len(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Validate => {
            config.validate()?;
            println!(
                "Configuration OK: {} contact(s), {} response plan(s), {} alias(es) scheduled for deletion",
                config.contacts.len(),
                config.response_plans.len(),
                config.deletion.contacts.len()
            );
            Ok(true)
        }
        Command::Plan { json } => {
            config.validate_provisioning()?;
            let plans = preview_plans(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
            } else {
                print!("{}", render_plans(&config, &plans));
            }
            Ok(true)
        }
        Command::Provision => {
            config.validate_provisioning()?;
            let session = connect(&config.settings).await?;
            let report = run_provision(&session, &config).await;
            finish(&report, cli.summary_json.as_deref())
        }
        Command::Delete {
            aliases,
            yes,
            keep_response_plans,
        } => {
            let aliases = if aliases.is_empty() {
                config.deletion.contacts.clone()
            } else {
                aliases
            };
            validate_deletion_list(&aliases)?;

            let settings = &config.settings;
            if settings.require_confirmation && !yes {
                let confirmed =
                    confirm_deletion(&aliases, settings.dry_run, io::stdin().lock(), io::stdout())
                        .context("Failed to read confirmation")?;
                if !confirmed {
                    warn!("Deletion cancelled");
                    println!("Deletion cancelled.");
                    return Ok(false);
                }
            }

            let session = connect(settings).await?;
            let detach = settings.remove_from_response_plans && !keep_response_plans;
            let report = run_delete(&session, &aliases, detach).await;
            finish(&report, cli.summary_json.as_deref())
        }
    }
}

/// `--config`, then `$ONCALL_CONFIG`, then the default file name.
fn config_path(flag: Option<&Path>, env: Option<String>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| env.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn apply_cli(settings: &mut Settings, cli: &Cli) {
    if cli.dry_run {
        settings.dry_run = true;
    }
    if cli.live {
        settings.dry_run = false;
    }
    if let Some(region) = &cli.region {
        settings.region = Some(region.clone());
    }
    if cli.verbose {
        settings.verbose = true;
    }
    if cli.quiet {
        settings.verbose = false;
    }
}

/// Build the AWS-backed session and resolve the caller account up front so
/// bad credentials fail before any work starts.
async fn connect(settings: &Settings) -> Result<Session> {
    let api = AwsIncidentApi::connect(settings.region.as_deref()).await;
    let session = Session::new(Arc::new(api), settings);
    let account = session
        .account_id()
        .await
        .context("Failed to resolve caller identity; are AWS credentials configured?")?;
    info!(account, region = session.region(), "Connected to AWS");
    Ok(session)
}

fn preview_plans(config: &AdminConfig) -> BTreeMap<&str, EngagementPlan> {
    let interval = config.settings.channel_retry_interval_minutes;
    config
        .contacts
        .iter()
        .map(|(alias, spec)| (alias.as_str(), preview_plan(spec, interval)))
        .collect()
}

fn render_plans(config: &AdminConfig, plans: &BTreeMap<&str, EngagementPlan>) -> String {
    let mut out = String::new();
    for (alias, plan) in plans {
        let name = config
            .contacts
            .get(*alias)
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        out.push_str(&format!("{alias} ({name})\n"));
        for (idx, (stage, start)) in plan.stages.iter().zip(plan.engagement_offsets()).enumerate() {
            let targets: Vec<&str> = stage.targets.iter().map(|t| t.channel_ref.as_str()).collect();
            let targets = if targets.is_empty() {
                "(nothing)".to_string()
            } else {
                targets.join(", ")
            };
            out.push_str(&format!(
                "  stage {}  T+{start:>2}m  wait {:>2}m  {targets}\n",
                idx + 1,
                stage.duration_minutes
            ));
        }
    }
    out
}

fn finish(report: &RunReport, summary_json: Option<&Path>) -> Result<bool> {
    println!("{}", report.render());
    if let Some(path) = summary_json {
        let json = report.to_json().context("Failed to serialize run summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote run summary");
    }
    Ok(report.all_succeeded())
}
