mod ansible;
mod cli;
mod config;
mod device;
mod inventory;
mod jobs;
mod models;
mod parsers;
mod prompt;
mod reconcile;
mod services;
mod ssh;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use ansible::Ansible;
use cli::{Cli, Commands};
use config::Config;
use jobs::VlanJob;
use models::{ProvisionReport, RunSummary, StepOutcome};
use services::Provisioner;
use ssh::SshConnector;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut cfg = Config::load();
    cli.apply(&mut cfg);

    init_tracing(&cfg.log_file);

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", run_id = %run_id);

    match run(cli, cfg, run_id).instrument(span).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// stderr plus an append-mode log file; the file layer is dropped if it cannot be opened
fn init_tracing(log_file: &str) {
    let (file_layer, file_error) = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "switch_autoconf=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!("Log file {} unavailable, logging to stderr only: {}", log_file, e);
    }
}

async fn run(cli: Cli, cfg: Config, run_id: Uuid) -> Result<bool> {
    match cli.command {
        Commands::CreateVlan { vlan_id, vlan_name } => {
            let target = prompt::vlan_target(vlan_id, vlan_name)?;

            let devices = inventory::load_devices(&cfg.devices_file).await;
            if devices.is_empty() {
                anyhow::bail!("No devices loaded from {}", cfg.devices_file);
            }
            tracing::debug!("Targets: {}", devices.addresses().collect::<Vec<_>>().join(", "));

            let credentials = prompt::load_credentials()?;
            let connector = SshConnector::new(cfg.ssh_port, cfg.ssh_timeout());
            let job = VlanJob::new(connector, credentials, target, cfg.worker_count());

            let summary = job.run(run_id, &devices).await;
            if cli.json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
            }
            Ok(summary.is_success())
        }
        Commands::AutoConfigure => {
            let ansible = Ansible::from_config(&cfg);
            let report = Provisioner::new(cfg, ansible).auto_configure(run_id).await;
            finish_provision(&report, cli.json)
        }
        Commands::DeployInventory => {
            let ansible = Ansible::from_config(&cfg);
            let report = Provisioner::new(cfg, ansible).deploy_inventory(run_id).await;
            finish_provision(&report, cli.json)
        }
    }
}

fn finish_provision(report: &ProvisionReport, json: bool) -> Result<bool> {
    if json {
        print_json(report)?;
    } else {
        print_provision(report);
    }
    Ok(report.is_success())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "VLAN {} ({}): {} succeeded, {} failed, {} changed",
        summary.target.id,
        summary.target.name,
        summary.succeeded(),
        summary.failed(),
        summary.changed()
    );
    for outcome in &summary.outcomes {
        match (&outcome.report, &outcome.error) {
            (Some(report), _) => println!(
                "  {:<16} {:<15} ok      {} vlan={:?} trunks {}/{} added",
                outcome.name,
                outcome.address,
                report.hostname,
                report.vlan,
                report.trunks_added(),
                report.trunks.len()
            ),
            (None, error) => println!(
                "  {:<16} {:<15} FAILED  {}",
                outcome.name,
                outcome.address,
                error.as_deref().unwrap_or_default()
            ),
        }
    }
}

fn print_provision(report: &ProvisionReport) {
    println!("{} ({})", report.workflow, report.run_id);
    for record in &report.steps {
        match &record.outcome {
            StepOutcome::Succeeded => println!("  {:<16} ok", record.name),
            StepOutcome::Failed { reason } => println!("  {:<16} FAILED   {}", record.name, reason),
            StepOutcome::Skipped { reason } => println!("  {:<16} skipped  {}", record.name, reason),
        }
    }
}
