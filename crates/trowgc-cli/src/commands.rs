use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tracing::{error, info, warn};
use trowgc_catalog::{BlobDeleter, ReapOutcome};
use trowgc_cycle::{
    run_cycle, CycleReport, CycleResult, DocumentFeed, GcConfig, InventoryFeed, ManifestFeed,
};
use trowgc_transport::{DiskUsage, KubectlRegistry, LocalRegistry};

use crate::cli::*;
use crate::settings::{self, Effective, FileSettings};

/// A transport the daemon can drive from a blocking task.
pub trait GcBackend:
    InventoryFeed + ManifestFeed + DocumentFeed + BlobDeleter + DiskUsage + Send
{
}

impl<T> GcBackend for T where
    T: InventoryFeed + ManifestFeed + DocumentFeed + BlobDeleter + DiskUsage + Send
{
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => settings::load_file(path)?,
        None => FileSettings::default(),
    };
    let effective = settings::resolve(file, cli.command.gc_args());

    match cli.command {
        Command::Run(_) => cmd_run(effective, &cli.format).await,
        Command::Once(_) => cmd_once(effective, &cli.format).await,
        Command::Config(_) => cmd_config(&effective, &cli.format),
    }
}

fn open_backend(effective: &Effective) -> Box<dyn GcBackend> {
    let layout = effective.gc.layout.clone();
    match effective.backend {
        BackendKind::Kubectl => Box::new(KubectlRegistry::new(effective.kubectl.clone(), layout)),
        BackendKind::Local => Box::new(LocalRegistry::new(&effective.root, layout)),
    }
}

/// Run one cycle on a blocking thread, with a disk usage report on each side.
async fn cycle_once(
    config: Arc<GcConfig>,
    mut backend: Box<dyn GcBackend>,
) -> anyhow::Result<(Box<dyn GcBackend>, CycleResult<CycleReport>)> {
    tokio::task::spawn_blocking(move || {
        report_disk_usage(backend.as_mut(), "before");
        let result = run_cycle(&config, backend.as_mut());
        report_disk_usage(backend.as_mut(), "after");
        (backend, result)
    })
    .await
    .context("garbage collection task panicked")
}

fn report_disk_usage(backend: &mut dyn GcBackend, when: &str) {
    match backend.disk_usage() {
        Ok(report) => {
            info!("disk usage {when} cycle:");
            for line in report.lines() {
                info!("{line}");
            }
        }
        Err(e) => warn!(error = %e, "could not read disk usage"),
    }
}

async fn cmd_run(effective: Effective, format: &OutputFormat) -> anyhow::Result<()> {
    let config = Arc::new(effective.gc.clone());
    let mut backend = open_backend(&effective);
    info!(
        backend = ?effective.backend,
        min_blob_age_secs = config.min_blob_age.as_secs(),
        poll_interval_secs = config.poll_interval.as_secs(),
        dry_run = config.dry_run,
        "trowgc starting"
    );

    loop {
        let (returned, result) = cycle_once(Arc::clone(&config), backend).await?;
        backend = returned;
        match result {
            Ok(report) => print_report(&report, format)?,
            Err(e) => error!(error = %e, phase = %e.phase(), "garbage collection cycle failed"),
        }

        info!(seconds = config.poll_interval.as_secs(), "sleeping until next cycle");
        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for shutdown signal")?;
                info!("interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

async fn cmd_once(effective: Effective, format: &OutputFormat) -> anyhow::Result<()> {
    let config = Arc::new(effective.gc.clone());
    let backend = open_backend(&effective);
    let (_, result) = cycle_once(config, backend).await?;
    let report = result.context("garbage collection cycle failed")?;
    print_report(&report, format)
}

fn cmd_config(effective: &Effective, format: &OutputFormat) -> anyhow::Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(effective)?);
        return Ok(());
    }

    let gc = &effective.gc;
    println!("{}", "Collector".bold());
    println!("  min blob age:    {}s", gc.min_blob_age.as_secs());
    println!("  poll interval:   {}s", gc.poll_interval.as_secs());
    println!("  dry run:         {}", gc.dry_run);
    println!("  blob prefix:     {}", gc.layout.blob_prefix);
    println!("  manifest prefix: {}", gc.layout.manifest_prefix);
    println!("{}", "Transport".bold());
    println!("  backend:         {:?}", effective.backend);
    println!("  root:            {}", effective.root);
    if effective.backend == BackendKind::Kubectl {
        let k = &effective.kubectl;
        println!("  kubectl:         {}", k.kubectl);
        println!("  pod:             {}/{}", k.namespace.cyan(), k.pod.cyan());
    }
    Ok(())
}

fn print_report(report: &CycleReport, format: &OutputFormat) -> anyhow::Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    let mode = if report.dry_run { " (dry run)".yellow().to_string() } else { String::new() };
    println!("{} Cycle {} complete{}", "✓".green().bold(), report.id.short_id().yellow(), mode);
    for line in report.summary.to_string().lines() {
        println!("  {line}");
    }
    match report.reap {
        ReapOutcome::Skipped => println!("  {}", "Nothing to delete".dimmed()),
        ReapOutcome::Simulated { files, bytes } => {
            println!("  Would delete {} blobs ({} bytes)", files.to_string().bold(), bytes)
        }
        ReapOutcome::Deleted { files, bytes } => {
            println!("  Deleted {} blobs ({} bytes)", files.to_string().green().bold(), bytes)
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    Ok(())
}
