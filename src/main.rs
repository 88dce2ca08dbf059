//! Audience Cleaner command line entry point.
//!
//! # Overview
//!
//! Runs the cleaning engine against a recorded list ([`ReplayPage`]) so criteria can
//! be rehearsed offline. It initializes:
//! - Settings ([`ConfigManager`]) from `Cleaner Settings.yaml` plus `CLEANER_*` overrides
//! - Logging (daily rotating file, optional console)
//! - A [`Worker`] serving start/cancel commands over a channel
//!
//! Ctrl-C requests cancellation; the run stops at its next checkpoint and the final
//! counters are printed either way.

use anyhow::{Context, Result, bail};
use audience_cleaner::config::normalize_criteria;
use audience_cleaner::controller::{Ack, Command, Request};
use audience_cleaner::replay::{Fixture, ReplayPage};
use audience_cleaner::{
    APP_NAME, ConfigManager, RunEvent, RunMonitor, RunReport, Termination, VERSION, Worker,
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Parser, Debug)]
#[command(name = "audience-cleaner", version, about = "Prune follower and following lists")]
struct Cli {
    /// Directory holding `Cleaner Settings.yaml`
    #[arg(long, default_value = "Cleaner Data", global = true)]
    config_dir: Utf8PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run the configured criteria against a recorded list
    Replay {
        /// YAML fixture describing the list
        #[arg(long)]
        fixture: Utf8PathBuf,

        /// Apply actions instead of the configured dry-run setting
        #[arg(long)]
        live: bool,

        /// Verbose logging
        #[arg(long)]
        debug: bool,
    },

    /// Write a default settings file
    InitConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("cleaner-worker")
        .build()?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config_manager = ConfigManager::new(&cli.config_dir)?;

    match cli.command {
        CliCommand::InitConfig => {
            if config_manager.create_default_user_config()? {
                println!("Wrote {}", config_manager.settings_path());
            } else {
                println!("{} already exists", config_manager.settings_path());
            }
            Ok(())
        }
        CliCommand::Replay {
            fixture,
            live,
            debug,
        } => {
            let mut user_config = config_manager.load_user_config()?;
            user_config.logging.debug |= debug;
            let _guard = audience_cleaner::logging::setup_logging(&user_config.logging)?;

            tracing::info!("Starting {} v{}", APP_NAME, VERSION);

            let mut criteria = normalize_criteria(&user_config.criteria);
            if live {
                criteria.is_dry_run = false;
            }

            let fixture = Fixture::load(&fixture)?;
            let page_kind = fixture.page_kind;
            let page = Arc::new(ReplayPage::new(fixture));

            let monitor = RunMonitor::new();
            let events = monitor.subscribe();
            let worker = Worker::new(page, user_config.timing.clone(), monitor);

            let (tx, rx) = mpsc::channel(8);
            let server = tokio::spawn(worker.serve(rx));

            match request(&tx, Command::Start {
                page_kind,
                criteria,
            })
            .await?
            {
                Ack::Rejected(reason) => bail!("Run rejected: {}", reason),
                _ => tracing::info!("Run accepted"),
            }

            wait_for_end(&tx, events).await?;
            drop(tx);

            let report = server
                .await
                .context("Worker task failed")?
                .context("Run ended without a report")?;
            print_summary(&report);

            match report.termination {
                Termination::Failed(reason) => bail!("Run failed: {}", reason),
                _ => Ok(()),
            }
        }
    }
}

async fn request(tx: &mpsc::Sender<Request>, command: Command) -> Result<Ack> {
    let (reply, ack) = oneshot::channel();
    tx.send(Request { command, reply })
        .await
        .context("Worker is gone")?;
    ack.await.context("Worker dropped the request")
}

/// Forward Ctrl-C as a cancel command until the run reports its end
async fn wait_for_end(
    tx: &mpsc::Sender<Request>,
    mut events: broadcast::Receiver<RunEvent>,
) -> Result<()> {
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::warn!("Interrupted, cancelling run");
                request(tx, Command::Cancel).await?;
            }
            event = events.recv() => match event {
                Ok(RunEvent::Completed { .. } | RunEvent::Failed { .. }) => return Ok(()),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event listener lagged by {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }
}

fn print_summary(report: &RunReport) {
    let ending = match &report.termination {
        Termination::EndOfList => "end of list",
        Termination::Cancelled => "cancelled",
        Termination::Failed(_) => "failed",
    };

    println!("Run finished ({})", ending);
    println!("  processed: {}", report.processed());
    println!("  kept:      {}", report.kept);
    println!("  removed:   {}", report.removed);
    for identifier in &report.removed_identifiers {
        println!("    - {}", identifier);
    }
}
