use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use envsync_core::{SyncMode, SyncOutcome};
use envsync_storage::PgUpsertStore;
use envsync_sync::{maybe_build_scheduler, orchestrator_from_env, sync_status, SyncConfig, SyncScheduler};
use envsync_web::{serve, web_port_from_env, AppState};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "envsync-cli")]
#[command(about = "Envelope status sync command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one sync (incremental unless a window is given)
    Sync {
        #[arg(long, conflicts_with = "force_full", value_parser = clap::value_parser!(u32).range(1..))]
        days_back: Option<u32>,
        #[arg(long)]
        force_full: bool,
    },
    /// Print recent sync log rows and the current lock
    Status {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Apply pending database migrations
    Migrate,
    /// Serve the sync trigger endpoints (and the scheduler when enabled)
    Serve,
    /// Run scheduled incremental syncs until Ctrl-C
    Schedule,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ENVSYNC_LOG_JSON")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current page");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    let command = cli.command.unwrap_or(Commands::Sync {
        days_back: None,
        force_full: false,
    });

    match command {
        Commands::Sync { days_back, force_full } => {
            let mode = match (days_back, force_full) {
                (_, true) => SyncMode::ForceFull,
                (Some(days), false) => SyncMode::DaysBack(days),
                (None, false) => SyncMode::Incremental,
            };
            let orchestrator = orchestrator_from_env(&config).await?;
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let report = orchestrator.run(mode, &cancel).await?;
            println!(
                "sync {}: run_id={} mode={} window={}..{} covered_until={} synced={} failures={} log_id={}",
                report.outcome,
                report.run_id,
                report.mode,
                report.window_start,
                report.window_end,
                report.covered_until,
                report.envelopes_synced,
                report.error_count(),
                report
                    .sync_log_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            for failure in &report.failures {
                println!(
                    "  {:?} {}: {}",
                    failure.kind,
                    failure.envelope_id.as_deref().unwrap_or("-"),
                    failure.detail
                );
            }
            if report.outcome == SyncOutcome::Error {
                bail!("sync run {} ended with outcome error", report.run_id);
            }
        }
        Commands::Status { limit } => {
            let store = PgUpsertStore::connect(&config.database_url)
                .await
                .context("connecting to database")?;
            let snapshot = sync_status(&store, limit).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Migrate => {
            let store = PgUpsertStore::connect(&config.database_url)
                .await
                .context("connecting to database")?;
            store.migrate().await.context("applying migrations")?;
            println!("migrations applied");
        }
        Commands::Serve => {
            let orchestrator = Arc::new(orchestrator_from_env(&config).await?);
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let scheduler = maybe_build_scheduler(&config, orchestrator.clone(), cancel.clone()).await?;
            if let Some(sched) = &scheduler {
                sched.start().await.context("starting scheduler")?;
                info!(cron = %config.sync_cron, "scheduler started");
            }

            serve(AppState::new(orchestrator, cancel), web_port_from_env()).await?;

            if let Some(mut sched) = scheduler {
                sched.shutdown().await.context("stopping scheduler")?;
            }
        }
        Commands::Schedule => {
            let orchestrator = Arc::new(orchestrator_from_env(&config).await?);
            let cancel = CancellationToken::new();
            let mut sched = SyncScheduler::new(orchestrator, config.sync_cron.clone(), cancel.clone())
                .build()
                .await?;
            sched.start().await.context("starting scheduler")?;
            info!(cron = %config.sync_cron, "scheduler running; press Ctrl-C to stop");

            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            cancel.cancel();
            sched.shutdown().await.context("stopping scheduler")?;
            info!("scheduler stopped");
        }
    }

    Ok(())
}
