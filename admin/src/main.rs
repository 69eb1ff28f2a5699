//! merit-admin: operator console for a merit ledger data directory.
//!
//! Opens the same store a host application uses and runs one command
//! against it: inspect accounts and stats, moderate, or drain pending
//! payout requests through the configured rate source and transfer
//! endpoint.

use std::path::PathBuf;

use clap::Parser;

use merit_payout::PayoutError;
use merit_service::{init_logging, LogFormat, MeritService, ServiceConfig, ServiceError};
use merit_types::{AccountId, Amount, ReviewerId};

#[derive(Parser)]
#[command(name = "merit-admin", about = "Operator console for the merit reward ledger")]
struct Cli {
    /// Path to a TOML configuration file. A missing file means defaults.
    #[arg(long, default_value = "merit.toml", env = "MERIT_CONFIG")]
    config: PathBuf,

    /// Data directory override.
    #[arg(long, env = "MERIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Reviewer id to act as for moderation and payout commands.
    #[arg(long, env = "MERIT_ACTOR")]
    actor: Option<u64>,

    /// Log level override: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MERIT_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Platform-wide statistics.
    Stats,
    /// One account's record and statistics.
    Account { id: u64 },
    /// Review history for an account, newest first.
    History {
        id: u64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Register an account (idempotent).
    Register { id: u64 },
    /// Set an account's payout destination address.
    SetDestination { id: u64, address: String },
    /// Credit a bonus to an account, in micro-units.
    Credit { id: u64, micros: u64 },
    /// Ban an account. Requires --actor.
    Ban { id: u64 },
    /// Lift a ban. Requires --actor.
    Unban { id: u64 },
    /// Process pending payout requests, oldest first. Requires --actor.
    Drain {
        /// Maximum number of requests to process.
        #[arg(long, default_value_t = 1)]
        max: usize,
    },
    /// Print the Prometheus metrics text for this process.
    Metrics,
}

fn actor_id(cli_actor: Option<u64>) -> anyhow::Result<ReviewerId> {
    cli_actor
        .map(ReviewerId::new)
        .ok_or_else(|| anyhow::anyhow!("--actor <id> is required for this command"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_logging(config.log_format.parse::<LogFormat>()?, &config.log_level);

    let service = MeritService::open(config)?;

    match cli.command {
        Command::Stats => {
            let stats = service.global_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Account { id } => {
            let account = service.get_account(AccountId::new(id))?;
            let stats = service.account_stats(AccountId::new(id))?;
            println!("{}", serde_json::to_string_pretty(&account)?);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::History { id, limit } => {
            let records = service.history(AccountId::new(id), limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Register { id } => {
            let account = service.register_account(AccountId::new(id))?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::SetDestination { id, address } => {
            service.set_destination(AccountId::new(id), &address)?;
            tracing::info!(account = id, %address, "destination updated");
        }
        Command::Credit { id, micros } => {
            let balance = service.credit(AccountId::new(id), Amount::from_micros(micros))?;
            println!("new balance: {balance}");
        }
        Command::Ban { id } => {
            service.ban(actor_id(cli.actor)?, AccountId::new(id))?;
            tracing::info!(account = id, "account banned");
        }
        Command::Unban { id } => {
            service.unban(actor_id(cli.actor)?, AccountId::new(id))?;
            tracing::info!(account = id, "ban lifted");
        }
        Command::Drain { max } => {
            let actor = actor_id(cli.actor)?;
            drain_payouts(&service, actor, max).await?;
        }
        Command::Metrics => {
            print!("{}", service.render_metrics()?);
        }
    }

    Ok(())
}

/// Process up to `max` pending requests, oldest first.
///
/// A transfer failure cancels that request and moves on to the next one.
/// A rate failure stops the drain: the same quote would fail for every
/// remaining request, and all of them stay pending for a later run.
async fn drain_payouts<R, T>(
    service: &MeritService<R, T>,
    actor: ReviewerId,
    max: usize,
) -> anyhow::Result<()>
where
    R: merit_payout::RateSource,
    T: merit_payout::TransferClient,
{
    let mut processed = 0usize;
    while processed < max {
        let Some(request) = service.oldest_pending_payout()? else {
            tracing::info!(processed, "no pending payout requests left");
            break;
        };
        processed += 1;

        match service.process_payout(request.id, actor).await {
            Ok(receipt) => {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            }
            Err(ServiceError::Payout(PayoutError::RateUnavailable(reason))) => {
                tracing::warn!(%reason, "rate unavailable, stopping drain");
                break;
            }
            Err(ServiceError::Payout(PayoutError::TransferFailed(reason))) => {
                tracing::warn!(
                    payout = %request.id,
                    account = %request.account,
                    %reason,
                    "transfer failed, request cancelled"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
