use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use the_reviewer::config::Config;
use the_reviewer::handler::RequestHandler;
use the_reviewer::{Orchestrator, RunOutcome};
use the_reviewer_ipc::{r#pub::IpcPublisher, sub::IpcSubscriber, ReviewRequest};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "the-reviewer", version)]
#[command(about = "AI post-game reviews of League of Legends matches, posted to a chat webhook.")]
struct Cli {
    /// TOML configuration file. Environment variables override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review the given matches
    Match {
        #[arg(value_name = "MATCH_ID", required = true)]
        match_ids: Vec<String>,
    },
    /// Review the most recent matches of a player
    Summoner {
        #[arg(value_name = "NAME#TAG")]
        riot_id: String,
        /// Defaults to batch.match_count
        #[arg(long, value_name = "N")]
        count: Option<u32>,
    },
    /// Review the most recent matches of every configured summoner
    Batch,
    /// Review requests pushed over the IPC socket as they arrive
    Serve,
    /// Push a review request to a running `serve`
    Enqueue {
        #[arg(
            value_name = "MATCH_ID",
            required_unless_present = "summoner",
            conflicts_with = "summoner"
        )]
        match_id: Option<String>,
        #[arg(long, value_name = "NAME#TAG")]
        summoner: Option<String>,
        #[arg(long, value_name = "N")]
        count: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    // Running without a .env file is fine
    let _ = dotenvy::dotenv();
    setup_tracing_subscriber();

    info!("Loading configuration");
    let config = Config::load(cli.config.as_ref()).await?;

    let mut all_succeeded = true;
    let outcomes = match cli.command {
        Command::Match { match_ids } => setup(&config).await?.run_batch(&match_ids).await,
        Command::Summoner { riot_id, count } => setup(&config)
            .await?
            .review_summoner(&riot_id, count.unwrap_or(config.batch.match_count))
            .await
            .with_context(|| format!("Failed to review matches of {riot_id}"))?,
        Command::Batch => {
            if config.batch.summoners.is_empty() {
                anyhow::bail!("No summoners configured, set batch.summoners or SUMMONER_NAMES");
            }
            let orchestrator = setup(&config).await?;
            let mut outcomes = Vec::new();
            for riot_id in &config.batch.summoners {
                match orchestrator
                    .review_summoner(riot_id, config.batch.match_count)
                    .await
                {
                    Ok(reviewed) => outcomes.extend(reviewed),
                    Err(e) => {
                        error!(kind = %e.kind(), "Failed to list matches of {riot_id}: {e}");
                        println!("{riot_id}: failed ({}): {e}", e.kind());
                        all_succeeded = false;
                    }
                }
            }
            outcomes
        }
        Command::Serve => {
            let orchestrator = setup(&config).await?;
            info!("Listening for review requests on {}", config.ipc_url);
            let subscriber = IpcSubscriber::new(&config.ipc_url)
                .with_context(|| format!("Failed to listen on {}", config.ipc_url))?;
            RequestHandler::new(orchestrator, subscriber).start().await;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Enqueue {
            match_id,
            summoner,
            count,
        } => {
            let request = match (match_id, summoner) {
                (Some(match_id), _) => ReviewRequest::Match { match_id },
                (None, Some(riot_id)) => ReviewRequest::Summoner {
                    riot_id,
                    count: count.unwrap_or(config.batch.match_count),
                },
                (None, None) => anyhow::bail!("Nothing to enqueue"),
            };
            enqueue(&config.ipc_url, request).await?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    for outcome in &outcomes {
        println!("{outcome}");
    }
    all_succeeded &= outcomes.iter().all(RunOutcome::is_done);

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Everything but `enqueue` runs the pipeline and needs the full configuration.
async fn setup(config: &Config) -> anyhow::Result<Orchestrator> {
    config.validate()?;
    Orchestrator::from_config(config).await
}

async fn enqueue(ipc_url: &str, request: ReviewRequest) -> anyhow::Result<()> {
    let publisher = IpcPublisher::<ReviewRequest>::new(ipc_url)
        .with_context(|| format!("Failed to open {ipc_url}"))?;
    publisher.set_send_timeout(ENQUEUE_TIMEOUT)?;
    info!("Enqueueing {}", request.describe());
    publisher
        .publish(request)
        .await
        .context("Failed to enqueue request, is `the-reviewer serve` running?")?;
    Ok(())
}

fn setup_tracing_subscriber() {
    let layer = fmt::layer()
        .pretty()
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_thread_ids(false)
        .with_target(false);
    tracing_subscriber::registry()
        .with(layer)
        .with(EnvFilter::from_default_env())
        .init();
}
