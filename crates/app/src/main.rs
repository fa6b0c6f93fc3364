//! Terminal front end for the trivia quiz.

mod play;

use clap::{Parser, Subcommand};
use quiz_core::model::Difficulty;
use services::{AppServices, CancelToken, Clock, ConfigLoader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "quiz")]
#[command(about = "Multiple-choice trivia in the terminal")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a round interactively
    Play(PlayArgs),
    /// Load a round of questions and print them as JSON
    Questions(RoundArgs),
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct RoundArgs {
    /// Number of questions to load
    #[arg(long, short = 'n', default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=50))]
    count: u16,

    /// easy, medium or hard; any difficulty when omitted
    #[arg(long, short)]
    difficulty: Option<Difficulty>,

    /// Skip the network and use the bundled questions
    #[arg(long)]
    offline: bool,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct PlayArgs {
    #[command(flatten)]
    round: RoundArgs,

    /// Seconds allowed per question; unlimited when omitted
    #[arg(long)]
    time_limit: Option<u32>,
}

impl Default for PlayArgs {
    fn default() -> Self {
        Self {
            round: RoundArgs {
                count: 10,
                difficulty: None,
                offline: false,
            },
            time_limit: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    run(cli).await.inspect_err(|err| tracing::error!(error = %err, "command failed"))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Play(PlayArgs::default()));
    let round = match &command {
        Commands::Play(args) => args.round,
        Commands::Questions(args) => *args,
    };

    let loaded = ConfigLoader::from_env();
    if loaded.has_warnings() {
        tracing::debug!(count = loaded.warnings.len(), "configuration fell back to defaults");
    }
    let config = if round.offline {
        loaded.config.into_offline()
    } else {
        loaded.config
    };
    let services = AppServices::from_config(config, Clock::default_clock());

    let cancel = CancelToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match command {
        Commands::Play(args) => {
            let time_limit = args
                .time_limit
                .map(|secs| chrono::Duration::seconds(i64::from(secs)));
            let services = services.with_time_limit(time_limit);
            play::run(&services, args.round.count.into(), args.round.difficulty, &cancel).await?;
        }
        Commands::Questions(args) => {
            let batch = services
                .questions()
                .load_questions(args.count.into(), args.difficulty, &cancel)
                .await;
            if let Some(notice) = batch.notice() {
                eprintln!("{notice}");
            }
            println!("{}", serde_json::to_string_pretty(&batch.questions)?);
        }
    }
    Ok(())
}

fn spawn_ctrl_c_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
