use crate::demo::{run_demo, DemoArgs};
use crate::jobs::{run_recompute, run_score, RecomputeArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use railmatch::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "railmatch-api",
    about = "Match rail wagon offers to freight requests and track deal status",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Rescore every (request, offer) pair and upsert the matches
    Recompute(RecomputeArgs),
    /// Print the ranked, explained candidates for one request
    Score(ScoreArgs),
    /// Walk the reference scenario from scoring through a completed deal
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
}

/// CSV sources used to seed the in-memory marketplace.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct CatalogArgs {
    /// Offers CSV export
    #[arg(long)]
    pub(crate) offers: Option<PathBuf>,
    /// Transport requests CSV export
    #[arg(long)]
    pub(crate) requests: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Recompute(args) => run_recompute(args).await,
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}
