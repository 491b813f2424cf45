use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
use commands::{eval::EvalArgs, scan::ScanArgs};

#[derive(Parser)]
#[command(name = "saguru")]
#[command(about = "Hybrid static/LLM vulnerability scanner for source repositories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a repository checkout and report findings.
    Scan(ScanArgs),

    /// Scan labeled fixtures and score the result against group specs.
    Eval(EvalArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Scan(args) => runtime.block_on(commands::scan::execute(args)),
        Commands::Eval(args) => runtime.block_on(commands::eval::execute(args)),
    }
}
