mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{groups, ous, precalc, protection};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Groups(args) => groups::run(&cli, args),
        Commands::Ous(args) => ous::run(&cli, args),
        Commands::Precalc(args) => precalc::run(&cli, args),
        Commands::Protection(args) => protection::run(&cli, args),
    }
}

/// Log to stderr. `RUST_LOG` wins over the `-v` count.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> { run() }
