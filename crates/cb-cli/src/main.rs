use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cb_cli::commands::{buckets, stages, summary, worklog};
use cb_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Summary(args) => summary::run(&mut stdout, args, &config)?,
        Commands::Stages(args) => stages::run(&mut stdout, args, &config)?,
        Commands::Worklog(args) => worklog::run(&mut stdout, args, &config)?,
        Commands::Buckets(args) => buckets::run(&mut stdout, args, &config)?,
    }

    Ok(())
}
