use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use authcheck_lib::AuthConfig;

mod args;
mod mx;
mod output;
mod verify;

use args::{Cli, Commands};
use output::Format;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let format = Format::parse(&cli.format)?;
    let config = match &cli.config {
        Some(path) => AuthConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AuthConfig::default(),
    };

    let positive = match &cli.cmd {
        Commands::Verify { email } => verify::run_verify(&config, email, format)?,
        Commands::Mx { domain } => mx::run_mx(domain, format)?,
        Commands::Policy { domain } => verify::run_policy(&config, domain, format)?,
    };

    // exit codes: 0 ok, 2 negative, 1 fatal
    if !positive {
        std::process::exit(2);
    }
    Ok(())
}
