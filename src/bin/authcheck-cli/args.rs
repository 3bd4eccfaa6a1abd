use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "authcheck-cli", version, about = "Mailbox liveness and domain policy checks")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// YAML configuration (domains, probe, hash_cost)
    #[arg(long, env = "AUTHCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Proves an address is live by racing SMTP probes against its exchangers
    Verify { email: String },
    /// Lists the ranked mail exchangers of a domain
    Mx { domain: String },
    /// Shows how the configured domain policy classifies a domain
    Policy { domain: String },
}
