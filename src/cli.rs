use clap::Parser;

use crate::types::{ForbiddenPolicy, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "czds-dl", about = "Download zone files from the CZDS service")]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long, default_value = "config.json")]
    pub config: String,

    /// CZDS account password (overrides the config file).
    /// WARNING: passing via --password is visible in process listings.
    /// Prefer the CZDS_PASSWORD environment variable instead.
    #[arg(short = 'p', long, env = "CZDS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Root directory for dated zone-file folders (overrides the config file)
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Issue a HEAD request first and skip zones whose local copy has the same size
    #[arg(long)]
    pub prefetch: bool,

    /// Retry ceiling for list and zone requests (overrides the config file)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Policy for zones the service refuses with 403 (overrides the config file)
    #[arg(long, value_enum)]
    pub on_forbidden: Option<ForbiddenPolicy>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Do not send email notifications even if mail is configured
    #[arg(long)]
    pub no_mail: bool,
}
