//! packport CLI tool.

use clap::{Parser, Subcommand, ValueEnum};
use packport_config::ConvertSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "packport")]
#[command(about = "Convert Packer templates to normalized build configurations", long_about = None)]
struct Cli {
    /// YAML file with global conversion defaults
    #[arg(long, env = "PACKPORT_SETTINGS", global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Packer template directory
    Convert(commands::convert::ConvertArgs),
    /// Parse a Packer template directory and report what was found
    Validate {
        /// Template directory
        template_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let settings = match &cli.settings {
        Some(path) => commands::load_settings(path)?,
        None => ConvertSettings::default(),
    };

    match cli.command {
        Commands::Convert(args) => {
            commands::convert::run(args, settings)?;
        }
        Commands::Validate { template_dir } => {
            commands::validate::run(&template_dir, settings)?;
        }
    }

    Ok(())
}
