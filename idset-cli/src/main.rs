use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use idset_cli::config::Settings;
use idset_cli::logging;
use idset_cli::Command;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogOutputFormat {
    Json,
    Pretty,
}

/// Command line arguments for the idset tool.
#[derive(Debug, Parser)]
#[clap(name = "idset", about = "Encode and inspect GLOBSET and IDSET buffers")]
struct CliArgs {
    /// Optional path to the configuration file. If not provided, defaults
    /// and `IDSET_` environment variables are used.
    #[clap(short = 'c', long, required = false)]
    config: Option<PathBuf>,

    #[clap(short = 'o', long = "output-format", default_value = "pretty")]
    output_format: Option<LogOutputFormat>,

    #[clap(subcommand)]
    command: Command,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let pretty = matches!(args.output_format, Some(LogOutputFormat::Pretty));
    logging::setup_logging(logging::DEFAULT_DIRECTIVES, pretty);

    let settings = Settings::new(args.config)?;

    let output = idset_cli::run(&args.command, &settings).inspect_err(|error| {
        tracing::error!(%error, "command failed");
    })?;
    println!("{}", idset_cli::render(&output, &settings)?);

    Ok(())
}
