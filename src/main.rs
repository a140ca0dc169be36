//! Command-line runner for analysis requests.

use std::path::PathBuf;
use std::process::ExitCode;

use anofox_econometrics::analysis::{run_analysis, AnalysisRequest};
use anofox_econometrics::config::Config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "anofox-econ")]
#[command(about = "Run econometric analyses on CSV files")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the output root directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a request file (JSON, or TOML with a .toml extension)
    Run { request: PathBuf },

    /// Print the fields a request reads
    Fields { request: PathBuf },
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { request } => {
            let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
            if let Some(dir) = cli.output_dir {
                config.output.root_dir = dir;
            }
            let request = AnalysisRequest::from_path(&request)
                .with_context(|| format!("reading request {}", request.display()))?;
            let outcome = run_analysis(request, config);
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Fields { request } => {
            let request = AnalysisRequest::from_path(&request)
                .with_context(|| format!("reading request {}", request.display()))?;
            println!("{}", serde_json::to_string_pretty(&request.required_fields())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
