//! advtr CLI: builds and pushes the Docker images declared in an `.advtrc` file.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "advtr", version)]
#[command(about = "Build and push Docker images from an .advtrc file", long_about = None)]
struct Cli {
    /// Config file, or directory to search for one
    #[arg(short, long, global = true, env = "ADVTR_FILE", default_value = ".")]
    file: PathBuf,

    /// Log verbosity. RUST_LOG takes precedence when set
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Notice)]
    loglevel: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Silent,
    Error,
    Notice,
    Verbose,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Notice => "info",
            LogLevel::Verbose => "debug",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build images, and optionally push them
    Build(commands::build::BuildArgs),
    /// Print the resolved configuration as JSON
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.loglevel.directive())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => commands::build::run(&cli.file, args).await,
        Commands::Config => commands::config::show(&cli.file),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
