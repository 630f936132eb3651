use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stability::cli::{self, CmdRun};
use stability::config;

#[derive(Parser)]
#[command(name = "stability")]
#[command(version, about = "Circuit breaker demo against an unstable service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (environment variables are used when omitted)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "debug")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the consumer against the unstable service
    Run {
        /// Number of calls to make
        #[arg(long)]
        calls: Option<u32>,

        /// Pause between calls in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Consecutive errors before the circuit opens
        #[arg(long)]
        error_threshold: Option<u32>,

        /// Cooldown before probing, in milliseconds
        #[arg(long)]
        cooldown_ms: Option<u64>,

        /// Call the service directly, without a circuit breaker
        #[arg(long, conflicts_with = "nested")]
        no_breaker: bool,

        /// Wrap the circuit breaker in a second one
        #[arg(long)]
        nested: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            calls,
            interval_ms,
            error_threshold,
            cooldown_ms,
            no_breaker,
            nested,
        } => {
            let cmd = CmdRun {
                calls,
                interval_ms,
                error_threshold,
                cooldown_ms,
                no_breaker,
                nested,
            };
            cli::cmd_run(&config, &cmd)?;
        }
        Commands::Config => {
            cli::cmd_config(&config)?;
        }
    }

    Ok(())
}
