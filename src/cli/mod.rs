//! CLI module for stability
//!
//! Subcommands of the `stability` binary:
//!
//! ```bash
//! # Run the consumer against the unstable service behind a circuit breaker
//! stability run --calls 30 --cooldown-ms 3000
//!
//! # Same run without the breaker, for comparison
//! stability run --no-breaker
//!
//! # Print the effective configuration
//! stability --config stability.yaml config
//! ```

pub mod commands;

pub use commands::{cmd_config, cmd_run, run_demo, CmdRun, RunSummary};
