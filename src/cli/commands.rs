use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::breaker::{CircuitBreaker, CircuitStats, Clock, SystemClock};
use crate::config::Config;
use crate::consumer::{ConsumeReport, Consumer};
use crate::service::UnstableService;

/// Run command - drive the unstable service through the consumer
#[derive(Debug, Clone, Default)]
pub struct CmdRun {
    pub calls: Option<u32>,
    pub interval_ms: Option<u64>,
    pub error_threshold: Option<u32>,
    pub cooldown_ms: Option<u64>,
    /// Call the unstable service directly
    pub no_breaker: bool,
    /// Wrap the breaker in a second breaker
    pub nested: bool,
}

impl CmdRun {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(calls) = self.calls {
            config.consumer.call_count = calls;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.consumer.interval_ms = interval_ms;
        }
        if let Some(threshold) = self.error_threshold {
            config.circuit_breaker.error_threshold = threshold;
        }
        if let Some(cooldown_ms) = self.cooldown_ms {
            config.circuit_breaker.cooldown_ms = cooldown_ms;
        }
    }
}

/// Outcome of a demo run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: ConsumeReport,

    /// Breaker directly wrapping the service, absent with `no_breaker`
    pub breaker: Option<CircuitStats>,

    /// Outer breaker, only with `nested`
    pub outer: Option<CircuitStats>,
}

/// Wire service, breaker(s) and consumer together and run the consumer
///
/// Command-line overrides are applied before the configuration is validated.
pub fn run_demo(config: &Config, cmd: &CmdRun, clock: Arc<dyn Clock>) -> Result<RunSummary> {
    let mut config = config.clone();
    cmd.apply(&mut config);
    config.validate()?;

    let service = UnstableService::new(config.unstable_service.to_unstable_config())
        .with_clock(clock.clone());
    let consumer = Consumer::new(config.consumer.to_consumer_config()).with_clock(clock.clone());

    if cmd.no_breaker {
        info!("Running consumer without circuit breaker");
        let report = consumer.consume(&service);
        return Ok(RunSummary {
            report,
            breaker: None,
            outer: None,
        });
    }

    let breaker_config = config.circuit_breaker.to_breaker_config();
    let breaker = CircuitBreaker::new(breaker_config.clone(), service)
        .context("Failed to create circuit breaker")?
        .with_clock(clock.clone());

    if cmd.nested {
        let outer = CircuitBreaker::new(breaker_config, breaker.with_name("inner"))
            .context("Failed to create outer circuit breaker")?
            .with_name("outer")
            .with_clock(clock);
        let report = consumer.consume(&outer);
        return Ok(RunSummary {
            report,
            breaker: Some(outer.inner().stats()),
            outer: Some(outer.stats()),
        });
    }

    let report = consumer.consume(&breaker);
    Ok(RunSummary {
        report,
        breaker: Some(breaker.stats()),
        outer: None,
    })
}

/// Run the demo in real time and print a summary
pub fn cmd_run(config: &Config, cmd: &CmdRun) -> Result<()> {
    let mut config = config.clone();
    cmd.apply(&mut config);

    println!("Circuit Breaker Demo");
    println!(
        "{} calls every {}ms, breaker opens after {} errors for {}ms",
        config.consumer.call_count,
        config.consumer.interval_ms,
        config.circuit_breaker.error_threshold,
        config.circuit_breaker.cooldown_ms
    );
    println!();

    let summary = run_demo(&config, cmd, Arc::new(SystemClock))?;

    println!();
    println!(
        "Calls: {}  succeeded: {}  failed: {}",
        summary.report.calls, summary.report.succeeded, summary.report.failed
    );
    if let Some(stats) = &summary.breaker {
        print_stats("breaker", stats);
    }
    if let Some(stats) = &summary.outer {
        print_stats("outer breaker", stats);
    }

    Ok(())
}

fn print_stats(label: &str, stats: &CircuitStats) {
    println!(
        "{}: state={} forwarded={} failures={} rejections={} opened={}",
        label,
        stats.state,
        stats.forwarded,
        stats.failures,
        stats.rejections,
        stats.open_count
    );
}

/// Config command - print the effective configuration
pub fn cmd_config(config: &Config) -> Result<()> {
    config.validate()?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::ManualClock;

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        let cmd = CmdRun {
            calls: Some(7),
            cooldown_ms: Some(100),
            ..Default::default()
        };

        cmd.apply(&mut config);

        assert_eq!(config.consumer.call_count, 7);
        assert_eq!(config.consumer.interval_ms, 1_000);
        assert_eq!(config.circuit_breaker.error_threshold, 3);
        assert_eq!(config.circuit_breaker.cooldown_ms, 100);
    }

    #[test]
    fn test_run_without_breaker_hits_service_every_time() {
        let mut config = Config::default();
        config.consumer.call_count = 10;
        let cmd = CmdRun {
            no_breaker: true,
            ..Default::default()
        };

        let summary = run_demo(&config, &cmd, Arc::new(ManualClock::new())).unwrap();

        // 4 answers, then broken for the rest of the 12s window.
        assert_eq!(summary.report.succeeded, 4);
        assert_eq!(summary.report.failed, 6);
        assert!(summary.breaker.is_none());
    }

    #[test]
    fn test_override_replaces_invalid_threshold() {
        let mut config = Config::default();
        config.circuit_breaker.error_threshold = 0;
        config.consumer.call_count = 3;
        let cmd = CmdRun {
            error_threshold: Some(2),
            ..Default::default()
        };

        let summary = run_demo(&config, &cmd, Arc::new(ManualClock::new())).unwrap();

        assert_eq!(summary.report.calls, 3);
        assert!(summary.breaker.is_some());
    }

    #[test]
    fn test_run_rejects_invalid_threshold() {
        let mut config = Config::default();
        config.circuit_breaker.error_threshold = 0;

        let result = run_demo(&config, &CmdRun::default(), Arc::new(ManualClock::new()));
        assert!(result.is_err());
    }
}
