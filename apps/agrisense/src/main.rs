use std::{future::Future, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, load_settings_from, ClientSettings, WorkflowController, WorkflowError,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "agrisense", about = "Crop and fertilizer recommendation from soil NPK readings")]
struct Cli {
    /// Config file; defaults to ./agrisense.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    sensor_url: Option<String>,
    #[arg(long, global = true)]
    prediction_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Print the final workflow state as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and show one sensor reading.
    Reading {
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Fetch a reading, then ask for a crop and fertilizer recommendation.
    Recommend {
        #[command(flatten)]
        retry: RetryArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct RetryArgs {
    /// Extra attempts for timeouts, unreachable services and 5xx responses.
    #[arg(long, default_value_t = 0)]
    retries: u32,
    #[arg(long, default_value_t = 500)]
    retry_delay_ms: u64,
}

impl RetryArgs {
    fn delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    init_tracing(&settings.log_level);

    let controller =
        WorkflowController::from_settings(&settings).context("failed to build service clients")?;

    let outcome = match cli.command {
        Command::Reading { retry } => {
            with_retries(retry, "fetch_reading", || controller.fetch_reading())
                .await
                .map(|_| ())
        }
        Command::Recommend { retry } => {
            match with_retries(retry, "fetch_reading", || controller.fetch_reading()).await {
                Ok(_) => with_retries(retry, "request_recommendation", || {
                    controller.request_recommendation()
                })
                .await
                .map(|_| ()),
                Err(err) => Err(err),
            }
        }
    };

    let state = controller.state();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&render::state_json(&state))?);
    } else {
        print!("{}", render::render_text(&state));
    }

    outcome.context("workflow did not complete")
}

fn resolve_settings(cli: &Cli) -> Result<ClientSettings> {
    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path, true)?,
        None => load_settings()?,
    };

    if let Some(v) = &cli.sensor_url {
        settings.sensor_base_url = v.clone();
    }
    if let Some(v) = &cli.prediction_url {
        settings.prediction_base_url = v.clone();
    }
    if let Some(v) = cli.timeout_secs {
        settings.request_timeout_secs = v;
    }

    settings.validate()?;
    Ok(settings)
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Re-invokes `op` after retryable failures. The controller itself never
/// retries.
async fn with_retries<T, F, Fut>(
    policy: RetryArgs,
    operation: &str,
    mut op: F,
) -> Result<T, WorkflowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WorkflowError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.retries => {
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.retries + 1,
                    error = %err,
                    "retrying after failure"
                );
                tokio::time::sleep(policy.delay()).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(retries: u32) -> RetryArgs {
        RetryArgs {
            retries,
            retry_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = &AtomicU32::new(0);
        let result = with_retries(policy(3), "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(WorkflowError::Timeout)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retries(policy(2), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WorkflowError::service(503))
        })
        .await;

        assert_eq!(result, Err(WorkflowError::service(503)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_failures() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retries(policy(5), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WorkflowError::ValidationError("negative".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cli_flags_override_loaded_settings() {
        let cli = Cli::parse_from([
            "agrisense",
            "--sensor-url",
            "http://127.0.0.1:5000",
            "--timeout-secs",
            "3",
            "recommend",
            "--retries",
            "2",
        ]);
        let settings = resolve_settings(&cli).expect("settings");
        assert_eq!(settings.sensor_base_url, "http://127.0.0.1:5000");
        assert_eq!(settings.request_timeout_secs, 3);
        assert!(matches!(
            cli.command,
            Command::Recommend {
                retry: RetryArgs { retries: 2, .. }
            }
        ));
    }

    #[test]
    fn zero_timeout_flag_is_rejected() {
        let cli = Cli::parse_from(["agrisense", "--timeout-secs", "0", "reading"]);
        assert!(resolve_settings(&cli).is_err());
    }
}
