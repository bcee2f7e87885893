//! probe CLI: run consistency trials against a cluster or the simulator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use consistency_probe::client::{RestClient, SimClient, SimProfile, WorkflowClient};
use consistency_probe::config::{Config, LocateFailure, ProbeConfig, RemoteConfig};
use consistency_probe::harness::Harness;
use consistency_probe::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "probe", about = "Measure eventual-consistency gaps in task search and reads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run trials against the cluster at CAMUNDA_REST_ADDRESS
    Run {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run trials against the in-memory simulated engine
    Simulate {
        #[command(flatten)]
        run: RunArgs,
        /// Delay before a user task shows up in search
        #[arg(long, default_value_t = 1200)]
        materialize_ms: u64,
        /// Delay before a user task can be read by key
        #[arg(long, default_value_t = 0)]
        point_read_lag_ms: u64,
        /// Delay before a user task's variables are returned
        #[arg(long, default_value_t = 0)]
        data_lag_ms: u64,
        /// Make every n-th instance's task unreadable by key
        #[arg(long)]
        point_read_missing_every: Option<u32>,
        /// Make every n-th instance's variable query fail
        #[arg(long)]
        data_error_every: Option<u32>,
        /// Make every n-th instance's variable query come back empty
        #[arg(long)]
        data_empty_every: Option<u32>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// TOML file with probe settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of trials
    #[arg(long)]
    trials: Option<u32>,
    /// Search poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Search poll timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Stop the run when a user task never appears in search
    #[arg(long)]
    abort_on_locate_timeout: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn probe_config(&self) -> anyhow::Result<ProbeConfig> {
        let mut config = match self.config {
            Some(ref path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(ms) = self.interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            config.poll_timeout_ms = ms;
        }
        if self.abort_on_locate_timeout {
            config.locate_failure = LocateFailure::Abort;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env();

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "consistency-probe".to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Run { run } => {
            let client = RestClient::new(RemoteConfig::from_env()?)?;
            cmd_run(Arc::new(client), &run).await
        }
        Command::Simulate {
            run,
            materialize_ms,
            point_read_lag_ms,
            data_lag_ms,
            point_read_missing_every,
            data_error_every,
            data_empty_every,
        } => {
            let client = SimClient::new(SimProfile {
                materialize_after: Duration::from_millis(materialize_ms),
                point_read_after: Duration::from_millis(point_read_lag_ms),
                data_after: Duration::from_millis(data_lag_ms),
                point_read_missing_every,
                data_error_every,
                data_empty_every,
            });
            cmd_run(Arc::new(client), &run).await
        }
    }
}

async fn cmd_run(client: Arc<dyn WorkflowClient>, args: &RunArgs) -> anyhow::Result<()> {
    let harness = Harness::new(client, args.probe_config()?)?;
    let report = harness.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
