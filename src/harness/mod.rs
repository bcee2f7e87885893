//! Repeated-trial harness: deploy once, run N trials in order, tally.

pub mod report;
pub mod trial;

pub use report::{Failure, FailureBuckets, Report};
pub use trial::{Cleanup, FailureKind, TrialContext, TrialOutcome, cleanup};

use std::sync::Arc;

use tracing::info;

use crate::client::WorkflowClient;
use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::poll::PollConfig;

/// Runs probe trials against one engine.
pub struct Harness {
    client: Arc<dyn WorkflowClient>,
    config: ProbeConfig,
    poll: PollConfig,
}

impl Harness {
    pub fn new(client: Arc<dyn WorkflowClient>, config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        let poll = config.poll_config()?;
        Ok(Self {
            client,
            config,
            poll,
        })
    }

    /// Deploy the fixtures, then run every trial.
    pub async fn run(&self) -> Result<Report> {
        let deployment = self.client.deploy_fixtures(&self.config.fixtures).await?;
        let definition = deployment
            .primary()
            .ok_or_else(|| Error::Other("deployment contained no process definition".into()))?;
        info!(definition = %definition.id, key = %definition.key, "fixtures deployed");
        self.run_trials(&definition.id).await
    }

    /// Run every trial against an already deployed definition.
    ///
    /// Trials run one at a time; trial i+1 starts only after trial i has
    /// attempted its cleanup.
    pub async fn run_trials(&self, definition_id: &str) -> Result<Report> {
        let total = self.config.trials;
        let ctx = TrialContext {
            client: self.client.as_ref(),
            config: &self.config,
            poll: &self.poll,
            definition_id,
        };

        let mut report = Report::new(total);
        for index in 1..=total {
            let outcome = ctx.run(index, total).await?;
            report.record(outcome);
        }

        info!(
            trials = total,
            successes = report.successes,
            failures = report.buckets.total(),
            "run finished"
        );
        Ok(report)
    }
}
