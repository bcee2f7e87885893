//! Run parameters for a probe run, loadable from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::poll::PollConfig;

/// What to do when the locate step exhausts its polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateFailure {
    /// Record the trial in the locate-timed-out bucket and keep going.
    #[default]
    Bucket,
    /// Clean up the unit and end the run with the timeout error.
    Abort,
}

/// How correlation tags are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStyle {
    /// `test-<index>`.
    #[default]
    Sequence,
    /// A random UUID per trial.
    Uuid,
}

impl TagStyle {
    pub fn tag_for(self, index: u32) -> String {
        match self {
            TagStyle::Sequence => format!("test-{index}"),
            TagStyle::Uuid => uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub trials: u32,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    /// Resource files deployed once before the first trial.
    pub fixtures: Vec<PathBuf>,
    /// State a freshly materialized record is searched for.
    pub expected_state: String,
    /// Name of the variable carrying the correlation tag.
    pub tag_variable: String,
    pub tag_style: TagStyle,
    pub locate_sort_field: String,
    pub data_sort_field: String,
    pub page_limit: u32,
    pub locate_failure: LocateFailure,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            poll_interval_ms: 500,
            poll_timeout_ms: 7000,
            fixtures: vec![
                PathBuf::from("fixtures/test-tasks-query.bpmn"),
                PathBuf::from("fixtures/test-basic-form.form"),
            ],
            expected_state: "CREATED".to_string(),
            tag_variable: "queryTag".to_string(),
            tag_style: TagStyle::Sequence,
            locate_sort_field: "creationDate".to_string(),
            data_sort_field: "name".to_string(),
            page_limit: 10,
            locate_failure: LocateFailure::Bucket,
        }
    }
}

impl ProbeConfig {
    /// Load a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read probe config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("bad probe config {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(Error::Config("trials must be at least 1".into()));
        }
        if self.page_limit == 0 {
            return Err(Error::Config("page_limit must be at least 1".into()));
        }
        self.poll_config().map(|_| ())
    }

    pub fn poll_config(&self) -> Result<PollConfig> {
        PollConfig::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.poll_timeout_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = ProbeConfig::default();
        assert_eq!(config.trials, 100);
        let poll = config.poll_config().unwrap();
        assert_eq!(poll.interval(), Duration::from_millis(500));
        assert_eq!(poll.timeout(), Duration::from_secs(7));
        assert_eq!(config.locate_failure, LocateFailure::Bucket);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ProbeConfig::from_toml(
            r#"
            trials = 5
            locate_failure = "abort"
            tag_style = "uuid"
            "#,
        )
        .unwrap();
        assert_eq!(config.trials, 5);
        assert_eq!(config.locate_failure, LocateFailure::Abort);
        assert_eq!(config.tag_style, TagStyle::Uuid);
        assert_eq!(config.expected_state, "CREATED");
    }

    #[test]
    fn rejects_zero_trials() {
        assert!(ProbeConfig::from_toml("trials = 0").is_err());
    }

    #[test]
    fn rejects_timeout_below_interval() {
        let err = ProbeConfig::from_toml("poll_interval_ms = 1000\npoll_timeout_ms = 10");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn sequence_tags_are_index_based() {
        assert_eq!(TagStyle::Sequence.tag_for(7), "test-7");
        assert_ne!(TagStyle::Uuid.tag_for(7), TagStyle::Uuid.tag_for(7));
    }
}
