//! Aggregated results of a run.

use std::fmt;

use serde::Serialize;

use super::trial::{FailureKind, TrialOutcome};

/// One classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Derived record key, or the unit key when no record was ever located.
    pub key: String,
    pub error: String,
}

/// Per-kind failure lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FailureBuckets {
    /// Located by search, not readable by key.
    pub point_read_failed: Vec<Failure>,
    /// Located by search, data query failed.
    pub data_query_failed: Vec<Failure>,
    /// Located by search, data query returned nothing.
    pub data_empty: Vec<Failure>,
    /// Never located within the poll budget.
    pub locate_timed_out: Vec<Failure>,
}

impl FailureBuckets {
    pub fn get(&self, kind: FailureKind) -> &[Failure] {
        match kind {
            FailureKind::PointRead => &self.point_read_failed,
            FailureKind::DataQuery => &self.data_query_failed,
            FailureKind::DataEmpty => &self.data_empty,
            FailureKind::LocateTimeout => &self.locate_timed_out,
        }
    }

    pub fn total(&self) -> usize {
        self.point_read_failed.len()
            + self.data_query_failed.len()
            + self.data_empty.len()
            + self.locate_timed_out.len()
    }
}

/// Summary of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Trials the run was configured for.
    pub trials: u32,
    pub successes: u32,
    /// Successful trials whose data did not carry the expected tag.
    pub tag_not_echoed: u32,
    #[serde(flatten)]
    pub buckets: FailureBuckets,
}

impl Report {
    pub fn new(trials: u32) -> Self {
        Self {
            trials,
            successes: 0,
            tag_not_echoed: 0,
            buckets: FailureBuckets::default(),
        }
    }

    /// Fold one trial's outcome in.
    pub fn record(&mut self, outcome: TrialOutcome) {
        let b = &mut self.buckets;
        match outcome {
            TrialOutcome::Success { tag_echoed, .. } => {
                self.successes += 1;
                if !tag_echoed {
                    self.tag_not_echoed += 1;
                }
            }
            TrialOutcome::PointReadFailed { record, error } => b.point_read_failed.push(Failure {
                key: record.0,
                error: error.to_string(),
            }),
            TrialOutcome::DataQueryFailed { record, error } => b.data_query_failed.push(Failure {
                key: record.0,
                error: error.to_string(),
            }),
            TrialOutcome::DataEmpty { record } => {
                let error = crate::error::Error::EmptyData(record.clone()).to_string();
                b.data_empty.push(Failure { key: record.0, error })
            }
            TrialOutcome::LocateTimedOut { unit, error } => b.locate_timed_out.push(Failure {
                key: unit.0,
                error: error.to_string(),
            }),
        }
    }

    /// Trials folded in so far.
    pub fn classified(&self) -> usize {
        self.successes as usize + self.buckets.total()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.trials;
        let b = &self.buckets;
        writeln!(f, "Failure rate:")?;
        writeln!(f, "Could not retrieve user task: {}", b.point_read_failed.len())?;
        writeln!(f, "Could not retrieve variables: {}", b.data_query_failed.len())?;
        writeln!(f, "Could not retrieve actual variables: {}", b.data_empty.len())?;
        if !b.locate_timed_out.is_empty() {
            writeln!(f, "User task never appeared in search: {}", b.locate_timed_out.len())?;
        }
        writeln!(f, "Successful runs: {}", self.successes)?;
        writeln!(f, "Total runs: {n}")?;
        writeln!(f, "-------------")?;
        writeln!(f, "Detailed failure information:")?;
        writeln!(
            f,
            "{}/{n} times we got a user task back in a search query, but when we tried to get that user task by key, it was not found.",
            b.point_read_failed.len()
        )?;
        writeln!(
            f,
            "{}/{n} times we got a user task back in a search query, but when we tried to get the variables for that user task, it was not found.",
            b.data_query_failed.len()
        )?;
        writeln!(
            f,
            "{}/{n} times we got a user task back in a search query, but when we tried to get the variables for that user task, the variables were not populated.",
            b.data_empty.len()
        )?;
        if !b.locate_timed_out.is_empty() {
            writeln!(
                f,
                "{}/{n} times the user task did not show up in a search query before the polling timeout.",
                b.locate_timed_out.len()
            )?;
        }
        if self.tag_not_echoed > 0 {
            writeln!(
                f,
                "{}/{n} times the variables were returned but did not carry the instance's tag.",
                self.tag_not_echoed
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{RecordKey, UnitKey};

    fn key(k: &str) -> RecordKey {
        RecordKey(k.into())
    }

    #[test]
    fn outcomes_land_in_their_buckets() {
        let mut report = Report::new(5);
        report.record(TrialOutcome::Success {
            record: key("1"),
            tag_echoed: true,
        });
        report.record(TrialOutcome::Success {
            record: key("2"),
            tag_echoed: false,
        });
        report.record(TrialOutcome::PointReadFailed {
            record: key("3"),
            error: Error::remote("get user task", Some(404), "missing"),
        });
        report.record(TrialOutcome::DataEmpty { record: key("4") });
        report.record(TrialOutcome::LocateTimedOut {
            unit: UnitKey("5".into()),
            error: Error::Other("timeout".into()),
        });

        assert_eq!(report.successes, 2);
        assert_eq!(report.tag_not_echoed, 1);
        assert_eq!(report.buckets.get(FailureKind::PointRead)[0].key, "3");
        assert!(report.buckets.get(FailureKind::DataQuery).is_empty());
        assert_eq!(
            report.buckets.data_empty[0],
            Failure {
                key: "4".into(),
                error: "no data found for record 4".into(),
            }
        );
        assert_eq!(report.buckets.locate_timed_out[0].key, "5");
        assert_eq!(report.classified(), 5);
    }

    #[test]
    fn display_prints_rate_sentences() {
        let mut report = Report::new(3);
        report.record(TrialOutcome::DataEmpty { record: key("9") });
        let text = report.to_string();
        assert!(text.contains("Could not retrieve actual variables: 1"));
        assert!(text.contains("Total runs: 3"));
        assert!(text.contains("1/3 times we got a user task back in a search query, but when we tried to get the variables for that user task, the variables were not populated."));
        assert!(!text.contains("never appeared"));
    }

    #[test]
    fn serializes_buckets_flat() {
        let report = Report::new(1);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["trials"], 1);
        assert!(value["point_read_failed"].as_array().unwrap().is_empty());
    }
}
