//! One trial: create → locate → point-read → secondary-read → cleanup.
//!
//! A trial never fails because the engine was inconsistent; inconsistency
//! is classified into a [`TrialOutcome`]. `Err` is reserved for conditions
//! that stop the whole run: a failed create, or a locate timeout under
//! [`LocateFailure::Abort`].

use opentelemetry::KeyValue;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::client::WorkflowClient;
use crate::config::{LocateFailure, ProbeConfig};
use crate::error::{Error, Result};
use crate::model::{DataItem, DerivedRecord, Page, RecordFilter, RecordKey, Sort, UnitKey, UnitOfWork};
use crate::poll::{PollConfig, poll};
use crate::telemetry::metrics;
use crate::telemetry::trial::{record_outcome, record_stage, start_trial_span};

/// Where a trial ended up. Exactly one per trial.
#[derive(Debug)]
pub enum TrialOutcome {
    /// Every read succeeded and returned data.
    Success {
        record: RecordKey,
        /// Data carried the trial's tag, the record pointed back at the unit,
        /// and the unit echoed the deployed definition.
        tag_echoed: bool,
    },
    /// Search found the record, reading it by key failed.
    PointReadFailed { record: RecordKey, error: Error },
    /// Search found the record, querying its data failed.
    DataQueryFailed { record: RecordKey, error: Error },
    /// Search found the record, its data came back empty.
    DataEmpty { record: RecordKey },
    /// The record never showed up in search within the poll budget.
    LocateTimedOut { unit: UnitKey, error: Error },
}

/// Failure buckets a trial can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    PointRead,
    DataQuery,
    DataEmpty,
    LocateTimeout,
}

impl TrialOutcome {
    /// `None` for a successful trial.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TrialOutcome::Success { .. } => None,
            TrialOutcome::PointReadFailed { .. } => Some(FailureKind::PointRead),
            TrialOutcome::DataQueryFailed { .. } => Some(FailureKind::DataQuery),
            TrialOutcome::DataEmpty { .. } => Some(FailureKind::DataEmpty),
            TrialOutcome::LocateTimedOut { .. } => Some(FailureKind::LocateTimeout),
        }
    }

    pub fn label(&self) -> &'static str {
        match self.failure_kind() {
            None => "success",
            Some(FailureKind::PointRead) => "point_read_failed",
            Some(FailureKind::DataQuery) => "data_query_failed",
            Some(FailureKind::DataEmpty) => "data_empty",
            Some(FailureKind::LocateTimeout) => "locate_timed_out",
        }
    }
}

/// Everything a trial needs besides its index.
pub struct TrialContext<'a> {
    pub client: &'a dyn WorkflowClient,
    pub config: &'a ProbeConfig,
    pub poll: &'a PollConfig,
    pub definition_id: &'a str,
}

impl TrialContext<'_> {
    /// Run trial `index` of `total`.
    pub async fn run(&self, index: u32, total: u32) -> Result<TrialOutcome> {
        let tag = self.config.tag_style.tag_for(index);
        let span = start_trial_span(index, total, &tag);

        async {
            info!("trial {index}/{total}");
            let unit = self
                .client
                .create_unit_of_work(self.definition_id, &self.config.tag_variable, &tag)
                .await?;
            record_stage(&span, "pending", "created");
            debug!(unit = %unit.key, "unit of work created");

            let result = self.exercise(&unit, &span).await;
            cleanup(self.client, &unit.key).await;

            match result {
                Ok(ref outcome) => {
                    record_outcome(&span, outcome.label());
                    metrics::trials().add(1, &[KeyValue::new("outcome", outcome.label())]);
                }
                Err(_) => record_outcome(&span, "aborted"),
            }
            result
        }
        .instrument(span.clone())
        .await
    }

    /// Steps after create. Cleanup is the caller's job.
    async fn exercise(&self, unit: &UnitOfWork, span: &Span) -> Result<TrialOutcome> {
        record_stage(span, "created", "locating");
        let located = match self.locate(&unit.key).await {
            Ok(record) => record,
            Err(error) => {
                record_stage(span, "locating", "locate_timed_out");
                error!(unit = %unit.key, %error, "record never appeared in search");
                return match self.config.locate_failure {
                    LocateFailure::Bucket => Ok(TrialOutcome::LocateTimedOut {
                        unit: unit.key.clone(),
                        error,
                    }),
                    LocateFailure::Abort => Err(error),
                };
            }
        };
        let key = located.key;

        record_stage(span, "located", "point_reading");
        let record = match self.client.get_by_key(&key).await {
            Ok(record) => record,
            Err(error) => {
                record_stage(span, "point_reading", "point_read_failed");
                warn!(record = %key, %error, "located record could not be read by key");
                return Ok(TrialOutcome::PointReadFailed { record: key, error });
            }
        };

        record_stage(span, "point_read_ok", "secondary_reading");
        let sort = [Sort::asc(&self.config.data_sort_field)];
        let outcome = match self.client.search_derived_data(&key, &sort).await {
            Err(error) => {
                warn!(record = %key, %error, "data for located record could not be queried");
                TrialOutcome::DataQueryFailed { record: key, error }
            }
            Ok(items) if items.is_empty() => {
                warn!(record = %key, "no data found for located record");
                TrialOutcome::DataEmpty { record: key }
            }
            Ok(items) => {
                let tag_echoed = echoes_tag(
                    unit,
                    self.definition_id,
                    &record,
                    &items,
                    &self.config.tag_variable,
                );
                if !tag_echoed {
                    warn!(record = %key, tag = %unit.tag, "data does not carry the trial's tag");
                }
                TrialOutcome::Success {
                    record: key,
                    tag_echoed,
                }
            }
        };
        record_stage(span, "secondary_reading", outcome.label());
        Ok(outcome)
    }

    /// Poll search until the unit's record appears in the expected state.
    async fn locate(&self, owner: &UnitKey) -> Result<DerivedRecord> {
        let filter = RecordFilter {
            owner: owner.clone(),
            state: self.config.expected_state.clone(),
        };
        let sort = [Sort::asc(&self.config.locate_sort_field)];
        let page = Page::first(self.config.page_limit);

        let client = self.client;
        let filter = &filter;
        let sort = &sort[..];
        let found = poll(self.poll, move || async move {
            client
                .search_derived(filter, sort, page)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| Error::NotReady(format!("no {} record for unit {}", filter.state, filter.owner)))
        })
        .await?;
        Ok(found)
    }
}

/// What a cleanup attempt amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    Cancelled,
    /// The unit was already gone. Not reported.
    NotFound,
    /// Cancellation failed for another reason. Logged only.
    Failed,
}

impl Cleanup {
    pub fn label(self) -> &'static str {
        match self {
            Cleanup::Cancelled => "ok",
            Cleanup::NotFound => "not_found",
            Cleanup::Failed => "error",
        }
    }
}

/// Cancel the unit. A unit that is already gone is fine; anything else is
/// logged and otherwise ignored.
pub async fn cleanup(client: &dyn WorkflowClient, key: &UnitKey) -> Cleanup {
    let result = match client.cancel_unit_of_work(key).await {
        Ok(()) => Cleanup::Cancelled,
        Err(e) if e.is_not_found() => Cleanup::NotFound,
        Err(e) => {
            error!(unit = %key, error = %e, "error cancelling unit of work");
            Cleanup::Failed
        }
    };
    metrics::cleanups().add(1, &[KeyValue::new("result", result.label())]);
    result
}

/// The data must contain the tag variable holding the JSON-encoded tag, the
/// record must belong to the unit that was created, and the engine must have
/// echoed the definition the unit was created from.
fn echoes_tag(
    unit: &UnitOfWork,
    definition_id: &str,
    record: &DerivedRecord,
    items: &[DataItem],
    tag_variable: &str,
) -> bool {
    let expected = serde_json::Value::String(unit.tag.clone()).to_string();
    unit.definition_id == definition_id
        && record.owner == unit.key
        && items
            .iter()
            .any(|item| item.name == tag_variable && item.value == expected)
}
