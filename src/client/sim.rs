//! In-memory engine with tunable eventual consistency.
//!
//! Each unit of work gets exactly one derived record. The record becomes
//! searchable, point-readable, and gets its data only after the lags in
//! [`SimProfile`] have passed since creation. Every n-th unit can be made
//! permanently inconsistent to reproduce the failure shapes the harness
//! classifies.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::WorkflowClient;
use crate::error::{Error, Result};
use crate::model::{
    DataItem, Definition, Deployment, DerivedRecord, Page, RecordFilter, RecordKey, Sort,
    SortOrder, UnitKey, UnitOfWork,
};

/// Consistency behaviour of a [`SimClient`].
#[derive(Debug, Clone, Default)]
pub struct SimProfile {
    /// Delay before the derived record shows up in searches.
    pub materialize_after: Duration,
    /// Delay before the record can be read by key.
    pub point_read_after: Duration,
    /// Delay before the record's data is returned.
    pub data_after: Duration,
    /// Every n-th unit's record is never readable by key.
    pub point_read_missing_every: Option<u32>,
    /// Every n-th unit's data query fails.
    pub data_error_every: Option<u32>,
    /// Every n-th unit's data query returns no items.
    pub data_empty_every: Option<u32>,
}

/// Record state reported for every simulated record.
const CREATED: &str = "CREATED";

struct SimUnit {
    ordinal: u32,
    created: Instant,
    created_at: chrono::DateTime<chrono::Utc>,
    record: RecordKey,
    tag_variable: String,
    tag: String,
    cancelled: bool,
}

impl SimUnit {
    fn hits(&self, every: Option<u32>) -> bool {
        every.is_some_and(|n| n > 0 && self.ordinal % n == 0)
    }
}

#[derive(Default)]
struct SimState {
    next_key: u64,
    ordinal: u32,
    definitions: Vec<String>,
    units: HashMap<UnitKey, SimUnit>,
    records: HashMap<RecordKey, UnitKey>,
    cancellations: u32,
}

pub struct SimClient {
    profile: SimProfile,
    state: Mutex<SimState>,
}

impl SimClient {
    pub fn new(profile: SimProfile) -> Self {
        Self {
            profile,
            state: Mutex::new(SimState {
                next_key: 2_251_799_813_685_248,
                ..SimState::default()
            }),
        }
    }

    /// Number of successful cancellations so far.
    pub fn cancellations(&self) -> u32 {
        self.lock().map(|s| s.cancellations).unwrap_or_default()
    }

    /// Number of units that have not been cancelled.
    pub fn live_units(&self) -> usize {
        self.lock()
            .map(|s| s.units.values().filter(|u| !u.cancelled).count())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|_| Error::Other("simulated engine state poisoned".into()))
    }

    fn record_of(unit_key: &UnitKey, unit: &SimUnit) -> DerivedRecord {
        DerivedRecord {
            key: unit.record.clone(),
            owner: unit_key.clone(),
            state: CREATED.to_string(),
            created_at: Some(unit.created_at),
        }
    }
}

fn not_found(operation: &'static str, what: impl std::fmt::Display) -> Error {
    Error::remote(operation, Some(404), format!("{what} not found"))
}

#[async_trait]
impl WorkflowClient for SimClient {
    async fn deploy_fixtures(&self, paths: &[PathBuf]) -> Result<Deployment> {
        let ids: Vec<String> = paths
            .iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "bpmn"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        if ids.is_empty() {
            return Err(Error::remote("deploy", Some(400), "no process resources in deployment"));
        }

        let mut state = self.lock()?;
        let definitions = ids
            .into_iter()
            .map(|id| {
                state.next_key += 1;
                state.definitions.push(id.clone());
                Definition {
                    id,
                    key: state.next_key.to_string(),
                }
            })
            .collect();
        Ok(Deployment { definitions })
    }

    async fn create_unit_of_work(
        &self,
        definition_id: &str,
        tag_variable: &str,
        tag: &str,
    ) -> Result<UnitOfWork> {
        let mut state = self.lock()?;
        if !state.definitions.iter().any(|d| d == definition_id) {
            return Err(not_found("create process instance", format!("definition {definition_id}")));
        }

        state.ordinal += 1;
        state.next_key += 2;
        let key = UnitKey(state.next_key.to_string());
        let record = RecordKey((state.next_key + 1).to_string());
        let unit = SimUnit {
            ordinal: state.ordinal,
            created: Instant::now(),
            created_at: chrono::Utc::now(),
            record: record.clone(),
            tag_variable: tag_variable.to_string(),
            tag: tag.to_string(),
            cancelled: false,
        };
        state.units.insert(key.clone(), unit);
        state.records.insert(record, key.clone());

        Ok(UnitOfWork {
            key,
            definition_id: definition_id.to_string(),
            tag: tag.to_string(),
        })
    }

    async fn search_derived(
        &self,
        filter: &RecordFilter,
        _sort: &[Sort],
        page: Page,
    ) -> Result<Vec<DerivedRecord>> {
        let state = self.lock()?;
        let visible = state.units.get(&filter.owner).filter(|u| {
            !u.cancelled
                && filter.state == CREATED
                && u.created.elapsed() >= self.profile.materialize_after
        });
        Ok(visible
            .map(|u| Self::record_of(&filter.owner, u))
            .into_iter()
            .skip(page.from as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn get_by_key(&self, key: &RecordKey) -> Result<DerivedRecord> {
        const OP: &str = "get user task";
        let state = self.lock()?;
        let owner = state.records.get(key).ok_or_else(|| not_found(OP, key))?;
        let unit = state.units.get(owner).ok_or_else(|| not_found(OP, key))?;
        if unit.hits(self.profile.point_read_missing_every)
            || unit.created.elapsed() < self.profile.point_read_after
        {
            return Err(not_found(OP, format!("user task {key}")));
        }
        Ok(Self::record_of(owner, unit))
    }

    async fn search_derived_data(&self, key: &RecordKey, sort: &[Sort]) -> Result<Vec<DataItem>> {
        const OP: &str = "search user task variables";
        let state = self.lock()?;
        let owner = state.records.get(key).ok_or_else(|| not_found(OP, key))?;
        let unit = state.units.get(owner).ok_or_else(|| not_found(OP, key))?;
        if unit.hits(self.profile.data_error_every) {
            return Err(Error::remote(OP, Some(500), "internal error"));
        }
        if unit.hits(self.profile.data_empty_every)
            || unit.created.elapsed() < self.profile.data_after
        {
            return Ok(Vec::new());
        }

        let mut items = vec![DataItem {
            name: unit.tag_variable.clone(),
            value: serde_json::Value::String(unit.tag.clone()).to_string(),
        }];
        if sort.first().is_some_and(|s| s.order == SortOrder::Desc) {
            items.reverse();
        }
        Ok(items)
    }

    async fn cancel_unit_of_work(&self, key: &UnitKey) -> Result<()> {
        const OP: &str = "cancel process instance";
        let mut state = self.lock()?;
        let unit = state
            .units
            .get_mut(key)
            .filter(|u| !u.cancelled)
            .ok_or_else(|| not_found(OP, format!("process instance {key}")))?;
        unit.cancelled = true;
        state.cancellations += 1;
        Ok(())
    }
}
