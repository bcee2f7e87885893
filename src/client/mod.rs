//! The remote engine as seen by the probe.
//!
//! [`WorkflowClient`] is the seam between the harness and a concrete engine:
//! [`rest::RestClient`] talks to a live cluster, [`sim::SimClient`] is an
//! in-memory engine with configurable consistency lag.

pub mod rest;
pub mod sim;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    DataItem, Deployment, DerivedRecord, Page, RecordFilter, RecordKey, Sort, UnitKey, UnitOfWork,
};

pub use rest::RestClient;
pub use sim::{SimClient, SimProfile};

#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Deploy resource files; returns the deployed definitions.
    async fn deploy_fixtures(&self, paths: &[PathBuf]) -> Result<Deployment>;

    /// Start a unit of work carrying `tag` in variable `tag_variable`.
    async fn create_unit_of_work(
        &self,
        definition_id: &str,
        tag_variable: &str,
        tag: &str,
    ) -> Result<UnitOfWork>;

    /// Search derived records. An empty page is a valid answer.
    async fn search_derived(
        &self,
        filter: &RecordFilter,
        sort: &[Sort],
        page: Page,
    ) -> Result<Vec<DerivedRecord>>;

    /// Point lookup of one derived record.
    async fn get_by_key(&self, key: &RecordKey) -> Result<DerivedRecord>;

    /// Key/value data attached to a derived record. May be empty.
    async fn search_derived_data(&self, key: &RecordKey, sort: &[Sort]) -> Result<Vec<DataItem>>;

    async fn cancel_unit_of_work(&self, key: &UnitKey) -> Result<()>;
}
