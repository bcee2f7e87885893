//! Core data model.
//!
//! A unit of work is a remote process instance started for one trial. The
//! engine materializes derived records (user tasks) for it asynchronously;
//! those records carry key/value data (variables) that the probe reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Opaque key of a unit of work (process instance key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitKey(pub String);

/// Opaque key of a derived record (user task key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub String);

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// What a fixture deployment produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub definitions: Vec<Definition>,
}

impl Deployment {
    /// The definition every trial instantiates: the first deployed one.
    pub fn primary(&self) -> Option<&Definition> {
        self.definitions.first()
    }
}

/// A deployed process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub id: String,
    pub key: String,
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

/// A created unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfWork {
    pub key: UnitKey,
    /// Definition id echoed back by the engine.
    pub definition_id: String,
    /// Correlation tag the unit was created with.
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Derived record
// ---------------------------------------------------------------------------

/// A record materialized by the engine as a side effect of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub key: RecordKey,
    /// The unit of work this record belongs to.
    pub owner: UnitKey,
    pub state: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// One key/value item attached to a derived record.
///
/// `value` is the engine's JSON-encoded rendering, so a string variable
/// `abc` arrives as `"\"abc\""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub name: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Predicate for searching derived records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFilter {
    pub owner: UnitKey,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }
}

/// Page bounds for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub from: u32,
    pub limit: u32,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self { from: 0, limit }
    }
}
