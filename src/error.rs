//! Error types for consistency-probe.

use std::time::Duration;

use thiserror::Error;

use crate::model::RecordKey;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote engine answered with a failure.
    ///
    /// `status` carries the HTTP status when the failure came over the wire,
    /// so callers can discriminate "not found" without probing messages.
    #[error("{operation} failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("gave up after {attempts} attempt(s) in {elapsed:?}{}", .last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    PollTimeout {
        elapsed: Duration,
        attempts: u32,
        last_error: Option<Box<Error>>,
    },

    /// A polled operation completed but what it returned is not there yet.
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("no data found for record {0}")]
    EmptyData(RecordKey),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn remote(operation: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            status,
            message: message.into(),
        }
    }

    /// True when the remote engine reported the resource as absent (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote { status: Some(404), .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_discriminated_by_status() {
        assert!(Error::remote("cancel", Some(404), "gone").is_not_found());
        assert!(!Error::remote("cancel", Some(500), "boom").is_not_found());
        assert!(!Error::remote("cancel", None, "offline").is_not_found());
        assert!(!Error::Other("404".into()).is_not_found());
    }

    #[test]
    fn remote_display_includes_status_when_known() {
        let err = Error::remote("get record", Some(404), "no such task");
        assert_eq!(err.to_string(), "get record failed (404): no such task");
        let err = Error::remote("get record", None, "reset");
        assert_eq!(err.to_string(), "get record failed: reset");
    }
}
