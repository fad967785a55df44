//! Error types for device selection, scene commit and queries.

use std::fmt;

use thiserror::Error;
use umbra_core::GeometryError;

/// Which batched query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Intersection,
    Occlusion,
}

impl QueryKind {
    pub(crate) fn result_label(self) -> &'static str {
        match self {
            QueryKind::Intersection => "hit records",
            QueryKind::Occlusion => "occlusion flags",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Intersection => f.write_str("intersection"),
            QueryKind::Occlusion => f.write_str("occlusion"),
        }
    }
}

/// Errors raised by the intersector and the frame pipeline.
///
/// All of them are fatal for the frame; nothing is retried.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("no compatible intersection device: {0}")]
    DeviceUnavailable(String),

    #[error("scene commit failed: {0}")]
    Commit(String),

    #[error("{query} query failed: {reason}")]
    QueryFailure { query: QueryKind, reason: String },

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl TraceError {
    pub(crate) fn query(query: QueryKind, reason: impl Into<String>) -> Self {
        TraceError::QueryFailure {
            query,
            reason: reason.into(),
        }
    }
}

/// Result type for tracing operations.
pub type TraceResult<T> = Result<T, TraceError>;
