use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::stage::TaskId;

/// Failure while talking to the weather API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("weather API responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse weather API response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// An upstream task produced nothing for this run.
#[derive(Debug, Error)]
#[error("no weather data received from {upstream} task")]
pub struct MissingDataError {
    pub upstream: TaskId,
}

/// Failure while writing the record to disk.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write weather file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize weather record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Any error a pipeline task can return.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    MissingData(#[from] MissingDataError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}
