use crate::types::period::Month;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid month {month} in year {year}, expected 1-12")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Start month {start} is after end month {end}")]
    InvalidPeriod { start: Month, end: Month },

    #[error("Invalid bounding box [north {north}, west {west}, south {south}, east {east}]")]
    InvalidBoundingBox {
        north: f64,
        west: f64,
        south: f64,
        east: f64,
    },

    #[error("At least one variable must be requested")]
    NoVariables,

    #[error("No CDS API key configured (set CDSAPI_KEY or add a 'key:' line to ~/.cdsapirc)")]
    MissingApiKey,

    #[error("Failed to read CDS configuration file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to create download directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}: {detail}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("Retrieval job {job_id} ended with status '{status}': {detail}")]
    JobFailed {
        job_id: String,
        status: String,
        detail: String,
    },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("I/O error writing download '{0}'")]
    DownloadIo(PathBuf, #[source] std::io::Error),

    #[error("Downloaded file '{path}' has {found} bytes, expected {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },
}
