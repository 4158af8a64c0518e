use crate::types::file_names::OutputFormat;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Start year {start} is after end year {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("Invalid file pattern")]
    Glob(#[from] glob::PatternError),

    #[error("Failed to list input file")]
    GlobEntry(#[from] glob::GlobError),

    #[error("Failed to create output directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Grid file '{0}' contains no messages")]
    EmptyInput(PathBuf),

    #[error("No grid files were given to merge")]
    NoMessages,

    #[error("Grid in '{path}' has {found} points, expected {expected}")]
    GridMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[cfg(feature = "grib")]
    #[error("Failed to decode GRIB file '{path}'")]
    Grib {
        path: PathBuf,
        #[source]
        source: eccodes::errors::CodesError,
    },

    #[error("Key '{key}' has an unexpected type in '{path}'")]
    IncorrectKeyType { path: PathBuf, key: &'static str },

    #[error("Invalid reference time (dataDate {date}, dataTime {time}) in '{path}'")]
    InvalidReferenceTime { path: PathBuf, date: i64, time: i64 },

    #[error("Cannot append variables {found:?} to a dataset holding {expected:?}")]
    VariableMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Failed processing DataFrame: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error writing parquet file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[cfg(feature = "netcdf")]
    #[error("Failed to write NetCDF file '{path}'")]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("Output format {0} is not available, enable the matching cargo feature")]
    FormatUnavailable(OutputFormat),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
