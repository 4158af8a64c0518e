//! Naming of the downloaded monthly files and the combined output file.

use crate::types::period::Month;
use glob::Pattern;
use std::fmt;
use std::path::Path;

/// Format of the combined output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// NetCDF-4, needs the `netcdf` feature.
    #[default]
    NetCdf,
    /// Snappy-compressed Parquet in the long `valid_time, latitude, longitude, ...` layout.
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::NetCdf => "nc",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::NetCdf => write!(f, "NetCDF"),
            OutputFormat::Parquet => write!(f, "Parquet"),
        }
    }
}

/// `{year}_months{MM}_europe.grib`
pub fn monthly_file_name(month: Month) -> String {
    format!("{}_months{:02}_europe.grib", month.year(), month.month())
}

/// Glob pattern matching every monthly file of `year` inside `dir`.
///
/// Glob metacharacters in `dir` are escaped so only the month field is a wildcard.
pub fn yearly_file_pattern(dir: &Path, year: i32) -> String {
    let dir = Pattern::escape(&dir.to_string_lossy());
    format!("{}/{}_months*_europe.grib", dir, year)
}

/// `inflows_var_era5_{start}to{end}.{nc|parquet}`
pub fn output_file_name(start_year: i32, end_year: i32, format: OutputFormat) -> String {
    format!(
        "inflows_var_era5_{}to{}.{}",
        start_year,
        end_year,
        format.extension()
    )
}
