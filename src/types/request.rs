//! The request descriptor sent to the archive for one month of hourly data.

use crate::types::bounding_box::BoundingBox;
use crate::types::period::Month;
use serde::Serialize;

/// Name of the ERA5-Land hourly dataset on the Climate Data Store.
pub const DATASET_ERA5_LAND: &str = "reanalysis-era5-land";

/// Variable requested when the caller does not name any.
pub const DEFAULT_VARIABLE: &str = "2m_temperature";

/// One month of hourly ERA5-Land data, as sent in the `inputs` of a CDS job.
///
/// Built fresh for every month by [`RetrievalRequest::for_month`] and never changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalRequest {
    #[serde(skip)]
    period: Month,
    variable: Vec<String>,
    year: String,
    month: String,
    day: Vec<String>,
    time: Vec<String>,
    data_format: &'static str,
    download_format: &'static str,
    area: BoundingBox,
}

impl RetrievalRequest {
    pub fn for_month(variables: &[String], month: Month, area: BoundingBox) -> Self {
        Self {
            period: month,
            variable: variables.to_vec(),
            year: month.year().to_string(),
            month: format!("{:02}", month.month()),
            day: month.day_strings(),
            time: Self::hours(),
            data_format: "grib",
            download_format: "unarchived",
            area,
        }
    }

    /// All 24 hours of the day, `"00:00"..="23:00"`.
    pub fn hours() -> Vec<String> {
        (0..24).map(|hour| format!("{:02}:00", hour)).collect()
    }

    pub fn period(&self) -> Month {
        self.period
    }

    pub fn variables(&self) -> &[String] {
        &self.variable
    }

    pub fn days(&self) -> &[String] {
        &self.day
    }

    pub fn times(&self) -> &[String] {
        &self.time
    }

    pub fn area(&self) -> BoundingBox {
        self.area
    }
}
