//! Download ERA5-Land reanalysis data month by month from the Copernicus Climate
//! Data Store and merge the monthly files into one multi-year dataset.

mod aggregate;
mod error;
mod fetch;
mod types;
mod utils;

pub use error::Era5Error;

pub use fetch::cds_client::CdsClient;
pub use fetch::config::{CdsConfig, DEFAULT_CDS_URL};
pub use fetch::error::FetchError;
pub use fetch::fetcher::Era5LandFetcher;
pub use fetch::retriever::Retriever;

pub use aggregate::aggregator::Era5LandAggregator;
pub use aggregate::dataset::Era5Dataset;
pub use aggregate::error::AggregateError;
pub use aggregate::grid::{
    GridChunk, GridMessage, GridStack, GridVariable, COL_LATITUDE, COL_LONGITUDE, COL_STEP, COL_TIME,
    COL_VALID_TIME,
};
pub use aggregate::pipeline::{reshape_year, Era5FrameExt};
#[cfg(feature = "grib")]
pub use aggregate::reader::GribReader;
pub use aggregate::reader::GridReader;

pub use types::bounding_box::BoundingBox;
pub use types::file_names::{monthly_file_name, output_file_name, yearly_file_pattern, OutputFormat};
pub use types::period::{Month, MonthRange};
pub use types::request::{RetrievalRequest, DATASET_ERA5_LAND, DEFAULT_VARIABLE};
