//! Month-by-month download of ERA5-Land data.

use crate::fetch::cds_client::CdsClient;
use crate::fetch::error::FetchError;
use crate::fetch::retriever::Retriever;
use crate::types::bounding_box::BoundingBox;
use crate::types::file_names::monthly_file_name;
use crate::types::period::{Month, MonthRange};
use crate::types::request::{RetrievalRequest, DATASET_ERA5_LAND, DEFAULT_VARIABLE};
use crate::utils::ensure_dir_exists;
use bon::bon;
use log::info;
use std::path::{Path, PathBuf};

/// Downloads one GRIB file per calendar month through a [`Retriever`].
///
/// Months are requested strictly one after the other; each download completes
/// before the next request is sent. The first failure stops the walk and is
/// returned to the caller.
///
/// # Examples
///
/// ```no_run
/// use era5land::{BoundingBox, Era5LandFetcher, Month};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), era5land::FetchError> {
/// let fetcher = Era5LandFetcher::from_env()?;
/// let files = fetcher
///     .download()
///     .directory(Path::new("data/grib"))
///     .start(Month(2009, 1))
///     .end(Month(2009, 12))
///     .variables(vec!["2m_temperature".to_string(), "total_precipitation".to_string()])
///     .area(BoundingBox::new(72.0, -25.0, 34.0, 45.0)?)
///     .call()
///     .await?;
/// assert_eq!(files.len(), 12);
/// # Ok(())
/// # }
/// ```
pub struct Era5LandFetcher<R = CdsClient> {
    retriever: R,
    dataset: String,
}

impl Era5LandFetcher<CdsClient> {
    /// Fetcher talking to the Climate Data Store with credentials from the environment.
    pub fn from_env() -> Result<Self, FetchError> {
        Ok(Self::new(CdsClient::from_env()?))
    }
}

#[bon]
impl<R: Retriever> Era5LandFetcher<R> {
    pub fn new(retriever: R) -> Self {
        Self {
            retriever,
            dataset: DATASET_ERA5_LAND.to_string(),
        }
    }

    /// Requests a different dataset than `reanalysis-era5-land`.
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Downloads every month from `start` to `end` (both included) into `directory`.
    ///
    /// Each month is written to `{directory}/{year}_months{MM}_europe.grib`.
    ///
    /// # Arguments
    ///
    /// * `.directory(&Path)`: **Required.** Destination directory, created if missing.
    /// * `.start(Month)` / `.end(Month)`: **Required.** Inclusive month range.
    /// * `.variables(Vec<String>)`: Optional. CDS variable names. Defaults to `["2m_temperature"]`.
    /// * `.area(BoundingBox)`: Optional. Defaults to [`BoundingBox::GLOBAL`].
    ///
    /// # Returns
    ///
    /// The paths of the written files, in chronological order.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidMonth`] / [`FetchError::InvalidPeriod`] for a bad range,
    /// [`FetchError::NoVariables`] for an empty variable list, and whatever the
    /// retriever reports for the first month that fails.
    #[builder]
    pub async fn download(
        &self,
        directory: &Path,
        start: Month,
        end: Month,
        variables: Option<Vec<String>>,
        area: Option<BoundingBox>,
    ) -> Result<Vec<PathBuf>, FetchError> {
        let variables = variables.unwrap_or_else(|| vec![DEFAULT_VARIABLE.to_string()]);
        if variables.is_empty() {
            return Err(FetchError::NoVariables);
        }
        let area = area.unwrap_or_default();
        let months = MonthRange::new(start, end)?;

        ensure_dir_exists(directory)
            .await
            .map_err(|e| FetchError::DirCreation(directory.to_path_buf(), e))?;

        let mut written = Vec::with_capacity(months.len());
        for month in months {
            let request = RetrievalRequest::for_month(&variables, month, area);
            let target = directory.join(monthly_file_name(month));
            self.retriever
                .retrieve(&self.dataset, &request, &target)
                .await?;
            info!("Data downloaded to {}", target.display());
            written.push(target);
        }
        Ok(written)
    }
}
