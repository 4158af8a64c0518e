//! Merges the monthly grid files of a range of years into one dataset.

use crate::aggregate::dataset::Era5Dataset;
use crate::aggregate::error::AggregateError;
use crate::aggregate::grid::{GridChunk, GridStack};
use crate::aggregate::pipeline::reshape_year;
use crate::aggregate::reader::GridReader;
use crate::types::file_names::{output_file_name, yearly_file_pattern, OutputFormat};
use crate::utils::ensure_dir_exists;
use bon::bon;
use log::{info, warn};
use polars::prelude::IntoLazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;

/// Combines the files written by [`crate::Era5LandFetcher`] into an [`Era5Dataset`].
///
/// Years are processed one at a time in ascending order. Decoding and reshaping run
/// on tokio's blocking pool.
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "grib")]
/// # async fn demo() -> Result<(), era5land::AggregateError> {
/// use era5land::{Era5LandAggregator, OutputFormat};
/// use std::path::Path;
///
/// let aggregator = Era5LandAggregator::grib();
/// let dataset = aggregator
///     .aggregate()
///     .input_dir(Path::new("data/grib"))
///     .output_dir(Path::new("data/out"))
///     .start_year(2009)
///     .end_year(2019)
///     .format(OutputFormat::Parquet)
///     .call()
///     .await?;
/// println!("{} timestamps", dataset.timestamps()?.len());
/// # Ok(())
/// # }
/// ```
pub struct Era5LandAggregator<G> {
    reader: Arc<G>,
}

#[cfg(feature = "grib")]
impl Era5LandAggregator<crate::aggregate::reader::GribReader> {
    /// Aggregator decoding GRIB files with ecCodes.
    pub fn grib() -> Self {
        Self::new(crate::aggregate::reader::GribReader)
    }
}

#[bon]
impl<G: GridReader> Era5LandAggregator<G> {
    pub fn new(reader: G) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }

    /// Aggregates every year from `start_year` to `end_year` (both included).
    ///
    /// For each year, all `{year}_months*_europe.grib` files in `input_dir` are merged,
    /// indexed by `valid_time`, limited to that calendar year, sorted, stripped of
    /// timestamps without any data, and appended to the result. Years without files
    /// are skipped.
    ///
    /// # Arguments
    ///
    /// * `.input_dir(&Path)`: **Required.** Directory holding the monthly files.
    /// * `.output_dir(&Path)`: **Required.** Directory for the combined file.
    /// * `.start_year(i32)` / `.end_year(i32)`: **Required.** Inclusive year range.
    /// * `.save(bool)`: Optional. Write `inflows_var_era5_{start}to{end}.{ext}`. Defaults to `true`.
    /// * `.format(OutputFormat)`: Optional. Defaults to [`OutputFormat::NetCdf`].
    ///
    /// # Errors
    ///
    /// [`AggregateError::InvalidYearRange`] if `start_year > end_year`,
    /// [`AggregateError::FormatUnavailable`] when saving in a format whose feature is
    /// disabled, and any read, merge or write failure.
    #[builder]
    pub async fn aggregate(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        start_year: i32,
        end_year: i32,
        save: Option<bool>,
        format: Option<OutputFormat>,
    ) -> Result<Era5Dataset, AggregateError> {
        if start_year > end_year {
            return Err(AggregateError::InvalidYearRange {
                start: start_year,
                end: end_year,
            });
        }
        let save = save.unwrap_or(true);
        let format = format.unwrap_or_default();
        if save && format == OutputFormat::NetCdf && !cfg!(feature = "netcdf") {
            return Err(AggregateError::FormatUnavailable(format));
        }

        let mut dataset = Era5Dataset::empty();
        for year in start_year..=end_year {
            let files = year_files(input_dir, year)?;
            if files.is_empty() {
                info!("No file for year {} found in {}", year, input_dir.display());
                continue;
            }

            info!("Opening {} files for year {}", files.len(), year);
            let yearly = self.read_year(files, year).await?;
            info!("Concatenating year {}", year);
            dataset = dataset.append(yearly)?;
        }

        if save {
            self.save(&dataset, output_dir, start_year, end_year, format)
                .await?;
        }
        Ok(dataset)
    }

    async fn read_year(&self, files: Vec<PathBuf>, year: i32) -> Result<Era5Dataset, AggregateError> {
        let reader = Arc::clone(&self.reader);
        task::spawn_blocking(move || {
            // One file per time chunk: its messages are dropped once it is stacked.
            let mut stack = GridStack::new();
            for path in files {
                let messages = reader.read(&path)?;
                stack.push(GridChunk::new(path, messages)?)?;
            }

            info!("Processing year {} ({} stacked rows)", year, stack.row_count());
            let variables = stack.variables().to_vec();
            let names = stack.variable_names();
            let stacked = stack.into_lazy()?;

            info!("Filtering year {}", year);
            let frame = reshape_year(stacked, &names, year).collect()?;
            Ok::<_, AggregateError>(Era5Dataset::new(frame.lazy(), variables))
        })
        .await?
    }

    async fn save(
        &self,
        dataset: &Era5Dataset,
        output_dir: &Path,
        start_year: i32,
        end_year: i32,
        format: OutputFormat,
    ) -> Result<(), AggregateError> {
        if dataset.is_empty() {
            warn!(
                "No data found for {}-{}, nothing written to {}",
                start_year,
                end_year,
                output_dir.display()
            );
            return Ok(());
        }

        ensure_dir_exists(output_dir)
            .await
            .map_err(|e| AggregateError::DirCreation(output_dir.to_path_buf(), e))?;
        let path = output_dir.join(output_file_name(start_year, end_year, format));
        match format {
            OutputFormat::NetCdf => dataset.save_netcdf(&path).await?,
            OutputFormat::Parquet => dataset.save_parquet(&path).await?,
        }
        info!("Saved {} to {}", format, path.display());
        Ok(())
    }
}

/// Monthly files of `year` in `dir`, sorted by name.
fn year_files(dir: &Path, year: i32) -> Result<Vec<PathBuf>, AggregateError> {
    let mut files = glob::glob(&yearly_file_pattern(dir, year))?
        .collect::<Result<Vec<_>, _>>()?;
    files.sort();
    Ok(files)
}
