//! Contains [`Era5Dataset`], the combined multi-year ERA5-Land data.

use crate::aggregate::error::AggregateError;
use crate::aggregate::grid::{
    datetime_dtype, GridVariable, COL_LATITUDE, COL_LONGITUDE, COL_VALID_TIME,
};
use crate::aggregate::writer;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;

/// A wrapper around a Polars `LazyFrame` holding ERA5-Land data in long layout.
///
/// Columns are `valid_time` (datetime, milliseconds), `latitude`, `longitude` and one
/// `Float64` column per variable. Rows of each year are ordered by `valid_time`
/// ascending, then latitude descending, then longitude ascending; years follow each
/// other in the order they were appended.
///
/// Instances are typically obtained from [`crate::Era5LandAggregator::aggregate`].
///
/// # Errors
///
/// Operations that trigger computation on the underlying `LazyFrame` (e.g. [`Self::collect`])
/// can return [`AggregateError::Polars`].
#[derive(Clone)]
pub struct Era5Dataset {
    /// The underlying Polars LazyFrame.
    pub frame: LazyFrame,
    variables: Vec<GridVariable>,
}

impl Era5Dataset {
    pub fn new(frame: LazyFrame, variables: Vec<GridVariable>) -> Self {
        Self { frame, variables }
    }

    /// A dataset with no variables and no rows, the seed of an aggregation.
    pub fn empty() -> Self {
        Self {
            frame: DataFrame::empty().lazy(),
            variables: Vec::new(),
        }
    }

    /// `true` until a year has been appended.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[GridVariable] {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Filters the data based on a Polars predicate expression.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use era5land::Era5Dataset;
    /// use polars::prelude::{col, lit};
    /// # fn demo(dataset: Era5Dataset) {
    /// let north = dataset.filter(col("latitude").gt_eq(lit(60.0)));
    /// # }
    /// ```
    pub fn filter(&self, predicate: Expr) -> Era5Dataset {
        Era5Dataset::new(self.frame.clone().filter(predicate), self.variables.clone())
    }

    /// Rows with `start <= valid_time <= end`.
    pub fn get_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Era5Dataset {
        self.filter(
            col(COL_VALID_TIME)
                .cast(datetime_dtype())
                .gt_eq(lit(start))
                .and(col(COL_VALID_TIME).cast(datetime_dtype()).lt_eq(lit(end))),
        )
    }

    /// Appends `other` below `self` along `valid_time`.
    ///
    /// An empty `self` simply becomes `other`. Columns of `other` are put in the
    /// order of `self`; nothing is re-sorted.
    ///
    /// # Errors
    ///
    /// [`AggregateError::VariableMismatch`] if the two datasets hold different variables.
    pub fn append(self, other: Era5Dataset) -> Result<Era5Dataset, AggregateError> {
        if self.is_empty() {
            return Ok(other);
        }
        if other.is_empty() {
            return Ok(self);
        }

        let expected = self.variable_names();
        let found = other.variable_names();
        let mut sorted_expected = expected.clone();
        let mut sorted_found = found.clone();
        sorted_expected.sort();
        sorted_found.sort();
        if sorted_expected != sorted_found {
            return Err(AggregateError::VariableMismatch { expected, found });
        }

        let mut columns = vec![col(COL_VALID_TIME), col(COL_LATITUDE), col(COL_LONGITUDE)];
        columns.extend(expected.iter().map(|name| col(name.as_str())));
        let frame = concat(
            [self.frame, other.frame.select(columns)],
            UnionArgs::default(),
        )?;
        Ok(Era5Dataset::new(frame, self.variables))
    }

    /// Executes the lazy plan.
    pub fn collect(&self) -> Result<DataFrame, AggregateError> {
        Ok(self.frame.clone().collect()?)
    }

    /// Distinct `valid_time` values, in frame order.
    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>, AggregateError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let df = self.frame.clone().select([col(COL_VALID_TIME)]).collect()?;
        let millis = df
            .column(COL_VALID_TIME)?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        let mut seen = HashSet::new();
        Ok(millis
            .i64()?
            .into_iter()
            .flatten()
            .filter(|ms| seen.insert(*ms))
            .filter_map(|ms| DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc()))
            .collect())
    }

    /// Writes the dataset as Snappy-compressed Parquet.
    pub async fn save_parquet(&self, path: &Path) -> Result<(), AggregateError> {
        let df = self.collect()?;
        writer::write_parquet(df, path).await
    }

    /// Writes the dataset as NetCDF-4 on a `(valid_time, latitude, longitude)` grid.
    ///
    /// Without the `netcdf` feature this returns [`AggregateError::FormatUnavailable`].
    pub async fn save_netcdf(&self, path: &Path) -> Result<(), AggregateError> {
        let df = self.collect()?;
        writer::write_netcdf(df, self.variables.clone(), path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(year: i32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, 1, day)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap()
    }

    fn dataset(year: i32, names: &[&str]) -> Era5Dataset {
        let times: Vec<i64> = (1..=3)
            .map(|day| at(year, day).and_utc().timestamp_millis())
            .collect();
        let mut columns = vec![
            Column::new(COL_VALID_TIME.into(), times)
                .cast(&datetime_dtype())
                .unwrap(),
            Column::new(COL_LATITUDE.into(), vec![50.0; 3]),
            Column::new(COL_LONGITUDE.into(), vec![5.0; 3]),
        ];
        let mut variables = Vec::new();
        for (i, name) in names.iter().enumerate() {
            columns.push(Column::new((*name).into(), vec![Some(i as f64); 3]));
            variables.push(GridVariable::new(*name, *name, "1"));
        }
        Era5Dataset::new(DataFrame::new(columns).unwrap().lazy(), variables)
    }

    #[test]
    fn test_append_concatenates_in_order() -> Result<(), AggregateError> {
        let combined = Era5Dataset::empty()
            .append(dataset(2010, &["t2m", "tp"]))?
            .append(dataset(2011, &["tp", "t2m"]))?;

        let timestamps = combined.timestamps()?;
        assert_eq!(timestamps.len(), 6);
        assert_eq!(timestamps[0], at(2010, 1));
        assert_eq!(timestamps[5], at(2011, 3));

        let df = combined.collect()?;
        let t2m: Vec<Option<f64>> = df
            .column("t2m")?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect();
        // Column order of the second year is aligned by name.
        assert_eq!(t2m, vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0), Some(1.0), Some(1.0)]);
        Ok(())
    }

    #[test]
    fn test_append_rejects_other_variables() {
        let result = dataset(2010, &["t2m"]).append(dataset(2011, &["tp"]));
        assert!(matches!(
            result,
            Err(AggregateError::VariableMismatch { .. })
        ));
    }

    #[test]
    fn test_get_range_is_inclusive() -> Result<(), AggregateError> {
        let ranged = dataset(2010, &["t2m"]).get_range(at(2010, 2), at(2010, 3));
        assert_eq!(ranged.timestamps()?, vec![at(2010, 2), at(2010, 3)]);
        Ok(())
    }

    #[test]
    fn test_empty_dataset() -> Result<(), AggregateError> {
        let empty = Era5Dataset::empty();
        assert!(empty.is_empty());
        assert!(empty.timestamps()?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_parquet_save_round_trips() -> Result<(), AggregateError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        let data = dataset(2012, &["t2m"]);
        data.save_parquet(&path).await?;

        let file = std::fs::File::open(&path).unwrap();
        let read = ParquetReader::new(file).finish()?;
        assert!(read.equals_missing(&data.collect()?));
        Ok(())
    }

    #[cfg(not(feature = "netcdf"))]
    #[tokio::test]
    async fn test_netcdf_needs_feature() {
        let dir = tempfile::tempdir().unwrap();
        let result = dataset(2012, &["t2m"])
            .save_netcdf(&dir.path().join("data.nc"))
            .await;
        assert!(matches!(result, Err(AggregateError::FormatUnavailable(_))));
    }
}
