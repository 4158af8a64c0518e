//! Blocking writers for the combined dataset, run on tokio's blocking pool.

use crate::aggregate::error::AggregateError;
#[cfg(any(feature = "netcdf", test))]
use crate::aggregate::grid::{COL_LATITUDE, COL_LONGITUDE, COL_VALID_TIME};
use crate::aggregate::grid::GridVariable;
#[cfg(any(feature = "netcdf", test))]
use std::collections::HashMap;
use polars::prelude::*;
use std::path::Path;
use tokio::task;

pub(crate) async fn write_parquet(mut df: DataFrame, path: &Path) -> Result<(), AggregateError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| AggregateError::ParquetWriteIo(path_buf.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| AggregateError::ParquetWritePolars(path_buf, e))?;
        Ok::<(), AggregateError>(())
    })
    .await??;
    Ok(())
}

#[cfg(feature = "netcdf")]
pub(crate) async fn write_netcdf(
    df: DataFrame,
    variables: Vec<GridVariable>,
    path: &Path,
) -> Result<(), AggregateError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let grid = DenseGrid::from_frame(&df, &variables)?;
        netcdf_file::write(&grid, &variables, &path_buf).map_err(|source| {
            AggregateError::NetCdf {
                path: path_buf.clone(),
                source,
            }
        })
    })
    .await?
}

#[cfg(not(feature = "netcdf"))]
pub(crate) async fn write_netcdf(
    _df: DataFrame,
    _variables: Vec<GridVariable>,
    _path: &Path,
) -> Result<(), AggregateError> {
    Err(AggregateError::FormatUnavailable(
        crate::types::file_names::OutputFormat::NetCdf,
    ))
}

/// The long frame unfolded onto a `(valid_time, latitude, longitude)` grid.
///
/// Cells without a row are NaN.
#[cfg(any(feature = "netcdf", test))]
#[derive(Debug)]
pub(crate) struct DenseGrid {
    /// Seconds since 1970-01-01.
    pub times: Vec<i64>,
    /// Descending.
    pub latitudes: Vec<f64>,
    /// Ascending.
    pub longitudes: Vec<f64>,
    /// One `times x latitudes x longitudes` block per variable, row-major.
    pub values: Vec<Vec<f64>>,
}

#[cfg(any(feature = "netcdf", test))]
impl DenseGrid {
    pub fn from_frame(df: &DataFrame, variables: &[GridVariable]) -> Result<Self, AggregateError> {
        let valid = df
            .column(COL_VALID_TIME)?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        let valid_ms: Vec<i64> = valid.i64()?.into_iter().flatten().collect();
        let latitude: Vec<f64> = df
            .column(COL_LATITUDE)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        let longitude: Vec<f64> = df
            .column(COL_LONGITUDE)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .flatten()
            .collect();

        let mut times: Vec<i64> = Vec::new();
        let mut time_index = HashMap::new();
        for &ms in &valid_ms {
            time_index.entry(ms).or_insert_with(|| {
                times.push(ms);
                times.len() - 1
            });
        }
        let (latitudes, lat_index) = axis(&latitude, true);
        let (longitudes, lon_index) = axis(&longitude, false);

        let cells = times.len() * latitudes.len() * longitudes.len();
        let mut values = Vec::with_capacity(variables.len());
        for variable in variables {
            let column = df.column(&variable.name)?.as_materialized_series().f64()?;
            let mut block = vec![f64::NAN; cells];
            for (row, value) in column.into_iter().enumerate() {
                let (Some(value), Some(&ms)) = (value, valid_ms.get(row)) else {
                    continue;
                };
                let t = time_index[&ms];
                let y = lat_index[&latitude[row].to_bits()];
                let x = lon_index[&longitude[row].to_bits()];
                block[(t * latitudes.len() + y) * longitudes.len() + x] = value;
            }
            values.push(block);
        }

        Ok(Self {
            times: times.into_iter().map(|ms| ms.div_euclid(1000)).collect(),
            latitudes,
            longitudes,
            values,
        })
    }
}

/// Sorted distinct coordinate values and the position of each one.
#[cfg(any(feature = "netcdf", test))]
fn axis(values: &[f64], descending: bool) -> (Vec<f64>, HashMap<u64, usize>) {
    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(|a, b| if descending { b.total_cmp(a) } else { a.total_cmp(b) });
    distinct.dedup_by(|a, b| a.to_bits() == b.to_bits());
    let index = distinct
        .iter()
        .enumerate()
        .map(|(i, v)| (v.to_bits(), i))
        .collect();
    (distinct, index)
}

#[cfg(feature = "netcdf")]
mod netcdf_file {
    use super::DenseGrid;
    use crate::aggregate::grid::{GridVariable, COL_LATITUDE, COL_LONGITUDE, COL_VALID_TIME};
    use std::path::Path;

    pub fn write(
        grid: &DenseGrid,
        variables: &[GridVariable],
        path: &Path,
    ) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        file.add_attribute("Conventions", "CF-1.7")?;
        file.add_attribute("source", "ECMWF ERA5-Land hourly reanalysis")?;

        file.add_dimension(COL_VALID_TIME, grid.times.len())?;
        file.add_dimension(COL_LATITUDE, grid.latitudes.len())?;
        file.add_dimension(COL_LONGITUDE, grid.longitudes.len())?;

        {
            let mut var = file.add_variable::<i64>(COL_VALID_TIME, &[COL_VALID_TIME])?;
            var.put_attribute("standard_name", "time")?;
            var.put_attribute("units", "seconds since 1970-01-01")?;
            var.put_attribute("calendar", "proleptic_gregorian")?;
            var.put_values(&grid.times, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>(COL_LATITUDE, &[COL_LATITUDE])?;
            var.put_attribute("standard_name", "latitude")?;
            var.put_attribute("units", "degrees_north")?;
            var.put_values(&grid.latitudes, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>(COL_LONGITUDE, &[COL_LONGITUDE])?;
            var.put_attribute("standard_name", "longitude")?;
            var.put_attribute("units", "degrees_east")?;
            var.put_values(&grid.longitudes, ..)?;
        }

        for (variable, values) in variables.iter().zip(&grid.values) {
            let mut var = file.add_variable::<f64>(
                &variable.name,
                &[COL_VALID_TIME, COL_LATITUDE, COL_LONGITUDE],
            )?;
            var.set_fill_value(f64::NAN)?;
            var.put_attribute("long_name", variable.long_name.as_str())?;
            var.put_attribute("units", variable.units.as_str())?;
            var.put_values(values, ..)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::grid::datetime_dtype;

    #[test]
    fn test_dense_grid_places_values_and_fills_gaps() -> Result<(), AggregateError> {
        let hour = 3_600_000i64;
        let df = DataFrame::new(vec![
            Column::new(COL_VALID_TIME.into(), vec![0, 0, 0, hour, hour])
                .cast(&datetime_dtype())?,
            Column::new(COL_LATITUDE.into(), vec![50.0, 50.0, 49.9, 50.0, 49.9]),
            Column::new(COL_LONGITUDE.into(), vec![5.0, 5.1, 5.0, 5.0, 5.1]),
            Column::new(
                "t2m".into(),
                vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)],
            ),
        ])?;
        let variables = vec![GridVariable::new("t2m", "2 metre temperature", "K")];

        let grid = DenseGrid::from_frame(&df, &variables)?;
        assert_eq!(grid.times, vec![0, 3600]);
        assert_eq!(grid.latitudes, vec![50.0, 49.9]);
        assert_eq!(grid.longitudes, vec![5.0, 5.1]);

        let block = &grid.values[0];
        assert_eq!(block.len(), 8);
        assert_eq!(block[0], 1.0);
        assert_eq!(block[1], 2.0);
        assert_eq!(block[2], 3.0);
        assert!(block[3].is_nan());
        assert!(block[4].is_nan());
        assert_eq!(block[7], 5.0);
        Ok(())
    }

    #[cfg(feature = "netcdf")]
    fn read_back(path: &Path, names: &[&str]) -> Vec<Vec<u64>> {
        let file = netcdf::open(path).unwrap();
        names
            .iter()
            .map(|name| {
                let values: Vec<f64> = file.variable(name).unwrap().get_values(..).unwrap();
                values.into_iter().map(f64::to_bits).collect()
            })
            .collect()
    }

    #[cfg(feature = "netcdf")]
    #[tokio::test]
    async fn test_netcdf_saved_twice_reads_back_the_same() -> Result<(), AggregateError> {
        let hour = 3_600_000i64;
        let df = DataFrame::new(vec![
            Column::new(COL_VALID_TIME.into(), vec![0, 0, hour, hour]).cast(&datetime_dtype())?,
            Column::new(COL_LATITUDE.into(), vec![50.0, 49.9, 50.0, 49.9]),
            Column::new(COL_LONGITUDE.into(), vec![5.0; 4]),
            Column::new("t2m".into(), vec![Some(271.5), Some(272.0), None, Some(273.25)]),
        ])?;
        let variables = vec![GridVariable::new("t2m", "2 metre temperature", "K")];
        let dir = tempfile::tempdir().unwrap();
        let names = [COL_VALID_TIME, COL_LATITUDE, COL_LONGITUDE, "t2m"];

        let path = dir.path().join("data.nc");
        write_netcdf(df.clone(), variables.clone(), &path).await?;
        let first = read_back(&path, &names);
        write_netcdf(df, variables, &path).await?;
        let second = read_back(&path, &names);

        assert_eq!(first, second);
        assert_eq!(first[0].len(), 2);
        let t2m: Vec<f64> = first[3].iter().map(|bits| f64::from_bits(*bits)).collect();
        assert_eq!(t2m[..2], [271.5, 272.0]);
        assert!(t2m[2].is_nan());
        assert_eq!(t2m[3], 273.25);
        Ok(())
    }
}
