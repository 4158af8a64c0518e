//! Decoded grid messages and their stacking into long `(valid_time, point)` rows.

use crate::aggregate::error::AggregateError;
use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub const COL_TIME: &str = "time";
pub const COL_STEP: &str = "step";
pub const COL_VALID_TIME: &str = "valid_time";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

/// Datetime type of the `time` and `valid_time` columns.
pub fn datetime_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

/// Name and description of one physical variable, e.g. `t2m` / `2 metre temperature` / `K`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridVariable {
    pub name: String,
    pub long_name: String,
    pub units: String,
}

impl GridVariable {
    pub fn new(
        name: impl Into<String>,
        long_name: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            long_name: long_name.into(),
            units: units.into(),
        }
    }
}

/// One field: a single variable at one reference time and forecast step.
///
/// `latitudes`, `longitudes` and `values` are parallel, one entry per grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMessage {
    pub variable: GridVariable,
    pub reference_time: NaiveDateTime,
    pub step_hours: i64,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Vec<Option<f64>>,
}

impl GridMessage {
    /// `reference_time + step`
    pub fn valid_time(&self) -> NaiveDateTime {
        self.reference_time + Duration::hours(self.step_hours)
    }
}

type BlockKey = (usize, NaiveDateTime, i64);

/// The messages of one file, grouped by `(time, step)`.
///
/// Only the `(time, step)` pairs that occur in the file are kept. A variable
/// without a message at one of those pairs reads as missing there.
#[derive(Debug, Clone)]
pub struct GridChunk {
    path: PathBuf,
    variables: Vec<GridVariable>,
    keys: BTreeSet<(NaiveDateTime, i64)>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    blocks: HashMap<BlockKey, Vec<Option<f64>>>,
}

impl GridChunk {
    /// Groups the messages read from `path`.
    ///
    /// The grid of the first message is used for the whole file. Variables keep
    /// the order in which they are first seen. A repeated `(variable, time, step)`
    /// keeps its first occurrence.
    ///
    /// # Errors
    ///
    /// [`AggregateError::EmptyInput`] for a file without messages and
    /// [`AggregateError::GridMismatch`] when a message has a different point count.
    pub fn new(path: PathBuf, messages: Vec<GridMessage>) -> Result<Self, AggregateError> {
        let Some(points) = messages.first().map(|m| m.latitudes.len()) else {
            return Err(AggregateError::EmptyInput(path));
        };
        debug!("Grouping {} messages from {}", messages.len(), path.display());

        let mut variables: Vec<GridVariable> = Vec::new();
        let mut keys = BTreeSet::new();
        let mut grid: Option<(Vec<f64>, Vec<f64>)> = None;
        let mut blocks = HashMap::new();

        for message in messages {
            check_points(&path, points, &message)?;
            if grid.is_none() {
                grid = Some((message.latitudes, message.longitudes));
            }

            let index = match variables
                .iter()
                .position(|v| v.name == message.variable.name)
            {
                Some(index) => index,
                None => {
                    variables.push(message.variable);
                    variables.len() - 1
                }
            };

            let key = (index, message.reference_time, message.step_hours);
            if blocks.contains_key(&key) {
                warn!(
                    "Duplicate {} message for {} step {}h in {}, keeping the first",
                    variables[index].name,
                    message.reference_time,
                    message.step_hours,
                    path.display()
                );
                continue;
            }
            keys.insert((message.reference_time, message.step_hours));
            blocks.insert(key, message.values);
        }

        let (latitudes, longitudes) = grid.ok_or_else(|| AggregateError::EmptyInput(path.clone()))?;
        Ok(Self {
            path,
            variables,
            keys,
            latitudes,
            longitudes,
            blocks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variables(&self) -> &[GridVariable] {
        &self.variables
    }

    /// The `(time, step)` pairs present in the file, in ascending order.
    pub fn time_steps(&self) -> impl Iterator<Item = (NaiveDateTime, i64)> + '_ {
        self.keys.iter().copied()
    }

    pub fn point_count(&self) -> usize {
        self.latitudes.len()
    }

    /// Flattens `(time, step)` into rows, one row per grid point of each pair present.
    ///
    /// Columns: `time`, `step` (hours), `valid_time`, `latitude`, `longitude`, then one
    /// `Float64` column per variable of this file. Rows run over the pairs in
    /// ascending order, then over points.
    pub fn stack(&self) -> Result<DataFrame, AggregateError> {
        let points = self.point_count();
        let rows = self.keys.len() * points;

        let mut time_ms = Vec::with_capacity(rows);
        let mut step_hours = Vec::with_capacity(rows);
        let mut valid_ms = Vec::with_capacity(rows);
        let mut latitudes = Vec::with_capacity(rows);
        let mut longitudes = Vec::with_capacity(rows);
        let mut values: Vec<Vec<Option<f64>>> = self
            .variables
            .iter()
            .map(|_| Vec::with_capacity(rows))
            .collect();

        for &(time, step) in &self.keys {
            let valid_time = time + Duration::hours(step);
            time_ms.extend(std::iter::repeat(time.and_utc().timestamp_millis()).take(points));
            step_hours.extend(std::iter::repeat(step).take(points));
            valid_ms.extend(std::iter::repeat(valid_time.and_utc().timestamp_millis()).take(points));
            latitudes.extend_from_slice(&self.latitudes);
            longitudes.extend_from_slice(&self.longitudes);

            for (index, column) in values.iter_mut().enumerate() {
                match self.blocks.get(&(index, time, step)) {
                    Some(block) => column.extend_from_slice(block),
                    None => column.extend(std::iter::repeat(None).take(points)),
                }
            }
        }

        let mut columns = vec![
            Column::new(COL_TIME.into(), time_ms).cast(&datetime_dtype())?,
            Column::new(COL_STEP.into(), step_hours),
            Column::new(COL_VALID_TIME.into(), valid_ms).cast(&datetime_dtype())?,
            Column::new(COL_LATITUDE.into(), latitudes),
            Column::new(COL_LONGITUDE.into(), longitudes),
        ];
        for (variable, column) in self.variables.iter().zip(values) {
            columns.push(Column::new(variable.name.as_str().into(), column));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Stacked frames of a set of files, one chunk of the time dimension per file.
///
/// Each file is stacked as soon as it is pushed, so only its rows are kept and its
/// decoded messages can be dropped. Files may carry different variables; the
/// union is kept in order of first appearance.
#[derive(Debug, Default)]
pub struct GridStack {
    variables: Vec<GridVariable>,
    points: Option<usize>,
    frames: Vec<DataFrame>,
}

impl GridStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stacks `chunk` and keeps its frame.
    ///
    /// # Errors
    ///
    /// [`AggregateError::GridMismatch`] when the chunk's point count differs from
    /// the first chunk pushed.
    pub fn push(&mut self, chunk: GridChunk) -> Result<(), AggregateError> {
        let found = chunk.point_count();
        let expected = *self.points.get_or_insert(found);
        if found != expected {
            return Err(AggregateError::GridMismatch {
                path: chunk.path.clone(),
                expected,
                found,
            });
        }

        for variable in chunk.variables() {
            if !self.variables.iter().any(|v| v.name == variable.name) {
                self.variables.push(variable.clone());
            }
        }
        let frame = chunk.stack()?;
        debug!("Stacked {} rows from {}", frame.height(), chunk.path.display());
        self.frames.push(frame);
        Ok(())
    }

    pub fn variables(&self) -> &[GridVariable] {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Number of stacked rows over all chunks.
    pub fn row_count(&self) -> usize {
        self.frames.iter().map(DataFrame::height).sum()
    }

    /// Concatenates the chunks in push order into one lazy frame.
    ///
    /// Variables missing from a chunk are added to it as null columns.
    ///
    /// # Errors
    ///
    /// [`AggregateError::NoMessages`] if nothing was pushed.
    pub fn into_lazy(self) -> Result<LazyFrame, AggregateError> {
        if self.frames.is_empty() {
            return Err(AggregateError::NoMessages);
        }
        let names = self.variable_names();
        let mut columns = vec![
            col(COL_TIME),
            col(COL_STEP),
            col(COL_VALID_TIME),
            col(COL_LATITUDE),
            col(COL_LONGITUDE),
        ];
        columns.extend(names.iter().map(|name| col(name.as_str())));

        let frames: Vec<LazyFrame> = self
            .frames
            .into_iter()
            .map(|df| {
                let missing: Vec<Expr> = names
                    .iter()
                    .filter(|name| df.column(name.as_str()).is_err())
                    .map(|name| lit(NULL).cast(DataType::Float64).alias(name.as_str()))
                    .collect();
                let mut frame = df.lazy();
                if !missing.is_empty() {
                    frame = frame.with_columns(missing);
                }
                frame.select(columns.clone())
            })
            .collect();
        Ok(concat(frames, UnionArgs::default())?)
    }
}

fn check_points(path: &Path, expected: usize, message: &GridMessage) -> Result<(), AggregateError> {
    for found in [
        message.latitudes.len(),
        message.longitudes.len(),
        message.values.len(),
    ] {
        if found != expected {
            return Err(AggregateError::GridMismatch {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }
    }
    Ok(())
}
