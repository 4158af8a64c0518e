use crate::aggregate::grid::{COL_LATITUDE, COL_LONGITUDE, COL_VALID_TIME};
use polars::prelude::*;

/// Per-year reshaping of a stacked grid frame.
///
/// The frame is expected to carry `valid_time`, `latitude`, `longitude` and one
/// column per name in `variables`.
pub trait Era5FrameExt {
    /// Keeps `valid_time` as the time axis and drops `time` and `step`.
    fn swap_to_valid_time(self, variables: &[String]) -> LazyFrame;

    /// Keeps the rows whose `valid_time` falls in calendar year `year`.
    fn filter_year(self, year: i32) -> LazyFrame;

    /// Collapses repeated `(valid_time, latitude, longitude)` rows.
    ///
    /// Each variable keeps its first non-null value in row order.
    fn collapse_duplicate_times(self, variables: &[String]) -> LazyFrame;

    /// `valid_time` ascending, then latitude descending, then longitude ascending.
    fn sort_by_valid_time(self) -> LazyFrame;

    /// Drops every timestamp at which all variables are null at every grid point.
    fn drop_empty_times(self, variables: &[String]) -> LazyFrame;
}

impl Era5FrameExt for LazyFrame {
    fn swap_to_valid_time(self, variables: &[String]) -> LazyFrame {
        let mut columns = vec![col(COL_VALID_TIME), col(COL_LATITUDE), col(COL_LONGITUDE)];
        columns.extend(variables.iter().map(|name| col(name.as_str())));
        self.select(columns)
    }

    fn filter_year(self, year: i32) -> LazyFrame {
        self.filter(col(COL_VALID_TIME).dt().year().eq(lit(year)))
    }

    fn collapse_duplicate_times(self, variables: &[String]) -> LazyFrame {
        let firsts: Vec<Expr> = variables
            .iter()
            .map(|name| col(name.as_str()).drop_nulls().first())
            .collect();
        self.group_by_stable([col(COL_VALID_TIME), col(COL_LATITUDE), col(COL_LONGITUDE)])
            .agg(firsts)
    }

    fn sort_by_valid_time(self) -> LazyFrame {
        self.sort_by_exprs(
            [col(COL_VALID_TIME), col(COL_LATITUDE), col(COL_LONGITUDE)],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, true, false])
                .with_maintain_order(true),
        )
    }

    fn drop_empty_times(self, variables: &[String]) -> LazyFrame {
        let any_present = variables
            .iter()
            .map(|name| col(name.as_str()).is_not_null())
            .reduce(|a, b| a.or(b))
            .unwrap_or_else(|| lit(false));
        self.filter(
            any_present
                .cast(DataType::UInt32)
                .sum()
                .over([col(COL_VALID_TIME)])
                .gt(lit(0)),
        )
    }
}

/// Runs the full per-year chain on a stacked frame.
pub fn reshape_year(frame: LazyFrame, variables: &[String], year: i32) -> LazyFrame {
    frame
        .swap_to_valid_time(variables)
        .filter_year(year)
        .collapse_duplicate_times(variables)
        .sort_by_valid_time()
        .drop_empty_times(variables)
}
