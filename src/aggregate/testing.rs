//! Grid reader that fabricates data from the monthly file name, so aggregation can be
//! tested without GRIB files.

use crate::aggregate::error::AggregateError;
use crate::aggregate::grid::{GridMessage, GridVariable};
use crate::aggregate::reader::GridReader;
use crate::types::period::Month;
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::path::Path;

pub const LATITUDES: [f64; 4] = [50.0, 50.0, 49.9, 49.9];
pub const LONGITUDES: [f64; 4] = [5.0, 5.1, 5.0, 5.1];

/// One `t2m` and one `tp` message per day of the month, valid at 01:00.
///
/// On the last day of December an extra 24 h step is emitted that is valid on
/// January 1st of the next year. `tp` is always missing at the last grid point.
/// Days listed in `blank_days` carry no values at all.
#[derive(Debug, Default, Clone)]
pub struct SyntheticReader {
    pub blank_days: HashSet<NaiveDate>,
}

impl SyntheticReader {
    pub fn with_blank_day(day: NaiveDate) -> Self {
        Self {
            blank_days: HashSet::from([day]),
        }
    }
}

/// Parses `{year}_months{MM}_europe.grib`.
pub fn month_of(path: &Path) -> Month {
    let name = path.file_name().unwrap().to_str().unwrap();
    let (year, month) = name
        .strip_suffix("_europe.grib")
        .and_then(|stem| stem.split_once("_months"))
        .unwrap();
    Month(year.parse().unwrap(), month.parse().unwrap())
}

fn t2m_value(day: NaiveDate, point: usize) -> f64 {
    270.0 + day.ordinal() as f64 * 0.1 + point as f64
}

impl GridReader for SyntheticReader {
    fn read(&self, path: &Path) -> Result<Vec<GridMessage>, AggregateError> {
        let month = month_of(path);
        let first = month.first_day().unwrap();
        let mut messages = Vec::new();

        for offset in 0..month.days_in_month() {
            let day = first + chrono::Duration::days(offset as i64);
            let blank = self.blank_days.contains(&day);
            let reference_time = day.and_hms_opt(0, 0, 0).unwrap();

            let t2m: Vec<Option<f64>> = (0..LATITUDES.len())
                .map(|point| (!blank).then(|| t2m_value(day, point)))
                .collect();
            let tp: Vec<Option<f64>> = (0..LATITUDES.len())
                .map(|point| (!blank && point < 3).then_some(0.001))
                .collect();

            let mut steps = vec![1];
            if day.month() == 12 && day.day() == 31 {
                steps.push(24);
            }
            for step_hours in steps {
                for (variable, values) in [
                    (GridVariable::new("t2m", "2 metre temperature", "K"), t2m.clone()),
                    (GridVariable::new("tp", "Total precipitation", "m"), tp.clone()),
                ] {
                    messages.push(GridMessage {
                        variable,
                        reference_time,
                        step_hours,
                        latitudes: LATITUDES.to_vec(),
                        longitudes: LONGITUDES.to_vec(),
                        values,
                    });
                }
            }
        }
        Ok(messages)
    }
}
