use crate::aggregate::error::AggregateError;
use crate::aggregate::grid::GridMessage;
use std::path::Path;

/// Decodes one grid file into its messages.
///
/// Reading is blocking; the aggregator calls it from `spawn_blocking`.
pub trait GridReader: Send + Sync + 'static {
    fn read(&self, path: &Path) -> Result<Vec<GridMessage>, AggregateError>;
}

#[cfg(feature = "grib")]
pub use grib::GribReader;

#[cfg(feature = "grib")]
mod grib {
    use super::GridReader;
    use crate::aggregate::error::AggregateError;
    use crate::aggregate::grid::{GridMessage, GridVariable};
    use chrono::{NaiveDate, NaiveDateTime};
    use eccodes::{
        CodesHandle, FallibleIterator, KeyType, KeyedMessage, ProductKind::GRIB,
    };
    use log::debug;
    use std::path::Path;

    /// [`GridReader`] for GRIB files, decoded with ecCodes.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct GribReader;

    impl GridReader for GribReader {
        fn read(&self, path: &Path) -> Result<Vec<GridMessage>, AggregateError> {
            let mut handle = CodesHandle::new_from_file(path, GRIB).map_err(|source| {
                AggregateError::Grib {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

            let mut messages = Vec::new();
            while let Some(msg) = handle.next().map_err(|source| AggregateError::Grib {
                path: path.to_path_buf(),
                source,
            })? {
                messages.push(MessageKeys { path, msg: &msg }.decode()?);
            }
            debug!("Read {} messages from {}", messages.len(), path.display());
            Ok(messages)
        }
    }

    struct MessageKeys<'a> {
        path: &'a Path,
        msg: &'a KeyedMessage,
    }

    impl MessageKeys<'_> {
        fn decode(&self) -> Result<GridMessage, AggregateError> {
            // ecCodes reports "unknown" when a parameter has no CF name.
            let name = self
                .string("cfVarName")
                .ok()
                .filter(|name| !name.is_empty() && name != "unknown")
                .map_or_else(|| self.string("shortName"), Ok)?;
            let variable = GridVariable {
                name,
                long_name: self.string("name")?,
                units: self.string("units")?,
            };

            let values = self.floats("values")?;
            let missing_value = self.float("missingValue")?;
            let has_bitmap = self.int("bitmapPresent")? != 0;
            let values = values
                .into_iter()
                .map(|v| (!has_bitmap || v != missing_value).then_some(v))
                .collect();

            Ok(GridMessage {
                variable,
                reference_time: self.reference_time()?,
                step_hours: self.int("endStep")?,
                latitudes: self.floats("latitudes")?,
                longitudes: self.floats("longitudes")?,
                values,
            })
        }

        /// `dataDate` is `YYYYMMDD`, `dataTime` is `HHMM`.
        fn reference_time(&self) -> Result<NaiveDateTime, AggregateError> {
            let date = self.int("dataDate")?;
            let time = self.int("dataTime")?;
            NaiveDate::from_ymd_opt(
                (date / 10_000) as i32,
                ((date / 100) % 100) as u32,
                (date % 100) as u32,
            )
            .and_then(|day| day.and_hms_opt((time / 100) as u32, (time % 100) as u32, 0))
            .ok_or_else(|| AggregateError::InvalidReferenceTime {
                path: self.path.to_path_buf(),
                date,
                time,
            })
        }

        fn value(&self, key: &'static str) -> Result<KeyType, AggregateError> {
            self.msg
                .read_key(key)
                .map(|key| key.value)
                .map_err(|source| AggregateError::Grib {
                    path: self.path.to_path_buf(),
                    source,
                })
        }

        fn incorrect(&self, key: &'static str) -> AggregateError {
            AggregateError::IncorrectKeyType {
                path: self.path.to_path_buf(),
                key,
            }
        }

        fn string(&self, key: &'static str) -> Result<String, AggregateError> {
            match self.value(key)? {
                KeyType::Str(value) => Ok(value),
                _ => Err(self.incorrect(key)),
            }
        }

        fn int(&self, key: &'static str) -> Result<i64, AggregateError> {
            match self.value(key)? {
                KeyType::Int(value) => Ok(value),
                _ => Err(self.incorrect(key)),
            }
        }

        fn float(&self, key: &'static str) -> Result<f64, AggregateError> {
            match self.value(key)? {
                KeyType::Float(value) => Ok(value),
                KeyType::Int(value) => Ok(value as f64),
                _ => Err(self.incorrect(key)),
            }
        }

        fn floats(&self, key: &'static str) -> Result<Vec<f64>, AggregateError> {
            match self.value(key)? {
                KeyType::FloatArray(values) => Ok(values),
                KeyType::Float(value) => Ok(vec![value]),
                _ => Err(self.incorrect(key)),
            }
        }
    }
}
