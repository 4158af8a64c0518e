use crate::fetch::error::FetchError;
use serde::{Serialize, Serializer};

/// Output area of a retrieval, in degrees.
///
/// Serializes to the CDS `area` form `[north, west, south, east]`.
///
/// # Examples
///
/// ```
/// use era5land::BoundingBox;
///
/// let alps = BoundingBox::new(48.0, 5.0, 44.0, 17.0).unwrap();
/// assert_eq!(alps.as_area(), [48.0, 5.0, 44.0, 17.0]);
/// assert!(BoundingBox::new(40.0, 5.0, 44.0, 17.0).is_err()); // north below south
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    /// The whole globe, `[90, -180, -90, 180]`.
    pub const GLOBAL: BoundingBox = BoundingBox {
        north: 90.0,
        west: -180.0,
        south: -90.0,
        east: 180.0,
    };

    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Result<Self, FetchError> {
        let latitudes_ok = (-90.0..=90.0).contains(&north) && (-90.0..=90.0).contains(&south);
        let longitudes_ok = (-180.0..=360.0).contains(&west) && (-180.0..=360.0).contains(&east);
        if !latitudes_ok || !longitudes_ok || north < south || east < west {
            return Err(FetchError::InvalidBoundingBox {
                north,
                west,
                south,
                east,
            });
        }
        Ok(Self {
            north,
            west,
            south,
            east,
        })
    }

    pub fn as_area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_area().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_area_array() {
        let json = serde_json::to_string(&BoundingBox::GLOBAL).unwrap();
        assert_eq!(json, "[90.0,-180.0,-90.0,180.0]");
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(BoundingBox::new(91.0, 0.0, 0.0, 10.0).is_err());
        assert!(BoundingBox::new(10.0, 0.0, -91.0, 10.0).is_err());
        assert!(BoundingBox::new(10.0, 20.0, 0.0, 10.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 0.0, 10.0).is_err());
        assert!(BoundingBox::new(72.0, -25.0, 34.0, 45.0).is_ok());
    }
}
