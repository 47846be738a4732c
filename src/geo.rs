use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("risk level {0} must be a non-negative number")]
    InvalidRiskLevel(f64),
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }
}

/// A reported hazard location. Higher `risk` means more severe.
///
/// The store keeps duplicates; readers treat the collection as a multiset.
/// Field names match the stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPoint {
    pub lat: f64,
    pub lng: f64,
    pub risk: f64,
}

impl RiskPoint {
    pub fn new(lat: f64, lng: f64, risk: f64) -> Result<Self, GeoError> {
        let Coordinate { lat, lng } = Coordinate::new(lat, lng)?;
        if risk.is_nan() || risk < 0.0 {
            return Err(GeoError::InvalidRiskLevel(risk));
        }
        Ok(Self { lat, lng, risk })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_coordinates_on_the_range_edges() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            Coordinate::new(90.1, 0.0),
            Err(GeoError::LatitudeOutOfRange(90.1))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(GeoError::LongitudeOutOfRange(-180.5))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn rejects_negative_risk_levels() {
        assert!(RiskPoint::new(35.0, 139.0, 0.0).is_ok());
        assert_eq!(
            RiskPoint::new(35.0, 139.0, -1.0),
            Err(GeoError::InvalidRiskLevel(-1.0))
        );
        assert!(RiskPoint::new(35.0, 139.0, f64::NAN).is_err());
    }

    #[test]
    fn risk_point_serde_uses_store_field_names() {
        let point = RiskPoint::new(35.005, 139.005, 3.0).unwrap();
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lat": 35.005, "lng": 139.005, "risk": 3.0})
        );
    }
}
