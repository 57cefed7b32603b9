use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::InvalidRequest(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::InvalidRequest(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            )));
        }
        Ok(Coordinates { lat, lng })
    }

    /// Initial bearing towards `other` in degrees, [0, 360)
    pub fn bearing_to(&self, other: &Coordinates) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let y = delta_lng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(45.7489, 21.2087).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, 181.0).is_err());
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Coordinates::new(45.0, 21.0).unwrap();
        let north = Coordinates::new(45.01, 21.0).unwrap();
        let east = Coordinates::new(45.0, 21.01).unwrap();

        assert!(origin.bearing_to(&north).abs() < 1e-6);
        assert!((origin.bearing_to(&east) - 90.0).abs() < 0.1);
    }
}
