//! WGS84 -> UTM forward projection.
//!
//! All proximity distances are measured in a single UTM zone so results are
//! in meters and comparable across calls. Series expansion after Snyder,
//! "Map Projections: A Working Manual" (USGS PP 1395).

use crate::config::ProximityConfig;
use crate::error::{AppError, Result};
use crate::models::{Coordinates, RouteGeometry};
use geo::{Coord, LineString, Point};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_SCALE_FACTOR: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmProjection {
    zone: u8,
    north: bool,
}

impl UtmProjection {
    pub fn new(zone: u8, north: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(AppError::Config(format!(
                "UTM zone must be between 1 and 60, got {}",
                zone
            )));
        }
        Ok(UtmProjection { zone, north })
    }

    pub fn from_config(config: &ProximityConfig) -> Result<Self> {
        Self::new(config.utm_zone, config.utm_north)
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn epsg_code(&self) -> u32 {
        let base = if self.north { 32_600 } else { 32_700 };
        base + self.zone as u32
    }

    pub fn central_meridian(&self) -> f64 {
        (self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    /// Easting/northing in meters
    pub fn project(&self, coordinates: &Coordinates) -> Coord<f64> {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = coordinates.lat.to_radians();
        let lambda = coordinates.lng.to_radians();
        let lambda0 = self.central_meridian().to_radians();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = (lambda - lambda0) * cos_phi;

        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let easting = UTM_SCALE_FACTOR
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + UTM_FALSE_EASTING;

        let mut northing = UTM_SCALE_FACTOR
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        if !self.north {
            northing += UTM_FALSE_NORTHING_SOUTH;
        }

        Coord {
            x: easting,
            y: northing,
        }
    }

    pub fn project_point(&self, coordinates: &Coordinates) -> Point<f64> {
        Point::from(self.project(coordinates))
    }

    pub fn project_line(&self, geometry: &RouteGeometry) -> LineString<f64> {
        geometry.points().iter().map(|c| self.project(c)).collect()
    }
}

impl Default for UtmProjection {
    fn default() -> Self {
        UtmProjection {
            zone: crate::constants::DEFAULT_UTM_ZONE,
            north: true,
        }
    }
}
