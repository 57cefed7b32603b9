use crate::constants::TURN_ANGLE_THRESHOLD_DEG;
use crate::error::{AppError, Result};
use crate::models::road::NodeId;
use crate::models::{Coordinates, RoadNetwork};
use serde::{Deserialize, Serialize};

/// Ordered route polyline with at least two points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinates>", into = "Vec<Coordinates>")]
pub struct RouteGeometry {
    points: Vec<Coordinates>,
}

impl RouteGeometry {
    pub fn new(points: Vec<Coordinates>) -> Result<Self> {
        if points.len() < 2 {
            return Err(AppError::MalformedRoute(format!(
                "route geometry needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(RouteGeometry { points })
    }

    /// Build from `(latitude, longitude)` pairs
    pub fn from_lat_lng(pairs: &[(f64, f64)]) -> Result<Self> {
        let points = pairs
            .iter()
            .map(|&(lat, lng)| Coordinates::new(lat, lng))
            .collect::<Result<Vec<_>>>()?;
        Self::new(points)
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.points
    }

    /// Number of vertices where the heading changes by more than the turn threshold
    pub fn turn_count(&self) -> usize {
        let bearings: Vec<f64> = self
            .points
            .windows(2)
            .filter(|w| w[0] != w[1])
            .map(|w| w[0].bearing_to(&w[1]))
            .collect();

        bearings
            .windows(2)
            .filter(|b| {
                let delta = (b[1] - b[0]).abs() % 360.0;
                delta.min(360.0 - delta) > TURN_ANGLE_THRESHOLD_DEG
            })
            .count()
    }
}

impl TryFrom<Vec<Coordinates>> for RouteGeometry {
    type Error = AppError;

    fn try_from(points: Vec<Coordinates>) -> Result<Self> {
        RouteGeometry::new(points)
    }
}

impl From<RouteGeometry> for Vec<Coordinates> {
    fn from(geometry: RouteGeometry) -> Self {
        geometry.points
    }
}

/// A candidate route produced by the (external) route generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRoute {
    pub id: String,
    /// Node sequence through the road network; empty when only geometry is known
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    pub geometry: RouteGeometry,
}

impl CandidateRoute {
    pub fn new(id: impl Into<String>, nodes: Vec<NodeId>, geometry: RouteGeometry) -> Self {
        CandidateRoute {
            id: id.into(),
            nodes,
            geometry,
        }
    }

    /// Derive the geometry from the coordinates of the traversed nodes
    pub fn from_node_path(
        id: impl Into<String>,
        network: &RoadNetwork,
        nodes: Vec<NodeId>,
    ) -> Result<Self> {
        let id = id.into();
        let lookup = network.node_coordinates();
        let points = nodes
            .iter()
            .map(|node| {
                lookup.get(node).copied().ok_or_else(|| {
                    AppError::MalformedRoute(format!("route {} references unknown node {}", id, node))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CandidateRoute {
            geometry: RouteGeometry::new(points)?,
            id,
            nodes,
        })
    }
}
