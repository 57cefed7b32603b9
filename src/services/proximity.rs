use crate::config::ProximityConfig;
use crate::constants::DEFAULT_PROXIMITY_MAX_DISTANCE_M;
use crate::error::{AppError, Result};
use crate::models::{CandidateRoute, Coordinates, Poi, PoiCategory, RouteGeometry};
use crate::services::projection::UtmProjection;
use geo::{Distance, Euclidean, LineString, Point};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// Distance metrics between one route and a set of POIs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityResult {
    /// Meters to the closest POI
    pub min_distance: f64,
    /// Mean meters over all POIs considered
    pub avg_distance: f64,
    /// POIs within the scorer's max distance
    pub count_within_range: usize,
    /// 1.0 on the route, decaying linearly to 0.0 at max distance
    pub proximity_score: f64,
}

impl ProximityResult {
    /// Result for an empty POI set: carries no information, is not an error
    pub fn empty() -> Self {
        ProximityResult {
            min_distance: f64::INFINITY,
            avg_distance: f64::INFINITY,
            count_within_range: 0,
            proximity_score: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_distance.is_infinite() && self.count_within_range == 0
    }

    fn from_distances(distances: &[f64], max_distance_m: f64) -> Self {
        if distances.is_empty() {
            return Self::empty();
        }

        let min_distance = distances.iter().copied().fold(f64::INFINITY, f64::min);
        let avg_distance = distances.iter().sum::<f64>() / distances.len() as f64;
        let count_within_range = distances.iter().filter(|&&d| d <= max_distance_m).count();

        ProximityResult {
            min_distance,
            avg_distance,
            count_within_range,
            proximity_score: (1.0 - min_distance / max_distance_m).max(0.0),
        }
    }
}

/// The two per-category columns of the route feature table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryProximity {
    pub proximity: f64,
    pub count: usize,
}

impl From<ProximityResult> for CategoryProximity {
    fn from(result: ProximityResult) -> Self {
        CategoryProximity {
            proximity: result.proximity_score,
            count: result.count_within_range,
        }
    }
}

/// Per-route, per-category proximity features plus routes that could not be scored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub categories: Vec<PoiCategory>,
    pub rows: BTreeMap<String, BTreeMap<PoiCategory, CategoryProximity>>,
    pub failures: BTreeMap<String, String>,
    /// Ids seen more than once; only the first occurrence is scored
    pub duplicate_ids: BTreeSet<String>,
}

impl FeatureTable {
    pub fn column_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|c| [format!("{}_proximity", c), format!("{}_count", c)])
            .collect()
    }

    /// Flattened `{category}_proximity` / `{category}_count` values for a route
    pub fn columns(&self, route_id: &str) -> Option<BTreeMap<String, f64>> {
        self.rows.get(route_id).map(|row| {
            row.iter()
                .flat_map(|(category, values)| {
                    [
                        (format!("{}_proximity", category), values.proximity),
                        (format!("{}_count", category), values.count as f64),
                    ]
                })
                .collect()
        })
    }

    /// `{route_id: {column: value}}` with integer count columns
    pub fn to_json(&self) -> Value {
        let rows: Map<String, Value> = self
            .rows
            .iter()
            .map(|(route_id, row)| {
                let columns: Map<String, Value> = row
                    .iter()
                    .flat_map(|(category, values)| {
                        [
                            (format!("{}_proximity", category), json!(values.proximity)),
                            (format!("{}_count", category), json!(values.count)),
                        ]
                    })
                    .collect();
                (route_id.clone(), Value::Object(columns))
            })
            .collect();
        Value::Object(rows)
    }
}

/// POIs projected once per batch, grouped by category
struct ProjectedPois {
    by_category: BTreeMap<PoiCategory, Vec<Point<f64>>>,
}

impl ProjectedPois {
    fn new(pois: &[Poi], projection: &UtmProjection) -> Self {
        let mut by_category: BTreeMap<PoiCategory, Vec<Point<f64>>> = BTreeMap::new();
        for poi in pois {
            by_category
                .entry(poi.category.clone())
                .or_default()
                .push(projection.project_point(&poi.coordinates));
        }
        ProjectedPois { by_category }
    }
}

/// Scores how closely routes pass by POIs, measured in a fixed UTM zone
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityScorer {
    projection: UtmProjection,
    max_distance_m: f64,
}

impl Default for ProximityScorer {
    fn default() -> Self {
        ProximityScorer {
            projection: UtmProjection::default(),
            max_distance_m: DEFAULT_PROXIMITY_MAX_DISTANCE_M,
        }
    }
}

impl ProximityScorer {
    pub fn new(config: &ProximityConfig) -> Result<Self> {
        ProximityScorer {
            projection: UtmProjection::from_config(config)?,
            max_distance_m: DEFAULT_PROXIMITY_MAX_DISTANCE_M,
        }
        .with_max_distance(config.max_distance_m)
    }

    pub fn with_max_distance(mut self, max_distance_m: f64) -> Result<Self> {
        if !(max_distance_m > 0.0 && max_distance_m.is_finite()) {
            return Err(AppError::InvalidRequest(format!(
                "max distance must be a positive number of meters, got {}",
                max_distance_m
            )));
        }
        self.max_distance_m = max_distance_m;
        Ok(self)
    }

    pub fn max_distance_m(&self) -> f64 {
        self.max_distance_m
    }

    pub fn projection(&self) -> &UtmProjection {
        &self.projection
    }

    /// Proximity of one route to the POIs of `category` (all POIs when `None`)
    pub fn proximity(
        &self,
        route: &RouteGeometry,
        pois: &[Poi],
        category: Option<&PoiCategory>,
    ) -> ProximityResult {
        let line = self.projection.project_line(route);
        let points: Vec<Point<f64>> = pois
            .iter()
            .filter(|poi| category.map_or(true, |c| &poi.category == c))
            .map(|poi| self.projection.project_point(&poi.coordinates))
            .collect();

        if points.is_empty() {
            debug!(category = ?category, "No POIs to score against, returning empty result");
            return ProximityResult::empty();
        }

        self.score_projected(&line, &points)
    }

    /// Same as [`proximity`](Self::proximity) for a raw `(latitude, longitude)` sequence
    pub fn proximity_lat_lng(
        &self,
        route: &[(f64, f64)],
        pois: &[Poi],
        category: Option<&PoiCategory>,
    ) -> Result<ProximityResult> {
        let geometry = RouteGeometry::from_lat_lng(route)?;
        Ok(self.proximity(&geometry, pois, category))
    }

    fn score_projected(&self, line: &LineString<f64>, points: &[Point<f64>]) -> ProximityResult {
        let distances: Vec<f64> = points
            .iter()
            .map(|point| Euclidean.distance(point, line))
            .collect();
        ProximityResult::from_distances(&distances, self.max_distance_m)
    }

    /// Proximity score and in-range count for every (route, category) pair.
    ///
    /// Categories are the distinct values found in `pois`. Routes with fewer
    /// than two points land in `failures`; the rest of the batch is scored.
    /// A repeated route id keeps the outcome of its first occurrence.
    #[instrument(skip(self, routes, pois), fields(routes = routes.len(), pois = pois.len()))]
    pub fn feature_table(&self, routes: &[(String, Vec<Coordinates>)], pois: &[Poi]) -> FeatureTable {
        let projected = ProjectedPois::new(pois, &self.projection);
        let categories: Vec<PoiCategory> = projected.by_category.keys().cloned().collect();
        debug!("Scoring {} categories", categories.len());

        let scored: Vec<(String, Result<BTreeMap<PoiCategory, CategoryProximity>>)> = routes
            .par_iter()
            .map(|(route_id, points)| {
                let row = RouteGeometry::new(points.clone()).map(|geometry| {
                    let line = self.projection.project_line(&geometry);
                    projected
                        .by_category
                        .iter()
                        .map(|(category, points)| {
                            let result = self.score_projected(&line, points);
                            (category.clone(), CategoryProximity::from(result))
                        })
                        .collect()
                });
                (route_id.clone(), row)
            })
            .collect();

        let mut table = FeatureTable {
            categories,
            ..FeatureTable::default()
        };

        for (route_id, row) in scored {
            if table.rows.contains_key(&route_id) || table.failures.contains_key(&route_id) {
                warn!(route_id = %route_id, "Duplicate route id in batch, keeping first occurrence");
                table.duplicate_ids.insert(route_id);
                continue;
            }
            match row {
                Ok(row) => {
                    table.rows.insert(route_id, row);
                }
                Err(e) => {
                    warn!(route_id = %route_id, "Skipping route: {}", e);
                    table.failures.insert(route_id, e.to_string());
                }
            }
        }

        debug!(
            "Scored {} routes, {} failures",
            table.rows.len(),
            table.failures.len()
        );
        table
    }

    /// [`feature_table`](Self::feature_table) over candidate routes
    pub fn feature_table_for(&self, routes: &[CandidateRoute], pois: &[Poi]) -> FeatureTable {
        let raw: Vec<(String, Vec<Coordinates>)> = routes
            .iter()
            .map(|route| (route.id.clone(), route.geometry.points().to_vec()))
            .collect();
        self.feature_table(&raw, pois)
    }
}
