use crate::config::Config;
use crate::constants::{COST_FEATURES, FEATURE_SPREAD_EPSILON};
use crate::error::{AppError, Result};
use crate::models::road::NodeId;
use crate::models::{
    CandidateRoute, Poi, PoiCategory, RoadEdge, RoadNetwork, RouteConstraints, UserProfile,
};
use crate::services::proximity::{CategoryProximity, ProximityScorer};
use crate::services::traffic::{TrafficModel, TrafficTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, warn};

type EdgeIndex<'a> = HashMap<(NodeId, NodeId), Vec<&'a RoadEdge>>;

/// Named features of one candidate route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub route_id: String,
    pub values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new(route_id: impl Into<String>) -> Self {
        FeatureVector {
            route_id: route_id.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }

    pub fn insert(&mut self, feature: impl Into<String>, value: f64) {
        self.values.insert(feature.into(), value);
    }

    /// Hard limits of `constraints` against the `time`, `distance` and
    /// `highway_distance` features. A limit on a missing feature passes.
    pub fn satisfies(&self, constraints: &RouteConstraints) -> bool {
        let within = |feature: &str, limit: Option<f64>, unit: f64| match (limit, self.get(feature)) {
            (Some(limit), Some(value)) => value <= limit * unit,
            _ => true,
        };

        let uses_highways = self.get("highway_distance").unwrap_or(0.0) > 0.0;

        within("time", constraints.max_time, 60.0)
            && within("distance", constraints.max_distance, 1000.0)
            && !(constraints.avoid_highways && uses_highways)
    }
}

/// Feature vectors for the routes that could be assembled, plus per-route failures
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureBatch {
    /// Sorted by route id
    pub vectors: Vec<FeatureVector>,
    pub failures: BTreeMap<String, String>,
    /// Ids seen more than once; the first occurrence decides the outcome
    pub duplicate_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RouteTotals {
    time_s: f64,
    distance_m: f64,
    highway_distance_m: f64,
}

/// Combines traffic-adjusted travel times and POI proximity into one vector per route
#[derive(Debug, Clone)]
pub struct RouteFeatureAggregator {
    traffic: TrafficModel,
    proximity: ProximityScorer,
    scenic_categories: Vec<PoiCategory>,
}

impl Default for RouteFeatureAggregator {
    fn default() -> Self {
        RouteFeatureAggregator {
            traffic: TrafficModel::default(),
            proximity: ProximityScorer::default(),
            scenic_categories: crate::config::FeatureConfig::default().scenic_categories,
        }
    }
}

impl RouteFeatureAggregator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(RouteFeatureAggregator {
            traffic: TrafficModel::new(&config.traffic),
            proximity: ProximityScorer::new(&config.proximity)?,
            scenic_categories: config.features.scenic_categories.clone(),
        })
    }

    pub fn with_traffic_model(mut self, traffic: TrafficModel) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn with_proximity_scorer(mut self, proximity: ProximityScorer) -> Self {
        self.proximity = proximity;
        self
    }

    pub fn with_scenic_categories(mut self, categories: Vec<PoiCategory>) -> Self {
        self.scenic_categories = categories;
        self
    }

    pub fn traffic_model(&self) -> &TrafficModel {
        &self.traffic
    }

    pub fn proximity_scorer(&self) -> &ProximityScorer {
        &self.proximity
    }

    /// Feature vector of one route over an (ideally traffic-annotated) network
    pub fn aggregate(
        &self,
        network: &RoadNetwork,
        route: &CandidateRoute,
        pois: &[Poi],
    ) -> Result<FeatureVector> {
        let index = network.edge_index();
        let totals = route_totals(&index, route)?;

        let categories: BTreeSet<&PoiCategory> = pois.iter().map(|p| &p.category).collect();
        let proximity: BTreeMap<PoiCategory, CategoryProximity> = categories
            .into_iter()
            .map(|category| {
                let result = self.proximity.proximity(&route.geometry, pois, Some(category));
                (category.clone(), CategoryProximity::from(result))
            })
            .collect();

        Ok(self.assemble(route, totals, &proximity))
    }

    /// Feature vectors for many routes. Routes whose node path leaves the
    /// network end up in `failures`; the others are still assembled. A repeated
    /// route id is assembled once, from its first occurrence.
    #[instrument(skip(self, network, routes, pois), fields(routes = routes.len()))]
    pub fn aggregate_all(
        &self,
        network: &RoadNetwork,
        routes: &[CandidateRoute],
        pois: &[Poi],
    ) -> FeatureBatch {
        if !network.is_annotated() {
            debug!("Network carries no traffic state, using base travel times");
        }

        let index = network.edge_index();
        let table = self.proximity.feature_table_for(routes, pois);

        let mut batch = FeatureBatch {
            vectors: Vec::with_capacity(routes.len()),
            failures: table.failures.clone(),
            duplicate_ids: table.duplicate_ids.clone(),
        };

        let mut seen: HashSet<&str> = HashSet::with_capacity(routes.len());
        for route in routes {
            if !seen.insert(route.id.as_str()) {
                continue;
            }
            let Some(row) = table.rows.get(&route.id) else {
                continue;
            };

            match route_totals(&index, route) {
                Ok(totals) => batch.vectors.push(self.assemble(route, totals, row)),
                Err(e) => {
                    warn!(route_id = %route.id, "Skipping route: {}", e);
                    batch.failures.insert(route.id.clone(), e.to_string());
                }
            }
        }

        batch.vectors.sort_by(|a, b| a.route_id.cmp(&b.route_id));
        debug!(
            "Assembled {} feature vectors, {} failures",
            batch.vectors.len(),
            batch.failures.len()
        );
        batch
    }

    /// Annotate `network` for `time`, then assemble every route against it
    pub fn features_at<R: Rng>(
        &self,
        network: &RoadNetwork,
        routes: &[CandidateRoute],
        pois: &[Poi],
        time: TrafficTime,
        rng: &mut R,
    ) -> FeatureBatch {
        let annotated = self.traffic.annotate(network, time, rng);
        self.aggregate_all(&annotated, routes, pois)
    }

    /// `(route id, score)` for the routes that satisfy the profile's
    /// constraints, best first. Normalization spans all `vectors`.
    pub fn rank(vectors: &[FeatureVector], profile: &UserProfile) -> Vec<(String, f64)> {
        let normalizer = FeatureNormalizer::fit(vectors);

        let mut ranked: Vec<(String, f64)> = vectors
            .iter()
            .filter(|v| v.satisfies(profile.constraints()))
            .map(|v| (v.route_id.clone(), normalizer.score(v, profile)))
            .collect();

        if ranked.len() < vectors.len() {
            debug!(
                user_id = %profile.user_id(),
                "{} routes excluded by constraints",
                vectors.len() - ranked.len()
            );
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    fn assemble(
        &self,
        route: &CandidateRoute,
        totals: RouteTotals,
        proximity: &BTreeMap<PoiCategory, CategoryProximity>,
    ) -> FeatureVector {
        let mut vector = FeatureVector::new(route.id.clone());
        vector.insert("time", totals.time_s);
        vector.insert("distance", totals.distance_m);
        vector.insert("highway_distance", totals.highway_distance_m);
        vector.insert("simplicity", route.geometry.turn_count() as f64);

        for (category, values) in proximity {
            vector.insert(format!("{}_proximity", category), values.proximity);
            vector.insert(format!("{}_count", category), values.count as f64);
        }

        // Only scenic categories present in the POI set count towards scenery
        let scenic: Vec<f64> = self
            .scenic_categories
            .iter()
            .filter_map(|category| proximity.get(category))
            .map(|values| values.proximity)
            .collect();
        if !scenic.is_empty() {
            vector.insert("scenery", scenic.iter().sum::<f64>() / scenic.len() as f64);
        }

        vector
    }
}

/// Sum edge costs along the node path, taking the fastest of any parallel edges
fn route_totals(index: &EdgeIndex<'_>, route: &CandidateRoute) -> Result<RouteTotals> {
    if route.nodes.len() < 2 {
        return Err(AppError::MalformedRoute(format!(
            "route {} has no node path through the network",
            route.id
        )));
    }

    let mut totals = RouteTotals::default();
    for pair in route.nodes.windows(2) {
        let edge = index
            .get(&(pair[0], pair[1]))
            .and_then(|edges| {
                edges
                    .iter()
                    .min_by(|a, b| a.effective_travel_time().total_cmp(&b.effective_travel_time()))
            })
            .ok_or_else(|| {
                AppError::MalformedRoute(format!(
                    "route {} uses missing edge {} -> {}",
                    route.id, pair[0], pair[1]
                ))
            })?;

        totals.time_s += edge.effective_travel_time();
        totals.distance_m += edge.length;
        if edge.road_class().is_highway() {
            totals.highway_distance_m += edge.length;
        }
    }

    Ok(totals)
}

/// Min-max scaling of every feature across a candidate set; 1.0 is always best
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureNormalizer {
    ranges: BTreeMap<String, (f64, f64)>,
}

impl FeatureNormalizer {
    pub fn fit(vectors: &[FeatureVector]) -> Self {
        let mut ranges: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for vector in vectors {
            for (feature, &value) in vector.values.iter().filter(|(_, v)| v.is_finite()) {
                ranges
                    .entry(feature.clone())
                    .and_modify(|(min, max)| {
                        *min = min.min(value);
                        *max = max.max(value);
                    })
                    .or_insert((value, value));
            }
        }
        FeatureNormalizer { ranges }
    }

    /// Scaled value in [0, 1], `None` for a feature not seen during fitting
    pub fn normalize(&self, feature: &str, value: f64) -> Option<f64> {
        let &(min, max) = self.ranges.get(feature)?;
        let spread = max - min;
        if spread <= FEATURE_SPREAD_EPSILON {
            return Some(1.0);
        }

        let scaled = ((value - min) / spread).clamp(0.0, 1.0);
        if COST_FEATURES.contains(&feature) {
            Some(1.0 - scaled)
        } else {
            Some(scaled)
        }
    }

    /// Weighted sum over the profile criteria present in `vector`
    pub fn score(&self, vector: &FeatureVector, profile: &UserProfile) -> f64 {
        profile
            .preferences()
            .iter()
            .filter_map(|(criterion, weight)| {
                vector
                    .get(criterion)
                    .and_then(|value| self.normalize(criterion, value))
                    .map(|normalized| weight * normalized)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, PreferenceWeights, RoadNode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn c(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).unwrap()
    }

    /// Square block: 1 -> 2 -> 3 on residential streets, 1 -> 4 -> 3 on a motorway
    fn block_network() -> RoadNetwork {
        let mut slow_parallel = RoadEdge::new(1, 2, "service", 780.0, 120.0);
        slow_parallel.key = 1;

        RoadNetwork::new(
            vec![
                RoadNode::new(1, 45.7500, 21.2200),
                RoadNode::new(2, 45.7500, 21.2300),
                RoadNode::new(3, 45.7600, 21.2300),
                RoadNode::new(4, 45.7600, 21.2200),
            ],
            vec![
                RoadEdge::new(1, 2, "residential", 780.0, 60.0),
                slow_parallel,
                RoadEdge::new(2, 3, "residential", 1110.0, 80.0),
                RoadEdge::new(1, 4, "motorway", 1110.0, 40.0),
                RoadEdge::new(4, 3, "motorway", 780.0, 30.0),
            ],
        )
    }

    fn routes(network: &RoadNetwork) -> Vec<CandidateRoute> {
        vec![
            CandidateRoute::from_node_path("b", network, vec![1, 4, 3]).unwrap(),
            CandidateRoute::from_node_path("a", network, vec![1, 2, 3]).unwrap(),
        ]
    }

    fn pois() -> Vec<Poi> {
        vec![
            Poi::new("parks", c(45.7500, 21.2300)),
            Poi::new("historic", c(45.7700, 21.2500)),
        ]
    }

    fn profile(pairs: &[(&str, f64)]) -> UserProfile {
        let weights: PreferenceWeights = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        UserProfile::create(Some(weights), None).unwrap()
    }

    #[test]
    fn test_aggregate_route_features() {
        let network = block_network();
        let route = CandidateRoute::from_node_path("a", &network, vec![1, 2, 3]).unwrap();

        let vector = RouteFeatureAggregator::default()
            .aggregate(&network, &route, &pois())
            .unwrap();

        assert_eq!(vector.get("time"), Some(140.0));
        assert_eq!(vector.get("distance"), Some(1890.0));
        assert_eq!(vector.get("highway_distance"), Some(0.0));
        assert_eq!(vector.get("simplicity"), Some(1.0));
        assert_eq!(vector.get("parks_proximity"), Some(1.0));
        assert_eq!(vector.get("parks_count"), Some(1.0));
        assert_eq!(vector.get("historic_count"), Some(0.0));
        assert_eq!(vector.get("scenery"), Some(0.5));
    }

    #[test]
    fn test_scenery_omitted_without_scenic_pois() {
        let network = block_network();
        let route = CandidateRoute::from_node_path("a", &network, vec![1, 2, 3]).unwrap();
        let cafes = vec![Poi::new("cafe", c(45.7500, 21.2300))];

        let vector = RouteFeatureAggregator::default()
            .aggregate(&network, &route, &cafes)
            .unwrap();
        assert!(vector.get("scenery").is_none());
        assert_eq!(vector.get("cafe_proximity"), Some(1.0));
    }

    #[test]
    fn test_missing_edge_is_malformed() {
        let network = block_network();
        let route = CandidateRoute::from_node_path("diag", &network, vec![1, 3]).unwrap();
        let err = RouteFeatureAggregator::default()
            .aggregate(&network, &route, &pois())
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedRoute(_)));
    }

    #[test]
    fn test_features_at_uses_traffic_state() {
        let network = block_network();
        let aggregator =
            RouteFeatureAggregator::default().with_traffic_model(TrafficModel::without_jitter());
        let mut rng = StdRng::seed_from_u64(3);
        let late_night = TrafficTime::new(3, 2).unwrap();

        let batch = aggregator.features_at(&network, &routes(&network), &pois(), late_night, &mut rng);

        assert!(batch.failures.is_empty());
        let ids: Vec<&str> = batch.vectors.iter().map(|v| v.route_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!((batch.vectors[0].get("time").unwrap() - 126.0).abs() < 1e-9);
        assert!((batch.vectors[1].get("time").unwrap() - 63.0).abs() < 1e-9);
        assert_eq!(batch.vectors[1].get("highway_distance"), Some(1890.0));

        // Input network is not annotated in place
        assert!(!network.is_annotated());
    }

    #[test]
    fn test_aggregate_all_collects_failures() {
        let network = block_network();
        let mut candidates = routes(&network);
        candidates.push(CandidateRoute::from_node_path("diag", &network, vec![1, 3]).unwrap());

        let batch = RouteFeatureAggregator::default().aggregate_all(&network, &candidates, &pois());
        assert_eq!(batch.vectors.len(), 2);
        assert!(batch.failures.contains_key("diag"));
    }

    #[test]
    fn test_normalizer_inverts_costs() {
        let mut fast = FeatureVector::new("fast");
        fast.insert("time", 100.0);
        fast.insert("scenery", 0.2);
        let mut slow = FeatureVector::new("slow");
        slow.insert("time", 300.0);
        slow.insert("scenery", 0.8);

        let normalizer = FeatureNormalizer::fit(&[fast, slow]);
        assert_eq!(normalizer.normalize("time", 100.0), Some(1.0));
        assert_eq!(normalizer.normalize("time", 300.0), Some(0.0));
        let close = |value: f64, expected: f64| {
            let normalized = normalizer.normalize("scenery", value).unwrap();
            (normalized - expected).abs() < 1e-9
        };
        assert!(close(0.8, 1.0));
        assert!(close(0.5, 0.5));
        assert_eq!(normalizer.normalize("safety", 1.0), None);
    }

    #[test]
    fn test_constant_feature_normalizes_to_one() {
        let mut a = FeatureVector::new("a");
        a.insert("distance", 1500.0);
        let mut b = FeatureVector::new("b");
        b.insert("distance", 1500.0);

        let normalizer = FeatureNormalizer::fit(&[a, b]);
        assert_eq!(normalizer.normalize("distance", 1500.0), Some(1.0));
    }

    #[test]
    fn test_rank_follows_profile_weights() {
        let network = block_network();
        let batch = RouteFeatureAggregator::default().aggregate_all(&network, &routes(&network), &pois());

        let hurried = RouteFeatureAggregator::rank(&batch.vectors, &profile(&[("time", 1.0)]));
        assert_eq!(hurried[0].0, "b");
        assert_eq!(hurried[0].1, 1.0);

        let stroller = RouteFeatureAggregator::rank(&batch.vectors, &profile(&[("scenery", 1.0)]));
        assert_eq!(stroller[0].0, "a");

        // Safety has no feature, so only ties remain and ids break them
        let cautious = RouteFeatureAggregator::rank(&batch.vectors, &profile(&[("safety", 1.0)]));
        assert_eq!(
            cautious,
            vec![("a".to_string(), 0.0), ("b".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_rank_applies_constraints() {
        let network = block_network();
        let batch = RouteFeatureAggregator::default().aggregate_all(&network, &routes(&network), &pois());

        let constraints = RouteConstraints {
            avoid_highways: true,
            ..RouteConstraints::default()
        };
        let profile = UserProfile::create(None, Some(constraints)).unwrap();

        let ranked = RouteFeatureAggregator::rank(&batch.vectors, &profile);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, "a");
    }

    #[test]
    fn test_satisfies_limits() {
        let mut vector = FeatureVector::new("r");
        vector.insert("time", 600.0);
        vector.insert("distance", 2500.0);
        vector.insert("highway_distance", 0.0);

        let tight = RouteConstraints {
            max_time: Some(5.0),
            ..RouteConstraints::default()
        };
        let loose = RouteConstraints {
            max_time: Some(10.0),
            max_distance: Some(3.0),
            avoid_highways: true,
            prefer_bike_lanes: true,
        };

        assert!(!vector.satisfies(&tight));
        assert!(vector.satisfies(&loose));
        assert!(vector.satisfies(&RouteConstraints::default()));
    }
}
