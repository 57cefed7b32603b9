use routewise::models::{CandidateRoute, Coordinates, Poi, RoadEdge, RoadNetwork, RoadNode};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Meters per degree of latitude around Timisoara (45.75°N)
#[allow(dead_code)]
pub const M_PER_DEG_LAT: f64 = 111_148.0;

/// Install a test subscriber once; later calls are no-ops
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routewise=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[allow(dead_code)]
pub fn coords(lat: f64, lng: f64) -> Coordinates {
    Coordinates::new(lat, lng).unwrap()
}

/// Create a test POI
#[allow(dead_code)]
pub fn create_test_poi(name: &str, category: &str, lat: f64, lng: f64) -> Poi {
    Poi::new(category, coords(lat, lng)).with_attribute("name", json!(name))
}

/// Small downtown grid around Piata Victoriei.
///
/// ```text
///   4 ---- 5 ---- 6      row at 45.7560
///   |      |      |
///   1 ---- 2 ---- 3      row at 45.7500
/// ```
///
/// Bottom row is a primary boulevard, top row residential, verticals tertiary.
/// Node 3 -> 6 is a trunk bypass carrying two parallel edges.
#[allow(dead_code)]
pub fn sample_network() -> RoadNetwork {
    let nodes = vec![
        RoadNode::new(1, 45.7500, 21.2200),
        RoadNode::new(2, 45.7500, 21.2280),
        RoadNode::new(3, 45.7500, 21.2360),
        RoadNode::new(4, 45.7560, 21.2200),
        RoadNode::new(5, 45.7560, 21.2280),
        RoadNode::new(6, 45.7560, 21.2360),
    ];

    let mut bypass_slow = RoadEdge::new(3, 6, "trunk", 700.0, 70.0);
    bypass_slow.key = 1;

    let mut edges = vec![
        RoadEdge::new(1, 2, "primary", 620.0, 45.0),
        RoadEdge::new(2, 3, "primary", 620.0, 45.0),
        RoadEdge::new(4, 5, "residential", 620.0, 75.0),
        RoadEdge::new(5, 6, "residential", 620.0, 75.0),
        RoadEdge::new(1, 4, "tertiary", 667.0, 60.0),
        RoadEdge::new(2, 5, "tertiary", 667.0, 60.0),
        RoadEdge::new(3, 6, "trunk", 667.0, 35.0),
        bypass_slow,
    ];
    edges[0]
        .extra
        .insert("name".to_string(), json!("Bulevardul 16 Decembrie 1989"));
    edges[0].extra.insert("oneway".to_string(), json!(false));

    RoadNetwork::new(nodes, edges)
}

/// `bottom`: 1-2-3-6 (boulevard then bypass), `top`: 1-4-5-6 (quiet streets),
/// `middle`: 1-2-5-6
#[allow(dead_code)]
pub fn sample_routes(network: &RoadNetwork) -> Vec<CandidateRoute> {
    vec![
        CandidateRoute::from_node_path("bottom", network, vec![1, 2, 3, 6]).unwrap(),
        CandidateRoute::from_node_path("top", network, vec![1, 4, 5, 6]).unwrap(),
        CandidateRoute::from_node_path("middle", network, vec![1, 2, 5, 6]).unwrap(),
    ]
}

/// Park on the top row, cathedral at node 5, restaurants south of the boulevard
#[allow(dead_code)]
pub fn sample_pois() -> Vec<Poi> {
    vec![
        create_test_poi("Parcul Central", "parks", 45.7560, 21.2240),
        create_test_poi("Catedrala Mitropolitana", "historic", 45.7560, 21.2280),
        create_test_poi("Restaurant A", "restaurants", 45.7500 - 600.0 / M_PER_DEG_LAT, 21.2280),
        create_test_poi("Restaurant B", "restaurants", 45.7500 - 800.0 / M_PER_DEG_LAT, 21.2250),
        create_test_poi("Restaurant C", "restaurants", 45.7500 - 1200.0 / M_PER_DEG_LAT, 21.2300),
    ]
}
