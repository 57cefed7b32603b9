use rand::rngs::StdRng;
use rand::SeedableRng;
use routewise::config::TrafficConfig;
use routewise::models::{RoadEdge, RoadNetwork, RoadNode};
use routewise::services::traffic::{base_multiplier, TrafficModel, TrafficTime};
use serde_json::json;
use time::macros::datetime;

mod common;

#[test]
fn test_residential_edge_at_monday_rush() {
    common::init_tracing();

    let network = RoadNetwork::new(
        vec![RoadNode::new(1, 45.75, 21.22), RoadNode::new(2, 45.759, 21.22)],
        vec![RoadEdge::new(1, 2, "residential", 1000.0, 60.0)],
    );
    let monday_eight = TrafficTime::new(8, 0).unwrap();
    let model = TrafficModel::default();

    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let annotated = model.annotate(&network, monday_eight, &mut rng);
        let edge = &annotated.edges[0];

        let current = edge.current_travel_time.unwrap();
        assert!(
            (54.0 - 1e-9..=66.0 + 1e-9).contains(&current),
            "current travel time {} outside jitter range",
            current
        );
        assert_eq!(edge.travel_time, Some(60.0));
        assert_eq!(edge.length, 1000.0);
    }
}

#[test]
fn test_late_night_wins_over_rush_classes() {
    let model = TrafficModel::default();
    let wednesday_late = TrafficTime::new(23, 2).unwrap();
    let mut rng = StdRng::seed_from_u64(99);

    for tag in ["motorway", "trunk", "primary"] {
        let edge = RoadEdge::new(1, 2, tag, 100.0, 10.0);
        let class = edge.road_class();
        assert_eq!(base_multiplier(&class, wednesday_late), 0.9);

        for _ in 0..200 {
            let m = model.multiplier(&class, wednesday_late, &mut rng);
            assert!((0.81 - 1e-12..=0.99 + 1e-12).contains(&m));
        }
    }
}

#[test]
fn test_annotation_returns_new_network() {
    let network = common::sample_network();
    let before = network.clone();
    let mut rng = StdRng::seed_from_u64(4);

    let annotated = TrafficModel::default().annotate(
        &network,
        TrafficTime::from_datetime(datetime!(2024-02-05 18:15 UTC)),
        &mut rng,
    );

    assert_eq!(network, before);
    assert!(!network.is_annotated());
    assert!(annotated.is_annotated());
    assert_eq!(annotated.nodes, network.nodes);
    assert_eq!(annotated.edges.len(), network.edges.len());
}

#[test]
fn test_reannotation_does_not_accumulate() {
    let network = common::sample_network();
    let model = TrafficModel::without_jitter();
    let evening = TrafficTime::new(18, 1).unwrap();
    let mut rng = StdRng::seed_from_u64(0);

    let once = model.annotate(&network, evening, &mut rng);
    let twice = model.annotate(&once, evening, &mut rng);

    assert_eq!(once, twice);
    // Primary boulevard at evening rush: 45 s * 2.0
    assert_eq!(once.edges[0].current_travel_time, Some(90.0));
}

#[test]
fn test_seeded_config_reproduces_annotation() {
    let config = TrafficConfig {
        seed: Some(2024),
        ..TrafficConfig::default()
    };
    let model = TrafficModel::new(&config);
    let network = common::sample_network();
    let noon = TrafficTime::new(12, 3).unwrap();

    let a = model.annotate(&network, noon, &mut config.rng());
    let b = model.annotate(&network, noon, &mut config.rng());
    assert_eq!(a, b);
}

#[test]
fn test_annotated_network_keeps_pass_through_attributes() {
    let network = common::sample_network();
    let mut rng = StdRng::seed_from_u64(8);
    let annotated =
        TrafficModel::default().annotate(&network, TrafficTime::new(9, 4).unwrap(), &mut rng);

    let document = serde_json::to_value(&annotated).unwrap();
    let first = &document["edges"][0];
    assert_eq!(first["name"], json!("Bulevardul 16 Decembrie 1989"));
    assert_eq!(first["oneway"], json!(false));
    assert!(first["traffic_multiplier"].is_number());
    assert!(first["current_travel_time"].is_number());
}

#[test]
fn test_node_link_document_with_missing_attributes() {
    let document = json!({
        "nodes": [
            {"id": 1, "lat": 45.75, "lng": 21.22, "street_count": 3},
            {"id": 2, "lat": 45.76, "lng": 21.22}
        ],
        "edges": [
            {"u": 1, "v": 2, "key": 0, "length": 1100.0, "lanes": "2"},
            {"u": 2, "v": 1, "key": 0, "highway": ["tertiary", "residential"],
             "length": 1100.0, "travel_time": 70.0}
        ]
    });
    let network: RoadNetwork = serde_json::from_value(document).unwrap();
    let model = TrafficModel::without_jitter();
    let mut rng = StdRng::seed_from_u64(1);

    // Saturday afternoon: residential and collector roads slow down
    let saturday = TrafficTime::new(15, 5).unwrap();
    let annotated = model.annotate(&network, saturday, &mut rng);

    // Missing highway behaves as residential, missing travel time is 60 s
    assert_eq!(annotated.edges[0].traffic_multiplier, Some(1.3));
    assert!((annotated.edges[0].current_travel_time.unwrap() - 78.0).abs() < 1e-9);
    assert!((annotated.edges[1].current_travel_time.unwrap() - 91.0).abs() < 1e-9);
    assert_eq!(annotated.nodes[0].extra.get("street_count"), Some(&json!(3)));
}

#[test]
fn test_network_summary() {
    let summary = common::sample_network().summary();
    assert_eq!(summary.edge_count, 8);
    assert_eq!(summary.edges_by_class.get("primary"), Some(&2));
    assert_eq!(summary.edges_by_class.get("trunk"), Some(&2));
    assert_eq!(summary.mean_speed_kph, 50.0);
}
