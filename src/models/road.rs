use crate::constants::{DEFAULT_EDGE_SPEED_KPH, DEFAULT_EDGE_TRAVEL_TIME_S};
use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub type NodeId = u64;

/// OSM `highway` classification relevant to congestion behavior
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    /// Any other tag value (service, unclassified, motorway_link, ...)
    Other(String),
    Unknown,
}

/// How a road class responds to time-of-day congestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionGroup {
    /// motorway, trunk, primary
    Arterial,
    /// secondary, tertiary
    Collector,
    /// residential
    Local,
    /// untracked classes
    Uncongested,
}

impl RoadClass {
    /// Single classification from a raw tag.
    ///
    /// List-valued tags resolve to the first entry naming a tracked class,
    /// falling back to the first entry; an absent or empty tag is `Unknown`.
    pub fn from_tag(tag: Option<&HighwayTag>) -> Self {
        match tag {
            None => RoadClass::Unknown,
            Some(HighwayTag::Single(value)) => Self::parse_value(value),
            Some(HighwayTag::List(values)) => {
                let parsed: Vec<RoadClass> = values.iter().map(|v| Self::parse_value(v)).collect();
                parsed
                    .iter()
                    .find(|class| class.is_tracked())
                    .or_else(|| parsed.first())
                    .cloned()
                    .unwrap_or(RoadClass::Unknown)
            }
        }
    }

    fn parse_value(value: &str) -> Self {
        value.parse().unwrap_or(RoadClass::Unknown)
    }

    fn is_tracked(&self) -> bool {
        !matches!(self, RoadClass::Other(_) | RoadClass::Unknown)
    }

    /// Unknown classifications are looked up as residential
    pub fn congestion_group(&self) -> CongestionGroup {
        match self {
            RoadClass::Motorway | RoadClass::Trunk | RoadClass::Primary => {
                CongestionGroup::Arterial
            }
            RoadClass::Secondary | RoadClass::Tertiary => CongestionGroup::Collector,
            RoadClass::Residential | RoadClass::Unknown => CongestionGroup::Local,
            RoadClass::Other(_) => CongestionGroup::Uncongested,
        }
    }

    /// Motorway-grade roads avoided by the `avoid_highways` constraint
    pub fn is_highway(&self) -> bool {
        matches!(self, RoadClass::Motorway | RoadClass::Trunk)
    }
}

impl fmt::Display for RoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadClass::Motorway => write!(f, "motorway"),
            RoadClass::Trunk => write!(f, "trunk"),
            RoadClass::Primary => write!(f, "primary"),
            RoadClass::Secondary => write!(f, "secondary"),
            RoadClass::Tertiary => write!(f, "tertiary"),
            RoadClass::Residential => write!(f, "residential"),
            RoadClass::Other(tag) => write!(f, "{}", tag),
            RoadClass::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for RoadClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "" => Err("Empty road classification".to_string()),
            "motorway" => Ok(RoadClass::Motorway),
            "trunk" => Ok(RoadClass::Trunk),
            "primary" => Ok(RoadClass::Primary),
            "secondary" => Ok(RoadClass::Secondary),
            "tertiary" => Ok(RoadClass::Tertiary),
            "residential" => Ok(RoadClass::Residential),
            "unknown" => Ok(RoadClass::Unknown),
            _ => Ok(RoadClass::Other(normalized)),
        }
    }
}

/// Raw `highway` attribute: OSM ways merged during simplification carry a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HighwayTag {
    Single(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: NodeId,
    pub lat: f64,
    pub lng: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoadNode {
    pub fn new(id: NodeId, lat: f64, lng: f64) -> Self {
        RoadNode {
            id,
            lat,
            lng,
            extra: Map::new(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Directed edge `u -> v`; `key` disambiguates parallel edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub u: NodeId,
    pub v: NodeId,
    #[serde(default)]
    pub key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highway: Option<HighwayTag>,
    /// Meters
    #[serde(default)]
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kph: Option<f64>,
    /// Base travel time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_multiplier: Option<f64>,
    /// Seconds, `travel_time * traffic_multiplier`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_travel_time: Option<f64>,
    /// Pass-through attributes (oneway, lanes, maxspeed, name, osmid, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoadEdge {
    pub fn new(u: NodeId, v: NodeId, highway: &str, length: f64, travel_time: f64) -> Self {
        RoadEdge {
            u,
            v,
            key: 0,
            highway: Some(HighwayTag::Single(highway.to_string())),
            length,
            speed_kph: None,
            travel_time: Some(travel_time),
            traffic_multiplier: None,
            current_travel_time: None,
            extra: Map::new(),
        }
    }

    pub fn road_class(&self) -> RoadClass {
        RoadClass::from_tag(self.highway.as_ref())
    }

    pub fn base_travel_time(&self) -> f64 {
        self.travel_time.unwrap_or(DEFAULT_EDGE_TRAVEL_TIME_S)
    }

    /// Traffic-adjusted travel time when annotated, base travel time otherwise
    pub fn effective_travel_time(&self) -> f64 {
        self.current_travel_time
            .unwrap_or_else(|| self.base_travel_time())
    }
}

/// Directed multigraph handed over by the network loader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    pub nodes: Vec<RoadNode>,
    pub edges: Vec<RoadEdge>,
}

/// Network-wide edge statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSummary {
    pub edge_count: usize,
    pub total_length_m: f64,
    pub mean_length_m: f64,
    pub mean_speed_kph: f64,
    pub total_travel_time_s: f64,
    pub edges_by_class: BTreeMap<String, usize>,
}

impl RoadNetwork {
    pub fn new(nodes: Vec<RoadNode>, edges: Vec<RoadEdge>) -> Self {
        RoadNetwork { nodes, edges }
    }

    pub fn node_coordinates(&self) -> HashMap<NodeId, Coordinates> {
        self.nodes.iter().map(|n| (n.id, n.coordinates())).collect()
    }

    /// Index of parallel edges by `(u, v)`
    pub fn edge_index(&self) -> HashMap<(NodeId, NodeId), Vec<&RoadEdge>> {
        let mut index: HashMap<(NodeId, NodeId), Vec<&RoadEdge>> = HashMap::new();
        for edge in &self.edges {
            index.entry((edge.u, edge.v)).or_default().push(edge);
        }
        index
    }

    pub fn is_annotated(&self) -> bool {
        !self.edges.is_empty()
            && self
                .edges
                .iter()
                .all(|e| e.current_travel_time.is_some() && e.traffic_multiplier.is_some())
    }

    pub fn summary(&self) -> EdgeSummary {
        let edge_count = self.edges.len();
        let total_length_m: f64 = self.edges.iter().map(|e| e.length).sum();
        let total_travel_time_s: f64 = self
            .edges
            .iter()
            .map(|e| e.travel_time.unwrap_or(0.0))
            .sum();

        let mut edges_by_class = BTreeMap::new();
        for edge in &self.edges {
            *edges_by_class
                .entry(edge.road_class().to_string())
                .or_insert(0) += 1;
        }

        let (mean_length_m, mean_speed_kph) = if edge_count == 0 {
            (0.0, 0.0)
        } else {
            let speed_sum: f64 = self
                .edges
                .iter()
                .map(|e| e.speed_kph.unwrap_or(DEFAULT_EDGE_SPEED_KPH))
                .sum();
            (
                total_length_m / edge_count as f64,
                speed_sum / edge_count as f64,
            )
        };

        EdgeSummary {
            edge_count,
            total_length_m,
            mean_length_m,
            mean_speed_kph,
            total_travel_time_s,
            edges_by_class,
        }
    }
}
