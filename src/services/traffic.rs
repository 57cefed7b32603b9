use crate::config::TrafficConfig;
use crate::constants::*;
use crate::error::{AppError, Result};
use crate::models::road::CongestionGroup;
use crate::models::{RoadClass, RoadEdge, RoadNetwork};
use rand::Rng;
use time::OffsetDateTime;
use tracing::{debug, instrument};

/// Hour of day and day of week (Monday = 0) the traffic model is evaluated at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficTime {
    hour: u8,
    weekday: u8,
}

impl TrafficTime {
    pub fn new(hour: u8, weekday: u8) -> Result<Self> {
        if hour > 23 {
            return Err(AppError::InvalidRequest(format!(
                "hour must be between 0 and 23, got {}",
                hour
            )));
        }
        if weekday > 6 {
            return Err(AppError::InvalidRequest(format!(
                "weekday must be between 0 (Monday) and 6 (Sunday), got {}",
                weekday
            )));
        }
        Ok(TrafficTime { hour, weekday })
    }

    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        TrafficTime {
            hour: datetime.hour(),
            weekday: datetime.weekday().number_days_from_monday(),
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn weekday(&self) -> u8 {
        self.weekday
    }

    pub fn is_weekend(&self) -> bool {
        self.weekday >= 5
    }

    pub fn is_late_night(&self) -> bool {
        self.hour >= 22 || self.hour <= 5
    }
}

/// Congestion multiplier before jitter.
///
/// Weekday bands are checked in order (morning rush, evening rush, midday)
/// and the first matching band decides. The late-night rule overrides
/// everything else.
pub fn base_multiplier(class: &RoadClass, time: TrafficTime) -> f64 {
    if time.is_late_night() {
        return LATE_NIGHT;
    }

    let group = class.congestion_group();
    let hour = time.hour();

    if time.is_weekend() {
        return match group {
            CongestionGroup::Collector | CongestionGroup::Local if (14..=18).contains(&hour) => {
                WEEKEND_AFTERNOON
            }
            _ => TRAFFIC_BASELINE,
        };
    }

    match hour {
        7..=9 => match group {
            CongestionGroup::Arterial => MORNING_RUSH_ARTERIAL,
            CongestionGroup::Collector => MORNING_RUSH_COLLECTOR,
            _ => TRAFFIC_BASELINE,
        },
        17..=19 => match group {
            CongestionGroup::Arterial => EVENING_RUSH_ARTERIAL,
            CongestionGroup::Collector => EVENING_RUSH_COLLECTOR,
            _ => TRAFFIC_BASELINE,
        },
        12..=16 => match group {
            CongestionGroup::Arterial => MIDDAY_ARTERIAL,
            _ => TRAFFIC_BASELINE,
        },
        _ => TRAFFIC_BASELINE,
    }
}

/// Time-of-day congestion model with multiplicative jitter
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficModel {
    jitter_min: f64,
    jitter_max: f64,
}

impl Default for TrafficModel {
    fn default() -> Self {
        TrafficModel {
            jitter_min: DEFAULT_JITTER_MIN,
            jitter_max: DEFAULT_JITTER_MAX,
        }
    }
}

impl TrafficModel {
    pub fn new(config: &TrafficConfig) -> Self {
        TrafficModel {
            jitter_min: config.jitter_min,
            jitter_max: config.jitter_max,
        }
    }

    /// Model that returns the base multiplier unchanged
    pub fn without_jitter() -> Self {
        TrafficModel {
            jitter_min: 1.0,
            jitter_max: 1.0,
        }
    }

    pub fn multiplier<R: Rng>(
        &self,
        class: &RoadClass,
        time: TrafficTime,
        rng: &mut R,
    ) -> f64 {
        let jitter = if self.jitter_min < self.jitter_max {
            rng.random_range(self.jitter_min..=self.jitter_max)
        } else {
            self.jitter_min
        };
        base_multiplier(class, time) * jitter
    }

    /// Copy of `edge` with its traffic state recomputed from the base travel time
    pub fn annotate_edge<R: Rng>(
        &self,
        edge: &RoadEdge,
        time: TrafficTime,
        rng: &mut R,
    ) -> RoadEdge {
        let multiplier = self.multiplier(&edge.road_class(), time, rng);
        RoadEdge {
            traffic_multiplier: Some(multiplier),
            current_travel_time: Some(edge.base_travel_time() * multiplier),
            ..edge.clone()
        }
    }

    /// New network whose edges carry `traffic_multiplier` and `current_travel_time`.
    /// The input network is left untouched.
    #[instrument(skip(self, network, rng), fields(edges = network.edges.len()))]
    pub fn annotate<R: Rng>(
        &self,
        network: &RoadNetwork,
        time: TrafficTime,
        rng: &mut R,
    ) -> RoadNetwork {
        let edges: Vec<RoadEdge> = network
            .edges
            .iter()
            .map(|edge| self.annotate_edge(edge, time, rng))
            .collect();

        if !edges.is_empty() {
            let mean = edges
                .iter()
                .filter_map(|e| e.traffic_multiplier)
                .sum::<f64>()
                / edges.len() as f64;
            debug!(
                hour = time.hour(),
                weekday = time.weekday(),
                "Annotated network, mean multiplier {:.2}x",
                mean
            );
        }

        RoadNetwork {
            nodes: network.nodes.clone(),
            edges,
        }
    }
}
