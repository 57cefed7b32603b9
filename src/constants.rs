//! Stable crate-wide constants.
//!
//! Values here are algorithm coefficients and default fallbacks for
//! env-var-based configuration. They should rarely change.
//! For knobs that benefit from runtime experimentation, see
//! [`Config`](crate::config::Config) instead.

// --- Traffic multiplier coefficients ---

/// Multiplier when no congestion rule applies.
pub const TRAFFIC_BASELINE: f64 = 1.0;
/// Weekday morning rush (07-09h) on arterial roads.
pub const MORNING_RUSH_ARTERIAL: f64 = 1.8;
/// Weekday morning rush (07-09h) on collector roads.
pub const MORNING_RUSH_COLLECTOR: f64 = 1.4;
/// Weekday evening rush (17-19h) on arterial roads.
pub const EVENING_RUSH_ARTERIAL: f64 = 2.0;
/// Weekday evening rush (17-19h) on collector roads.
pub const EVENING_RUSH_COLLECTOR: f64 = 1.5;
/// Weekday midday (12-16h) on arterial roads.
pub const MIDDAY_ARTERIAL: f64 = 1.3;
/// Weekend afternoon (14-18h) on collector and residential roads.
pub const WEEKEND_AFTERNOON: f64 = 1.3;
/// Forced multiplier between 22h and 05h, any day, any road.
pub const LATE_NIGHT: f64 = 0.9;

/// Default lower bound of the multiplicative jitter. Overridden by `TRAFFIC_JITTER_MIN`.
pub const DEFAULT_JITTER_MIN: f64 = 0.9;
/// Default upper bound of the multiplicative jitter. Overridden by `TRAFFIC_JITTER_MAX`.
pub const DEFAULT_JITTER_MAX: f64 = 1.1;

/// Base travel time (seconds) assumed for edges that carry none.
pub const DEFAULT_EDGE_TRAVEL_TIME_S: f64 = 60.0;
/// Speed (km/h) assumed for edges without `speed_kph` when summarizing a network.
pub const DEFAULT_EDGE_SPEED_KPH: f64 = 50.0;

// --- Proximity scoring ---

/// Distance (meters) at which the proximity score decays to zero.
/// Overridden by `PROXIMITY_MAX_DISTANCE_M`.
pub const DEFAULT_PROXIMITY_MAX_DISTANCE_M: f64 = 500.0;
/// UTM zone used for metric distances (EPSG:32635). Overridden by `PROXIMITY_UTM_ZONE`.
pub const DEFAULT_UTM_ZONE: u8 = 35;

// --- Route features ---

/// Heading change (degrees) above which a vertex counts as a turn.
pub const TURN_ANGLE_THRESHOLD_DEG: f64 = 45.0;
/// POI categories averaged into the `scenery` feature by default.
/// Overridden by `FEATURE_SCENIC_CATEGORIES`.
pub const DEFAULT_SCENIC_CATEGORIES: &[&str] = &["parks", "historic"];
/// Features where lower raw values are better; inverted during normalization.
pub const COST_FEATURES: &[&str] = &["time", "distance", "simplicity"];
/// Spread below which a feature is treated as constant across candidates.
pub const FEATURE_SPREAD_EPSILON: f64 = 1e-12;

// --- Preference profiles ---

/// Default criterion weights for a fresh profile (sum to 1.0).
pub const DEFAULT_PREFERENCE_WEIGHTS: &[(&str, f64)] = &[
    ("time", 0.4),
    ("distance", 0.2),
    ("safety", 0.15),
    ("scenery", 0.15),
    ("simplicity", 0.1),
];
/// Tolerance for the sum-to-one weight invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;
/// Default directory for persisted profiles. Overridden by `PROFILE_DIR`.
pub const DEFAULT_PROFILE_DIR: &str = "data/processed/user_profiles";

// --- Synthetic profile generation ---

/// Relative perturbation applied to archetype weights (±20%).
pub const ARCHETYPE_WEIGHT_VARIATION: f64 = 0.2;
/// Floor applied to perturbed weights before normalization.
pub const ARCHETYPE_WEIGHT_FLOOR: f64 = 0.01;
