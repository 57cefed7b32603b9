use crate::constants::*;
use crate::models::PoiCategory;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub traffic: TrafficConfig,
    pub proximity: ProximityConfig,
    pub features: FeatureConfig,
    pub profile_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficConfig {
    /// Seed for the jitter generator; `None` draws from OS entropy
    pub seed: Option<u64>,

    /// Lower bound of the multiplicative jitter
    pub jitter_min: f64,

    /// Upper bound of the multiplicative jitter
    pub jitter_max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityConfig {
    /// Distance (m) at which the proximity score reaches zero
    pub max_distance_m: f64,

    /// UTM zone used for all metric distance computations
    pub utm_zone: u8,

    /// Northern hemisphere projection (EPSG:326xx) when true, southern (EPSG:327xx) otherwise
    pub utm_north: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// POI categories averaged into the `scenery` feature
    pub scenic_categories: Vec<PoiCategory>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            seed: None,
            jitter_min: DEFAULT_JITTER_MIN,
            jitter_max: DEFAULT_JITTER_MAX,
        }
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_distance_m: DEFAULT_PROXIMITY_MAX_DISTANCE_M,
            utm_zone: DEFAULT_UTM_ZONE,
            utm_north: true,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            scenic_categories: DEFAULT_SCENIC_CATEGORIES
                .iter()
                .map(|c| PoiCategory::new(*c))
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            traffic: TrafficConfig::default(),
            proximity: ProximityConfig::default(),
            features: FeatureConfig::default(),
            profile_dir: PathBuf::from(DEFAULT_PROFILE_DIR),
        }
    }
}

impl TrafficConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let seed = match env::var("TRAFFIC_SEED") {
            Ok(raw) => Some(raw.parse().map_err(|_| "Invalid TRAFFIC_SEED")?),
            Err(_) => None,
        };

        let jitter_min: f64 = env::var("TRAFFIC_JITTER_MIN")
            .unwrap_or_else(|_| defaults.jitter_min.to_string())
            .parse()
            .map_err(|_| "Invalid TRAFFIC_JITTER_MIN")?;

        let jitter_max: f64 = env::var("TRAFFIC_JITTER_MAX")
            .unwrap_or_else(|_| defaults.jitter_max.to_string())
            .parse()
            .map_err(|_| "Invalid TRAFFIC_JITTER_MAX")?;

        if !(jitter_min > 0.0 && jitter_min <= jitter_max && jitter_max.is_finite()) {
            return Err(format!(
                "Jitter bounds must satisfy 0 < min <= max (got {} .. {})",
                jitter_min, jitter_max
            ));
        }

        Ok(Self {
            seed,
            jitter_min,
            jitter_max,
        })
    }

    /// Random source for traffic jitter: seeded when configured, entropy otherwise
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl ProximityConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let max_distance_m: f64 = env::var("PROXIMITY_MAX_DISTANCE_M")
            .unwrap_or_else(|_| defaults.max_distance_m.to_string())
            .parse()
            .map_err(|_| "Invalid PROXIMITY_MAX_DISTANCE_M")?;

        if !(max_distance_m > 0.0 && max_distance_m.is_finite()) {
            return Err("PROXIMITY_MAX_DISTANCE_M must be a positive number".to_string());
        }

        let utm_zone: u8 = env::var("PROXIMITY_UTM_ZONE")
            .unwrap_or_else(|_| defaults.utm_zone.to_string())
            .parse()
            .map_err(|_| "Invalid PROXIMITY_UTM_ZONE")?;

        if !(1..=60).contains(&utm_zone) {
            return Err("PROXIMITY_UTM_ZONE must be between 1 and 60".to_string());
        }

        let utm_north: bool = env::var("PROXIMITY_UTM_NORTH")
            .unwrap_or_else(|_| defaults.utm_north.to_string())
            .parse()
            .map_err(|_| "Invalid PROXIMITY_UTM_NORTH (use true or false)")?;

        Ok(Self {
            max_distance_m,
            utm_zone,
            utm_north,
        })
    }
}

impl FeatureConfig {
    pub fn from_env() -> Result<Self, String> {
        let scenic_categories = match env::var("FEATURE_SCENIC_CATEGORIES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(PoiCategory::new)
                .collect(),
            Err(_) => Self::default().scenic_categories,
        };

        Ok(Self { scenic_categories })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            traffic: TrafficConfig::from_env()?,
            proximity: ProximityConfig::from_env()?,
            features: FeatureConfig::from_env()?,
            profile_dir: env::var("PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_PROFILE_DIR)),
        })
    }
}
