pub mod features;
pub mod profile_generator;
pub mod projection;
pub mod proximity;
pub mod traffic;

pub use features::{FeatureBatch, FeatureNormalizer, FeatureVector, RouteFeatureAggregator};
pub use profile_generator::ProfileArchetype;
pub use projection::UtmProjection;
pub use proximity::{CategoryProximity, FeatureTable, ProximityResult, ProximityScorer};
pub use traffic::{TrafficModel, TrafficTime};
