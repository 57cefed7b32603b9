pub mod coordinates;
pub mod poi;
pub mod profile;
pub mod road;
pub mod route;

pub use coordinates::Coordinates;
pub use poi::{Poi, PoiCategory};
pub use profile::{PreferenceWeights, RouteChoice, RouteConstraints, UserProfile};
pub use road::{EdgeSummary, HighwayTag, RoadClass, RoadEdge, RoadNetwork, RoadNode};
pub use route::{CandidateRoute, RouteGeometry};
