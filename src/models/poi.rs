use crate::error::{AppError, Result};
use crate::models::Coordinates;
use geojson::{Feature, FeatureCollection, Value as GeometryValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// POI category label. The set of categories is supplied by the POI source,
/// so this is an open string rather than a closed enum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PoiCategory(String);

impl PoiCategory {
    pub fn new(name: impl Into<String>) -> Self {
        PoiCategory(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PoiCategory {
    fn from(name: &str) -> Self {
        PoiCategory::new(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poi {
    pub category: PoiCategory,
    pub coordinates: Coordinates,
    /// Attributes not interpreted by scoring (name, osmid, tags, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Poi {
    pub fn new(category: impl Into<PoiCategory>, coordinates: Coordinates) -> Self {
        Poi {
            category: category.into(),
            coordinates,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }
}

impl TryFrom<&Feature> for Poi {
    type Error = AppError;

    fn try_from(feature: &Feature) -> Result<Self> {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| AppError::InvalidRequest("POI feature has no geometry".to_string()))?;

        let coordinates = match &geometry.value {
            GeometryValue::Point(position) if position.len() >= 2 => {
                Coordinates::new(position[1], position[0])?
            }
            _ => {
                return Err(AppError::InvalidRequest(
                    "POI geometry must be a Point".to_string(),
                ))
            }
        };

        let mut attributes = feature.properties.clone().unwrap_or_default();
        let category = match attributes.remove("category") {
            Some(Value::String(category)) if !category.is_empty() => PoiCategory::new(category),
            _ => {
                return Err(AppError::InvalidRequest(
                    "POI feature has no string 'category' property".to_string(),
                ))
            }
        };

        Ok(Poi {
            category,
            coordinates,
            attributes,
        })
    }
}

/// Convert every feature in a collection, failing on the first invalid record
pub fn pois_from_feature_collection(collection: &FeatureCollection) -> Result<Vec<Poi>> {
    collection.features.iter().map(Poi::try_from).collect()
}
