use crate::constants::{DEFAULT_PREFERENCE_WEIGHTS, WEIGHT_SUM_TOLERANCE};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use time::OffsetDateTime;
use uuid::Uuid;

/// Criterion name -> weight; weights of a live profile sum to 1.0
pub type PreferenceWeights = BTreeMap<String, f64>;

/// Optional hard limits and soft flags attached to a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConstraints {
    /// Maximum acceptable travel time, minutes
    #[serde(default)]
    pub max_time: Option<f64>,
    /// Maximum acceptable route length, kilometers
    #[serde(default)]
    pub max_distance: Option<f64>,
    #[serde(default)]
    pub avoid_highways: bool,
    #[serde(default)]
    pub prefer_bike_lanes: bool,
}

/// One recorded route decision. Route payloads are opaque to the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteChoice {
    #[serde(with = "timestamp")]
    pub timestamp: OffsetDateTime,
    pub origin: Value,
    pub destination: Value,
    pub chosen_route: Value,
    pub alternatives: Vec<Value>,
    pub context: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    user_id: String,
    #[serde(with = "timestamp")]
    created_at: OffsetDateTime,
    preferences: PreferenceWeights,
    constraints: RouteConstraints,
    history: Vec<RouteChoice>,
}

/// Written as RFC 3339. Read as RFC 3339, or as ISO 8601 without an offset taken as UTC.
mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::{OffsetDateTime, PrimitiveDateTime};

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(raw, &Rfc3339).or_else(|_| {
            PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(PrimitiveDateTime::assume_utc)
        })
    }
}

pub fn default_weights() -> PreferenceWeights {
    DEFAULT_PREFERENCE_WEIGHTS
        .iter()
        .map(|(name, weight)| (name.to_string(), *weight))
        .collect()
}

/// Proportionally rescale weights so they sum to 1
pub fn normalize_weights(weights: &PreferenceWeights) -> Result<PreferenceWeights> {
    if weights.is_empty() {
        return Err(AppError::InvalidPreference(
            "at least one criterion weight is required".to_string(),
        ));
    }

    if let Some((name, weight)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(AppError::InvalidPreference(format!(
            "weight for '{}' must be a non-negative number, got {}",
            name, weight
        )));
    }

    let total: f64 = weights.values().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(AppError::InvalidPreference(format!(
            "weights must have a positive finite total, got {}",
            total
        )));
    }

    Ok(weights
        .iter()
        .map(|(name, weight)| (name.clone(), weight / total))
        .collect())
}

impl Default for UserProfile {
    fn default() -> Self {
        UserProfile {
            user_id: Uuid::new_v4().to_string(),
            created_at: OffsetDateTime::now_utc(),
            preferences: default_weights(),
            constraints: RouteConstraints::default(),
            history: Vec::new(),
        }
    }
}

impl UserProfile {
    /// Profile with default weights and no constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile with caller-supplied weights (rescaled to sum to 1) and constraints
    pub fn create(
        weights: Option<PreferenceWeights>,
        constraints: Option<RouteConstraints>,
    ) -> Result<Self> {
        let preferences = match weights {
            Some(weights) => normalize_weights(&weights)?,
            None => default_weights(),
        };

        Ok(UserProfile {
            preferences,
            constraints: constraints.unwrap_or_default(),
            ..Self::default()
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn preferences(&self) -> &PreferenceWeights {
        &self.preferences
    }

    /// Weight of a criterion, zero when the profile does not track it
    pub fn weight(&self, criterion: &str) -> f64 {
        self.preferences.get(criterion).copied().unwrap_or(0.0)
    }

    pub fn constraints(&self) -> &RouteConstraints {
        &self.constraints
    }

    pub fn history(&self) -> &[RouteChoice] {
        &self.history
    }

    /// Replace all weights with the normalized `new_weights`.
    /// On error the current weights are left untouched.
    pub fn update_weights(&mut self, new_weights: &PreferenceWeights) -> Result<()> {
        self.preferences = normalize_weights(new_weights)?;
        tracing::debug!(user_id = %self.user_id, "Updated preference weights");
        Ok(())
    }

    /// Append a route decision stamped with the current time
    pub fn record_choice(
        &mut self,
        origin: Value,
        destination: Value,
        chosen_route: Value,
        alternatives: Vec<Value>,
        context: Value,
    ) -> Result<&RouteChoice> {
        if chosen_route.is_null() {
            return Err(AppError::InvalidRequest(
                "chosen_route is required when recording a choice".to_string(),
            ));
        }

        self.history.push(RouteChoice {
            timestamp: OffsetDateTime::now_utc(),
            origin,
            destination,
            chosen_route,
            alternatives,
            context,
        });

        tracing::debug!(
            user_id = %self.user_id,
            history_len = self.history.len(),
            "Recorded route choice"
        );

        // history is non-empty after the push
        Ok(&self.history[self.history.len() - 1])
    }

    pub fn to_record(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a profile from a persisted record. Missing or invalid fields
    /// make the whole record unusable.
    pub fn from_record(record: Value) -> Result<Self> {
        let profile: UserProfile = serde_json::from_value(record)
            .map_err(|e| AppError::CorruptProfile(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(AppError::CorruptProfile("empty user_id".to_string()));
        }
        normalize_weights(&self.preferences).map_err(|e| AppError::CorruptProfile(e.to_string()))?;

        let total: f64 = self.preferences.values().sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AppError::CorruptProfile(format!(
                "preferences sum to {}, expected 1.0",
                total
            )));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(user_id = %self.user_id, path = %path.display(), "Saved profile");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let record: Value = serde_json::from_str(&data)
            .map_err(|e| AppError::CorruptProfile(format!("{}: {}", path.display(), e)))?;
        Self::from_record(record)
    }
}
