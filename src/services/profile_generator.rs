use crate::config::Config;
use crate::constants::{ARCHETYPE_WEIGHT_FLOOR, ARCHETYPE_WEIGHT_VARIATION};
use crate::error::Result;
use crate::models::{PreferenceWeights, UserProfile};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Preference archetypes used to seed synthetic user profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileArchetype {
    TimeFocused,
    SafetyFocused,
    ScenicFocused,
    SimpleFocused,
    Balanced,
}

impl ProfileArchetype {
    pub const ALL: [ProfileArchetype; 5] = [
        ProfileArchetype::TimeFocused,
        ProfileArchetype::SafetyFocused,
        ProfileArchetype::ScenicFocused,
        ProfileArchetype::SimpleFocused,
        ProfileArchetype::Balanced,
    ];

    /// (time, distance, safety, scenery, simplicity)
    fn coefficients(&self) -> [f64; 5] {
        match self {
            ProfileArchetype::TimeFocused => [0.6, 0.2, 0.1, 0.05, 0.05],
            ProfileArchetype::SafetyFocused => [0.2, 0.1, 0.5, 0.1, 0.1],
            ProfileArchetype::ScenicFocused => [0.15, 0.15, 0.2, 0.4, 0.1],
            ProfileArchetype::SimpleFocused => [0.2, 0.2, 0.2, 0.1, 0.3],
            ProfileArchetype::Balanced => [0.25, 0.2, 0.2, 0.2, 0.15],
        }
    }

    pub fn base_weights(&self) -> PreferenceWeights {
        ["time", "distance", "safety", "scenery", "simplicity"]
            .iter()
            .zip(self.coefficients())
            .map(|(name, weight)| (name.to_string(), weight))
            .collect()
    }

    /// Archetype drawn uniformly at random
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for ProfileArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileArchetype::TimeFocused => write!(f, "time_focused"),
            ProfileArchetype::SafetyFocused => write!(f, "safety_focused"),
            ProfileArchetype::ScenicFocused => write!(f, "scenic_focused"),
            ProfileArchetype::SimpleFocused => write!(f, "simple_focused"),
            ProfileArchetype::Balanced => write!(f, "balanced"),
        }
    }
}

impl FromStr for ProfileArchetype {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "time_focused" => Ok(ProfileArchetype::TimeFocused),
            "safety_focused" => Ok(ProfileArchetype::SafetyFocused),
            "scenic_focused" => Ok(ProfileArchetype::ScenicFocused),
            "simple_focused" => Ok(ProfileArchetype::SimpleFocused),
            "balanced" => Ok(ProfileArchetype::Balanced),
            _ => Err(format!("Unknown profile archetype: {}", s)),
        }
    }
}

/// Profile whose weights are the archetype's, each scaled by a random factor
/// within ±20% and floored before normalization
pub fn generate_profile<R: Rng>(archetype: ProfileArchetype, rng: &mut R) -> Result<UserProfile> {
    let weights: PreferenceWeights = archetype
        .base_weights()
        .into_iter()
        .map(|(criterion, weight)| {
            let factor = rng
                .random_range(1.0 - ARCHETYPE_WEIGHT_VARIATION..=1.0 + ARCHETYPE_WEIGHT_VARIATION);
            (criterion, (weight * factor).max(ARCHETYPE_WEIGHT_FLOOR))
        })
        .collect();

    UserProfile::create(Some(weights), None)
}

/// `count` profiles, each from a uniformly drawn archetype
pub fn generate_profiles<R: Rng>(
    count: usize,
    rng: &mut R,
) -> Result<Vec<(ProfileArchetype, UserProfile)>> {
    let profiles = (0..count)
        .map(|_| {
            let archetype = ProfileArchetype::random(rng);
            generate_profile(archetype, rng).map(|profile| (archetype, profile))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Generated {} synthetic profiles", profiles.len());
    Ok(profiles)
}

/// Write profiles to `dir` as `user_000.json`, `user_001.json`, ...
pub fn save_profiles(profiles: &[UserProfile], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let paths = profiles
        .iter()
        .enumerate()
        .map(|(i, profile)| {
            let path = dir.join(format!("user_{:03}.json", i));
            profile.save(&path).map(|_| path)
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Saved {} profiles to {}", paths.len(), dir.display());
    Ok(paths)
}

/// [`save_profiles`] into the configured `profile_dir`
pub fn save_profiles_to_config_dir(profiles: &[UserProfile], config: &Config) -> Result<Vec<PathBuf>> {
    save_profiles(profiles, &config.profile_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_archetype_weights_sum_to_one() {
        for archetype in ProfileArchetype::ALL {
            let total: f64 = archetype.base_weights().values().sum();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", archetype, total);
        }
    }

    #[test]
    fn test_archetype_names_round_trip() {
        for archetype in ProfileArchetype::ALL {
            assert_eq!(archetype.to_string().parse::<ProfileArchetype>(), Ok(archetype));
        }
        assert!("speedy".parse::<ProfileArchetype>().is_err());
    }

    #[test]
    fn test_generated_profile_stays_near_archetype() {
        let mut rng = StdRng::seed_from_u64(11);
        let profile = generate_profile(ProfileArchetype::TimeFocused, &mut rng).unwrap();

        let total: f64 = profile.preferences().values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(profile.weight("time") > 0.45);
        assert!(profile.weight("time") > profile.weight("scenery"));
        assert!(profile.preferences().values().all(|w| *w > 0.0));
    }

    #[test]
    fn test_generate_profiles_is_seeded() {
        let a = generate_profiles(10, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = generate_profiles(10, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(a.len(), 10);
        for ((arch_a, prof_a), (arch_b, prof_b)) in a.iter().zip(&b) {
            assert_eq!(arch_a, arch_b);
            assert_eq!(prof_a.preferences(), prof_b.preferences());
            assert_ne!(prof_a.user_id(), prof_b.user_id());
        }
    }

    #[test]
    fn test_save_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let profiles: Vec<UserProfile> = generate_profiles(3, &mut StdRng::seed_from_u64(1))
            .unwrap()
            .into_iter()
            .map(|(_, profile)| profile)
            .collect();

        let paths = save_profiles(&profiles, dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[2].ends_with("user_002.json"));

        let loaded = UserProfile::load(&paths[1]).unwrap();
        assert_eq!(loaded, profiles[1]);
    }
}
