//! Engine configuration: the tier catalog and award policies.
//!
//! Loaded from `{data_dir}/rotation.json`. Tests use
//! `RotationConfig::default_test()`.

use crate::{tier::Tier, types::Points};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What to do when a grant names a tier the catalog does not know.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTierPolicy {
    /// Reject the award with `UnknownTier`.
    #[default]
    Strict,
    /// Accept the award at `fallback_points`.
    Permissive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub unknown_tier_policy: UnknownTierPolicy,
    /// Points used when the catalog is unavailable, or under the
    /// permissive policy when the tier is unknown.
    #[serde(default = "default_fallback_points")]
    pub fallback_points: Points,
    #[serde(default = "default_history_limit")]
    pub default_history_limit: usize,
    #[serde(default = "default_top_awardees_limit")]
    pub top_awardees_limit: usize,
}

fn default_fallback_points() -> Points { 1 }
fn default_history_limit() -> usize { 50 }
fn default_top_awardees_limit() -> usize { 10 }

impl RotationConfig {
    /// Load from the data/ directory.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/rotation.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RotationConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for tier in &self.tiers {
            if tier.name.trim().is_empty() {
                anyhow::bail!("tier names must be non-empty");
            }
            if tier.points == 0 {
                anyhow::bail!("tier '{}' must carry a positive point value", tier.name);
            }
            if !seen.insert(tier.name.as_str()) {
                anyhow::bail!("duplicate tier '{}'", tier.name);
            }
        }
        if self.fallback_points == 0 {
            anyhow::bail!("fallback_points must be positive");
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in tests.
    /// Mirrors data/rotation.json.
    pub fn default_test() -> Self {
        Self {
            tiers: vec![
                Tier::new("Simple", 1, 1),
                Tier::new("Earl", 3, 2),
                Tier::new("Duke", 5, 3),
            ],
            unknown_tier_policy: UnknownTierPolicy::Strict,
            fallback_points: default_fallback_points(),
            default_history_limit: default_history_limit(),
            top_awardees_limit: default_top_awardees_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        RotationConfig::default_test().validate().unwrap();
    }

    #[test]
    fn duplicate_tier_names_rejected() {
        let mut config = RotationConfig::default_test();
        config.tiers.push(Tier::new("Earl", 4, 9));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate tier 'Earl'"), "{err}");
    }

    #[test]
    fn zero_point_tier_rejected() {
        let mut config = RotationConfig::default_test();
        config.tiers.push(Tier::new("Baron", 0, 4));
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_policy_fields_fall_back_to_defaults() {
        let json = r#"{ "tiers": [ { "name": "Simple", "points": 1, "rank": 1 } ] }"#;
        let config: RotationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.unknown_tier_policy, UnknownTierPolicy::Strict);
        assert_eq!(config.fallback_points, 1);
        assert_eq!(config.default_history_limit, 50);
        assert_eq!(config.top_awardees_limit, 10);
    }
}
