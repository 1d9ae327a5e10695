//! Tier Catalog: award-tier name -> point value.
//!
//! The engine only reads the catalog. An `Err` from a lookup means the
//! catalog itself is unavailable, which is distinct from `Ok(None)`
//! (the name is not in the catalog).

use crate::{error::RotationResult, types::Points};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tier {
    pub name: String,
    pub points: Points,
    /// Display ordering only.
    pub rank: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl Tier {
    pub fn new(name: &str, points: Points, rank: u32) -> Self {
        Self { name: name.to_string(), points, rank, description: None }
    }
}

pub trait TierCatalog: Send + Sync {
    fn tier(&self, name: &str) -> RotationResult<Option<Tier>>;

    /// All tiers, ordered by display rank.
    fn tiers(&self) -> RotationResult<Vec<Tier>>;
}

/// Catalog backed by the tiers listed in `RotationConfig`.
#[derive(Debug, Clone, Default)]
pub struct ConfigTierCatalog {
    tiers: HashMap<String, Tier>,
}

impl ConfigTierCatalog {
    pub fn new(tiers: impl IntoIterator<Item = Tier>) -> Self {
        Self {
            tiers: tiers.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }
}

impl TierCatalog for ConfigTierCatalog {
    fn tier(&self, name: &str) -> RotationResult<Option<Tier>> {
        Ok(self.tiers.get(name).cloned())
    }

    fn tiers(&self) -> RotationResult<Vec<Tier>> {
        let mut all: Vec<Tier> = self.tiers.values().cloned().collect();
        all.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }
}
