//! Optimization policies per category and the rule table that holds them.

use crate::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Optimization policy for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Seconds a cached result stays valid (0 = never cache)
    #[serde(default)]
    pub cache_duration: u64,

    /// Whether a fresh cached result may replace execution
    #[serde(default)]
    pub skip_if_unchanged: bool,

    /// Whether operations may share a concurrent batch
    #[serde(default)]
    pub parallel_safe: bool,

    /// Whether results are memoizable
    #[serde(default)]
    pub memoize: bool,
}

impl Policy {
    const fn new(cache_duration: u64, skip_if_unchanged: bool, parallel_safe: bool, memoize: bool) -> Self {
        Self {
            cache_duration,
            skip_if_unchanged,
            parallel_safe,
            memoize,
        }
    }

    /// Cache lifetime as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_duration)
    }

    /// Whether results of this category are ever cached.
    pub fn is_cacheable(&self) -> bool {
        self.cache_duration > 0
    }

    /// Whether a cached result may be served instead of executing.
    pub fn allows_skip(&self) -> bool {
        self.skip_if_unchanged && self.is_cacheable()
    }
}

/// Canonical policies, in the order reports list them.
const CANONICAL: [(Category, Policy); 8] = [
    (Category::Data, Policy::new(300, true, true, false)),
    (Category::Computation, Policy::new(600, true, false, true)),
    (Category::Io, Policy::new(60, false, false, false)),
    (Category::Control, Policy::new(0, false, false, false)),
    (Category::Crypto, Policy::new(1800, true, true, true)),
    (Category::Network, Policy::new(120, false, true, false)),
    (Category::Ui, Policy::new(30, true, true, false)),
    (Category::Error, Policy::new(0, false, false, false)),
];

/// Read-only mapping from category to policy.
///
/// Built once and shared; categories without an entry get
/// [`Policy::default`], which never caches, skips or batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    policies: HashMap<Category, Policy>,
}

impl RuleTable {
    /// Table with the canonical per-category policies.
    pub fn canonical() -> Self {
        Self {
            policies: CANONICAL.into_iter().collect(),
        }
    }

    /// Table with exactly the given policies.
    pub fn from_policies(policies: impl IntoIterator<Item = (Category, Policy)>) -> Self {
        Self {
            policies: policies.into_iter().collect(),
        }
    }

    /// Canonical table with some categories replaced.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (Category, Policy)>) -> Self {
        let mut table = Self::canonical();
        table.policies.extend(overrides);
        table
    }

    /// Parse a JSON object of `category -> policy` overrides on top of the canonical table.
    pub fn from_json_overrides(json: &str) -> Result<Self, serde_json::Error> {
        let overrides: HashMap<Category, Policy> = serde_json::from_str(json)?;
        Ok(Self::with_overrides(overrides))
    }

    /// Policy for a category.
    pub fn policy_for(&self, category: Category) -> Policy {
        self.policies.get(&category).copied().unwrap_or_default()
    }

    /// Categories that have an explicit entry, in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = (Category, Policy)> + '_ {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.policies.get(&c).map(|p| (c, *p)))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::canonical()
    }
}
