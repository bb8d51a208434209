//! Tier routing: picks the resource tier a task runs on.
//!
//! Each task type maps to a `{default, max, min}` triple. Critical work is
//! lifted to the max tier, background work (or anything submitted during safe
//! mode) drops to the min tier, everything else gets the default. Types with no
//! route run on tier M.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SchedulerError;
use crate::types::{Priority, ResourceTier, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRoute {
    pub default_tier: ResourceTier,
    pub max_tier: ResourceTier,
    pub min_tier: ResourceTier,
}

impl TierRoute {
    pub const fn new(default_tier: ResourceTier, max_tier: ResourceTier, min_tier: ResourceTier) -> Self {
        Self {
            default_tier,
            max_tier,
            min_tier,
        }
    }
}

fn builtin_routes() -> [(&'static str, TierRoute); 14] {
    use crate::types::ResourceTier::{L, M, S};
    [
        ("code_generation", TierRoute::new(M, L, S)),
        ("code_review", TierRoute::new(M, L, M)),
        ("summarize", TierRoute::new(S, M, S)),
        ("classify", TierRoute::new(S, S, S)),
        ("route", TierRoute::new(S, S, S)),
        ("arena_evaluate", TierRoute::new(L, L, M)),
        ("arena_screen", TierRoute::new(S, M, S)),
        ("test_generation", TierRoute::new(M, M, S)),
        ("security_scan", TierRoute::new(M, L, M)),
        ("data_processing", TierRoute::new(M, M, S)),
        ("documentation", TierRoute::new(S, M, S)),
        ("planning", TierRoute::new(M, L, M)),
        ("monte_carlo_trial", TierRoute::new(M, L, S)),
        ("pipeline_stage", TierRoute::new(M, L, M)),
    ]
}

/// Task type → tier route lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingTable {
    routes: IndexMap<String, TierRoute>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoutingTable {
    pub fn empty() -> Self {
        Self {
            routes: IndexMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let routes = builtin_routes()
            .into_iter()
            .map(|(name, route)| (name.to_string(), route))
            .collect();
        Self { routes }
    }

    /// Parse a YAML mapping of `type: {defaultTier, maxTier, minTier}`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchedulerError> {
        let routes: IndexMap<String, TierRoute> =
            serde_yaml::from_str(yaml).map_err(|e| SchedulerError::Routing(e.to_string()))?;
        Ok(Self { routes })
    }

    /// Load the built-in table and merge overrides from a YAML file on top.
    pub fn builtin_with_overrides(path: &Path) -> Result<Self, SchedulerError> {
        let contents = std::fs::read_to_string(path)?;
        let overrides = Self::from_yaml_str(&contents)?;
        let mut table = Self::builtin();
        info!(
            path = %path.display(),
            count = overrides.len(),
            "Merging tier routing overrides"
        );
        table.merge(overrides);
        Ok(table)
    }

    /// Replace entries by key; new keys are appended.
    pub fn merge(&mut self, other: RoutingTable) {
        for (name, route) in other.routes {
            self.routes.insert(name, route);
        }
    }

    pub fn insert(&mut self, task_type: impl Into<String>, route: TierRoute) {
        self.routes.insert(task_type.into(), route);
    }

    pub fn get(&self, task_type: &str) -> Option<&TierRoute> {
        self.routes.get(task_type)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route(
        &self,
        task_type: &str,
        priority: Priority,
        risk: RiskLevel,
        safe_mode: bool,
    ) -> ResourceTier {
        let Some(route) = self.routes.get(task_type) else {
            return ResourceTier::M;
        };
        if risk == RiskLevel::Critical || priority == Priority::Critical {
            route.max_tier
        } else if safe_mode || priority == Priority::Background {
            route.min_tier
        } else {
            route.default_tier
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceTier::{L, M, S};

    #[test]
    fn builtin_has_all_routes() {
        let table = RoutingTable::builtin();
        assert_eq!(table.len(), 14);
        assert_eq!(table.get("arena_evaluate"), Some(&TierRoute::new(L, L, M)));
    }

    #[test]
    fn default_tier_for_plain_submission() {
        let table = RoutingTable::builtin();
        let tier = table.route("summarize", Priority::Normal, RiskLevel::Normal, false);
        assert_eq!(tier, S);
    }

    #[test]
    fn critical_lifts_to_max() {
        let table = RoutingTable::builtin();
        assert_eq!(table.route("code_generation", Priority::Critical, RiskLevel::Normal, false), L);
        assert_eq!(table.route("summarize", Priority::Low, RiskLevel::Critical, true), M);
    }

    #[test]
    fn background_and_safe_mode_drop_to_min() {
        let table = RoutingTable::builtin();
        assert_eq!(table.route("code_generation", Priority::Background, RiskLevel::Normal, false), S);
        assert_eq!(table.route("code_review", Priority::Normal, RiskLevel::Normal, true), M);
    }

    #[test]
    fn unknown_type_is_m() {
        let table = RoutingTable::builtin();
        assert_eq!(table.route("mystery", Priority::Critical, RiskLevel::Critical, false), M);
    }

    #[test]
    fn yaml_overrides_replace_by_key() {
        let mut table = RoutingTable::builtin();
        let overrides = RoutingTable::from_yaml_str(
            "summarize:\n  defaultTier: M\n  maxTier: L\n  minTier: S\ntranslate:\n  defaultTier: S\n  maxTier: M\n  minTier: S\n",
        )
        .unwrap();
        table.merge(overrides);
        assert_eq!(table.len(), 15);
        assert_eq!(table.route("summarize", Priority::Normal, RiskLevel::Normal, false), M);
        assert_eq!(table.route("translate", Priority::High, RiskLevel::Critical, false), M);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let err = RoutingTable::from_yaml_str("summarize: [1, 2]").unwrap_err();
        assert!(matches!(err, SchedulerError::Routing(_)));
    }
}
