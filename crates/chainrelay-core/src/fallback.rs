//! Tiered fallback after the public pool is exhausted.
//!
//! Tiers run in a fixed order: dedicated, config-supplied, network default.
//! A tier is skipped when it has no URL, when its URL was already tried in
//! this call, or when its URL belongs to the public pool.

use std::collections::HashSet;

use crate::telemetry::FallbackTier;

/// One fallback endpoint to attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTarget {
    pub tier: FallbackTier,
    pub url: String,
}

/// Candidate URLs for each tier, before deduplication.
#[derive(Debug, Clone, Default)]
pub struct FallbackCandidates {
    pub dedicated: Option<String>,
    pub config: Option<String>,
    pub network_default: Option<String>,
}

impl FallbackCandidates {
    /// Targets to attempt, in tier order, with every skip rule applied.
    pub fn plan(self, public_pool: &[String], tried: &HashSet<String>) -> Vec<FallbackTarget> {
        let mut seen: HashSet<String> = tried.clone();
        [
            (FallbackTier::Dedicated, self.dedicated),
            (FallbackTier::Config, self.config),
            (FallbackTier::NetworkDefault, self.network_default),
        ]
        .into_iter()
        .filter_map(|(tier, url)| {
            let url = url.filter(|u| !u.is_empty())?;
            if public_pool.contains(&url) || !seen.insert(url.clone()) {
                tracing::debug!(%tier, url = %url, "skipping duplicate fallback endpoint");
                return None;
            }
            Some(FallbackTarget { tier, url })
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn all_tiers_in_order() {
        let plan = FallbackCandidates {
            dedicated: s("https://d"),
            config: s("https://c"),
            network_default: s("https://n"),
        }
        .plan(&[], &HashSet::new());
        let tiers: Vec<_> = plan.iter().map(|t| t.tier).collect();
        assert_eq!(
            tiers,
            [FallbackTier::Dedicated, FallbackTier::Config, FallbackTier::NetworkDefault]
        );
    }

    #[test]
    fn missing_tiers_are_skipped() {
        let plan = FallbackCandidates {
            dedicated: None,
            config: Some(String::new()),
            network_default: s("https://n"),
        }
        .plan(&[], &HashSet::new());
        assert_eq!(
            plan,
            [FallbackTarget { tier: FallbackTier::NetworkDefault, url: "https://n".into() }]
        );
    }

    #[test]
    fn duplicates_are_skipped() {
        let pool = vec!["https://a".to_string()];
        let tried: HashSet<String> = ["https://t".to_string()].into_iter().collect();
        let plan = FallbackCandidates {
            dedicated: s("https://a"),     // in public pool
            config: s("https://t"),        // already tried
            network_default: s("https://t"),
        }
        .plan(&pool, &tried);
        assert!(plan.is_empty());

        let plan = FallbackCandidates {
            dedicated: s("https://d"),
            config: s("https://d"), // same as dedicated
            network_default: s("https://n"),
        }
        .plan(&pool, &HashSet::new());
        let urls: Vec<_> = plan.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, ["https://d", "https://n"]);
    }
}
