//! Model-tier routing (spec.md §4.6.2 step 3). Routing-tier thresholds
//! were an Open Question in spec.md §9; resolved as a monotone table on
//! `pagerank_percentile`, escalated by one tier when `risk_level` is
//! high (decision recorded in `DESIGN.md`).

use semgraph_core::{ModelTier, RiskLevel};

fn base_tier(pagerank_percentile: u8) -> ModelTier {
    if pagerank_percentile >= 85 {
        ModelTier::Premium
    } else if pagerank_percentile >= 50 {
        ModelTier::Standard
    } else {
        ModelTier::Fast
    }
}

fn escalate(tier: ModelTier) -> ModelTier {
    match tier {
        ModelTier::Heuristic => ModelTier::Fast,
        ModelTier::Fast => ModelTier::Standard,
        ModelTier::Standard => ModelTier::Premium,
        ModelTier::Premium => ModelTier::Premium,
    }
}

pub fn route(pagerank_percentile: u8, risk_level: RiskLevel) -> ModelTier {
    let tier = base_tier(pagerank_percentile);
    if risk_level == RiskLevel::High {
        escalate(tier)
    } else {
        tier
    }
}

/// A concrete model name per tier. The model itself is an external
/// collaborator (spec.md §1 Non-goals); these are labels an
/// [`semgraph_core::LlmProvider`] implementation is free to map
/// however it likes.
pub fn model_name(tier: ModelTier) -> &'static str {
    match tier {
        ModelTier::Heuristic => "heuristic",
        ModelTier::Fast => "fast-tier-model",
        ModelTier::Standard => "standard-tier-model",
        ModelTier::Premium => "premium-tier-model",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_percentile_normal_risk_routes_fast() {
        assert_eq!(route(10, RiskLevel::Normal), ModelTier::Fast);
    }

    #[test]
    fn mid_percentile_routes_standard() {
        assert_eq!(route(60, RiskLevel::Normal), ModelTier::Standard);
    }

    #[test]
    fn high_percentile_routes_premium() {
        assert_eq!(route(90, RiskLevel::Normal), ModelTier::Premium);
    }

    #[test]
    fn high_risk_escalates_by_one_tier() {
        assert_eq!(route(10, RiskLevel::High), ModelTier::Standard);
        assert_eq!(route(60, RiskLevel::High), ModelTier::Premium);
    }

    #[test]
    fn premium_cannot_escalate_further() {
        assert_eq!(route(90, RiskLevel::High), ModelTier::Premium);
    }

    #[test]
    fn boundary_at_50_and_85_is_inclusive_of_the_higher_tier() {
        assert_eq!(route(49, RiskLevel::Normal), ModelTier::Fast);
        assert_eq!(route(50, RiskLevel::Normal), ModelTier::Standard);
        assert_eq!(route(84, RiskLevel::Normal), ModelTier::Standard);
        assert_eq!(route(85, RiskLevel::Normal), ModelTier::Premium);
    }
}
