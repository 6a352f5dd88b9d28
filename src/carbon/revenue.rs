use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

use super::CarbonTier;
use crate::config::{CarbonConfig, TierTable};
use crate::error::{NexusError, ParameterError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueBreakdown {
    pub tier: CarbonTier,
    pub co2_avoided_t: f64,
    /// tons × price
    pub gross: f64,
    pub transaction_cost: f64,
    /// Added by the social multiplier; zero when it does not apply
    pub social_bonus: f64,
    /// Revenue after transaction cost and multiplier
    pub revenue: f64,
    pub verification_cost: f64,
    /// `revenue` minus the fixed verification cost
    pub net: f64,
}

/// Prices avoided CO2 on the configured tier table.
#[derive(Debug, Clone, PartialEq)]
pub struct CarbonRevenueEngine {
    tiers: TierTable,
}

impl CarbonRevenueEngine {
    pub fn new(tiers: TierTable) -> Self {
        Self { tiers }
    }

    pub fn from_config(config: &CarbonConfig) -> Self {
        Self::new(config.tiers.clone())
    }

    /// `tons × price × (1 − transaction_cost) × multiplier`, where the
    /// multiplier applies only to PGC with a water-access improvement.
    pub fn revenue(
        &self,
        co2_avoided_t: f64,
        tier: &str,
        water_access_improvement: bool,
    ) -> Result<f64, NexusError> {
        let tier = CarbonTier::from_name(tier)?;
        Ok(self
            .breakdown(co2_avoided_t, tier, water_access_improvement)?
            .revenue)
    }

    pub fn breakdown(
        &self,
        co2_avoided_t: f64,
        tier: CarbonTier,
        water_access_improvement: bool,
    ) -> Result<RevenueBreakdown, ParameterError> {
        if !co2_avoided_t.is_finite() || co2_avoided_t < 0.0 {
            return Err(ParameterError::out_of_domain(
                "carbon",
                "co2_avoided_t",
                co2_avoided_t,
                "finite value >= 0",
            ));
        }
        let terms = tier.terms(&self.tiers);
        let gross = co2_avoided_t * terms.price_per_ton;
        let transaction_cost = gross * terms.transaction_cost;
        let after_fees = gross - transaction_cost;
        let multiplier = if tier.has_social_cobenefit() && water_access_improvement {
            terms.social_multiplier
        } else {
            1.0
        };
        let revenue = after_fees * multiplier;
        Ok(RevenueBreakdown {
            tier,
            co2_avoided_t,
            gross,
            transaction_cost,
            social_bonus: revenue - after_fees,
            revenue,
            verification_cost: terms.verification_cost,
            net: revenue - terms.verification_cost,
        })
    }

    /// Every tier, best net first.
    pub fn compare(
        &self,
        co2_avoided_t: f64,
        water_access_improvement: bool,
    ) -> Result<Vec<RevenueBreakdown>, ParameterError> {
        let all = CarbonTier::iter()
            .map(|tier| self.breakdown(co2_avoided_t, tier, water_access_improvement))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(all
            .into_iter()
            .sorted_by_key(|b| std::cmp::Reverse(OrderedFloat(b.net)))
            .collect())
    }

    pub fn best_tier(
        &self,
        co2_avoided_t: f64,
        water_access_improvement: bool,
    ) -> Result<RevenueBreakdown, ParameterError> {
        let ranked = self.compare(co2_avoided_t, water_access_improvement)?;
        let best = ranked
            .into_iter()
            .next()
            .ok_or_else(|| ParameterError::MissingTechnology("carbon tier table".into()))?;
        debug!(tier = %best.tier, net = best.net, "best carbon tier");
        Ok(best)
    }
}

/// Sums a per-snapshot kg series into tons.
pub fn avoided_tons(series_kg: &[f64]) -> f64 {
    series_kg.iter().sum::<f64>() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use proptest::prelude::*;

    fn engine() -> CarbonRevenueEngine {
        CarbonRevenueEngine::from_config(&Config::default().carbon)
    }

    #[test]
    fn pgc_with_cobenefit_beats_ccc() {
        let e = engine();
        let pgc = e.revenue(1000.0, "PGC", true).unwrap();
        let ccc = e.revenue(1000.0, "CCC", true).unwrap();
        assert!((pgc - 1000.0 * 50.0 * 0.92 * 1.3).abs() < 1e-6);
        assert!((ccc - 1000.0 * 35.0 * 0.90).abs() < 1e-6);
        assert!(pgc > ccc);
    }

    #[test]
    fn multiplier_only_for_pgc_with_flag() {
        let e = engine();
        let plain = e.breakdown(10.0, CarbonTier::Pgc, false).unwrap();
        assert_eq!(plain.social_bonus, 0.0);
        let vcc = e.breakdown(10.0, CarbonTier::Vcc, true).unwrap();
        assert_eq!(vcc.social_bonus, 0.0);
        assert!((vcc.revenue - 10.0 * 15.0 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn zero_tons_earn_nothing() {
        for tier in ["vcc", "ccc", "pgc"] {
            assert_eq!(engine().revenue(0.0, tier, true).unwrap(), 0.0);
        }
    }

    #[test]
    fn unknown_tier_and_negative_tons_are_errors() {
        let e = engine();
        assert!(matches!(
            e.revenue(5.0, "gold", false),
            Err(NexusError::UnknownTier(_))
        ));
        assert!(matches!(
            e.revenue(-1.0, "VCC", false),
            Err(NexusError::Parameter(ParameterError::OutOfDomain { .. }))
        ));
    }

    #[test]
    fn net_subtracts_verification_and_ranks() {
        let e = engine();
        // 100 t: verification dominates, VCC has the cheapest audit
        let best = e.best_tier(100.0, false).unwrap();
        assert_eq!(best.tier, CarbonTier::Vcc);
        // 10 kt: PGC with co-benefit wins
        let best = e.best_tier(10_000.0, true).unwrap();
        assert_eq!(best.tier, CarbonTier::Pgc);
        assert!((best.net - (10_000.0 * 50.0 * 0.92 * 1.3 - 12_000.0)).abs() < 1e-6);
    }

    #[test]
    fn tons_from_kg_series() {
        assert_eq!(avoided_tons(&[500.0, 250.0, 250.0]), 1.0);
        assert_eq!(avoided_tons(&[]), 0.0);
    }

    proptest! {
        #[test]
        fn revenue_is_monotonic_in_tons(
            a in 0.0f64..1e6,
            b in 0.0f64..1e6,
            flag in any::<bool>(),
        ) {
            let e = engine();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for tier in ["VCC", "CCC", "PGC"] {
                let r_lo = e.revenue(lo, tier, flag).unwrap();
                let r_hi = e.revenue(hi, tier, flag).unwrap();
                prop_assert!(r_lo <= r_hi);
                prop_assert!(r_lo >= 0.0);
            }
        }
    }
}
