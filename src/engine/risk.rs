//! Risk assessment
//!
//! Turns pool snapshots into risk tags and a health factor into a solvency
//! status. Everything here is a pure function of already-fetched numbers.

use super::types::{RiskTag, TokenSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Health factor at or above which an account is considered healthy
pub const HEALTHY_THRESHOLD: f64 = 1.5;
/// Health factor below which an account is in danger of liquidation
pub const DANGER_THRESHOLD: f64 = 1.1;
/// Utilization above which a pool is flagged
pub const HIGH_UTILIZATION_THRESHOLD: f64 = 0.8;
/// Raw base-unit total supply below which a pool is flagged as thin
pub const LOW_LIQUIDITY_THRESHOLD: u128 = 1_000;

/// Account solvency derived from the protocol health factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolvencyStatus {
    Healthy,
    Caution,
    Danger,
}

impl fmt::Display for SolvencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolvencyStatus::Healthy => "HEALTHY",
            SolvencyStatus::Caution => "CAUTION",
            SolvencyStatus::Danger => "DANGER",
        };
        f.write_str(label)
    }
}

pub struct RiskAssessor;

impl RiskAssessor {
    /// Solvency tier for a health factor. Boundaries belong to the higher tier.
    pub fn status(health_factor: f64) -> SolvencyStatus {
        if health_factor >= HEALTHY_THRESHOLD {
            SolvencyStatus::Healthy
        } else if health_factor >= DANGER_THRESHOLD {
            SolvencyStatus::Caution
        } else {
            SolvencyStatus::Danger
        }
    }

    /// Risk flags for a pool.
    ///
    /// The liquidity check compares the raw base-unit total supply, not a
    /// decimal-normalized amount, so high-decimal coins almost never trip it.
    pub fn pool_risks(pool: &TokenSnapshot) -> BTreeSet<RiskTag> {
        let mut risks = BTreeSet::new();

        let high_utilization = match pool.utilization() {
            Some(utilization) => utilization > HIGH_UTILIZATION_THRESHOLD,
            // Borrow against an empty pool reads as unbounded utilization
            None => !pool.total_borrow.is_zero(),
        };
        if high_utilization {
            risks.insert(RiskTag::HighUtilization);
        }

        if pool.total_supply.0 < LOW_LIQUIDITY_THRESHOLD {
            risks.insert(RiskTag::LowLiquidity);
        }

        risks
    }

    /// Operator-facing advice for the account's health
    ///
    /// # Arguments
    /// * `health_factor` - Protocol-reported health factor
    /// * `borrowing_tokens` - Tokens with an outstanding borrow
    pub fn recommendations<'a>(
        health_factor: f64,
        borrowing_tokens: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        match Self::status(health_factor) {
            SolvencyStatus::Danger => recommendations.push(
                "URGENT: Health factor critically low. Consider repaying some debt or adding collateral."
                    .to_string(),
            ),
            SolvencyStatus::Caution => recommendations.push(
                "WARNING: Health factor below safe threshold. Monitor closely.".to_string(),
            ),
            SolvencyStatus::Healthy => {}
        }

        for token in borrowing_tokens {
            recommendations.push(format!(
                "{}: Consider adjusting position to improve health factor.",
                token
            ));
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Amount;

    fn pool(total_supply: u128, total_borrow: u128) -> TokenSnapshot {
        TokenSnapshot {
            symbol: "USDC".to_string(),
            decimals: 6,
            base_supply_rate: 0.05,
            boosted_supply_rate: 0.0,
            total_supply: Amount(total_supply),
            total_borrow: Amount(total_borrow),
            available_liquidity: Amount(total_supply.saturating_sub(total_borrow)),
        }
    }

    #[test]
    fn status_tiers_include_lower_boundary() {
        assert_eq!(RiskAssessor::status(2.0), SolvencyStatus::Healthy);
        assert_eq!(RiskAssessor::status(1.5), SolvencyStatus::Healthy);
        assert_eq!(RiskAssessor::status(1.4999), SolvencyStatus::Caution);
        assert_eq!(RiskAssessor::status(1.1), SolvencyStatus::Caution);
        assert_eq!(RiskAssessor::status(1.0999), SolvencyStatus::Danger);
        assert_eq!(RiskAssessor::status(0.0), SolvencyStatus::Danger);
    }

    #[test]
    fn status_sweep_matches_thresholds() {
        for step in 0..=300 {
            let h = step as f64 / 100.0;
            let status = RiskAssessor::status(h);
            assert_eq!(status == SolvencyStatus::Healthy, h >= 1.5, "h = {}", h);
            assert_eq!(
                status == SolvencyStatus::Caution,
                (1.1..1.5).contains(&h),
                "h = {}",
                h
            );
            assert_eq!(status == SolvencyStatus::Danger, h < 1.1, "h = {}", h);
        }
    }

    #[test]
    fn healthy_pool_has_no_risks() {
        assert!(RiskAssessor::pool_risks(&pool(1_000_000, 500_000)).is_empty());
    }

    #[test]
    fn flags_high_utilization() {
        let risks = RiskAssessor::pool_risks(&pool(1_000_000, 810_000));
        assert!(risks.contains(&RiskTag::HighUtilization));
        assert!(!risks.contains(&RiskTag::LowLiquidity));

        // Exactly 80% is not above the threshold
        assert!(RiskAssessor::pool_risks(&pool(1_000_000, 800_000)).is_empty());
    }

    #[test]
    fn flags_low_liquidity_on_raw_units() {
        let risks = RiskAssessor::pool_risks(&pool(999, 0));
        assert_eq!(risks.len(), 1);
        assert!(risks.contains(&RiskTag::LowLiquidity));
        assert!(RiskAssessor::pool_risks(&pool(1_000, 0)).is_empty());
    }

    #[test]
    fn empty_pool_with_debt_counts_as_high_utilization() {
        let risks = RiskAssessor::pool_risks(&pool(0, 10));
        assert!(risks.contains(&RiskTag::HighUtilization));
        assert!(risks.contains(&RiskTag::LowLiquidity));

        let empty = RiskAssessor::pool_risks(&pool(0, 0));
        assert!(!empty.contains(&RiskTag::HighUtilization));
    }

    #[test]
    fn recommendations_follow_status() {
        let urgent = RiskAssessor::recommendations(1.05, ["SUI"]);
        assert!(urgent[0].starts_with("URGENT"));
        assert_eq!(
            urgent[1],
            "SUI: Consider adjusting position to improve health factor."
        );

        let warning = RiskAssessor::recommendations(1.3, Vec::<&str>::new());
        assert_eq!(warning.len(), 1);
        assert!(warning[0].starts_with("WARNING"));

        assert!(RiskAssessor::recommendations(2.5, Vec::<&str>::new()).is_empty());
    }
}
