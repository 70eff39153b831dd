//! Strategy generation
//!
//! Scores ranked opportunities against the account's positions and risk
//! tolerance and turns them into prioritized actions. Pure and deterministic:
//! the same inputs always produce the same list in the same order.

use super::types::{
    ActionKind, Amount, Positions, Priority, RiskLevel, StrategyAction, YieldOpportunity,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Health factor below which every supply suggestion is penalized
pub const LOW_HEALTH_PENALTY_THRESHOLD: f64 = 1.2;
const LOW_HEALTH_PENALTY: f64 = 5.0;

/// Cut-offs derived from a risk level, reported alongside the strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub risk_level: RiskLevel,
    pub min_health_factor: f64,
    pub apy_threshold: f64,
}

impl From<RiskLevel> for Thresholds {
    fn from(risk_level: RiskLevel) -> Self {
        Self {
            risk_level,
            min_health_factor: risk_level.min_health_factor(),
            apy_threshold: risk_level.apy_threshold(),
        }
    }
}

pub struct StrategyGenerator;

impl StrategyGenerator {
    /// Build the prioritized action list.
    ///
    /// # Arguments
    /// * `opportunities` - Candidate markets, in any order
    /// * `positions` - Open positions keyed by token
    /// * `health_factor` - Current protocol health factor
    /// * `risk_level` - User risk tolerance
    pub fn generate(
        opportunities: &[YieldOpportunity],
        positions: &Positions,
        health_factor: f64,
        risk_level: RiskLevel,
    ) -> Vec<StrategyAction> {
        let thresholds = Thresholds::from(risk_level);

        let mut ranked: Vec<&YieldOpportunity> = opportunities.iter().collect();
        ranked.sort_by(|a, b| descending(a.apy, b.apy));

        let mut strategies = Vec::new();
        for opportunity in ranked {
            let position = positions.get(&opportunity.token).filter(|p| p.is_open());

            if opportunity.apy >= thresholds.apy_threshold {
                let priority = Self::priority(opportunity, health_factor, risk_level);
                let action = match position {
                    None => StrategyAction {
                        token: opportunity.token.clone(),
                        kind: ActionKind::Supply {
                            amount: Amount::ZERO,
                        },
                        expected_apy: opportunity.apy,
                        current_apy: None,
                        reason: format!(
                            "High yield opportunity with {:.2}% APY",
                            opportunity.apy * 100.0
                        ),
                        priority,
                    },
                    Some(_) => StrategyAction {
                        token: opportunity.token.clone(),
                        kind: ActionKind::Supply {
                            amount: Amount::ZERO,
                        },
                        expected_apy: opportunity.apy,
                        current_apy: Some(opportunity.apy),
                        reason: "Increase position to capture higher yields".to_string(),
                        priority,
                    },
                };
                strategies.push(action);
            } else if let Some(position) = position {
                strategies.push(StrategyAction {
                    token: opportunity.token.clone(),
                    kind: ActionKind::Withdraw {
                        amount: position.supplied,
                    },
                    expected_apy: 0.0,
                    current_apy: Some(opportunity.apy),
                    reason: "Current yield below threshold, consider reallocating".to_string(),
                    priority: Priority::new(Priority::MIN),
                });
            }
        }

        strategies.sort_by(|a, b| descending(a.priority.value(), b.priority.value()));
        strategies
    }

    fn priority(
        opportunity: &YieldOpportunity,
        health_factor: f64,
        risk_level: RiskLevel,
    ) -> Priority {
        let mut score = opportunity.apy * 10.0;
        score -= opportunity.risks.len() as f64;
        if health_factor < LOW_HEALTH_PENALTY_THRESHOLD {
            score -= LOW_HEALTH_PENALTY;
        }
        score += risk_level.value() as f64 * 0.5;
        Priority::new(score)
    }
}

/// Descending total order for scores
fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
