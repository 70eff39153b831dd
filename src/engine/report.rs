//! Reports assembled from engine outputs

use super::risk::{RiskAssessor, SolvencyStatus};
use super::snapshot::PortfolioSnapshot;
use super::strategy::{StrategyGenerator, Thresholds};
use super::types::{Amount, RiskLevel, StrategyAction, YieldOpportunity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An opportunity and whether any strategy targets it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOpportunity {
    #[serde(flatten)]
    pub opportunity: YieldOpportunity,
    pub is_recommended: bool,
}

/// Result of one optimization pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub address: String,
    pub current_state: PortfolioSnapshot,
    pub opportunities: Vec<RankedOpportunity>,
    pub strategies: Vec<StrategyAction>,
    pub thresholds: Thresholds,
    pub timestamp: DateTime<Utc>,
    /// Narrated summary, when a narrator is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl OptimizationReport {
    /// Run the strategy generator over `opportunities` for this portfolio
    pub fn build(
        address: impl Into<String>,
        current_state: PortfolioSnapshot,
        opportunities: Vec<YieldOpportunity>,
        risk_level: RiskLevel,
    ) -> Self {
        let strategies = StrategyGenerator::generate(
            &opportunities,
            &current_state.positions,
            current_state.health_factor,
            risk_level,
        );

        let targeted: BTreeSet<&str> = strategies.iter().map(|s| s.token.as_str()).collect();
        let opportunities = opportunities
            .into_iter()
            .map(|opportunity| RankedOpportunity {
                is_recommended: targeted.contains(opportunity.token.as_str()),
                opportunity,
            })
            .collect();

        Self {
            address: address.into(),
            current_state,
            opportunities,
            strategies,
            thresholds: Thresholds::from(risk_level),
            timestamp: Utc::now(),
            explanation: None,
        }
    }
}

/// A market the account borrows from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowingPosition {
    pub token: String,
    pub borrowed: Amount,
    pub supplied: Amount,
}

/// Account health summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub address: String,
    pub health_factor: f64,
    pub status: SolvencyStatus,
    pub borrowing_positions: Vec<BorrowingPosition>,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    pub fn build(address: impl Into<String>, portfolio: &PortfolioSnapshot) -> Self {
        let borrowing_positions = portfolio
            .positions
            .iter()
            .filter(|(_, p)| !p.borrowed.is_zero())
            .map(|(token, p)| BorrowingPosition {
                token: token.clone(),
                borrowed: p.borrowed,
                supplied: p.supplied,
            })
            .collect();

        Self {
            address: address.into(),
            health_factor: portfolio.health_factor,
            status: portfolio.status,
            borrowing_positions,
            recommendations: RiskAssessor::recommendations(
                portfolio.health_factor,
                portfolio.borrowing_tokens(),
            ),
        }
    }
}
