//! Yield optimization pass

use super::{validate_address, Action, ActionResult, Capabilities};
use crate::engine::ranker::OpportunityRanker;
use crate::engine::report::OptimizationReport;
use crate::engine::snapshot::PositionReader;
use crate::engine::types::RiskLevel;
use crate::narrator::Narrator;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OptimizeYieldInput {
    /// Sui address to optimize for
    pub address: String,
    /// Risk tolerance from 1 (conservative) to 5 (aggressive)
    #[serde(default)]
    pub risk_level: Option<u8>,
}

pub struct OptimizeYieldAction {
    capabilities: Capabilities,
    markets: Vec<String>,
    default_risk_level: u8,
    narrator: Option<Arc<dyn Narrator>>,
}

impl OptimizeYieldAction {
    pub fn new(
        capabilities: Capabilities,
        markets: Vec<String>,
        default_risk_level: u8,
        narrator: Option<Arc<dyn Narrator>>,
    ) -> Self {
        Self {
            capabilities,
            markets,
            default_risk_level,
            narrator,
        }
    }

    async fn narrate(&self, report: &mut OptimizationReport) {
        let Some(ref narrator) = self.narrator else {
            return;
        };
        match narrator.explain(report).await {
            Ok(text) => report.explanation = Some(text),
            Err(e) => {
                tracing::warn!(narrator = narrator.name(), error = %e, "Narration failed")
            }
        }
    }
}

#[async_trait]
impl Action for OptimizeYieldAction {
    const NAME: &'static str = "optimize_yield";
    const VERB: &'static str = "optimize yield";

    type Input = OptimizeYieldInput;
    type Output = OptimizationReport;

    fn description(&self) -> &'static str {
        "Rank NAVI supply markets and recommend actions for the account's risk level"
    }

    async fn run(&self, input: OptimizeYieldInput) -> ActionResult<OptimizationReport> {
        validate_address(&input.address)?;
        let risk_level =
            RiskLevel::try_from(input.risk_level.unwrap_or(self.default_risk_level))?;

        let caps = &self.capabilities;
        let (portfolio, opportunities) = futures::join!(
            PositionReader::read(caps.account.as_ref(), &input.address),
            OpportunityRanker::scan(caps.market.as_ref(), &self.markets)
        );
        let portfolio = portfolio?;

        let mut report =
            OptimizationReport::build(input.address, portfolio, opportunities, risk_level);
        self.narrate(&mut report).await;

        tracing::info!(
            address = %report.address,
            risk_level = risk_level.value(),
            health_factor = report.current_state.health_factor,
            opportunities = report.opportunities.len(),
            strategies = report.strategies.len(),
            "Optimization complete"
        );
        Ok(report)
    }
}
