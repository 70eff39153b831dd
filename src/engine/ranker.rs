//! Opportunity ranking

use super::risk::RiskAssessor;
use super::snapshot::fetch_all;
use super::types::{Amount, Requirements, TokenSnapshot, YieldOpportunity, PROTOCOL_NAME};
use crate::gateway::{GatewayResult, MarketOracle};
use crate::tokens::REWARD_SYMBOL;
use std::future::Future;

pub struct OpportunityRanker;

impl OpportunityRanker {
    /// Describe a pool as a supply opportunity
    pub fn opportunity(pool: &TokenSnapshot) -> YieldOpportunity {
        YieldOpportunity {
            token: pool.symbol.clone(),
            protocol: PROTOCOL_NAME.to_string(),
            apy: pool.total_apy(),
            available_liquidity: pool.available_liquidity,
            reward_tokens: vec![REWARD_SYMBOL.to_string()],
            risks: RiskAssessor::pool_risks(pool),
            requirements: Some(Requirements {
                min_amount: Some(Amount::ZERO),
                max_amount: Some(pool.total_supply),
                collateral_required: false,
            }),
        }
    }

    /// Opportunities ordered by descending APY; ties keep input order
    pub fn rank<'p>(pools: impl IntoIterator<Item = &'p TokenSnapshot>) -> Vec<YieldOpportunity> {
        let mut opportunities: Vec<YieldOpportunity> =
            pools.into_iter().map(Self::opportunity).collect();
        opportunities.sort_by(|a, b| b.apy.total_cmp(&a.apy));
        opportunities
    }

    /// Fetch every token's pool concurrently and rank what came back.
    ///
    /// Failed fetches are logged and omitted.
    pub async fn rank_with<'a, F, Fut>(tokens: &'a [String], fetch: F) -> Vec<YieldOpportunity>
    where
        F: Fn(&'a str) -> Fut,
        Fut: Future<Output = GatewayResult<TokenSnapshot>>,
    {
        let pools = fetch_all("pool", tokens, fetch).await;
        let opportunities = Self::rank(pools.iter().map(|(_, pool)| pool));

        tracing::debug!(
            requested = tokens.len(),
            ranked = opportunities.len(),
            "Ranked yield opportunities"
        );
        opportunities
    }

    /// Rank the given markets using a market oracle
    pub async fn scan(oracle: &dyn MarketOracle, tokens: &[String]) -> Vec<YieldOpportunity> {
        Self::rank_with(tokens, |token| oracle.pool(token)).await
    }
}
