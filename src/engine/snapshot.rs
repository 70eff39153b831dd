//! Market and position readers
//!
//! Per-token reads fan out concurrently. A token whose fetch fails is logged
//! and left out; it never cancels or fails its siblings.

use super::risk::{RiskAssessor, SolvencyStatus};
use super::types::{Amount, Positions, TokenSnapshot};
use crate::gateway::{AccountOracle, GatewayError, GatewayResult, MarketOracle};
use crate::tokens::{registry, QUOTE_SYMBOL};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;

/// Run one fetch per token concurrently and keep the successes, in input order.
///
/// # Arguments
/// * `what` - Label used in the failure warning
/// * `tokens` - Token symbols to fetch
/// * `fetch` - Fallible per-token fetch
pub async fn fetch_all<'a, T, F, Fut>(
    what: &str,
    tokens: &'a [String],
    fetch: F,
) -> Vec<(&'a str, T)>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let results = join_all(tokens.iter().map(|token| fetch(token.as_str()))).await;

    tokens
        .iter()
        .zip(results)
        .filter_map(|(token, result)| match result {
            Ok(value) => Some((token.as_str(), value)),
            Err(e) => {
                tracing::warn!(token = %token, what, error = %e, "Fetch failed, skipping token");
                None
            }
        })
        .collect()
}

/// Pool state and USD prices for the scanned markets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub pools: Vec<TokenSnapshot>,
    /// Price of one whole coin in the quote currency
    pub prices: BTreeMap<String, f64>,
}

pub struct MarketSnapshotReader;

impl MarketSnapshotReader {
    /// Read pools and prices for `tokens`
    pub async fn read(oracle: &dyn MarketOracle, tokens: &[String]) -> MarketSnapshot {
        let (pools, prices) = futures::join!(
            Self::pools(oracle, tokens),
            Self::prices(oracle, tokens)
        );
        MarketSnapshot { pools, prices }
    }

    pub async fn pools(oracle: &dyn MarketOracle, tokens: &[String]) -> Vec<TokenSnapshot> {
        fetch_all("pool", tokens, |token| oracle.pool(token))
            .await
            .into_iter()
            .map(|(_, pool)| pool)
            .collect()
    }

    /// Quote one whole coin of each token into the quote currency.
    ///
    /// Tokens missing from the coin registry are skipped.
    pub async fn prices(oracle: &dyn MarketOracle, tokens: &[String]) -> BTreeMap<String, f64> {
        let Some(quote_coin) = registry().get(QUOTE_SYMBOL) else {
            return BTreeMap::new();
        };
        let quote_unit = quote_coin.one() as f64;

        let quoted = fetch_all("price", tokens, |token| async move {
            if token == QUOTE_SYMBOL {
                return Ok::<f64, GatewayError>(1.0);
            }
            let coin = registry()
                .get(token)
                .ok_or_else(|| GatewayError::UnknownToken(token.to_string()))?;
            let quote = oracle
                .quote(token, QUOTE_SYMBOL, Amount(coin.one()))
                .await?;
            Ok(quote.out_amount.as_f64() / quote_unit)
        })
        .await;

        quoted
            .into_iter()
            .map(|(token, price)| (token.to_string(), price))
            .collect()
    }
}

/// An account's open positions and solvency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub positions: Positions,
    pub health_factor: f64,
    pub status: SolvencyStatus,
}

impl PortfolioSnapshot {
    pub fn new(positions: Positions, health_factor: f64) -> Self {
        let positions = positions.into_iter().filter(|(_, p)| p.is_open()).collect();
        Self {
            positions,
            health_factor,
            status: RiskAssessor::status(health_factor),
        }
    }

    /// Tokens with an outstanding borrow
    pub fn borrowing_tokens(&self) -> impl Iterator<Item = &str> {
        self.positions
            .iter()
            .filter(|(_, p)| !p.borrowed.is_zero())
            .map(|(token, _)| token.as_str())
    }
}

pub struct PositionReader;

impl PositionReader {
    /// Read positions and the health factor concurrently
    pub async fn read(
        account: &dyn AccountOracle,
        address: &str,
    ) -> GatewayResult<PortfolioSnapshot> {
        let (positions, health_factor) = futures::try_join!(
            account.positions(address),
            account.health_factor(address)
        )?;
        Ok(PortfolioSnapshot::new(positions, health_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Position, Quote};
    use crate::paper::{PaperBook, PaperMarket};
    use async_trait::async_trait;
    use futures::future::ready;

    /// Paper pools behind a router that never finds a route
    struct NoRoutes(PaperMarket);

    #[async_trait]
    impl MarketOracle for NoRoutes {
        async fn pool(&self, token: &str) -> GatewayResult<TokenSnapshot> {
            self.0.pool(token).await
        }

        async fn quote(&self, from: &str, to: &str, _amount_in: Amount) -> GatewayResult<Quote> {
            Err(GatewayError::NoRoute {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn tokens(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fetch_all_keeps_successes_in_order() {
        let symbols = tokens(&["SUI", "DOGE", "USDC"]);
        let fetched = fetch_all("pool", &symbols, |token| {
            ready(if token == "DOGE" {
                Err(GatewayError::UnknownToken(token.to_string()))
            } else {
                Ok(token.len())
            })
        })
        .await;
        assert_eq!(fetched, vec![("SUI", 3), ("USDC", 4)]);
    }

    #[tokio::test]
    async fn market_snapshot_prices_whole_coins_in_usdc() {
        let market = PaperMarket::new(PaperBook::demo("0xa11ce"));
        let snapshot =
            MarketSnapshotReader::read(&market, &tokens(&["SUI", "USDC", "WBTC", "DOGE"])).await;

        let pools: Vec<&str> = snapshot.pools.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(pools, vec!["SUI", "USDC"]);

        assert_eq!(snapshot.prices.len(), 2);
        // $2.10 less the 0.3% swap fee
        assert!((snapshot.prices["SUI"] - 2.0937).abs() < 1e-6);
        assert_eq!(snapshot.prices["USDC"], 1.0);
        assert!(!snapshot.prices.contains_key("WBTC"));
        assert!(!snapshot.prices.contains_key("DOGE"));
    }

    #[tokio::test]
    async fn failed_quotes_leave_pools_intact() {
        let oracle = NoRoutes(PaperMarket::new(PaperBook::demo("0xa11ce")));
        let snapshot = MarketSnapshotReader::read(&oracle, &tokens(&["SUI", "CETUS", "USDC"])).await;

        assert_eq!(snapshot.pools.len(), 3);
        assert_eq!(snapshot.prices.len(), 1);
        assert_eq!(snapshot.prices["USDC"], 1.0);
    }

    #[test]
    fn portfolio_drops_closed_positions() {
        let mut positions = Positions::new();
        positions.insert("SUI".to_string(), Position::default());
        positions.insert(
            "USDC".to_string(),
            Position {
                supplied: Amount(10),
                borrowed: Amount(2),
            },
        );

        let portfolio = PortfolioSnapshot::new(positions, 1.3);
        assert_eq!(portfolio.positions.len(), 1);
        assert_eq!(portfolio.status, SolvencyStatus::Caution);
        assert_eq!(portfolio.borrowing_tokens().collect::<Vec<_>>(), vec!["USDC"]);
    }
}
