//! Paper market book
//!
//! Pools, prices and a single simulated account. Every submitted operation
//! mutates the book the way the protocol would and is recorded with a
//! synthetic digest.

use crate::engine::types::{
    Amount, ClaimedReward, Position, Positions, Quote, RewardHistory, TokenSnapshot,
};
use crate::gateway::{GatewayError, GatewayResult, Operation, TxDigest};
use crate::tokens::{registry, REWARD_SYMBOL};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health factor reported for an account without debt
pub const NO_DEBT_HEALTH_FACTOR: f64 = 1.0e9;

/// Fee taken by simulated swaps
pub const SWAP_FEE: f64 = 0.003;

/// One listed market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperPool {
    pub pool: TokenSnapshot,
    /// USD price of one whole coin
    pub price_usd: f64,
    /// Share of supplied value counted as collateral
    pub liquidation_threshold: f64,
}

impl PaperPool {
    fn usd_value(&self, amount: u128) -> f64 {
        let unit = 10f64.powi(self.pool.decimals as i32);
        amount as f64 / unit * self.price_usd
    }
}

/// A recorded operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperOperation {
    pub digest: TxDigest,
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
}

/// Simulated protocol state for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperBook {
    /// Address of the simulated account
    pub address: String,
    pub pools: BTreeMap<String, PaperPool>,
    /// Coins held outside the protocol
    #[serde(default)]
    pub wallet: BTreeMap<String, Amount>,
    #[serde(default)]
    pub positions: Positions,
    /// Unclaimed rewards
    #[serde(default)]
    pub rewards: BTreeMap<String, Amount>,
    /// Claimed rewards, newest first
    #[serde(default)]
    pub claimed: Vec<ClaimedReward>,
    #[serde(default)]
    pub operations: Vec<PaperOperation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaperBook {
    /// Empty book for `address`
    pub fn new(address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            address: address.into(),
            pools: BTreeMap::new(),
            wallet: BTreeMap::new(),
            positions: Positions::new(),
            rewards: BTreeMap::new(),
            claimed: Vec::new(),
            operations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A small NAVI-like market with a funded account holding a USDC deposit,
    /// a SUI borrow and some unclaimed NAVX
    pub fn demo(address: impl Into<String>) -> Self {
        let mut book = Self::new(address);

        // symbol, base rate, boosted rate, total supply, total borrow (whole coins), price, LT
        let listings = [
            ("SUI", 0.031, 0.052, 40_000_000u128, 26_000_000u128, 2.10, 0.80),
            ("USDC", 0.048, 0.011, 90_000_000, 71_000_000, 1.00, 0.85),
            ("USDT", 0.039, 0.000, 35_000_000, 21_000_000, 1.00, 0.85),
            ("WETH", 0.012, 0.004, 4_000, 1_100, 2_600.0, 0.80),
            ("CETUS", 0.060, 0.090, 9_000_000, 7_600_000, 0.08, 0.60),
            ("NAVX", 0.000, 0.000, 0, 0, 0.05, 0.00),
        ];
        for (symbol, base, boosted, supply, borrow, price, lt) in listings {
            let decimals = registry().get(symbol).map(|c| c.decimals).unwrap_or(9);
            let unit = 10u128.pow(decimals as u32);
            book.list(
                TokenSnapshot {
                    symbol: symbol.to_string(),
                    decimals,
                    base_supply_rate: base,
                    boosted_supply_rate: boosted,
                    total_supply: Amount(supply * unit),
                    total_borrow: Amount(borrow * unit),
                    available_liquidity: Amount((supply - borrow) * unit),
                },
                price,
                lt,
            );
        }

        book.wallet.insert("SUI".to_string(), Amount(250_000_000_000));
        book.wallet.insert("USDC".to_string(), Amount(1_000_000_000));
        book.positions.insert(
            "USDC".to_string(),
            Position {
                supplied: Amount(2_000_000_000),
                borrowed: Amount::ZERO,
            },
        );
        book.positions.insert(
            "SUI".to_string(),
            Position {
                supplied: Amount::ZERO,
                borrowed: Amount(300_000_000_000),
            },
        );
        book.rewards
            .insert(REWARD_SYMBOL.to_string(), Amount(42_000_000_000));
        book
    }

    /// List or replace a market
    pub fn list(&mut self, pool: TokenSnapshot, price_usd: f64, liquidation_threshold: f64) {
        self.pools.insert(
            pool.symbol.clone(),
            PaperPool {
                pool,
                price_usd,
                liquidation_threshold,
            },
        );
    }

    fn market(&self, token: &str) -> GatewayResult<&PaperPool> {
        self.pools
            .get(token)
            .ok_or_else(|| GatewayError::UnknownToken(token.to_string()))
    }

    fn market_mut(&mut self, token: &str) -> GatewayResult<&mut PaperPool> {
        self.pools
            .get_mut(token)
            .ok_or_else(|| GatewayError::UnknownToken(token.to_string()))
    }

    pub fn pool(&self, token: &str) -> GatewayResult<TokenSnapshot> {
        self.market(token).map(|m| m.pool.clone())
    }

    pub fn is_owner(&self, address: &str) -> bool {
        self.address == address
    }

    /// Collateral-weighted supply over debt, both in USD
    pub fn health_factor(&self) -> f64 {
        health_factor_of(&self.pools, &self.positions)
    }

    /// Health factor with `token`'s supply and borrow shifted by signed deltas
    pub fn simulate_health_factor(
        &self,
        token: &str,
        delta_supply: i128,
        delta_borrow: i128,
    ) -> f64 {
        let mut positions = self.positions.clone();
        let position = positions.entry(token.to_string()).or_default();
        position.supplied = Amount(apply_delta(position.supplied.0, delta_supply));
        position.borrowed = Amount(apply_delta(position.borrowed.0, delta_borrow));
        health_factor_of(&self.pools, &positions)
    }

    /// Price-based quote with a flat fee; route is the direct pair
    pub fn quote(&self, from: &str, to: &str, amount_in: Amount) -> GatewayResult<Quote> {
        let no_route = || GatewayError::NoRoute {
            from: from.to_string(),
            to: to.to_string(),
        };
        let source = self.market(from).map_err(|_| no_route())?;
        let target = self.market(to).map_err(|_| no_route())?;
        if from == to || source.price_usd <= 0.0 || target.price_usd <= 0.0 {
            return Err(no_route());
        }

        let value_usd = source.usd_value(amount_in.0) * (1.0 - SWAP_FEE);
        let out = value_usd / target.price_usd * 10f64.powi(target.pool.decimals as i32);

        Ok(Quote {
            amount_in,
            out_amount: Amount(out.floor() as u128),
            route: vec![from.to_string(), to.to_string()],
        })
    }

    pub fn rewards_history(&self, page: u32, size: u32) -> RewardHistory {
        let start = (page.max(1) as usize - 1).saturating_mul(size as usize);
        let rewards = self
            .claimed
            .iter()
            .skip(start)
            .take(size as usize)
            .cloned()
            .collect();
        RewardHistory {
            page,
            size,
            total: self.claimed.len() as u32,
            rewards,
        }
    }

    /// Apply an operation and record it under a fresh digest
    pub fn apply(&mut self, operation: &Operation) -> GatewayResult<TxDigest> {
        match operation {
            Operation::Supply { token, amount } => self.supply(token, *amount)?,
            Operation::Withdraw { token, amount } => self.withdraw(token, *amount)?,
            Operation::Swap {
                from_token,
                to_token,
                amount_in,
                min_amount_out,
                from_collateral,
                ..
            } => self.swap(from_token, to_token, *amount_in, *min_amount_out, *from_collateral)?,
            Operation::ClaimRewards => self.claim()?,
        }

        let now = Utc::now();
        let digest = TxDigest(format!("paper-{}", uuid::Uuid::new_v4().simple()));
        self.operations.push(PaperOperation {
            digest: digest.clone(),
            operation: operation.clone(),
            timestamp: now,
        });
        self.updated_at = now;
        Ok(digest)
    }

    fn supply(&mut self, token: &str, amount: Amount) -> GatewayResult<()> {
        self.market(token)?;
        self.debit_wallet(token, amount)?;

        let market = self.market_mut(token)?;
        market.pool.total_supply.0 += amount.0;
        market.pool.available_liquidity.0 += amount.0;

        let position = self.positions.entry(token.to_string()).or_default();
        position.supplied.0 += amount.0;
        Ok(())
    }

    fn withdraw(&mut self, token: &str, amount: Amount) -> GatewayResult<()> {
        self.take_supply(token, amount)?;
        self.credit_wallet(token, amount);
        Ok(())
    }

    fn swap(
        &mut self,
        from: &str,
        to: &str,
        amount_in: Amount,
        min_amount_out: Amount,
        from_collateral: bool,
    ) -> GatewayResult<()> {
        let quote = self.quote(from, to, amount_in)?;
        if quote.out_amount < min_amount_out {
            return Err(GatewayError::Rejected(format!(
                "output {} below minimum {}",
                quote.out_amount, min_amount_out
            )));
        }

        if from_collateral {
            self.take_supply(from, amount_in)?;
        } else {
            self.debit_wallet(from, amount_in)?;
        }
        self.credit_wallet(to, quote.out_amount);
        Ok(())
    }

    fn claim(&mut self) -> GatewayResult<()> {
        let rewards: Vec<(String, Amount)> = std::mem::take(&mut self.rewards)
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .collect();
        if rewards.is_empty() {
            return Err(GatewayError::Rejected("no rewards to claim".to_string()));
        }

        let timestamp = Utc::now().timestamp_millis();
        for (reward_token, amount) in rewards {
            self.credit_wallet(&reward_token, amount);
            self.claimed.insert(
                0,
                ClaimedReward {
                    reward_token,
                    amount,
                    timestamp,
                },
            );
        }
        Ok(())
    }

    /// Remove supplied collateral and the matching pool liquidity
    fn take_supply(&mut self, token: &str, amount: Amount) -> GatewayResult<()> {
        let available = self.market(token)?.pool.available_liquidity;
        if available < amount {
            return Err(GatewayError::Rejected(format!(
                "pool {} has only {} available",
                token, available
            )));
        }

        let position = self
            .positions
            .get_mut(token)
            .filter(|p| p.supplied >= amount)
            .ok_or_else(|| {
                GatewayError::Rejected(format!("supplied {} does not cover {}", token, amount))
            })?;
        position.supplied.0 -= amount.0;
        if !position.is_open() {
            self.positions.remove(token);
        }

        let market = self.market_mut(token)?;
        market.pool.total_supply.0 = market.pool.total_supply.0.saturating_sub(amount.0);
        market.pool.available_liquidity.0 -= amount.0;
        Ok(())
    }

    fn debit_wallet(&mut self, token: &str, amount: Amount) -> GatewayResult<()> {
        let balance = self.wallet.get(token).copied().unwrap_or_default();
        if balance < amount {
            return Err(GatewayError::Rejected(format!(
                "wallet holds {} {}, need {}",
                balance, token, amount
            )));
        }
        let remaining = balance.0 - amount.0;
        if remaining == 0 {
            self.wallet.remove(token);
        } else {
            self.wallet.insert(token.to_string(), Amount(remaining));
        }
        Ok(())
    }

    fn credit_wallet(&mut self, token: &str, amount: Amount) {
        self.wallet.entry(token.to_string()).or_default().0 += amount.0;
    }
}

fn apply_delta(value: u128, delta: i128) -> u128 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

fn health_factor_of(pools: &BTreeMap<String, PaperPool>, positions: &Positions) -> f64 {
    let mut collateral = 0.0;
    let mut debt = 0.0;
    for (token, position) in positions {
        let Some(market) = pools.get(token) else {
            continue;
        };
        collateral += market.usd_value(position.supplied.0) * market.liquidation_threshold;
        debt += market.usd_value(position.borrowed.0);
    }

    if debt <= 0.0 {
        NO_DEBT_HEALTH_FACTOR
    } else {
        collateral / debt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xa11ce";

    fn listing(symbol: &str, decimals: u8, supply: u128) -> TokenSnapshot {
        TokenSnapshot {
            symbol: symbol.to_string(),
            decimals,
            base_supply_rate: 0.05,
            boosted_supply_rate: 0.01,
            total_supply: Amount(supply),
            total_borrow: Amount(0),
            available_liquidity: Amount(supply),
        }
    }

    /// 1000 USDC supplied (LT 0.85), 200 SUI borrowed at $2
    fn book() -> PaperBook {
        let mut book = PaperBook::new(ADDRESS);
        book.list(listing("USDC", 6, 10_000_000_000), 1.0, 0.85);
        book.list(listing("SUI", 9, 10_000_000_000_000), 2.0, 0.8);
        book.positions.insert(
            "USDC".to_string(),
            Position {
                supplied: Amount(1_000_000_000),
                borrowed: Amount::ZERO,
            },
        );
        book.positions.insert(
            "SUI".to_string(),
            Position {
                supplied: Amount::ZERO,
                borrowed: Amount(200_000_000_000),
            },
        );
        book
    }

    #[test]
    fn health_factor_weighs_collateral() {
        // 1000 * 0.85 / 400
        assert!((book().health_factor() - 2.125).abs() < 1e-9);
    }

    #[test]
    fn no_debt_reports_sentinel() {
        let mut book = book();
        book.positions.remove("SUI");
        assert_eq!(book.health_factor(), NO_DEBT_HEALTH_FACTOR);
    }

    #[test]
    fn simulated_withdrawal_lowers_health_factor() {
        let book = book();
        // Withdraw 600 USDC: 400 * 0.85 / 400
        let simulated = book.simulate_health_factor("USDC", -600_000_000, 0);
        assert!((simulated - 0.85).abs() < 1e-9);
        // The book itself is untouched
        assert!((book.health_factor() - 2.125).abs() < 1e-9);
    }

    #[test]
    fn withdraw_more_than_supplied_is_rejected() {
        let mut book = book();
        let result = book.apply(&Operation::Withdraw {
            token: "USDC".to_string(),
            amount: Amount(1_000_000_001),
        });
        assert!(matches!(result, Err(GatewayError::Rejected(_))));
        assert!(book.operations.is_empty());
    }

    #[test]
    fn withdraw_moves_supply_to_wallet() {
        let mut book = book();
        let digest = book
            .apply(&Operation::Withdraw {
                token: "USDC".to_string(),
                amount: Amount(250_000_000),
            })
            .unwrap();

        assert!(digest.0.starts_with("paper-"));
        assert_eq!(book.positions["USDC"].supplied, Amount(750_000_000));
        assert_eq!(book.wallet["USDC"], Amount(250_000_000));
        assert_eq!(book.pools["USDC"].pool.total_supply, Amount(9_750_000_000));
        assert_eq!(book.operations.len(), 1);
    }

    #[test]
    fn supply_requires_wallet_balance() {
        let mut book = book();
        let supply = Operation::Supply {
            token: "SUI".to_string(),
            amount: Amount(5_000_000_000),
        };
        assert!(book.apply(&supply).is_err());

        book.wallet.insert("SUI".to_string(), Amount(5_000_000_000));
        book.apply(&supply).unwrap();
        assert_eq!(book.positions["SUI"].supplied, Amount(5_000_000_000));
        assert!(!book.wallet.contains_key("SUI"));
    }

    #[test]
    fn quote_converts_through_usd() {
        let quote = book().quote("SUI", "USDC", Amount(1_000_000_000)).unwrap();
        // 1 SUI at $2 less the fee
        assert!((quote.out_amount.0 as i128 - 1_994_000).abs() <= 1);
        assert_eq!(quote.route, vec!["SUI".to_string(), "USDC".to_string()]);

        assert!(matches!(
            book().quote("SUI", "DOGE", Amount(1)),
            Err(GatewayError::NoRoute { .. })
        ));
    }

    #[test]
    fn swap_enforces_minimum_out() {
        let mut book = book();
        book.wallet.insert("SUI".to_string(), Amount(1_000_000_000));
        let swap = |min_out| Operation::Swap {
            from_token: "SUI".to_string(),
            to_token: "USDC".to_string(),
            amount_in: Amount(1_000_000_000),
            min_amount_out: Amount(min_out),
            slippage_percent: 0.5,
            route: vec![],
            from_collateral: false,
        };

        let expected = book.quote("SUI", "USDC", Amount(1_000_000_000)).unwrap();

        assert!(book.apply(&swap(2_000_000)).is_err());
        book.apply(&swap(1_990_000)).unwrap();
        assert_eq!(book.wallet["USDC"], expected.out_amount);
        assert!(!book.wallet.contains_key("SUI"));
    }

    #[test]
    fn claim_moves_rewards_into_history() {
        let mut book = book();
        book.rewards.insert("NAVX".to_string(), Amount(7_000));
        book.apply(&Operation::ClaimRewards).unwrap();

        assert!(book.rewards.is_empty());
        assert_eq!(book.wallet["NAVX"], Amount(7_000));
        let history = book.rewards_history(1, 10);
        assert_eq!(history.total, 1);
        assert_eq!(history.rewards[0].reward_token, "NAVX");

        assert!(book.apply(&Operation::ClaimRewards).is_err());
    }

    #[test]
    fn history_pages_newest_first() {
        let mut book = book();
        for (i, amount) in [10u128, 20, 30].into_iter().enumerate() {
            book.claimed.insert(
                0,
                ClaimedReward {
                    reward_token: "NAVX".to_string(),
                    amount: Amount(amount),
                    timestamp: i as i64,
                },
            );
        }
        let first = book.rewards_history(1, 2);
        assert_eq!(first.rewards.len(), 2);
        assert_eq!(first.rewards[0].amount, Amount(30));
        let second = book.rewards_history(2, 2);
        assert_eq!(second.rewards.len(), 1);
        assert_eq!(second.total, 3);
    }

    #[test]
    fn demo_book_is_consistent() {
        let book = PaperBook::demo(ADDRESS);
        assert!(book.pools.contains_key("SUI"));
        // 2000 USDC * 0.85 / (300 SUI * 2.10)
        let expected = 2_000.0 * 0.85 / (300.0 * 2.10);
        assert!((book.health_factor() - expected).abs() < 1e-9);
    }
}
