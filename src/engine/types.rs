//! Domain types shared by the decision engine, the actions and the gateways.

use crate::{Error, Result};
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Protocol every opportunity is sourced from
pub const PROTOCOL_NAME: &str = "NAVI";

fn amount_schema(_: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "string",
        "pattern": "^[0-9]+$",
        "description": "Integer amount in base units"
    })
}

/// Token amount in base units, carried as a decimal string on the wire.
///
/// `Amount::ZERO` in a recommendation means the caller decides the size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(try_from = "RawAmount", into = "String")]
#[schemars(schema_with = "amount_schema")]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u128>()
            .map(Amount)
            .map_err(|e| Error::Validation(format!("invalid amount '{}': {}", s, e)))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.0.to_string()
    }
}

/// Amounts arrive either as strings (gateway, CLI) or as plain JSON integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(u64),
}

impl TryFrom<RawAmount> for Amount {
    type Error = Error;

    fn try_from(raw: RawAmount) -> Result<Self> {
        match raw {
            RawAmount::Text(s) => s.parse(),
            RawAmount::Number(n) => Ok(Amount(n as u128)),
        }
    }
}

/// Pool state for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub symbol: String,
    pub decimals: u8,
    pub base_supply_rate: f64,
    pub boosted_supply_rate: f64,
    pub total_supply: Amount,
    pub total_borrow: Amount,
    pub available_liquidity: Amount,
}

impl TokenSnapshot {
    pub fn total_apy(&self) -> f64 {
        self.base_supply_rate + self.boosted_supply_rate
    }

    /// Borrowed share of the pool; `None` for an empty pool.
    pub fn utilization(&self) -> Option<f64> {
        if self.total_supply.is_zero() {
            None
        } else {
            Some(self.total_borrow.as_f64() / self.total_supply.as_f64())
        }
    }
}

/// A user's balances in one market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub supplied: Amount,
    pub borrowed: Amount,
}

impl Position {
    /// Positions with neither supply nor debt are treated as absent
    pub fn is_open(&self) -> bool {
        !self.supplied.is_zero() || !self.borrowed.is_zero()
    }
}

pub type Positions = BTreeMap<String, Position>;

/// User-selected risk tolerance, 1 (conservative) to 5 (aggressive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskLevel(u8);

impl RiskLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Health factor floor this tolerance accepts (1.4 down to 1.0)
    pub fn min_health_factor(&self) -> f64 {
        1.5 - 0.1 * self.0 as f64
    }

    /// Minimum APY worth acting on (0.05 up to 0.13)
    pub fn apy_threshold(&self) -> f64 {
        0.03 + 0.02 * self.0 as f64
    }
}

impl TryFrom<u8> for RiskLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(RiskLevel(value))
        } else {
            Err(Error::Validation(format!(
                "risk level must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }
}

impl From<RiskLevel> for u8 {
    fn from(value: RiskLevel) -> Self {
        value.0
    }
}

/// Qualitative pool risk flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTag {
    HighUtilization,
    LowLiquidity,
}

impl RiskTag {
    pub fn describe(&self) -> &'static str {
        match self {
            RiskTag::HighUtilization => "High utilization rate",
            RiskTag::LowLiquidity => "Low liquidity",
        }
    }
}

/// Deposit bounds attached to an opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    pub min_amount: Option<Amount>,
    pub max_amount: Option<Amount>,
    pub collateral_required: bool,
}

/// A market worth considering for new or additional supply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldOpportunity {
    pub token: String,
    pub protocol: String,
    pub apy: f64,
    pub available_liquidity: Amount,
    pub reward_tokens: Vec<String>,
    pub risks: BTreeSet<RiskTag>,
    pub requirements: Option<Requirements>,
}

/// Recommendation priority, always within [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Priority(f64);

impl From<f64> for Priority {
    fn from(raw: f64) -> Self {
        Priority::new(raw)
    }
}

impl From<Priority> for f64 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl Priority {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 10.0;

    /// Clamp a raw score into range; NaN collapses to the minimum
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            return Priority(Self::MIN);
        }
        Priority(raw.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// What a recommendation asks the caller to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    Supply { amount: Amount },
    Withdraw { amount: Amount },
    Swap { to_token: String, amount: Amount },
    Claim,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Supply { .. } => "supply",
            ActionKind::Withdraw { .. } => "withdraw",
            ActionKind::Swap { .. } => "swap",
            ActionKind::Claim => "claim",
        }
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAction {
    pub token: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    pub expected_apy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_apy: Option<f64>,
    pub reason: String,
    pub priority: Priority,
}

/// Best-route swap quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub amount_in: Amount,
    pub out_amount: Amount,
    pub route: Vec<String>,
}

/// A reward claim recorded by the protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedReward {
    pub reward_token: String,
    pub amount: Amount,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// One page of claimed-reward history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardHistory {
    pub page: u32,
    pub size: u32,
    pub total: u32,
    pub rewards: Vec<ClaimedReward>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(total_supply: u128, total_borrow: u128) -> TokenSnapshot {
        TokenSnapshot {
            symbol: "SUI".to_string(),
            decimals: 9,
            base_supply_rate: 0.04,
            boosted_supply_rate: 0.02,
            total_supply: Amount(total_supply),
            total_borrow: Amount(total_borrow),
            available_liquidity: Amount(total_supply - total_borrow),
        }
    }

    #[test]
    fn amount_accepts_strings_and_numbers() {
        let from_str: Amount = serde_json::from_value(json!("1500000")).unwrap();
        let from_num: Amount = serde_json::from_value(json!(1500000)).unwrap();
        assert_eq!(from_str, Amount(1_500_000));
        assert_eq!(from_num, Amount(1_500_000));
        assert_eq!(serde_json::to_value(from_str).unwrap(), json!("1500000"));
    }

    #[test]
    fn amount_rejects_garbage() {
        assert!(serde_json::from_value::<Amount>(json!("-5")).is_err());
        assert!(serde_json::from_value::<Amount>(json!("1.5")).is_err());
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn apy_is_base_plus_boosted() {
        let pool = snapshot(10_000, 5_000);
        assert!((pool.total_apy() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn utilization_guards_empty_pool() {
        assert_eq!(snapshot(10_000, 5_000).utilization(), Some(0.5));
        assert_eq!(snapshot(0, 0).utilization(), None);
    }

    #[test]
    fn closed_position_is_not_open() {
        assert!(!Position::default().is_open());
        let borrow_only = Position {
            supplied: Amount::ZERO,
            borrowed: Amount(1),
        };
        assert!(borrow_only.is_open());
    }

    #[test]
    fn risk_level_thresholds_at_bounds() {
        let conservative = RiskLevel::try_from(1).unwrap();
        let aggressive = RiskLevel::try_from(5).unwrap();
        assert!((conservative.apy_threshold() - 0.05).abs() < 1e-9);
        assert!((conservative.min_health_factor() - 1.4).abs() < 1e-9);
        assert!((aggressive.apy_threshold() - 0.13).abs() < 1e-9);
        assert!((aggressive.min_health_factor() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn risk_level_thresholds_are_monotone() {
        let levels: Vec<RiskLevel> = (1..=5).map(|l| RiskLevel::try_from(l).unwrap()).collect();
        for pair in levels.windows(2) {
            assert!(pair[1].min_health_factor() <= pair[0].min_health_factor());
            assert!(pair[1].apy_threshold() >= pair[0].apy_threshold());
        }
    }

    #[test]
    fn risk_level_out_of_range() {
        assert!(RiskLevel::try_from(0).is_err());
        assert!(RiskLevel::try_from(6).is_err());
        assert!(serde_json::from_value::<RiskLevel>(json!(9)).is_err());
    }

    #[test]
    fn priority_is_clamped() {
        assert_eq!(Priority::new(-3.0).value(), 1.0);
        assert_eq!(Priority::new(42.0).value(), 10.0);
        assert_eq!(Priority::new(f64::NAN).value(), 1.0);
        assert_eq!(Priority::new(4.5).value(), 4.5);
    }

    #[test]
    fn strategy_action_is_tagged_by_kind() {
        let action = StrategyAction {
            token: "USDC".to_string(),
            kind: ActionKind::Withdraw {
                amount: Amount(500),
            },
            expected_apy: 0.0,
            current_apy: Some(0.02),
            reason: "Current yield below threshold, consider reallocating".to_string(),
            priority: Priority::new(1.0),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["action"], "withdraw");
        assert_eq!(value["amount"], "500");
        assert_eq!(value["priority"], 1.0);

        let back: StrategyAction = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }
}
