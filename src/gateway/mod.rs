//! Protocol gateway capabilities
//!
//! The decision engine never talks to the chain directly. It is handed three
//! capabilities:
//!
//! - [`MarketOracle`] for pool state and swap quotes
//! - [`AccountOracle`] for positions, health factors and rewards
//! - [`Ledger`] for submitting a built [`Operation`]
//!
//! [`HttpGateway`] implements all three against the protocol sidecar, and
//! [`crate::paper::PaperMarket`] implements them in memory for dry runs.

mod http;

pub use http::HttpGateway;

use crate::engine::types::{Amount, Positions, Quote, RewardHistory, TokenSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Error type for gateway operations
#[derive(Debug)]
pub enum GatewayError {
    /// HTTP request failed
    HttpError(String),
    /// Gateway answered with a non-success status
    Status { code: u16, message: String },
    /// Token is not listed on the protocol
    UnknownToken(String),
    /// No route between two tokens
    NoRoute { from: String, to: String },
    /// Operation could not be applied
    Rejected(String),
    /// A guard refused to forward the operation
    Blocked(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            GatewayError::Status { code, message } => {
                write!(f, "gateway returned {}: {}", code, message)
            }
            GatewayError::UnknownToken(token) => write!(f, "unknown token: {}", token),
            GatewayError::NoRoute { from, to } => write!(f, "no route from {} to {}", from, to),
            GatewayError::Rejected(msg) => write!(f, "operation rejected: {}", msg),
            GatewayError::Blocked(msg) => write!(f, "operation blocked: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for crate::Error {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Rejected(msg) => crate::Error::Ledger(msg),
            GatewayError::Blocked(msg) => crate::Error::Blocked(msg),
            other => crate::Error::Oracle(other.to_string()),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Market-wide reads
#[async_trait]
pub trait MarketOracle: Send + Sync {
    /// Current pool state for a token
    async fn pool(&self, token: &str) -> GatewayResult<TokenSnapshot>;

    /// Best-route quote for swapping `amount_in` base units of `from` into `to`
    async fn quote(&self, from: &str, to: &str, amount_in: Amount) -> GatewayResult<Quote>;
}

/// Per-account reads
#[async_trait]
pub trait AccountOracle: Send + Sync {
    /// Protocol-reported health factor
    async fn health_factor(&self, address: &str) -> GatewayResult<f64>;

    /// Health factor after hypothetically changing supply/borrow in `token`.
    ///
    /// Deltas are in base units. `is_increase = false` treats both deltas as
    /// reductions regardless of their sign.
    async fn dynamic_health_factor(
        &self,
        address: &str,
        token: &str,
        delta_supply: i128,
        delta_borrow: i128,
        is_increase: bool,
    ) -> GatewayResult<f64>;

    /// All markets the address has touched; closed entries may be included
    async fn positions(&self, address: &str) -> GatewayResult<Positions>;

    /// Unclaimed rewards per reward token
    async fn available_rewards(&self, address: &str) -> GatewayResult<BTreeMap<String, Amount>>;

    /// Claimed-reward history, newest first
    async fn rewards_history(
        &self,
        address: &str,
        page: u32,
        size: u32,
    ) -> GatewayResult<RewardHistory>;
}

/// A fully specified operation for the execution sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Supply {
        token: String,
        amount: Amount,
    },
    Withdraw {
        token: String,
        amount: Amount,
    },
    Swap {
        from_token: String,
        to_token: String,
        amount_in: Amount,
        min_amount_out: Amount,
        slippage_percent: f64,
        route: Vec<String>,
        /// Spend supplied collateral instead of wallet coins
        #[serde(default)]
        from_collateral: bool,
    },
    ClaimRewards,
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Supply { .. } => "supply",
            Operation::Withdraw { .. } => "withdraw",
            Operation::Swap { .. } => "swap",
            Operation::ClaimRewards => "claim_rewards",
        }
    }
}

/// Transaction identifier returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxDigest(pub String);

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution sink: signs and submits operations on the account's behalf
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn submit(&self, operation: &Operation) -> GatewayResult<TxDigest>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_is_tagged_by_kind() {
        let op = Operation::Withdraw {
            token: "USDC".to_string(),
            amount: Amount(500),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"kind": "withdraw", "token": "USDC", "amount": "500"})
        );
        assert_eq!(op.kind(), "withdraw");
        assert_eq!(
            serde_json::to_value(Operation::ClaimRewards).unwrap(),
            json!({"kind": "claim_rewards"})
        );
    }

    #[test]
    fn rejection_maps_to_ledger_error() {
        let err: crate::Error = GatewayError::Rejected("insufficient gas".to_string()).into();
        assert!(matches!(err, crate::Error::Ledger(_)));

        let err: crate::Error = GatewayError::Blocked("policy".to_string()).into();
        assert!(matches!(err, crate::Error::Blocked(_)));

        let err: crate::Error = GatewayError::UnknownToken("DOGE".to_string()).into();
        assert!(matches!(err, crate::Error::Oracle(_)));
    }
}
