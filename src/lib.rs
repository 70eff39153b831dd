//! NAVI AutoFi
//!
//! A yield optimization and risk scoring agent for the NAVI lending protocol
//! on Sui. It:
//! - Reads pool and account state through injected oracle capabilities
//! - Scores solvency and ranks supply opportunities by APY
//! - Generates prioritized strategies for a chosen risk level
//! - Executes supply, withdraw, swap and reward-claim operations
//!
//! # Safety Model
//!
//! - Withdrawals and collateral swaps pass the health-factor safety gate
//! - Every operation passes the guard pipeline before reaching the ledger
//! - Signing stays in the gateway; the engine never holds credentials
//! - Full audit trail of all operations

pub mod actions;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod guards;
pub mod narrator;
pub mod paper;
pub mod runner;
pub mod tokens;

mod error;

// Re-export commonly used types
pub use actions::{Action, ActionOutcome, ActionSet, Capabilities};
pub use config::{Config, RpcConfig};
pub use error::{Error, Result};
pub use gateway::{AccountOracle, HttpGateway, Ledger, MarketOracle, Operation, TxDigest};
pub use paper::PaperMarket;
pub use runner::AgentRunner;
