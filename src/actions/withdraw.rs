//! Withdraw supplied coins, guarded by the safety gate

use super::{
    gate_supply_reduction, validate_amount, validate_token, Action, ActionError, ActionResult,
    Capabilities,
};
use crate::engine::safety::SafetyGate;
use crate::engine::types::Amount;
use crate::gateway::{Operation, TxDigest};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WithdrawInput {
    /// Coin symbol, e.g. "USDC"
    pub token: String,
    /// Amount in base units
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub digest: TxDigest,
    pub token: String,
    pub amount: Amount,
    pub health_factor_before: f64,
    /// Health factor the protocol predicted for after the withdrawal
    pub health_factor_after: f64,
}

pub struct WithdrawAction {
    capabilities: Capabilities,
    gate: SafetyGate,
}

impl WithdrawAction {
    pub fn new(capabilities: Capabilities, gate: SafetyGate) -> Self {
        Self { capabilities, gate }
    }
}

#[async_trait]
impl Action for WithdrawAction {
    const NAME: &'static str = "withdraw";
    const VERB: &'static str = "withdraw";

    type Input = WithdrawInput;
    type Output = WithdrawReceipt;

    fn description(&self) -> &'static str {
        "Withdraw supplied coins, refusing when the health factor would fall below the minimum"
    }

    async fn run(&self, input: WithdrawInput) -> ActionResult<WithdrawReceipt> {
        validate_token(&input.token)?;
        validate_amount(input.amount)?;

        let caps = &self.capabilities;
        let (pool, positions) = futures::join!(
            caps.market.pool(&input.token),
            caps.account.positions(&caps.address)
        );
        let position = match (pool, positions) {
            (Ok(_), Ok(positions)) => positions.get(&input.token).copied(),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(token = %input.token, error = %e, "Withdraw lookup failed");
                None
            }
        };
        let Some(position) = position else {
            return Err(ActionError::Rejected(
                "Market not available or no position found".to_string(),
            ));
        };

        if position.supplied < input.amount {
            return Err(ActionError::Rejected(
                "Insufficient balance to withdraw".to_string(),
            ));
        }

        let (before, after) =
            gate_supply_reduction(caps, &self.gate, &input.token, input.amount).await?;

        let digest = caps
            .ledger
            .submit(&Operation::Withdraw {
                token: input.token.clone(),
                amount: input.amount,
            })
            .await?;

        tracing::info!(
            token = %input.token,
            amount = %input.amount,
            health_factor_before = before,
            health_factor_after = after,
            digest = %digest,
            "Withdrew"
        );

        Ok(WithdrawReceipt {
            digest,
            token: input.token,
            amount: input.amount,
            health_factor_before: before,
            health_factor_after: after,
        })
    }
}
