//! Supply coins into a lending market

use super::{validate_amount, validate_token, Action, ActionError, ActionResult, Capabilities};
use crate::engine::types::Amount;
use crate::gateway::{Operation, TxDigest};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SupplyInput {
    /// Coin symbol, e.g. "SUI"
    pub token: String,
    /// Amount in base units
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyReceipt {
    pub digest: TxDigest,
    pub token: String,
    pub amount: Amount,
    /// Pool supply APY when the operation was built
    pub supply_apy: f64,
}

pub struct SupplyAction {
    capabilities: Capabilities,
}

impl SupplyAction {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Action for SupplyAction {
    const NAME: &'static str = "supply";
    const VERB: &'static str = "supply";

    type Input = SupplyInput;
    type Output = SupplyReceipt;

    fn description(&self) -> &'static str {
        "Supply coins from the wallet into a NAVI lending pool"
    }

    async fn run(&self, input: SupplyInput) -> ActionResult<SupplyReceipt> {
        validate_token(&input.token)?;
        validate_amount(input.amount)?;

        let pool = match self.capabilities.market.pool(&input.token).await {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(token = %input.token, error = %e, "Pool lookup failed");
                return Err(ActionError::Rejected("Market not available".to_string()));
            }
        };

        let digest = self
            .capabilities
            .ledger
            .submit(&Operation::Supply {
                token: input.token.clone(),
                amount: input.amount,
            })
            .await?;

        tracing::info!(
            token = %input.token,
            amount = %input.amount,
            digest = %digest,
            "Supplied"
        );

        Ok(SupplyReceipt {
            digest,
            token: input.token,
            amount: input.amount,
            supply_apy: pool.total_apy(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{capabilities, paper};

    #[tokio::test]
    async fn supplies_from_wallet() {
        let market = paper();
        let action = SupplyAction::new(capabilities(&market));

        let receipt = action
            .run(SupplyInput {
                token: "SUI".to_string(),
                amount: Amount(100_000_000_000),
            })
            .await
            .unwrap();

        assert!(receipt.digest.0.starts_with("paper-"));
        assert!((receipt.supply_apy - 0.083).abs() < 1e-9);

        let book = market.book().await;
        assert_eq!(book.positions["SUI"].supplied, Amount(100_000_000_000));
        assert_eq!(book.wallet["SUI"], Amount(150_000_000_000));
    }

    #[tokio::test]
    async fn unlisted_market_is_not_available() {
        // WBTC is a registered coin but the demo book does not list it
        let market = paper();
        let action = SupplyAction::new(capabilities(&market));

        let outcome = action
            .execute(SupplyInput {
                token: "WBTC".to_string(),
                amount: Amount(1),
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Market not available"));
    }

    #[tokio::test]
    async fn ledger_failures_name_the_verb() {
        let market = paper();
        let action = SupplyAction::new(capabilities(&market));

        // The demo wallet holds no USDT
        let outcome = action
            .execute(SupplyInput {
                token: "USDT".to_string(),
                amount: Amount(1),
            })
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().starts_with("Failed to supply: Ledger error:"));
    }

    #[tokio::test]
    async fn rejects_zero_amount() {
        let market = paper();
        let action = SupplyAction::new(capabilities(&market));

        let outcome = action
            .execute(SupplyInput {
                token: "SUI".to_string(),
                amount: Amount::ZERO,
            })
            .await;
        assert_eq!(
            outcome.error.as_deref(),
            Some("Invalid parameters: amount must be greater than zero")
        );
        assert!(market.book().await.operations.is_empty());
    }
}
