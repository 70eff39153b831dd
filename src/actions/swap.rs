//! Best-route token swaps

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

/// Basis of the slippage arithmetic: 1% is 1000 parts in 100_000
const SLIPPAGE_SCALE: u128 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwapInput {
    /// Coin to sell
    pub from_token: String,
    /// Coin to buy
    pub to_token: String,
    /// Amount of `from_token` in base units
    pub amount: Amount,
    /// Slippage tolerance in percent (0.5 = 0.5%)
    #[serde(default)]
    pub slippage_percent: Option<f64>,
    /// Sell supplied collateral instead of wallet coins
    #[serde(default)]
    pub from_collateral: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub digest: TxDigest,
    pub from_token: String,
    pub to_token: String,
    pub amount_in: Amount,
    pub expected_out: Amount,
    pub min_amount_out: Amount,
    pub slippage_percent: f64,
    pub route: Vec<String>,
}

/// Lowest acceptable output for a quote at the given slippage
pub fn min_amount_out(out: Amount, slippage_percent: f64) -> Amount {
    let cut = (slippage_percent * 1000.0).round().clamp(0.0, SLIPPAGE_SCALE as f64) as u128;
    let keep = SLIPPAGE_SCALE - cut;
    let value = out
        .0
        .checked_mul(keep)
        .map(|v| v / SLIPPAGE_SCALE)
        .unwrap_or_else(|| out.0 / SLIPPAGE_SCALE * keep);
    Amount(value)
}

pub struct SwapAction {
    capabilities: Capabilities,
    gate: SafetyGate,
    default_slippage_percent: f64,
}

impl SwapAction {
    pub fn new(capabilities: Capabilities, gate: SafetyGate, default_slippage_percent: f64) -> Self {
        Self {
            capabilities,
            gate,
            default_slippage_percent,
        }
    }
}

#[async_trait]
impl Action for SwapAction {
    const NAME: &'static str = "swap";
    const VERB: &'static str = "swap";

    type Input = SwapInput;
    type Output = SwapReceipt;

    fn description(&self) -> &'static str {
        "Swap one coin for another along the best quoted route with slippage protection"
    }

    async fn run(&self, input: SwapInput) -> ActionResult<SwapReceipt> {
        validate_token(&input.from_token)?;
        validate_token(&input.to_token)?;
        validate_amount(input.amount)?;
        if input.from_token == input.to_token {
            return Err(crate::Error::Validation(
                "from_token and to_token must differ".to_string(),
            )
            .into());
        }

        let slippage_percent = input
            .slippage_percent
            .unwrap_or(self.default_slippage_percent);
        if !(0.0..100.0).contains(&slippage_percent) {
            return Err(crate::Error::Validation(format!(
                "slippage_percent must be in [0, 100), got {}",
                slippage_percent
            ))
            .into());
        }

        let caps = &self.capabilities;
        let quote = match caps
            .market
            .quote(&input.from_token, &input.to_token, input.amount)
            .await
        {
            Ok(quote) if !quote.out_amount.is_zero() => quote,
            Ok(_) => return Err(ActionError::Rejected("No valid swap route found".to_string())),
            Err(e) => {
                tracing::warn!(
                    from = %input.from_token,
                    to = %input.to_token,
                    error = %e,
                    "Quote failed"
                );
                return Err(ActionError::Rejected("No valid swap route found".to_string()));
            }
        };

        if input.from_collateral {
            gate_supply_reduction(caps, &self.gate, &input.from_token, input.amount).await?;
        }

        let min_out = min_amount_out(quote.out_amount, slippage_percent);
        let digest = caps
            .ledger
            .submit(&Operation::Swap {
                from_token: input.from_token.clone(),
                to_token: input.to_token.clone(),
                amount_in: input.amount,
                min_amount_out: min_out,
                slippage_percent,
                route: quote.route.clone(),
                from_collateral: input.from_collateral,
            })
            .await?;

        tracing::info!(
            from = %input.from_token,
            to = %input.to_token,
            amount_in = %input.amount,
            expected_out = %quote.out_amount,
            min_out = %min_out,
            digest = %digest,
            "Swapped"
        );

        Ok(SwapReceipt {
            digest,
            from_token: input.from_token,
            to_token: input.to_token,
            amount_in: input.amount,
            expected_out: quote.out_amount,
            min_amount_out: min_out,
            slippage_percent,
            route: quote.route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{capabilities, gated, paper};

    fn swap(from: &str, to: &str, amount: u128) -> SwapInput {
        SwapInput {
            from_token: from.to_string(),
            to_token: to.to_string(),
            amount: Amount(amount),
            slippage_percent: None,
            from_collateral: false,
        }
    }

    #[test]
    fn min_out_applies_slippage() {
        assert_eq!(min_amount_out(Amount(1_000_000), 0.5), Amount(995_000));
        assert_eq!(min_amount_out(Amount(1_000_000), 1.0), Amount(990_000));
        assert_eq!(min_amount_out(Amount(1_000_000), 0.0), Amount(1_000_000));
        assert_eq!(min_amount_out(Amount(7), 0.5), Amount(6));
        // Large amounts fall back to dividing first
        assert!(min_amount_out(Amount(u128::MAX), 0.5).0 > 0);
    }

    #[tokio::test]
    async fn swaps_wallet_coins() {
        let market = paper();
        let action = SwapAction::new(capabilities(&market), SafetyGate::default(), 0.5);

        let receipt = action
            .run(swap("SUI", "USDC", 10_000_000_000))
            .await
            .unwrap();

        // 10 SUI at $2.10 less the 0.3% fee
        assert!(receipt.expected_out.0.abs_diff(20_937_000) <= 1);
        assert_eq!(
            receipt.min_amount_out,
            min_amount_out(receipt.expected_out, 0.5)
        );
        assert_eq!(receipt.route, vec!["SUI".to_string(), "USDC".to_string()]);

        let book = market.book().await;
        assert_eq!(book.wallet["SUI"], Amount(240_000_000_000));
        assert_eq!(
            book.wallet["USDC"],
            Amount(1_000_000_000 + receipt.expected_out.0)
        );
    }

    #[tokio::test]
    async fn unlisted_pair_has_no_route() {
        let market = paper();
        let action = SwapAction::new(capabilities(&market), SafetyGate::default(), 0.5);

        let outcome = action.execute(swap("SUI", "WBTC", 1_000)).await;
        assert_eq!(outcome.error.as_deref(), Some("No valid swap route found"));
        assert!(market.book().await.operations.is_empty());
    }

    #[tokio::test]
    async fn collateral_swap_runs_the_gate() {
        let (caps, ledger) = gated(1.3, 1.02);
        let action = SwapAction::new(caps, SafetyGate::default(), 0.5);

        let outcome = action
            .execute(SwapInput {
                from_collateral: true,
                ..swap("USDC", "SUI", 400_000_000)
            })
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("below minimum threshold"));
        assert_eq!(ledger.count(), 0);

        // Wallet swaps do not consult the gate
        let (caps, ledger) = gated(1.3, 1.02);
        let action = SwapAction::new(caps, SafetyGate::default(), 0.5);
        let outcome = action.execute(swap("USDC", "SUI", 400_000_000)).await;
        assert!(outcome.success);
        assert_eq!(ledger.count(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_parameters() {
        let market = paper();
        let action = SwapAction::new(capabilities(&market), SafetyGate::default(), 0.5);

        let same = action.execute(swap("SUI", "SUI", 1)).await;
        assert!(same.error.unwrap().starts_with("Invalid parameters"));

        let outcome = action
            .execute(SwapInput {
                slippage_percent: Some(-1.0),
                ..swap("SUI", "USDC", 1)
            })
            .await;
        assert!(outcome.error.unwrap().contains("slippage_percent"));
    }
}
