//! Account actions
//!
//! Each action takes a JSON-schema'd input, validates it, calls the injected
//! capabilities and returns a structured [`ActionOutcome`]. Actions that move
//! funds hand a fully specified [`Operation`](crate::gateway::Operation) to the
//! ledger, which is normally wrapped in the guard pipeline.

mod harvest;
mod health;
mod optimize;
mod supply;
mod swap;
mod withdraw;

pub use harvest::{HarvestInput, HarvestReceipt, HarvestRewardsAction, HarvestedReward};
pub use health::{CheckHealthAction, CheckHealthInput};
pub use optimize::{OptimizeYieldAction, OptimizeYieldInput};
pub use supply::{SupplyAction, SupplyInput, SupplyReceipt};
pub use swap::{SwapAction, SwapInput, SwapReceipt};
pub use withdraw::{WithdrawAction, WithdrawInput, WithdrawReceipt};

use crate::config::Config;
use crate::engine::safety::{GateDecision, SafetyGate};
use crate::engine::types::Amount;
use crate::gateway::{AccountOracle, GatewayError, Ledger, MarketOracle};
use crate::narrator::Narrator;
use crate::tokens::registry;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Structured result of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Convert an action result, prefixing capability failures with the verb
    pub fn from_result<T: Serialize>(verb: &str, result: Result<T, ActionError>) -> Self {
        let value = match result {
            Ok(output) => serde_json::to_value(output),
            Err(ActionError::Rejected(reason)) => return Self::failure(reason),
            Err(ActionError::Failed(e @ crate::Error::Validation(_))) => {
                return Self::failure(e.to_string())
            }
            Err(ActionError::Failed(e)) => {
                return Self::failure(format!("Failed to {}: {}", verb, e))
            }
        };
        match value {
            Ok(value) => Self::success(value),
            Err(e) => Self::failure(format!("Failed to {}: {}", verb, e)),
        }
    }
}

/// Why an action stopped
#[derive(Debug)]
pub enum ActionError {
    /// A precondition was not met; the reason is surfaced verbatim
    Rejected(String),
    /// Input validation or a capability call failed
    Failed(crate::Error),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Rejected(reason) => f.write_str(reason),
            ActionError::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl From<crate::Error> for ActionError {
    fn from(e: crate::Error) -> Self {
        ActionError::Failed(e)
    }
}

impl From<GatewayError> for ActionError {
    fn from(e: GatewayError) -> Self {
        ActionError::Failed(e.into())
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[async_trait]
pub trait Action: Send + Sync {
    /// Name used in schemas and logs
    const NAME: &'static str;
    /// Verb used in failure messages ("Failed to <verb>: ...")
    const VERB: &'static str;

    type Input: DeserializeOwned + JsonSchema + Send + 'static;
    type Output: Serialize + Send;

    fn description(&self) -> &'static str;

    async fn run(&self, input: Self::Input) -> ActionResult<Self::Output>;

    async fn execute(&self, input: Self::Input) -> ActionOutcome {
        let outcome = ActionOutcome::from_result(Self::VERB, self.run(input).await);
        if let Some(ref error) = outcome.error {
            tracing::warn!(action = Self::NAME, error = %error, "Action failed");
        } else {
            tracing::info!(action = Self::NAME, "Action completed");
        }
        outcome
    }

    /// Execute from raw JSON arguments
    async fn execute_json(&self, args: Value) -> ActionOutcome {
        match serde_json::from_value::<Self::Input>(args) {
            Ok(input) => self.execute(input).await,
            Err(e) => ActionOutcome::failure(
                crate::Error::Validation(e.to_string()).to_string(),
            ),
        }
    }
}

/// JSON schema of an action's input
pub fn input_schema<A: Action>() -> Value {
    schemars::schema_for!(A::Input).to_value()
}

/// Capabilities every action draws from
#[derive(Clone)]
pub struct Capabilities {
    pub market: Arc<dyn MarketOracle>,
    pub account: Arc<dyn AccountOracle>,
    pub ledger: Arc<dyn Ledger>,
    /// Account the ledger acts for
    pub address: String,
}

impl Capabilities {
    /// Use one gateway for every capability
    pub fn from_gateway<G>(gateway: Arc<G>, address: impl Into<String>) -> Self
    where
        G: MarketOracle + AccountOracle + Ledger + 'static,
    {
        Self {
            market: gateway.clone(),
            account: gateway.clone(),
            ledger: gateway,
            address: address.into(),
        }
    }

    /// Replace the ledger, e.g. with a guarded one
    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = ledger;
        self
    }
}

/// Every action, wired to one set of capabilities
pub struct ActionSet {
    pub check_health: CheckHealthAction,
    pub supply: SupplyAction,
    pub withdraw: WithdrawAction,
    pub swap: SwapAction,
    pub harvest_rewards: HarvestRewardsAction,
    pub optimize_yield: OptimizeYieldAction,
}

impl ActionSet {
    pub fn new(
        capabilities: Capabilities,
        config: &Config,
        narrator: Option<Arc<dyn Narrator>>,
    ) -> Self {
        let gate = SafetyGate::new(config.risk.min_withdraw_health_factor);
        Self {
            check_health: CheckHealthAction::new(capabilities.clone()),
            supply: SupplyAction::new(capabilities.clone()),
            withdraw: WithdrawAction::new(capabilities.clone(), gate),
            swap: SwapAction::new(
                capabilities.clone(),
                gate,
                config.risk.default_slippage_percent,
            ),
            harvest_rewards: HarvestRewardsAction::new(capabilities.clone()),
            optimize_yield: OptimizeYieldAction::new(
                capabilities,
                config.market_symbols(),
                config.risk.default_risk_level,
                narrator,
            ),
        }
    }

    /// Input schemas keyed by action name
    pub fn schemas() -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            (CheckHealthAction::NAME, input_schema::<CheckHealthAction>()),
            (SupplyAction::NAME, input_schema::<SupplyAction>()),
            (WithdrawAction::NAME, input_schema::<WithdrawAction>()),
            (SwapAction::NAME, input_schema::<SwapAction>()),
            (HarvestRewardsAction::NAME, input_schema::<HarvestRewardsAction>()),
            (OptimizeYieldAction::NAME, input_schema::<OptimizeYieldAction>()),
        ])
    }
}

/// Token must be listed on the protocol
pub(crate) fn validate_token(token: &str) -> crate::Result<()> {
    if registry().contains(token) {
        Ok(())
    } else {
        Err(crate::Error::Validation(format!("unknown token '{}'", token)))
    }
}

pub(crate) fn validate_amount(amount: Amount) -> crate::Result<()> {
    if amount.is_zero() {
        Err(crate::Error::Validation(
            "amount must be greater than zero".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Sui addresses are `0x` followed by 1 to 64 hex digits
pub(crate) fn validate_address(address: &str) -> crate::Result<()> {
    let valid = address
        .strip_prefix("0x")
        .map(|hex| !hex.is_empty() && hex.len() <= 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(crate::Error::Validation(format!(
            "invalid Sui address '{}'",
            address
        )))
    }
}

/// Base units as a negative supply delta
pub(crate) fn reduction(amount: Amount) -> crate::Result<i128> {
    i128::try_from(amount.0)
        .map(|value| -value)
        .map_err(|_| crate::Error::Validation(format!("amount {} is too large", amount)))
}

/// Run the safety gate for removing `amount` of `token` from the account's supply.
///
/// Returns the current and simulated health factors when the gate allows it.
pub(crate) async fn gate_supply_reduction(
    capabilities: &Capabilities,
    gate: &SafetyGate,
    token: &str,
    amount: Amount,
) -> ActionResult<(f64, f64)> {
    let delta = reduction(amount)?;
    let address = capabilities.address.as_str();
    let (current, simulated) = futures::try_join!(
        capabilities.account.health_factor(address),
        capabilities
            .account
            .dynamic_health_factor(address, token, delta, 0, false)
    )?;

    match gate.check_withdraw(current, simulated) {
        GateDecision::Allow => Ok((current, simulated)),
        GateDecision::Reject(reason) => {
            tracing::warn!(token, current, simulated, "Safety gate rejected supply reduction");
            Err(ActionError::Rejected(reason))
        }
    }
}
