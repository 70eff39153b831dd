//! Claim accrued protocol rewards

use super::{validate_address, Action, ActionError, ActionResult, Capabilities};
use crate::engine::types::{Amount, RewardHistory};
use crate::gateway::{Operation, TxDigest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const HISTORY_PAGE: u32 = 1;
const HISTORY_SIZE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HarvestInput {
    /// Account to claim for; must be the signing account
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestedReward {
    pub token: String,
    pub amount: Amount,
    /// When this reward token was last claimed (Unix milliseconds)
    pub last_claimed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReceipt {
    pub digest: TxDigest,
    pub rewards: Vec<HarvestedReward>,
    pub reward_count: usize,
    pub claimed_at: DateTime<Utc>,
}

pub struct HarvestRewardsAction {
    capabilities: Capabilities,
}

impl HarvestRewardsAction {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    async fn history(&self, address: &str) -> RewardHistory {
        match self
            .capabilities
            .account
            .rewards_history(address, HISTORY_PAGE, HISTORY_SIZE)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(address, error = %e, "Reward history unavailable");
                RewardHistory {
                    page: HISTORY_PAGE,
                    size: HISTORY_SIZE,
                    total: 0,
                    rewards: Vec::new(),
                }
            }
        }
    }
}

#[async_trait]
impl Action for HarvestRewardsAction {
    const NAME: &'static str = "harvest_rewards";
    const VERB: &'static str = "harvest rewards";

    type Input = HarvestInput;
    type Output = HarvestReceipt;

    fn description(&self) -> &'static str {
        "Claim every available NAVI reward for the account"
    }

    async fn run(&self, input: HarvestInput) -> ActionResult<HarvestReceipt> {
        validate_address(&input.address)?;
        if input.address != self.capabilities.address {
            return Err(crate::Error::Validation(format!(
                "address {} is not the signing account",
                input.address
            ))
            .into());
        }

        let available = self
            .capabilities
            .account
            .available_rewards(&input.address)
            .await?;
        let available: Vec<(String, Amount)> = available
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .collect();
        if available.is_empty() {
            return Err(ActionError::Rejected(
                "No rewards available to harvest".to_string(),
            ));
        }

        let history = self.history(&input.address).await;
        let digest = self
            .capabilities
            .ledger
            .submit(&Operation::ClaimRewards)
            .await?;

        let rewards: Vec<HarvestedReward> = available
            .into_iter()
            .map(|(token, amount)| HarvestedReward {
                last_claimed: history
                    .rewards
                    .iter()
                    .find(|claim| claim.reward_token == token)
                    .map(|claim| claim.timestamp),
                token,
                amount,
            })
            .collect();

        tracing::info!(
            address = %input.address,
            rewards = rewards.len(),
            digest = %digest,
            "Harvested rewards"
        );

        Ok(HarvestReceipt {
            digest,
            reward_count: rewards.len(),
            rewards,
            claimed_at: Utc::now(),
        })
    }
}
