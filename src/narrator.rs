//! Human-readable explanations of optimization reports
//!
//! Narration is advisory only. Callers log and drop narrator failures; nothing
//! downstream depends on the text.

use crate::config::rpc::env_vars;
use crate::config::NarratorSettings;
use crate::engine::report::OptimizationReport;
use crate::engine::types::ActionKind;
use crate::tokens::{format_units, registry};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use url::Url;

const SYSTEM_PROMPT: &str = "You explain DeFi lending recommendations for the NAVI protocol on Sui. \
Given a JSON report with the account's positions, health factor and ranked strategies, \
write a short plain-English summary for the account owner. Do not invent numbers.";

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn explain(&self, report: &OptimizationReport) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// Pick a narrator for the configured settings
///
/// Returns `None` when narration is disabled. Without `OPENROUTER_API_KEY` the
/// offline template narrator is used.
pub fn from_settings(settings: &NarratorSettings) -> Result<Option<Arc<dyn Narrator>>> {
    if !settings.enabled {
        return Ok(None);
    }

    match std::env::var(env_vars::OPENROUTER_API_KEY) {
        Ok(key) if !key.is_empty() => {
            let narrator = OpenRouterNarrator::new(settings, SecretString::from(key))?;
            Ok(Some(Arc::new(narrator)))
        }
        _ => {
            tracing::warn!("Narrator enabled but OPENROUTER_API_KEY is not set, using template");
            Ok(Some(Arc::new(TemplateNarrator)))
        }
    }
}

/// Deterministic summary built from the report itself
pub struct TemplateNarrator;

fn describe_amount(token: &str, amount: u128) -> String {
    match registry().get(token) {
        Some(coin) => format!("{} {}", format_units(amount, coin.decimals as u32), token),
        None => format!("{} base units of {}", amount, token),
    }
}

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn explain(&self, report: &OptimizationReport) -> Result<String> {
        let state = &report.current_state;
        let mut text = format!(
            "Health factor {:.2} ({}) at risk level {}.",
            state.health_factor,
            state.status,
            report.thresholds.risk_level.value()
        );

        if report.strategies.is_empty() {
            text.push_str(" No changes recommended.");
            return Ok(text);
        }

        let _ = write!(text, " {} recommended action(s):", report.strategies.len());
        for strategy in &report.strategies {
            let what = match &strategy.kind {
                ActionKind::Supply { amount } if amount.is_zero() => {
                    format!("supply {}", strategy.token)
                }
                ActionKind::Supply { amount } => {
                    format!("supply {}", describe_amount(&strategy.token, amount.0))
                }
                ActionKind::Withdraw { amount } => {
                    format!("withdraw {}", describe_amount(&strategy.token, amount.0))
                }
                ActionKind::Swap { to_token, amount } => format!(
                    "swap {} to {}",
                    describe_amount(&strategy.token, amount.0),
                    to_token
                ),
                ActionKind::Claim => format!("claim {} rewards", strategy.token),
            };
            let _ = write!(
                text,
                "\n- {} (priority {:.1}): {}",
                what,
                strategy.priority.value(),
                strategy.reason
            );

            let risks: Vec<&str> = report
                .opportunities
                .iter()
                .find(|ranked| ranked.opportunity.token == strategy.token)
                .map(|ranked| ranked.opportunity.risks.iter().map(|r| r.describe()).collect())
                .unwrap_or_default();
            if !risks.is_empty() {
                let _ = write!(text, " [{}]", risks.join(", "));
            }
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "TemplateNarrator"
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Narrator backed by an OpenRouter chat completion model
pub struct OpenRouterNarrator {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: SecretString,
}

impl OpenRouterNarrator {
    pub fn new(settings: &NarratorSettings, api_key: SecretString) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|e| Error::Config(format!("invalid narrator endpoint: {}", e)))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            model: settings.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Narrator for OpenRouterNarrator {
    async fn explain(&self, report: &OptimizationReport) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": serde_json::to_string(report)?},
            ],
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::Narrator("empty completion".to_string()))
    }

    fn name(&self) -> &'static str {
        "OpenRouterNarrator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::snapshot::PortfolioSnapshot;
    use crate::engine::types::{
        Amount, Position, Positions, RiskLevel, RiskTag, YieldOpportunity,
    };
    use std::collections::BTreeSet;

    fn report() -> OptimizationReport {
        let mut positions = Positions::new();
        positions.insert(
            "USDC".to_string(),
            Position {
                supplied: Amount(500_000_000),
                borrowed: Amount::ZERO,
            },
        );
        let opportunity = |token: &str, apy| YieldOpportunity {
            token: token.to_string(),
            protocol: "NAVI".to_string(),
            apy,
            available_liquidity: Amount(1),
            reward_tokens: vec![],
            risks: BTreeSet::new(),
            requirements: None,
        };
        OptimizationReport::build(
            "0x1",
            PortfolioSnapshot::new(positions, 1.6),
            vec![opportunity("SUI", 0.12), opportunity("USDC", 0.02)],
            RiskLevel::try_from(2).unwrap(),
        )
    }

    #[tokio::test]
    async fn template_lists_each_strategy() {
        let text = TemplateNarrator.explain(&report()).await.unwrap();
        assert!(text.starts_with("Health factor 1.60 (HEALTHY) at risk level 2."));
        assert!(text.contains("- supply SUI (priority 2.2)"));
        assert!(text.contains("- withdraw 500 USDC (priority 1.0)"));
    }

    #[tokio::test]
    async fn template_flags_pool_risks() {
        let mut report = report();
        for ranked in &mut report.opportunities {
            if ranked.opportunity.token == "SUI" {
                ranked.opportunity.risks =
                    BTreeSet::from([RiskTag::HighUtilization, RiskTag::LowLiquidity]);
            }
        }

        let text = TemplateNarrator.explain(&report).await.unwrap();
        let sui = text.lines().find(|l| l.starts_with("- supply SUI")).unwrap();
        assert!(sui.ends_with("[High utilization rate, Low liquidity]"), "{}", sui);
        let usdc = text.lines().find(|l| l.starts_with("- withdraw")).unwrap();
        assert!(!usdc.contains('['));
    }

    #[test]
    fn disabled_narrator_is_none() {
        let settings = NarratorSettings::default();
        assert!(from_settings(&settings).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_endpoint() {
        let settings = NarratorSettings {
            enabled: true,
            endpoint: "::not a url".to_string(),
            ..NarratorSettings::default()
        };
        assert!(OpenRouterNarrator::new(&settings, SecretString::from("k".to_string())).is_err());
    }
}
