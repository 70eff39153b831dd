//! Configuration for the AutoFi agent

pub mod rpc;

use serde::{Deserialize, Serialize};

// Re-export RPC config
pub use rpc::RpcConfig;

/// Sui networks NAVI is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Infer the network from a fullnode URL
    pub fn from_rpc_url(url: &str) -> Self {
        if url.contains("testnet") {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Risk level used when a request does not carry one (1-5)
    pub default_risk_level: u8,
    /// Floor the simulated post-withdrawal health factor must stay above
    pub min_withdraw_health_factor: f64,
    /// Maximum slippage tolerance (e.g., 1.0 for 1%)
    pub max_slippage_percent: f64,
    /// Slippage applied to swaps that do not specify one
    pub default_slippage_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_risk_level: 2,
            min_withdraw_health_factor: 1.05,
            max_slippage_percent: 1.0,
            default_slippage_percent: 0.5,
        }
    }
}

/// Default policy behavior when policy.json is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDefaultMode {
    #[default]
    AllowAll,
    DefaultDeny,
}

/// Policy settings for operation execution
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicySettings {
    /// Default mode when policy.json is missing
    #[serde(default)]
    pub default_mode: PolicyDefaultMode,
    /// Path to a policy.json file
    #[serde(default)]
    pub policy_file: Option<String>,
    /// Require the policy file to be present (fail closed if missing)
    #[serde(default)]
    pub require_file: bool,
}

/// LLM narrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorSettings {
    /// Ask the narrator to explain recommendations
    pub enabled: bool,
    /// OpenRouter model identifier
    pub model: String,
    /// Chat completions endpoint
    pub endpoint: String,
}

impl Default for NarratorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "openai/gpt-4o-mini".to_string(),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network used when SUI_RPC_URL is not set
    pub network: Network,
    /// Markets to scan; empty means every registered coin
    #[serde(default)]
    pub markets: Vec<String>,
    /// Address the runner monitors
    #[serde(default)]
    pub address: Option<String>,
    /// Gateway base URL; `AUTOFI_GATEWAY_URL` wins when set
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// Risk management settings
    pub risk: RiskConfig,
    /// Policy settings
    #[serde(default)]
    pub policy: PolicySettings,
    /// Narrator settings
    #[serde(default)]
    pub narrator: NarratorSettings,
    /// Optimization loop interval (milliseconds)
    pub check_interval_ms: u64,
    /// Let the runner execute gated withdrawals and reward claims
    #[serde(default)]
    pub auto_execute: bool,
    /// Path to audit log file
    pub audit_log_path: Option<String>,
    /// Paper market state file used instead of the gateway
    #[serde(default)]
    pub paper_market_file: Option<String>,
}

impl Config {
    /// Markets to scan, falling back to the full coin registry
    pub fn market_symbols(&self) -> Vec<String> {
        if self.markets.is_empty() {
            crate::tokens::registry()
                .symbols()
                .map(str::to_string)
                .collect()
        } else {
            self.markets.clone()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            markets: Vec::new(),
            address: None,
            gateway_url: None,
            risk: RiskConfig::default(),
            policy: PolicySettings::default(),
            narrator: NarratorSettings::default(),
            check_interval_ms: 300_000, // 5 minutes
            auto_execute: false,
            audit_log_path: Some("audit.jsonl".to_string()),
            paper_market_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserialize_defaults() {
        let value = serde_json::json!({
            "network": "testnet",
            "risk": {
                "default_risk_level": 3,
                "min_withdraw_health_factor": 1.05,
                "max_slippage_percent": 1.0,
                "default_slippage_percent": 0.5
            },
            "check_interval_ms": 60000,
            "audit_log_path": "audit.jsonl"
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::Testnet);
        assert_eq!(parsed.policy.default_mode, PolicyDefaultMode::AllowAll);
        assert!(!parsed.auto_execute);
        assert!(!parsed.narrator.enabled);
        assert!(parsed.markets.is_empty());
    }

    #[test]
    fn empty_markets_scan_registry() {
        let config = Config::default();
        let markets = config.market_symbols();
        assert!(markets.contains(&"SUI".to_string()));
        assert!(markets.contains(&"USDC".to_string()));
    }

    #[test]
    fn explicit_markets_are_kept() {
        let config = Config {
            markets: vec!["SUI".to_string()],
            ..Config::default()
        };
        assert_eq!(config.market_symbols(), vec!["SUI".to_string()]);
    }

    #[test]
    fn network_from_rpc_url() {
        assert_eq!(
            Network::from_rpc_url("https://fullnode.testnet.sui.io"),
            Network::Testnet
        );
        assert_eq!(
            Network::from_rpc_url("https://fullnode.mainnet.sui.io"),
            Network::Mainnet
        );
    }
}
