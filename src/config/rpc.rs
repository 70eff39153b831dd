//! Endpoint configuration
//!
//! Resolution order:
//! 1. `SUI_RPC_URL` selects the fullnode the gateway is told to use; a URL
//!    containing `testnet` switches the agent to testnet
//! 2. `AUTOFI_GATEWAY_URL`, then the config file's `gateway_url`, points at
//!    the protocol gateway sidecar
//! 3. Public fallbacks, rate limited and meant for testing only
//!
//! # Examples
//!
//! ```bash
//! export SUI_RPC_URL="https://fullnode.testnet.sui.io:443"
//! export AUTOFI_GATEWAY_URL="http://127.0.0.1:8787"
//! ```

use super::{Config, Network};

/// Environment variable names
pub mod env_vars {
    pub const SUI_RPC_URL: &str = "SUI_RPC_URL";
    pub const GATEWAY_URL: &str = "AUTOFI_GATEWAY_URL";
    pub const NAVI_API_KEY: &str = "NAVI_API_KEY";
    pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
}

/// Public fullnodes (rate limited, for testing only)
mod public_rpcs {
    pub const MAINNET: &str = "https://fullnode.mainnet.sui.io:443";
    pub const TESTNET: &str = "https://fullnode.testnet.sui.io:443";
}

/// Gateway address used when nothing is configured
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8787";

/// Resolved endpoints for one agent process
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Sui fullnode URL
    pub sui_rpc_url: String,
    /// Network inferred from the fullnode URL
    pub network: Network,
    /// Protocol gateway base URL
    pub gateway_url: String,
}

impl RpcConfig {
    /// Resolve endpoints for `config`. Environment variables take precedence
    /// over the config file; the config's network applies when `SUI_RPC_URL`
    /// is unset.
    pub fn for_config(config: &Config) -> Self {
        let sui_rpc_url = std::env::var(env_vars::SUI_RPC_URL).ok();
        let gateway_url = std::env::var(env_vars::GATEWAY_URL)
            .ok()
            .or_else(|| config.gateway_url.clone());
        Self::resolve(sui_rpc_url, gateway_url, config.network)
    }

    fn resolve(
        sui_rpc_url: Option<String>,
        gateway_url: Option<String>,
        fallback_network: Network,
    ) -> Self {
        let (sui_rpc_url, network) = match sui_rpc_url {
            Some(url) => {
                tracing::debug!("Using SUI_RPC_URL for fullnode");
                let network = Network::from_rpc_url(&url);
                (url, network)
            }
            None => {
                tracing::warn!(
                    network = fallback_network.name(),
                    "No SUI_RPC_URL configured, using public fullnode (rate limited)"
                );
                let url = match fallback_network {
                    Network::Mainnet => public_rpcs::MAINNET,
                    Network::Testnet => public_rpcs::TESTNET,
                };
                (url.to_string(), fallback_network)
            }
        };

        let gateway_url = gateway_url.unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());

        Self {
            sui_rpc_url,
            network,
            gateway_url,
        }
    }
}
