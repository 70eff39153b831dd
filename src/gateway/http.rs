//! HTTP gateway
//!
//! Talks to a JSON sidecar that wraps the NAVI SDK. The sidecar owns signing;
//! this client only ever sends fully specified operations. Every request
//! names the Sui network and fullnode the sidecar should use.
//!
//! Endpoints:
//! - `GET  /pools/{token}`
//! - `GET  /quote?from=&to=&amount=`
//! - `GET  /accounts/{address}/health-factor`
//! - `GET  /accounts/{address}/dynamic-health-factor?token=&delta_supply=&delta_borrow=&is_increase=`
//! - `GET  /accounts/{address}/positions`
//! - `GET  /accounts/{address}/rewards`
//! - `GET  /accounts/{address}/rewards/history?page=&size=`
//! - `POST /operations`

use super::{
    AccountOracle, GatewayError, GatewayResult, Ledger, MarketOracle, Operation, TxDigest,
};
use crate::config::rpc::env_vars;
use crate::config::{Network, RpcConfig};
use crate::engine::types::{Amount, Positions, Quote, RewardHistory, TokenSnapshot};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";
const NETWORK_HEADER: &str = "x-sui-network";
const FULLNODE_HEADER: &str = "x-sui-rpc-url";

#[derive(Deserialize)]
struct HealthFactorResponse {
    health_factor: f64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    digest: String,
}

/// Gateway client implementing every capability over HTTP
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    network: Network,
    fullnode: Option<String>,
}

impl HttpGateway {
    /// Create a gateway client
    ///
    /// # Arguments
    /// * `base_url` - Sidecar base URL, e.g. `http://127.0.0.1:8787`
    /// * `api_key` - Optional key sent as `x-api-key`
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> crate::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| crate::Error::Config(format!("invalid gateway URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(crate::Error::Config(format!(
                "gateway URL '{}' cannot be used as a base",
                base_url
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
            network: Network::default(),
            fullnode: None,
        })
    }

    /// Target `network` through the given fullnode
    pub fn with_network(mut self, network: Network, fullnode: impl Into<String>) -> Self {
        self.network = network;
        self.fullnode = Some(fullnode.into());
        self
    }

    /// Create a gateway client for resolved endpoints, reading `NAVI_API_KEY`
    /// from the environment
    pub fn from_rpc(rpc: &RpcConfig) -> crate::Result<Self> {
        let api_key = std::env::var(env_vars::NAVI_API_KEY)
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);
        Ok(Self::new(&rpc.gateway_url, api_key)?.with_network(rpc.network, &rpc.sui_rpc_url))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::HttpError("gateway URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request.header(NETWORK_HEADER, self.network.name());
        if let Some(fullnode) = &self.fullnode {
            request = request.header(FULLNODE_HEADER, fullnode);
        }
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let start = Instant::now();
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| GatewayError::HttpError(e.to_string()))?;

        let status = response.status();
        tracing::debug!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Gateway response"
        );

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                code: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::HttpError(format!("Failed to parse response: {}", e)))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> GatewayResult<T> {
        let url = self.endpoint(segments)?;
        self.send(self.client.get(url)).await
    }
}

#[async_trait]
impl MarketOracle for HttpGateway {
    async fn pool(&self, token: &str) -> GatewayResult<TokenSnapshot> {
        match self.get(&["pools", token]).await {
            Err(GatewayError::Status { code, .. }) if code == StatusCode::NOT_FOUND.as_u16() => {
                Err(GatewayError::UnknownToken(token.to_string()))
            }
            other => other,
        }
    }

    async fn quote(&self, from: &str, to: &str, amount_in: Amount) -> GatewayResult<Quote> {
        let url = self.endpoint(&["quote"])?;
        let amount = amount_in.to_string();
        let request = self
            .client
            .get(url)
            .query(&[("from", from), ("to", to), ("amount", amount.as_str())]);
        match self.send(request).await {
            Err(GatewayError::Status { code, .. }) if code == StatusCode::NOT_FOUND.as_u16() => {
                Err(GatewayError::NoRoute {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            other => other,
        }
    }
}

#[async_trait]
impl AccountOracle for HttpGateway {
    async fn health_factor(&self, address: &str) -> GatewayResult<f64> {
        let response: HealthFactorResponse =
            self.get(&["accounts", address, "health-factor"]).await?;
        Ok(response.health_factor)
    }

    async fn dynamic_health_factor(
        &self,
        address: &str,
        token: &str,
        delta_supply: i128,
        delta_borrow: i128,
        is_increase: bool,
    ) -> GatewayResult<f64> {
        let url = self.endpoint(&["accounts", address, "dynamic-health-factor"])?;
        let request = self.client.get(url).query(&[
            ("token", token.to_string()),
            ("delta_supply", delta_supply.to_string()),
            ("delta_borrow", delta_borrow.to_string()),
            ("is_increase", is_increase.to_string()),
        ]);
        let response: HealthFactorResponse = self.send(request).await?;
        Ok(response.health_factor)
    }

    async fn positions(&self, address: &str) -> GatewayResult<Positions> {
        self.get(&["accounts", address, "positions"]).await
    }

    async fn available_rewards(&self, address: &str) -> GatewayResult<BTreeMap<String, Amount>> {
        self.get(&["accounts", address, "rewards"]).await
    }

    async fn rewards_history(
        &self,
        address: &str,
        page: u32,
        size: u32,
    ) -> GatewayResult<RewardHistory> {
        let url = self.endpoint(&["accounts", address, "rewards", "history"])?;
        let request = self.client.get(url).query(&[("page", page), ("size", size)]);
        self.send(request).await
    }
}

#[async_trait]
impl Ledger for HttpGateway {
    async fn submit(&self, operation: &Operation) -> GatewayResult<TxDigest> {
        let url = self.endpoint(&["operations"])?;
        let request = self.client.post(url).json(operation);
        match self.send::<SubmitResponse>(request).await {
            Ok(response) => Ok(TxDigest(response.digest)),
            Err(GatewayError::Status { code, message })
                if code == StatusCode::UNPROCESSABLE_ENTITY.as_u16() =>
            {
                Err(GatewayError::Rejected(message))
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "HttpGateway"
    }
}
