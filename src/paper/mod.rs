//! Paper market
//!
//! A local simulation of the lending protocol that implements every gateway
//! capability:
//! - Pools, prices and liquidation thresholds for health factor math
//! - One simulated account with wallet coins, positions and rewards
//! - Operations mutate the book and return synthetic digests
//! - State persists to a JSON file across restarts (optional)
//!
//! Nothing here signs or submits real transactions.

mod book;

pub use book::{PaperBook, PaperOperation, PaperPool, NO_DEBT_HEALTH_FACTOR, SWAP_FEE};

use crate::engine::types::{Amount, Positions, Quote, RewardHistory, TokenSnapshot};
use crate::gateway::{
    AccountOracle, GatewayResult, Ledger, MarketOracle, Operation, TxDigest,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe paper market
#[derive(Clone)]
pub struct PaperMarket {
    book: Arc<RwLock<PaperBook>>,
    state_file: Option<PathBuf>,
}

impl PaperMarket {
    /// Wrap a book without persistence
    pub fn new(book: PaperBook) -> Self {
        Self {
            book: Arc::new(RwLock::new(book)),
            state_file: None,
        }
    }

    /// Load the book from `path`, or start a demo book for `address` there
    pub async fn load_or_create(path: impl AsRef<Path>, address: &str) -> crate::Result<Self> {
        let path = path.as_ref();
        let book = if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let book: PaperBook = serde_json::from_str(&content)?;
            tracing::info!(path = %path.display(), address = %book.address, "Loaded paper market");
            book
        } else {
            tracing::info!(path = %path.display(), address, "Starting new paper market");
            PaperBook::demo(address)
        };

        let market = Self {
            book: Arc::new(RwLock::new(book)),
            state_file: Some(path.to_path_buf()),
        };
        market.save().await?;
        Ok(market)
    }

    /// Snapshot of the current book
    pub async fn book(&self) -> PaperBook {
        self.book.read().await.clone()
    }

    /// Address of the simulated account
    pub async fn address(&self) -> String {
        self.book.read().await.address.clone()
    }

    /// Save state to the configured file
    pub async fn save(&self) -> crate::Result<()> {
        if let Some(ref path) = self.state_file {
            let book = self.book.read().await;
            Self::write_book(&book, path).await?;
        }
        Ok(())
    }

    async fn write_book(book: &PaperBook, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(book)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl MarketOracle for PaperMarket {
    async fn pool(&self, token: &str) -> GatewayResult<TokenSnapshot> {
        self.book.read().await.pool(token)
    }

    async fn quote(&self, from: &str, to: &str, amount_in: Amount) -> GatewayResult<Quote> {
        self.book.read().await.quote(from, to, amount_in)
    }
}

#[async_trait]
impl AccountOracle for PaperMarket {
    async fn health_factor(&self, address: &str) -> GatewayResult<f64> {
        let book = self.book.read().await;
        if !book.is_owner(address) {
            return Ok(NO_DEBT_HEALTH_FACTOR);
        }
        Ok(book.health_factor())
    }

    async fn dynamic_health_factor(
        &self,
        address: &str,
        token: &str,
        delta_supply: i128,
        delta_borrow: i128,
        is_increase: bool,
    ) -> GatewayResult<f64> {
        let book = self.book.read().await;
        if !book.is_owner(address) {
            return Ok(NO_DEBT_HEALTH_FACTOR);
        }
        let signed = |delta: i128| {
            let magnitude = delta.checked_abs().unwrap_or(i128::MAX);
            if is_increase {
                magnitude
            } else {
                -magnitude
            }
        };
        Ok(book.simulate_health_factor(token, signed(delta_supply), signed(delta_borrow)))
    }

    async fn positions(&self, address: &str) -> GatewayResult<Positions> {
        let book = self.book.read().await;
        if !book.is_owner(address) {
            return Ok(Positions::new());
        }
        Ok(book.positions.clone())
    }

    async fn available_rewards(&self, address: &str) -> GatewayResult<BTreeMap<String, Amount>> {
        let book = self.book.read().await;
        if !book.is_owner(address) {
            return Ok(BTreeMap::new());
        }
        Ok(book
            .rewards
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(token, amount)| (token.clone(), *amount))
            .collect())
    }

    async fn rewards_history(
        &self,
        address: &str,
        page: u32,
        size: u32,
    ) -> GatewayResult<RewardHistory> {
        let book = self.book.read().await;
        if !book.is_owner(address) {
            return Ok(RewardHistory {
                page,
                size,
                total: 0,
                rewards: Vec::new(),
            });
        }
        Ok(book.rewards_history(page, size))
    }
}

#[async_trait]
impl Ledger for PaperMarket {
    async fn submit(&self, operation: &Operation) -> GatewayResult<TxDigest> {
        let mut book = self.book.write().await;
        let digest = book.apply(operation)?;

        tracing::info!(
            kind = operation.kind(),
            digest = %digest,
            "Paper operation applied"
        );

        // Auto-save if state file is configured
        if let Some(ref path) = self.state_file {
            if let Err(e) = Self::write_book(&book, path).await {
                tracing::warn!("Failed to auto-save paper market: {}", e);
            }
        }

        Ok(digest)
    }

    fn name(&self) -> &'static str {
        "PaperMarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_err;

    const ADDRESS: &str = "0xa11ce";

    #[tokio::test]
    async fn state_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paper.json");

        let market = PaperMarket::load_or_create(&path, ADDRESS).await.unwrap();
        assert!(path.exists());
        market
            .submit(&Operation::Withdraw {
                token: "USDC".to_string(),
                amount: Amount(500_000_000),
            })
            .await
            .unwrap();

        let reloaded = PaperMarket::load_or_create(&path, "0xignored").await.unwrap();
        let book = reloaded.book().await;
        assert_eq!(book.address, ADDRESS);
        assert_eq!(book.positions["USDC"].supplied, Amount(1_500_000_000));
        assert_eq!(book.operations.len(), 1);
    }

    #[tokio::test]
    async fn decrease_ignores_delta_sign() {
        let market = PaperMarket::new(PaperBook::demo(ADDRESS));
        let current = market.health_factor(ADDRESS).await.unwrap();

        let negative = market
            .dynamic_health_factor(ADDRESS, "USDC", -1_000_000_000, 0, false)
            .await
            .unwrap();
        let positive = market
            .dynamic_health_factor(ADDRESS, "USDC", 1_000_000_000, 0, false)
            .await
            .unwrap();
        assert_eq!(negative, positive);
        assert!(negative < current);

        let increase = market
            .dynamic_health_factor(ADDRESS, "USDC", 1_000_000_000, 0, true)
            .await
            .unwrap();
        assert!(increase > current);
    }

    #[tokio::test]
    async fn unknown_address_has_empty_account() {
        let market = PaperMarket::new(PaperBook::demo(ADDRESS));
        assert!(market.positions("0xb0b").await.unwrap().is_empty());
        assert!(market.available_rewards("0xb0b").await.unwrap().is_empty());
        assert_eq!(
            market.health_factor("0xb0b").await.unwrap(),
            NO_DEBT_HEALTH_FACTOR
        );
    }

    #[tokio::test]
    async fn rejected_operation_is_not_recorded() {
        let market = PaperMarket::new(PaperBook::demo(ADDRESS));
        let result = market
            .submit(&Operation::Supply {
                token: "WETH".to_string(),
                amount: Amount(1),
            })
            .await;
        assert_err!(result);
        assert!(market.book().await.operations.is_empty());
    }
}
