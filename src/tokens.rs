//! Shared coin registry
//!
//! Centralizes coin metadata (symbols, decimals, Move coin types) for the
//! markets listed on NAVI. Actions validate token symbols against this
//! registry, and the market scan iterates it when no explicit list is given.

use std::collections::BTreeMap;

/// Coin metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinInfo {
    /// Coin symbol (e.g., "SUI", "USDC")
    pub symbol: &'static str,
    /// Number of decimals
    pub decimals: u8,
    /// Fully qualified Move coin type
    pub coin_type: &'static str,
}

impl CoinInfo {
    pub const fn new(symbol: &'static str, decimals: u8, coin_type: &'static str) -> Self {
        Self {
            symbol,
            decimals,
            coin_type,
        }
    }

    /// One whole coin expressed in base units
    pub fn one(&self) -> u128 {
        10u128.pow(self.decimals as u32)
    }
}

/// Well-known coin types on Sui mainnet
pub mod coin_types {
    pub const SUI: &str = "0x2::sui::SUI";
    pub const USDC: &str =
        "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
    pub const USDT: &str =
        "0xc060006111016b8a020ad5b33834984a437aaa7d3c74c18e09a95d48aceab08c::coin::COIN";
    pub const WETH: &str =
        "0xaf8cd5edc19c4512f4259f0bee101a40d41ebed738ade5874359610ef8eeced5::coin::COIN";
    pub const CETUS: &str =
        "0x06864a6f921804860930db6ddbe2e16acdf8504495ea7481637a1c8b9a8fe54b::cetus::CETUS";
    pub const VSUI: &str =
        "0x549e8b69270defbfafd4f94e17ec44cdbdd99820b33bda2278dea3b9a32d3f55::cert::CERT";
    pub const HASUI: &str =
        "0xbde4ba4c2e274a60ce15c1cfff9e5c42e41654ac8b6d906a57efa4bd3c29f47d::hasui::HASUI";
    pub const WBTC: &str =
        "0x027792d9fed7f9844eb4839566001bb6f6cb4804f66aa2da6fe1ee242d896881::coin::COIN";
    pub const NAVX: &str =
        "0xa99b8952d4f7d947ea77fe0ecdcc9e5fc0bcab2841d6e2a5aa00c3044e5544b5::navx::NAVX";
}

/// Symbol used as the quote currency for price lookups
pub const QUOTE_SYMBOL: &str = "USDC";

/// Reward token distributed by NAVI incentive programs
pub const REWARD_SYMBOL: &str = "NAVX";

/// Coin registry keyed by symbol
pub struct CoinRegistry {
    coins: BTreeMap<&'static str, CoinInfo>,
    /// Listing order, used when scanning markets
    order: Vec<&'static str>,
}

impl CoinRegistry {
    /// Create a registry with every NAVI-listed coin
    pub fn new() -> Self {
        use coin_types::*;

        let listed = [
            CoinInfo::new("SUI", 9, SUI),
            CoinInfo::new("USDC", 6, USDC),
            CoinInfo::new("USDT", 6, USDT),
            CoinInfo::new("WETH", 8, WETH),
            CoinInfo::new("CETUS", 9, CETUS),
            CoinInfo::new("vSUI", 9, VSUI),
            CoinInfo::new("haSUI", 9, HASUI),
            CoinInfo::new("WBTC", 8, WBTC),
            CoinInfo::new("NAVX", 9, NAVX),
        ];

        let mut coins = BTreeMap::new();
        let mut order = Vec::with_capacity(listed.len());
        for coin in listed {
            order.push(coin.symbol);
            coins.insert(coin.symbol, coin);
        }

        Self { coins, order }
    }

    /// Look up a coin by its exact symbol
    pub fn get(&self, symbol: &str) -> Option<&CoinInfo> {
        self.coins.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.coins.contains_key(symbol)
    }

    /// Symbols in listing order
    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

impl Default for CoinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global coin registry (lazy initialized)
static REGISTRY: std::sync::OnceLock<CoinRegistry> = std::sync::OnceLock::new();

/// Get the global coin registry
pub fn registry() -> &'static CoinRegistry {
    REGISTRY.get_or_init(CoinRegistry::new)
}

/// Format a base-unit amount with decimals
pub fn format_units(value: u128, decimals: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let divisor = 10u128.pow(decimals);
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder == 0 {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}
