// File: src/price.rs
// BTC/USD price chain and the $magic market cap derived from it

use serde_json::Value;

use crate::data_models::MarketSnapshot;
use crate::fallback::{first_success, Provider};
use crate::source::HttpAdapter;

/// Used when every provider fails
pub const FALLBACK_BTC_PRICE_USD: f64 = 100_000.0;
/// Floor price of one $magic mint, in BTC
pub const FLOOR_PRICE_BTC: f64 = 0.002;
/// Number of 21e8 blocks that can carry a $magic mint
pub const TOTAL_SUPPLY: u64 = 644;

/// One public price endpoint and how to read USD out of its body
#[derive(Debug, Clone, Copy)]
pub struct PriceProvider {
    pub name: &'static str,
    pub url: &'static str,
    pub parse: fn(&Value) -> Option<f64>,
}

fn coingecko(body: &Value) -> Option<f64> {
    body.pointer("/bitcoin/usd")?.as_f64()
}

fn coinbase(body: &Value) -> Option<f64> {
    // Rates are published as decimal strings
    let rate = body.pointer("/data/rates/USD")?;
    rate.as_str().and_then(|s| s.parse().ok()).or_else(|| rate.as_f64())
}

fn blockchain_info(body: &Value) -> Option<f64> {
    body.pointer("/USD/last")?.as_f64()
}

pub const DEFAULT_PROVIDERS: [PriceProvider; 3] = [
    PriceProvider {
        name: "coingecko",
        url: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd",
        parse: coingecko,
    },
    PriceProvider {
        name: "coinbase",
        url: "https://api.coinbase.com/v2/exchange-rates?currency=BTC",
        parse: coinbase,
    },
    PriceProvider {
        name: "blockchain.info",
        url: "https://api.blockchain.info/ticker",
        parse: blockchain_info,
    },
];

/// Ordered BTC price chain
pub struct PriceFeed {
    adapter: HttpAdapter,
    providers: Vec<PriceProvider>,
}

impl PriceFeed {
    pub fn new(adapter: HttpAdapter) -> Self {
        Self::with_providers(adapter, DEFAULT_PROVIDERS.to_vec())
    }

    pub fn with_providers(adapter: HttpAdapter, providers: Vec<PriceProvider>) -> Self {
        Self { adapter, providers }
    }

    /// Current BTC price in USD and the provider that supplied it
    pub async fn btc_price(&self) -> (f64, &'static str) {
        let chain = self
            .providers
            .iter()
            .map(|provider| {
                let adapter = &self.adapter;
                Provider::new(provider.name, async move {
                    let payload = adapter.request(provider.url, &[("Accept", "application/json")]).await?;
                    Ok::<_, anyhow::Error>(
                        payload.json().and_then(provider.parse).filter(|p| p.is_finite() && *p > 0.0),
                    )
                })
            })
            .collect();

        match first_success(chain).await {
            Some(success) => {
                tracing::info!(target: "magic_mint::price", provider = success.provider, price = success.value, "BTC price fetched");
                (success.value, success.provider)
            }
            None => {
                tracing::warn!(target: "magic_mint::price", fallback = FALLBACK_BTC_PRICE_USD, "All price providers failed, using fallback");
                (FALLBACK_BTC_PRICE_USD, "fallback")
            }
        }
    }

    pub async fn market(&self) -> MarketSnapshot {
        let (price, source) = self.btc_price().await;
        market_snapshot(price, source)
    }
}

pub fn market_snapshot(btc_price_usd: f64, source: &str) -> MarketSnapshot {
    let market_cap_usd = if btc_price_usd > 0.0 {
        FLOOR_PRICE_BTC * TOTAL_SUPPLY as f64 * btc_price_usd
    } else {
        0.0
    };
    MarketSnapshot {
        btc_price_usd,
        source: source.to_string(),
        floor_price_btc: FLOOR_PRICE_BTC,
        total_supply: TOTAL_SUPPLY,
        market_cap_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_parsers() {
        assert_eq!(coingecko(&json!({ "bitcoin": { "usd": 64000.5 } })), Some(64000.5));
        assert_eq!(coinbase(&json!({ "data": { "currency": "BTC", "rates": { "USD": "63999.12" } } })), Some(63999.12));
        assert_eq!(blockchain_info(&json!({ "USD": { "15m": 1.0, "last": 64001.0, "symbol": "$" } })), Some(64001.0));
    }

    #[test]
    fn test_parsers_reject_unexpected_shapes() {
        assert_eq!(coingecko(&json!({ "status": { "error_code": 429 } })), None);
        assert_eq!(coinbase(&json!({ "data": { "rates": { "USD": "n/a" } } })), None);
        assert_eq!(blockchain_info(&json!("rate limited")), None);
    }

    #[test]
    fn test_market_cap() {
        let snapshot = market_snapshot(100_000.0, "fallback");
        assert!((snapshot.market_cap_usd - 128_800.0).abs() < 1e-6);
        assert_eq!(snapshot.total_supply, 644);
        assert_eq!(market_snapshot(0.0, "none").market_cap_usd, 0.0);
    }

    #[tokio::test]
    async fn test_unreachable_providers_use_fallback() {
        fn unreachable(_: &Value) -> Option<f64> {
            Some(1.0)
        }
        let adapter = HttpAdapter::new().unwrap();
        let feed = PriceFeed::with_providers(
            adapter,
            vec![PriceProvider {
                name: "closed-port",
                url: "http://127.0.0.1:9/price",
                parse: unreachable,
            }],
        );
        assert_eq!(feed.btc_price().await, (FALLBACK_BTC_PRICE_USD, "fallback"));
    }
}
