use crate::domain::snapshot::StockSnapshot;
use anyhow::Result;
use std::time::Duration;

#[async_trait::async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Fetches company metadata and the four trailing close-price windows for
    /// one ticker. A failure here is per-ticker; it must never abort a batch.
    async fn fetch_snapshot(&self, ticker: &str) -> Result<StockSnapshot>;
}

/// Fetches every watchlist ticker sequentially, in order.
///
/// The output always has the same length as the input: a failed fetch yields
/// an error-bearing snapshot in place, not a shortened list.
pub async fn fetch_watchlist(
    provider: &dyn PriceHistoryProvider,
    tickers: &[String],
    request_delay: Duration,
) -> Vec<StockSnapshot> {
    let mut out = Vec::with_capacity(tickers.len());

    for (idx, ticker) in tickers.iter().enumerate() {
        if idx != 0 && !request_delay.is_zero() {
            tokio::time::sleep(request_delay).await;
        }

        match provider.fetch_snapshot(ticker).await {
            Ok(snapshot) => {
                tracing::info!(ticker = %ticker, provider = provider.provider_name(), "fetched snapshot");
                out.push(snapshot);
            }
            Err(err) => {
                tracing::error!(ticker = %ticker, error = %err, "snapshot fetch failed; recording error");
                out.push(StockSnapshot::failed(ticker, format!("{err:#}")));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticProvider {
        snapshots: HashMap<String, StockSnapshot>,
    }

    #[async_trait::async_trait]
    impl PriceHistoryProvider for StaticProvider {
        fn provider_name(&self) -> &'static str {
            "static"
        }

        async fn fetch_snapshot(&self, ticker: &str) -> Result<StockSnapshot> {
            self.snapshots
                .get(ticker)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no data for {ticker}"))
        }
    }

    fn ok_snapshot(ticker: &str, price: f64) -> StockSnapshot {
        let mut s = StockSnapshot::failed(ticker, "");
        s.error = None;
        s.current_price = Some(price);
        s
    }

    #[tokio::test]
    async fn preserves_watchlist_length_and_order_on_failures() {
        let mut snapshots = HashMap::new();
        snapshots.insert("AAPL".to_string(), ok_snapshot("AAPL", 150.0));
        snapshots.insert("MSFT".to_string(), ok_snapshot("MSFT", 410.0));
        let provider = StaticProvider { snapshots };

        let watchlist = vec![
            "AAPL".to_string(),
            "NOSUCH".to_string(),
            "MSFT".to_string(),
        ];
        let out = fetch_watchlist(&provider, &watchlist, Duration::ZERO).await;

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].ticker, "AAPL");
        assert!(!out[0].is_error());
        assert_eq!(out[1].ticker, "NOSUCH");
        assert!(out[1].is_error());
        assert_eq!(out[2].ticker, "MSFT");
        assert!(!out[2].is_error());
    }

    #[tokio::test]
    async fn empty_watchlist_yields_empty_result() {
        let provider = StaticProvider {
            snapshots: HashMap::new(),
        };
        let out = fetch_watchlist(&provider, &[], Duration::ZERO).await;
        assert!(out.is_empty());
    }
}
