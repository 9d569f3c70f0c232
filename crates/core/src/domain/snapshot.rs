use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One point of a close-price time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Everything fetched for one ticker at one point in time.
///
/// `error` being set means the fetch failed; all other business fields are
/// then empty and must not be used. A missing window is an empty series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub current_price: Option<f64>,
    pub currency: String,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub week_high_52: Option<f64>,
    pub week_low_52: Option<f64>,
    pub employees: Option<u64>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub daily: Vec<PricePoint>,
    pub weekly: Vec<PricePoint>,
    pub monthly: Vec<PricePoint>,
    pub yearly: Vec<PricePoint>,
    pub fetched_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl StockSnapshot {
    /// Degraded snapshot for a ticker whose fetch failed.
    pub fn failed(ticker: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            company_name: String::new(),
            sector: String::new(),
            industry: String::new(),
            current_price: None,
            currency: String::new(),
            market_cap: None,
            pe_ratio: None,
            dividend_yield: None,
            week_high_52: None,
            week_low_52: None,
            employees: None,
            website: None,
            description: None,
            daily: Vec::new(),
            weekly: Vec::new(),
            monthly: Vec::new(),
            yearly: Vec::new(),
            fetched_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_snapshot_carries_only_ticker_and_error() {
        let s = StockSnapshot::failed("AAPL", "lookup failed");
        assert!(s.is_error());
        assert_eq!(s.ticker, "AAPL");
        assert_eq!(s.error.as_deref(), Some("lookup failed"));
        assert!(s.current_price.is_none());
        assert!(s.yearly.is_empty());
    }
}
