use crate::config::ProviderConfig;
use crate::domain::snapshot::{PricePoint, StockSnapshot};
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const CHART_PATH: &str = "/v8/finance/chart";
const SUMMARY_PATH: &str = "/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "assetProfile,price,summaryDetail";

// Chart range parameters for the four trailing windows.
const RANGE_DAY: &str = "1d";
const RANGE_WEEK: &str = "5d";
const RANGE_MONTH: &str = "1mo";
const RANGE_YEAR: &str = "1y";

// Exponential backoff capped at 64s so an oversized retry setting can
// neither overflow the shift nor stall a run for hours.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.saturating_sub(1).min(6))
}

/// HTTP client for a Yahoo-Finance-style quote/chart API.
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl YahooClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let base_url = std::env::var("STOCKMON_PROVIDER_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| config.base_url.clone());

        let timeout_secs = std::env::var("STOCKMON_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(config.timeout_secs);

        let retries = std::env::var("STOCKMON_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(config.retries)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build price provider http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
        })
    }

    fn url(&self, path: &str, ticker: &str) -> String {
        format!("{}{}/{}", self.base_url.trim_end_matches('/'), path, ticker)
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let res = self.http.get(url).query(query).send().await;
            let res = match res {
                Ok(r) => r,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("price provider request failed");
                    }
                    let backoff = backoff_delay(attempt);
                    tracing::warn!(attempt, ?backoff, error = %err, "provider request failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            let status = res.status();
            let text = res
                .text()
                .await
                .context("failed to read provider response")?;

            if !status.is_success() {
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if retryable && attempt < self.retries {
                    let backoff = backoff_delay(attempt);
                    tracing::warn!(attempt, ?backoff, http_status = %status, "provider HTTP error; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                anyhow::bail!("price provider HTTP {status}: {text}");
            }

            return Ok(text);
        }
    }

    async fn fetch_range(&self, ticker: &str, range: &str) -> Result<Vec<PricePoint>> {
        let url = self.url(CHART_PATH, ticker);
        let text = self
            .get_text(&url, &[("range", range), ("interval", "1d")])
            .await
            .with_context(|| format!("chart fetch failed for {ticker} range {range}"))?;

        let body: ChartResponse = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse chart response for {ticker}"))?;
        let result = chart_result(body, ticker)?;
        Ok(series_from_chart(&result))
    }

    async fn fetch_current(&self, ticker: &str) -> Result<(Vec<PricePoint>, ChartMeta)> {
        let url = self.url(CHART_PATH, ticker);
        let text = self
            .get_text(&url, &[("range", RANGE_DAY), ("interval", "1d")])
            .await
            .with_context(|| format!("chart fetch failed for {ticker} range {RANGE_DAY}"))?;

        let body: ChartResponse = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse chart response for {ticker}"))?;
        let result = chart_result(body, ticker)?;
        let series = series_from_chart(&result);
        Ok((series, result.meta))
    }

    async fn fetch_summary(&self, ticker: &str) -> Result<SummaryResult> {
        let url = self.url(SUMMARY_PATH, ticker);
        let text = self
            .get_text(&url, &[("modules", SUMMARY_MODULES)])
            .await
            .with_context(|| format!("quote summary fetch failed for {ticker}"))?;

        let body: SummaryResponse = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse quote summary for {ticker}"))?;

        if let Some(err) = body.quote_summary.error {
            anyhow::bail!("quote summary error for {ticker}: {err}");
        }
        body.quote_summary
            .result
            .into_iter()
            .next()
            .with_context(|| format!("empty quote summary for {ticker}"))
    }
}

#[async_trait::async_trait]
impl super::PriceHistoryProvider for YahooClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_http"
    }

    async fn fetch_snapshot(&self, ticker: &str) -> Result<StockSnapshot> {
        let summary = self.fetch_summary(ticker).await?;
        let (daily, meta) = self.fetch_current(ticker).await?;
        let weekly = self.fetch_range(ticker, RANGE_WEEK).await?;
        let monthly = self.fetch_range(ticker, RANGE_MONTH).await?;
        let yearly = self.fetch_range(ticker, RANGE_YEAR).await?;

        let current_price = meta
            .regular_market_price
            .or_else(|| daily.last().map(|p| p.close));

        let profile = summary.asset_profile.unwrap_or_default();
        let price = summary.price.unwrap_or_default();
        let detail = summary.summary_detail.unwrap_or_default();

        let company_name = price
            .long_name
            .or(price.short_name)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "N/A".to_string());

        let currency = price
            .currency
            .or(meta.currency)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "USD".to_string());

        Ok(StockSnapshot {
            ticker: ticker.to_string(),
            company_name,
            sector: non_empty_or_na(profile.sector),
            industry: non_empty_or_na(profile.industry),
            current_price,
            currency,
            market_cap: raw(&price.market_cap),
            pe_ratio: raw(&detail.trailing_pe),
            dividend_yield: raw(&detail.dividend_yield),
            week_high_52: raw(&detail.fifty_two_week_high),
            week_low_52: raw(&detail.fifty_two_week_low),
            employees: profile.full_time_employees,
            website: profile.website.filter(|s| !s.trim().is_empty()),
            description: profile
                .long_business_summary
                .filter(|s| !s.trim().is_empty()),
            daily,
            weekly,
            monthly,
            yearly,
            fetched_at: Utc::now(),
            error: None,
        })
    }
}

fn chart_result(body: ChartResponse, ticker: &str) -> Result<ChartResult> {
    if let Some(err) = body.chart.error {
        anyhow::bail!("chart error for {ticker}: {err}");
    }
    body.chart
        .result
        .into_iter()
        .next()
        .with_context(|| format!("empty chart result for {ticker}"))
}

/// Pairs timestamps with close prices, dropping bars whose close is null.
fn series_from_chart(result: &ChartResult) -> Vec<PricePoint> {
    let closes = result
        .indicators
        .quote
        .first()
        .map(|q| q.close.as_slice())
        .unwrap_or(&[]);

    result
        .timestamp
        .iter()
        .zip(closes.iter())
        .filter_map(|(ts, close)| {
            let close = (*close)?;
            let date = chrono::DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(PricePoint::new(date, close))
        })
        .collect()
}

fn non_empty_or_na(v: Option<String>) -> String {
    v.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "N/A".to_string())
}

fn raw(v: &Option<RawNum>) -> Option<f64> {
    v.as_ref().and_then(|n| n.raw)
}

#[derive(Debug, Clone, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    chart: ChartEnvelope,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Vec<ChartResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct SummaryResponse {
    #[serde(default, rename = "quoteSummary")]
    quote_summary: SummaryEnvelope,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    result: Vec<SummaryResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SummaryResult {
    #[serde(default, rename = "assetProfile")]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    price: Option<PriceBlock>,
    #[serde(default, rename = "summaryDetail")]
    summary_detail: Option<SummaryDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AssetProfile {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default, rename = "longBusinessSummary")]
    long_business_summary: Option<String>,
    #[serde(default, rename = "fullTimeEmployees")]
    full_time_employees: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PriceBlock {
    #[serde(default, rename = "longName")]
    long_name: Option<String>,
    #[serde(default, rename = "shortName")]
    short_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, rename = "marketCap")]
    market_cap: Option<RawNum>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SummaryDetail {
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawNum>,
    #[serde(default, rename = "dividendYield")]
    dividend_yield: Option<RawNum>,
    #[serde(default, rename = "fiftyTwoWeekHigh")]
    fifty_two_week_high: Option<RawNum>,
    #[serde(default, rename = "fiftyTwoWeekLow")]
    fifty_two_week_low: Option<RawNum>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawNum {
    #[serde(default)]
    raw: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(7), Duration::from_secs(64));
        assert_eq!(backoff_delay(40), Duration::from_secs(64));
    }

    #[test]
    fn parses_chart_series_and_skips_null_closes() {
        // 2026-08-24 through 2026-08-26, midnight UTC.
        let v = json!({
            "chart": {
                "result": [{
                    "meta": {"currency": "USD", "regularMarketPrice": 150.25},
                    "timestamp": [1787529600, 1787616000, 1787702400],
                    "indicators": {"quote": [{"close": [140.0, null, 149.5]}]}
                }],
                "error": null
            }
        });

        let body: ChartResponse = serde_json::from_value(v).unwrap();
        let result = chart_result(body, "AAPL").unwrap();
        assert_eq!(result.meta.regular_market_price, Some(150.25));

        let series = series_from_chart(&result);
        assert_eq!(series.len(), 2);
        assert_eq!(
            series[0].date,
            NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
        );
        assert_eq!(series[0].close, 140.0);
        assert_eq!(series[1].close, 149.5);
    }

    #[test]
    fn chart_error_payload_is_an_error() {
        let v = json!({
            "chart": {
                "result": [],
                "error": {"code": "Not Found", "description": "No data found"}
            }
        });
        let body: ChartResponse = serde_json::from_value(v).unwrap();
        let err = chart_result(body, "NOSUCH").unwrap_err();
        assert!(err.to_string().contains("NOSUCH"));
    }

    #[test]
    fn parses_quote_summary_fields() {
        let v = json!({
            "quoteSummary": {
                "result": [{
                    "assetProfile": {
                        "sector": "Technology",
                        "industry": "Consumer Electronics",
                        "website": "https://www.apple.com",
                        "longBusinessSummary": "Apple designs smartphones.",
                        "fullTimeEmployees": 164000
                    },
                    "price": {
                        "longName": "Apple Inc.",
                        "shortName": "Apple",
                        "currency": "USD",
                        "marketCap": {"raw": 3.1e12, "fmt": "3.1T"}
                    },
                    "summaryDetail": {
                        "trailingPE": {"raw": 29.31},
                        "dividendYield": {"raw": 0.0045}
                    }
                }],
                "error": null
            }
        });

        let body: SummaryResponse = serde_json::from_value(v).unwrap();
        let result = body.quote_summary.result.into_iter().next().unwrap();
        let price = result.price.unwrap();
        assert_eq!(price.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(raw(&price.market_cap), Some(3.1e12));

        let detail = result.summary_detail.unwrap();
        assert_eq!(raw(&detail.trailing_pe), Some(29.31));
        assert_eq!(raw(&detail.dividend_yield), Some(0.0045));

        let profile = result.asset_profile.unwrap();
        assert_eq!(profile.full_time_employees, Some(164000));
    }

    #[test]
    fn missing_summary_modules_default_to_none() {
        let v = json!({
            "quoteSummary": {"result": [{}], "error": null}
        });
        let body: SummaryResponse = serde_json::from_value(v).unwrap();
        let result = body.quote_summary.result.into_iter().next().unwrap();
        assert!(result.asset_profile.is_none());
        assert!(result.price.is_none());
    }
}
