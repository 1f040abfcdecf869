use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use screen_core::{
    Bar, FundamentalsProvider, MarketDataProvider, ProviderError, QuarterlyReport, Ticker,
};

const BASE_URL: &str = "https://query1.finance.yahoo.com";
// Yahoo rejects reqwest's default agent outright.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Quarterly rows requested from the fundamentals timeseries endpoint and the
/// statement labels they surface under.
const QUARTERLY_TYPES: [(&str, &str); 3] = [
    ("quarterlyTotalRevenue", "Total Revenue"),
    ("quarterlyBasicEPS", "Basic EPS"),
    ("quarterlyDilutedEPS", "Diluted EPS"),
];

/// Client for Yahoo's unofficial chart and fundamentals-timeseries endpoints.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get_body(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        if status.as_u16() == 429 || body.contains("Too Many Requests") {
            return Err(ProviderError::RateLimited(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(ProviderError::Api(format!("HTTP {status}")));
        }
        Ok(body)
    }

    /// One trailing year of daily, split/dividend-adjusted bars.
    async fn chart(&self, ticker: &Ticker) -> Result<Vec<Bar>, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1y&interval=1d&events=div%2Csplit",
            self.base_url, ticker
        );
        let body = self.get_body(&url).await?;
        parse_chart(&body)
    }

    async fn timeseries(&self, ticker: &Ticker) -> Result<Vec<QuarterlyReport>, ProviderError> {
        let types = QUARTERLY_TYPES
            .iter()
            .map(|(metric, _)| *metric)
            .collect::<Vec<_>>()
            .join(",");
        let period2 = Utc::now().timestamp();
        let period1 = period2 - 2 * 365 * 24 * 3600;
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}?type={}&period1={}&period2={}",
            self.base_url, ticker, types, period1, period2
        );
        let body = self.get_body(&url).await?;
        parse_timeseries(&body)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn daily_history(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<Ticker, Vec<Bar>>, ProviderError> {
        let mut series = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            match self.chart(ticker).await {
                Ok(bars) if !bars.is_empty() => {
                    series.insert(ticker.clone(), bars);
                }
                Ok(_) => tracing::debug!("{ticker}: empty chart payload"),
                // Throttling applies to the whole host; surface it so the
                // caller can back off instead of hammering the rest of the
                // batch.
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) => tracing::warn!("{ticker}: chart fetch failed: {e}"),
            }
        }
        Ok(series)
    }
}

#[async_trait]
impl FundamentalsProvider for YahooClient {
    async fn quarterly_reports(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<QuarterlyReport>, ProviderError> {
        self.timeseries(ticker).await
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<ChartAdjClose>>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    adjclose: Vec<Option<f64>>,
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten().filter(|v| v.is_finite())
}

/// Parse a v8 chart payload into ascending daily bars. Rows with a missing
/// OHLCV component are skipped; duplicate dates keep the first row; closes
/// are rescaled to the adjusted series when Yahoo supplies one.
fn parse_chart(body: &str) -> Result<Vec<Bar>, ProviderError> {
    let parsed: ChartResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = parsed.chart.error {
        return Err(ProviderError::Api(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    let mut results = parsed.chart.result.unwrap_or_default();
    if results.is_empty() {
        return Err(ProviderError::NoData("empty chart result".to_string()));
    }
    let result = results.remove(0);

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing quote block".to_string()))?;
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|mut blocks| {
            if blocks.is_empty() {
                None
            } else {
                Some(blocks.remove(0).adjclose)
            }
        });

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut last_date: Option<NaiveDate> = None;
    for (i, &ts) in timestamps.iter().enumerate() {
        let (open, high, low, close, volume) = match (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
            value_at(&quote.volume, i),
        ) {
            (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
            _ => continue,
        };

        let timestamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| ProviderError::Parse(format!("bad timestamp {ts}")))?;

        // Adjusted mode: rescale the whole bar by adjclose/close.
        let (open, high, low, close) = match adjclose.as_deref().and_then(|a| value_at(a, i)) {
            Some(adj) if close != 0.0 => {
                let ratio = adj / close;
                (open * ratio, high * ratio, low * ratio, adj)
            }
            _ => (open, high, low, close),
        };

        let date = timestamp.date_naive();
        if last_date == Some(date) {
            continue;
        }
        last_date = Some(date);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

/// Parse a fundamentals-timeseries payload into one report per period.
///
/// The payload carries one result entry per requested metric, each holding
/// parallel rows keyed by `asOfDate`; rows are merged across metrics here.
fn parse_timeseries(body: &str) -> Result<Vec<QuarterlyReport>, ProviderError> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let timeseries = parsed
        .get("timeseries")
        .ok_or_else(|| ProviderError::Parse("missing timeseries block".to_string()))?;
    if let Some(error) = timeseries.get("error").filter(|e| !e.is_null()) {
        return Err(ProviderError::Api(error.to_string()));
    }

    let results = timeseries
        .get("result")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    let mut by_period: HashMap<NaiveDate, QuarterlyReport> = HashMap::new();
    for entry in &results {
        let metric = entry
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(|t| t.get(0))
            .and_then(|t| t.as_str());
        let Some(metric) = metric else { continue };
        let Some(&(_, label)) = QUARTERLY_TYPES.iter().find(|(name, _)| *name == metric) else {
            continue;
        };
        let Some(rows) = entry.get(metric).and_then(|r| r.as_array()) else {
            continue;
        };

        for row in rows {
            let Some(date) = row
                .get("asOfDate")
                .and_then(|d| d.as_str())
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            else {
                continue;
            };
            let Some(value) = row
                .get("reportedValue")
                .and_then(|v| v.get("raw"))
                .and_then(|v| v.as_f64())
            else {
                continue;
            };

            let report = by_period.entry(date).or_insert_with(|| QuarterlyReport {
                period: date,
                revenue: None,
                line_items: HashMap::new(),
            });
            if label == "Total Revenue" {
                report.revenue = Some(value);
            } else {
                report.line_items.insert(label.to_string(), value);
            }
        }
    }

    Ok(by_period.into_values().collect())
}
