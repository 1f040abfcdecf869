//! Shared test doubles and series builders.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use screen_core::{
    Bar, FundamentalsProvider, MarketDataProvider, ProviderError, QuarterlyReport, Ticker,
};

/// In-memory market data source. Scripted failures are served first, one per
/// call, then the canned series.
pub struct MockMarket {
    series: HashMap<Ticker, Vec<Bar>>,
    failures: Mutex<VecDeque<ProviderError>>,
    calls: AtomicUsize,
}

impl MockMarket {
    pub fn new(series: HashMap<Ticker, Vec<Bar>>) -> Self {
        Self {
            series,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_failures(
        series: HashMap<Ticker, Vec<Bar>>,
        failures: Vec<ProviderError>,
    ) -> Self {
        Self {
            series,
            failures: Mutex::new(failures.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn daily_history(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<Ticker, Vec<Bar>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(tickers
            .iter()
            .filter_map(|t| self.series.get(t).map(|bars| (t.clone(), bars.clone())))
            .collect())
    }
}

/// In-memory fundamentals source. Tickers without canned reports get an
/// empty result; tickers listed in `errors` fail the call.
pub struct MockFundamentals {
    reports: HashMap<Ticker, Vec<QuarterlyReport>>,
    errors: Vec<Ticker>,
}

impl MockFundamentals {
    pub fn new(reports: HashMap<Ticker, Vec<QuarterlyReport>>) -> Self {
        Self {
            reports,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(
        reports: HashMap<Ticker, Vec<QuarterlyReport>>,
        errors: Vec<Ticker>,
    ) -> Self {
        Self { reports, errors }
    }
}

#[async_trait]
impl FundamentalsProvider for MockFundamentals {
    async fn quarterly_reports(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<QuarterlyReport>, ProviderError> {
        if self.errors.contains(ticker) {
            return Err(ProviderError::Api("scripted fundamentals outage".to_string()));
        }
        Ok(self.reports.get(ticker).cloned().unwrap_or_default())
    }
}

pub fn bars_from_closes(closes: &[f64], volume: f64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        })
        .collect()
}

/// 300 days flat at 100 with a 3-day surge: golden cross two days before the
/// series end, liquidity comfortably above the floor.
pub fn golden_series() -> Vec<Bar> {
    let mut closes = vec![100.0; 297];
    closes.extend_from_slice(&[105.0, 110.0, 115.0]);
    bars_from_closes(&closes, 250_000.0)
}

/// 300 days flat at 100 with a 3-day slide: death cross two days before the
/// series end.
pub fn death_series() -> Vec<Bar> {
    let mut closes = vec![100.0; 297];
    closes.extend_from_slice(&[95.0, 90.0, 85.0]);
    bars_from_closes(&closes, 250_000.0)
}

/// Too short to screen.
pub fn short_series() -> Vec<Bar> {
    let mut closes = vec![100.0; 147];
    closes.extend_from_slice(&[105.0, 110.0, 115.0]);
    bars_from_closes(&closes, 250_000.0)
}

fn quarter(date: (i32, u32, u32), revenue: f64, eps: f64) -> QuarterlyReport {
    let mut line_items = HashMap::new();
    line_items.insert("Basic EPS".to_string(), eps);
    QuarterlyReport {
        period: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        revenue: Some(revenue),
        line_items,
    }
}

/// Three quarters of strictly increasing revenue and EPS.
pub fn growing_quarters() -> Vec<QuarterlyReport> {
    vec![
        quarter((2025, 6, 30), 120.0, 3.0),
        quarter((2025, 3, 31), 110.0, 2.0),
        quarter((2024, 12, 31), 100.0, 1.0),
    ]
}

/// Revenue grows but EPS is flat, so a bullish confirmation fails.
pub fn flat_eps_quarters() -> Vec<QuarterlyReport> {
    vec![
        quarter((2025, 6, 30), 120.0, 2.0),
        quarter((2025, 3, 31), 110.0, 2.0),
        quarter((2024, 12, 31), 100.0, 2.0),
    ]
}

/// Three quarters of strictly decreasing revenue and EPS.
pub fn declining_quarters() -> Vec<QuarterlyReport> {
    vec![
        quarter((2025, 6, 30), 100.0, 1.0),
        quarter((2025, 3, 31), 110.0, 2.0),
        quarter((2024, 12, 31), 120.0, 3.0),
    ]
}
