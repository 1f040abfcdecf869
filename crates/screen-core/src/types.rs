use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Equity ticker symbol, normalized to the data provider's format.
///
/// Class-share dots ("BRK.B") are rewritten to the dash form ("BRK-B") the
/// provider expects. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().replace('.', "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction of a moving-average crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossDirection {
    Bullish,
    Bearish,
}

impl CrossDirection {
    /// Short signal tag used in the output table.
    pub fn signal_label(&self) -> &'static str {
        match self {
            CrossDirection::Bullish => "GOLDEN",
            CrossDirection::Bearish => "DEATH",
        }
    }
}

/// A detected SMA50/SMA200 crossing for one ticker. Consumed once by the
/// fundamentals stage, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossoverEvent {
    pub ticker: Ticker,
    pub direction: CrossDirection,
    /// Trading day the short average crossed the long one.
    pub date: NaiveDate,
    /// Most recent close at signal time.
    pub price: f64,
    /// SMA50(close) x SMA50(volume), an average dollar-volume proxy.
    pub liquidity: f64,
    pub one_year_change_pct: f64,
}

/// One quarterly reporting period as returned by the fundamentals provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyReport {
    pub period: NaiveDate,
    pub revenue: Option<f64>,
    /// Raw labeled statement rows (e.g. "Basic EPS", "Diluted EPS").
    pub line_items: HashMap<String, f64>,
}

/// Outcome of the fundamentals confirmation stage. The reason is always
/// populated, including on a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsVerdict {
    pub passed: bool,
    pub reason: String,
}

impl FundamentalsVerdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: "Passed".to_string(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

/// The four result buckets: cross direction crossed with the fundamentals
/// outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    BullishConfirmed,
    BullishSpeculative,
    BearishConfirmed,
    BearishSpeculative,
}

impl Category {
    pub fn from_outcome(direction: CrossDirection, passed: bool) -> Self {
        match (direction, passed) {
            (CrossDirection::Bullish, true) => Category::BullishConfirmed,
            (CrossDirection::Bullish, false) => Category::BullishSpeculative,
            (CrossDirection::Bearish, true) => Category::BearishConfirmed,
            (CrossDirection::Bearish, false) => Category::BearishSpeculative,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Category::BullishConfirmed => "Bullish (Confirmed)",
            Category::BullishSpeculative => "Bullish (Speculative)",
            Category::BearishConfirmed => "Bearish (Confirmed)",
            Category::BearishSpeculative => "Bearish (Speculative)",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Fully formatted output row handed to the report renderer. Every field is a
/// ready-to-display string; none is ever empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub ticker: String,
    pub category: Category,
    pub signal: String,
    pub price: String,
    pub one_year_change: String,
    pub fundamentals: String,
    pub liquidity: String,
    pub date: String,
}

impl ResultRecord {
    pub fn new(event: &CrossoverEvent, verdict: &FundamentalsVerdict) -> Self {
        Self {
            ticker: event.ticker.to_string(),
            category: Category::from_outcome(event.direction, verdict.passed),
            signal: event.direction.signal_label().to_string(),
            price: format_price(event.price),
            one_year_change: format_percent(event.one_year_change_pct),
            fundamentals: if verdict.passed {
                "PASSED".to_string()
            } else {
                format!("FAIL ({})", verdict.reason)
            },
            liquidity: format_liquidity(event.liquidity),
            date: event.date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// `123.456` -> `"123.46"`
pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

/// `12.3` -> `"+12.30%"`
pub fn format_percent(pct: f64) -> String {
    format!("{pct:+.2}%")
}

/// Condensed millions: `25_000_000.0` -> `"$25.0M"`
pub fn format_liquidity(liquidity: f64) -> String {
    format!("${:.1}M", liquidity / 1_000_000.0)
}

/// Final artifact of a screening run, consumed by the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    pub records: Vec<ResultRecord>,
    pub generated_at: DateTime<Utc>,
    pub total_screened: usize,
}
