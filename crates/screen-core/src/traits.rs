use async_trait::async_trait;
use std::collections::HashMap;

use crate::{Bar, ProviderError, QuarterlyReport, Ticker};

/// Source of daily adjusted OHLCV history.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// One trailing year of daily bars per ticker, ascending by date,
    /// split/dividend adjusted. Tickers the provider cannot serve are simply
    /// absent from the map; callers must re-validate history length.
    async fn daily_history(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<Ticker, Vec<Bar>>, ProviderError>;
}

/// Source of quarterly report history.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Recent quarterly reports for one ticker, in no particular order. An
    /// empty vector means the provider has no financial data for the name.
    async fn quarterly_reports(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<QuarterlyReport>, ProviderError>;
}
