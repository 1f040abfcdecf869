use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use screen_core::{Bar, MarketDataProvider, Ticker};

/// Outcome of one batch download. Keeping "nothing matched" distinct from
/// "the provider failed" means callers never have to infer errors from an
/// empty map.
#[derive(Debug)]
pub enum SeriesFetch {
    Series(HashMap<Ticker, Vec<Bar>>),
    /// Rate limited on every attempt up to the ceiling.
    TransientFailure(String),
    /// Non-throttle provider failure; retrying would not help.
    PermanentFailure(String),
}

/// Fetches one batch of daily histories, retrying rate-limit failures with a
/// growing cooldown. Fetched series live for the duration of the batch only;
/// nothing is cached across batches.
pub struct SeriesStore {
    provider: Arc<dyn MarketDataProvider>,
    max_retries: u32,
    backoff: Duration,
}

impl SeriesStore {
    pub fn new(provider: Arc<dyn MarketDataProvider>, max_retries: u32, backoff: Duration) -> Self {
        Self {
            provider,
            max_retries,
            backoff,
        }
    }

    /// The n-th failed attempt waits n times the base backoff before the
    /// next try. No cooldown after the final attempt.
    pub async fn fetch_batch(&self, tickers: &[Ticker]) -> SeriesFetch {
        let attempts = self.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.provider.daily_history(tickers).await {
                Ok(series) => return SeriesFetch::Series(series),
                Err(e) if e.is_rate_limit() => {
                    last_error = e.to_string();
                    if attempt < attempts {
                        let wait = self.backoff * attempt;
                        tracing::warn!(
                            "rate limited, cooling down {}s (attempt {attempt}/{attempts})",
                            wait.as_secs()
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(e) => return SeriesFetch::PermanentFailure(e.to_string()),
            }
        }

        SeriesFetch::TransientFailure(last_error)
    }
}
