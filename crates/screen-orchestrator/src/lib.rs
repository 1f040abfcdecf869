pub mod store;

pub use store::{SeriesFetch, SeriesStore};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use fundamental_screen::FundamentalsGate;
use screen_core::{
    CrossDirection, CrossoverEvent, FundamentalsProvider, FundamentalsVerdict,
    MarketDataProvider, ResultRecord, ScreenReport, Ticker,
};
use technical_screen::{CrossoverDetector, DetectorConfig};
use yahoo_client::YahooClient;

/// Screening pipeline knobs. The defaults match live-provider pacing; tests
/// shrink the batches and zero the delays.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Tickers per price-history download.
    pub batch_size: usize,
    /// Trailing trading days scanned for a cross event.
    pub lookback_days: usize,
    /// Delay between consecutive batches.
    pub batch_pacing: Duration,
    /// Concurrent fundamentals confirmations per batch.
    pub fundamental_workers: usize,
    /// Attempt ceiling for rate-limited history downloads.
    pub max_fetch_retries: u32,
    /// Base cooldown unit; the n-th failed attempt waits n times this.
    pub retry_backoff: Duration,
    pub min_price: f64,
    pub min_liquidity: f64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            lookback_days: 5,
            batch_pacing: Duration::from_secs(2),
            fundamental_workers: 5,
            max_fetch_retries: 3,
            retry_backoff: Duration::from_secs(60),
            min_price: 10.0,
            min_liquidity: 20_000_000.0,
        }
    }
}

impl ScreenerConfig {
    fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            lookback_days: self.lookback_days,
            min_price: self.min_price,
            min_liquidity: self.min_liquidity,
        }
    }
}

/// Drives the batched screen: fetch, detect, confirm, emit.
///
/// Batches run strictly one after another; inside a batch the technical pass
/// is sequential and the fundamentals pass fans out over a bounded worker
/// pool. Failures never escalate past a single ticker or a single batch.
pub struct ScreeningOrchestrator {
    config: ScreenerConfig,
    store: SeriesStore,
    detector: CrossoverDetector,
    gate: Arc<FundamentalsGate>,
}

impl ScreeningOrchestrator {
    pub fn new(
        config: ScreenerConfig,
        market: Arc<dyn MarketDataProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
    ) -> Self {
        let store = SeriesStore::new(market, config.max_fetch_retries, config.retry_backoff);
        let detector = CrossoverDetector::new(config.detector_config());
        let gate = Arc::new(FundamentalsGate::new(fundamentals));

        Self {
            config,
            store,
            detector,
            gate,
        }
    }

    /// Wire both provider roles to Yahoo, the default data source.
    pub fn with_yahoo(config: ScreenerConfig) -> Self {
        let yahoo = Arc::new(YahooClient::new());
        Self::new(config, yahoo.clone(), yahoo)
    }

    /// Screen the whole universe. Infallible: a provider failure costs at
    /// most its batch and the report carries whatever records were
    /// producible, possibly none.
    pub async fn run(&self, universe: &[Ticker]) -> ScreenReport {
        let batches: Vec<&[Ticker]> = universe.chunks(self.config.batch_size.max(1)).collect();
        let total_batches = batches.len();
        tracing::info!(
            "screening {} tickers in {} batches",
            universe.len(),
            total_batches
        );

        let mut records = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            tracing::info!("batch {}/{}: {} tickers", index + 1, total_batches, batch.len());
            records.extend(self.run_batch(batch).await);

            if index + 1 < total_batches {
                tokio::time::sleep(self.config.batch_pacing).await;
            }
        }

        if records.is_empty() {
            tracing::info!("no stocks met criteria");
        } else {
            tracing::info!("run complete: {} records", records.len());
        }

        ScreenReport {
            records,
            generated_at: Utc::now(),
            total_screened: universe.len(),
        }
    }

    async fn run_batch(&self, batch: &[Ticker]) -> Vec<ResultRecord> {
        let series = match self.store.fetch_batch(batch).await {
            SeriesFetch::Series(series) => series,
            SeriesFetch::TransientFailure(reason) => {
                tracing::warn!("batch abandoned after retries: {reason}");
                return Vec::new();
            }
            SeriesFetch::PermanentFailure(reason) => {
                tracing::warn!("batch abandoned: {reason}");
                return Vec::new();
            }
        };

        // Technical pass, sequential in batch order. Tickers the provider
        // skipped or the detector rejected simply produce no record.
        let mut matches = Vec::new();
        let mut bullish = 0usize;
        let mut bearish = 0usize;
        for ticker in batch {
            let Some(bars) = series.get(ticker) else {
                continue;
            };
            if let Some(event) = self.detector.evaluate(ticker, bars) {
                match event.direction {
                    CrossDirection::Bullish => bullish += 1,
                    CrossDirection::Bearish => bearish += 1,
                }
                matches.push(event);
            }
        }
        tracing::info!(
            "batch technicals: {bullish} bullish, {bearish} bearish, {} without a signal",
            batch.len() - bullish - bearish
        );

        if matches.is_empty() {
            return Vec::new();
        }

        self.confirm_matches(matches).await
    }

    /// Bounded fan-out: one confirmation task per technical match, each
    /// returning its own verdict. Results are joined here, so no shared
    /// accumulator is ever touched from a worker.
    async fn confirm_matches(&self, matches: Vec<CrossoverEvent>) -> Vec<ResultRecord> {
        let semaphore = Arc::new(Semaphore::new(self.config.fundamental_workers.max(1)));
        let mut tasks: JoinSet<(CrossoverEvent, FundamentalsVerdict)> = JoinSet::new();

        for event in matches {
            let sem = Arc::clone(&semaphore);
            let gate = Arc::clone(&self.gate);
            tasks.spawn(async move {
                let _permit = sem.acquire().await.unwrap();
                let verdict = gate.confirm(&event.ticker, event.direction).await;
                (event, verdict)
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((event, verdict)) => records.push(ResultRecord::new(&event, &verdict)),
                Err(e) => tracing::error!("confirmation task failed: {e}"),
            }
        }
        records
    }
}
