use chrono::NaiveDate;

use screen_core::{Bar, CrossDirection, CrossoverEvent, Ticker};

use crate::indicators::sma_aligned;

const MIN_OBSERVATIONS: usize = 200;
const SHORT_WINDOW: usize = 50;
const LONG_WINDOW: usize = 200;

/// Thresholds and window for the crossover scan.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Trailing trading days scanned for a cross event.
    pub lookback_days: usize,
    /// Penny-stock floor: the most recent close must exceed this.
    pub min_price: f64,
    /// Floor on SMA50(close) x SMA50(volume), an average dollar-volume proxy.
    pub min_liquidity: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lookback_days: 5,
            min_price: 10.0,
            min_liquidity: 20_000_000.0,
        }
    }
}

/// Scans one ticker's daily history for a golden or death cross inside the
/// trailing lookback window.
pub struct CrossoverDetector {
    config: DetectorConfig,
}

impl CrossoverDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Evaluate one ticker. Total per ticker: every data defect maps to
    /// `None`, never a panic or an error, so one bad series cannot sink its
    /// batch.
    ///
    /// The scan walks the window chronologically and stops at the first
    /// crossing found. Equality counts as not-yet-crossed on the prior day:
    /// equal-then-greater is a cross, equal-then-equal is not.
    pub fn evaluate(&self, ticker: &Ticker, bars: &[Bar]) -> Option<CrossoverEvent> {
        if bars.len() < MIN_OBSERVATIONS {
            tracing::debug!("{ticker}: {} observations, unscreenable", bars.len());
            return None;
        }

        let current_price = bars.last()?.close;
        if !current_price.is_finite() || current_price <= self.config.min_price {
            return None;
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let sma50 = sma_aligned(&closes, SHORT_WINDOW);
        let sma200 = sma_aligned(&closes, LONG_WINDOW);
        let vol_sma50 = sma_aligned(&volumes, SHORT_WINDOW);

        let latest_sma50 = (*sma50.last()?)?;
        let latest_vol_sma = (*vol_sma50.last()?)?;
        let liquidity = latest_sma50 * latest_vol_sma;
        if !liquidity.is_finite() || liquidity < self.config.min_liquidity {
            tracing::debug!("{ticker}: liquidity {liquidity:.0} under floor");
            return None;
        }

        // Trailing lookback_days + 1 observations; the extra one supplies the
        // prior day for the first comparison.
        let window = self.config.lookback_days + 1;
        if bars.len() < window || window < 2 {
            return None;
        }
        let start = bars.len() - window;

        let mut detected: Option<(CrossDirection, NaiveDate)> = None;
        for i in start + 1..bars.len() {
            let (prev_50, prev_200, curr_50, curr_200) =
                match (sma50[i - 1], sma200[i - 1], sma50[i], sma200[i]) {
                    (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                    // An undefined average inside the evaluation window means
                    // the history is too thin to judge; drop the ticker.
                    _ => return None,
                };

            if prev_50 <= prev_200 && curr_50 > curr_200 {
                detected = Some((CrossDirection::Bullish, bars[i].timestamp.date_naive()));
                break;
            }
            if prev_50 >= prev_200 && curr_50 < curr_200 {
                detected = Some((CrossDirection::Bearish, bars[i].timestamp.date_naive()));
                break;
            }
        }

        let (direction, date) = detected?;

        let start_price = bars.first()?.close;
        if !start_price.is_finite() || start_price == 0.0 {
            return None;
        }
        let one_year_change_pct = (current_price - start_price) / start_price * 100.0;

        Some(CrossoverEvent {
            ticker: ticker.clone(),
            direction,
            date,
            price: current_price,
            liquidity,
            one_year_change_pct,
        })
    }
}

impl Default for CrossoverDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
