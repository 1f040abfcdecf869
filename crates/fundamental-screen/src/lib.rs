use std::sync::Arc;

use screen_core::{
    CrossDirection, FundamentalsProvider, FundamentalsVerdict, QuarterlyReport, Ticker,
};

/// Labels probed for a per-share earnings row, in preference order.
const EPS_LABELS: [&str; 2] = ["Basic EPS", "Diluted EPS"];

/// Confirms a technical signal against the recent fundamentals trend: three
/// strictly monotonic quarters of revenue and per-share earnings in the
/// direction of the cross.
pub struct FundamentalsGate {
    provider: Arc<dyn FundamentalsProvider>,
}

impl FundamentalsGate {
    pub fn new(provider: Arc<dyn FundamentalsProvider>) -> Self {
        Self { provider }
    }

    /// Fetch quarterly reports and judge them. Total per ticker: provider
    /// failures collapse into a failed verdict instead of propagating, so a
    /// single name cannot abort its batch.
    pub async fn confirm(&self, ticker: &Ticker, direction: CrossDirection) -> FundamentalsVerdict {
        match self.provider.quarterly_reports(ticker).await {
            Ok(reports) => evaluate_reports(direction, reports),
            Err(e) => {
                tracing::warn!("fundamentals fetch failed for {ticker}: {e}");
                FundamentalsVerdict::fail(e.to_string())
            }
        }
    }
}

/// Judge the three most recent distinct quarters against `direction`.
pub fn evaluate_reports(
    direction: CrossDirection,
    mut reports: Vec<QuarterlyReport>,
) -> FundamentalsVerdict {
    if reports.is_empty() {
        return FundamentalsVerdict::fail("No Financial Data");
    }

    // Most recent first, one row per reporting period. The sort is stable so
    // a duplicated period keeps its first occurrence.
    reports.sort_by(|a, b| b.period.cmp(&a.period));
    reports.dedup_by_key(|r| r.period);

    if reports.len() < 3 {
        return FundamentalsVerdict::fail("Insufficient Quarters");
    }
    let recent = &reports[..3];

    let revenue: Vec<f64> = match recent.iter().map(|r| r.revenue).collect::<Option<Vec<_>>>() {
        Some(values) => values,
        None => return FundamentalsVerdict::fail("Revenue Data Missing"),
    };
    if let Some(verdict) = check_trend(direction, &revenue, "Revenue") {
        return verdict;
    }

    let eps_key = match find_eps_key(recent) {
        Some(key) => key,
        None => return FundamentalsVerdict::fail("EPS Key Missing"),
    };
    // A quarter missing the chosen row can never satisfy a strict trend.
    let eps: Vec<f64> = recent
        .iter()
        .map(|r| r.line_items.get(&eps_key).copied().unwrap_or(f64::NAN))
        .collect();
    if let Some(verdict) = check_trend(direction, &eps, "EPS") {
        return verdict;
    }

    FundamentalsVerdict::pass()
}

/// `None` when the three values are strictly monotonic in the wanted
/// direction, otherwise the failing verdict naming the metric.
fn check_trend(
    direction: CrossDirection,
    values: &[f64],
    metric: &str,
) -> Option<FundamentalsVerdict> {
    let (curr, one_ago, two_ago) = (values[0], values[1], values[2]);
    let ok = match direction {
        CrossDirection::Bullish => curr > one_ago && one_ago > two_ago,
        CrossDirection::Bearish => curr < one_ago && one_ago < two_ago,
    };
    if ok {
        return None;
    }

    let reason = match direction {
        CrossDirection::Bullish => format!("{metric} Not Growing"),
        CrossDirection::Bearish => format!("{metric} Not Declining"),
    };
    Some(FundamentalsVerdict::fail(reason))
}

/// Fuzzy lookup of the per-share earnings row: any label containing
/// "Basic EPS", else any containing "Diluted EPS".
fn find_eps_key(reports: &[QuarterlyReport]) -> Option<String> {
    for label in EPS_LABELS {
        for report in reports {
            if let Some(key) = report.line_items.keys().find(|k| k.contains(label)) {
                return Some(key.clone());
            }
        }
    }
    None
}
