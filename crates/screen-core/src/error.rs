use thiserror::Error;

/// Failure classes surfaced by the market data and fundamentals providers.
///
/// Rate limiting is its own variant so callers can back off and retry instead
/// of inspecting error strings or conflating throttling with empty results.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider error: {0}")]
    Api(String),

    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("no data: {0}")]
    NoData(String),
}

impl ProviderError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }
}
