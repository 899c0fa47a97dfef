use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{ChartError, OhlcvSeries};

/// Upstream source of daily price history.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch the daily series for `[start, end]`. A transport failure or an
    /// empty range surfaces as `ProviderUnavailable`.
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: DateTime<Utc>,
    ) -> Result<OhlcvSeries, ChartError>;
}
