pub mod bar_store;

use anyhow::Result;

use crate::types::{Bar, DateRange};

pub use bar_store::BarStore;

/// Supplies historical bars per ticker.
///
/// An empty vec means "no data for this range" and is not an error.
pub trait MarketDataSource: Send + Sync {
    fn fetch(&self, ticker: &str, range: &DateRange) -> Result<Vec<Bar>>;
}
