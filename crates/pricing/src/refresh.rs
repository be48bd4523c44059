//! Background price refresh — keeps the table current without coupling
//! price fetches to any individual call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openrelay_core::pricing::ModelPricing;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::table::PriceTable;

/// A source of fresh model prices (typically the provider's `/models`
/// endpoint, or a configuration file).
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self) -> Result<HashMap<String, ModelPricing>, String>;
}

/// Spawn a task that refreshes `table` from `source` on a fixed interval.
///
/// The first refresh runs immediately. Fetch failures are logged and the
/// previous table is kept; individual calls never observe a refresh error.
/// Dropping the returned handle does not stop the task; abort it to stop.
pub fn spawn_refresh(
    table: Arc<PriceTable>,
    source: Arc<dyn PriceSource>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match source.fetch().await {
                Ok(prices) => {
                    debug!(models = prices.len(), "Refreshed price table");
                    table.replace(prices);
                }
                Err(e) => {
                    warn!(error = %e, "Price refresh failed, keeping previous table");
                }
            }
        }
    })
}
