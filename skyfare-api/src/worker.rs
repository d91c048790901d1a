use skyfare_order::MarketUpdater;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Runs a market pass every `every` until the process exits.
pub async fn start_market_worker(updater: MarketUpdater, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    info!("Market worker started, updating every {:?}", every);

    loop {
        ticker.tick().await;
        if let Err(e) = updater.run_once().await {
            error!("Market update failed: {}", e);
        }
    }
}
