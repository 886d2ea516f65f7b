use reseller_core::rates::RateRegistry;
use reseller_core::store::RateStore;
use std::time::Duration;
use tracing::info;

/// Reloads the rate table on a fixed interval for the life of the process.
pub fn spawn_periodic_reload<S>(registry: RateRegistry, store: S, every: Duration)
where
    S: RateStore + 'static,
{
    tokio::spawn(async move {
        info!("Periodic rate reload every {}s", every.as_secs());
        let mut ticker = tokio::time::interval(every);
        // First tick fires immediately; startup already loaded the table.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.reload(&store).await;
        }
    });
}
